//! # archgraph — Go architecture and call-graph extraction
//!
//! Indexes a Go source tree with tree-sitter and derives two kinds of graphs
//! from the symbol tables: a whole-program architecture graph and bounded
//! call graphs rooted at chosen entry points.
//!
//! ## Architecture
//!
//! - **[`indexer`]** — Go parsing, call-site capture, the read-only [`indexer::SymbolIndex`]
//! - **[`resolver`]** — Name-based resolution of call sites and type references
//! - **[`callgraph`]** — Depth-limited walker, builder, per-event batch driver
//! - **[`architecture`]** — Containment, import, usage, embedding and call edges
//! - **[`contexts`]** — YAML mapping of process events to entry points
//! - **[`config`]** — JSON configuration loading, validation and projections

pub mod architecture;
pub mod callgraph;
pub mod config;
pub mod contexts;
pub mod indexer;
pub mod resolver;
