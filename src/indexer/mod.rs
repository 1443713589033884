//! Source indexing: tree-sitter front-end plus the symbol tables it fills.
pub mod calls;
pub mod core;
pub mod go_parser;
pub mod languages;
pub mod symbols;

use std::path::PathBuf;
use thiserror::Error;

pub use self::core::{IndexOptions, PackageIdStrategy, SymbolIndexer, index};
pub use self::symbols::{
    CLOSURE_TARGET, CallSite, Callable, Field, FunctionSymbol, IndexSummary, MethodSymbol, Package,
    SymbolIndex, TypeKind, TypeSymbol,
};

/// Errors that abort an index build. There is no partial index.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("source root does not exist: {0}")]
    MissingRoot(PathBuf),

    #[error("failed to walk source tree: {0}")]
    Walk(#[from] ignore::Error),

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to load grammar: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    #[error("invalid query: {0}")]
    Query(#[from] tree_sitter::QueryError),

    #[error("parser produced no tree for {path}")]
    Parse { path: String },

    #[error("syntax error in {path} at line {line}")]
    Syntax { path: String, line: usize },
}
