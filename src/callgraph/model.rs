use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Function,
    Method,
    InterfaceMethod,
    Closure,
    External,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Function => "function",
            NodeKind::Method => "method",
            NodeKind::InterfaceMethod => "interface_method",
            NodeKind::Closure => "closure",
            NodeKind::External => "external",
        }
    }

    /// Leaf nodes are never expanded and never the target of a cycle edge.
    pub fn is_leaf(&self) -> bool {
        matches!(self, NodeKind::Closure | NodeKind::External)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallType {
    Direct,
    Interface,
    Goroutine,
    Closure,
    Deferred,
}

impl CallType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallType::Direct => "direct",
            CallType::Interface => "interface",
            CallType::Goroutine => "goroutine",
            CallType::Closure => "closure",
            CallType::Deferred => "deferred",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallNode {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    pub function: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallEdge {
    pub from: String,
    pub to: String,
    pub call_type: CallType,
    pub line: usize,
    #[serde(rename = "async", skip_serializing_if = "std::ops::Not::not")]
    pub is_async: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub cycle: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub max_depth_reached: usize,
    pub interface_calls: usize,
    pub goroutine_calls: usize,
    pub cycles_detected: usize,
    pub unresolved_calls: usize,
}

/// Call graph rooted at one entry point.
#[derive(Debug, Clone, Serialize)]
pub struct CallGraph {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    pub entry_point: String,
    pub nodes: Vec<CallNode>,
    pub edges: Vec<CallEdge>,
    pub max_depth: usize,
    pub actual_depth: usize,
    pub stats: Stats,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip)]
    pub build_time: Duration,
}

impl CallGraph {
    pub fn node(&self, id: &str) -> Option<&CallNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Orders nodes by (depth, id) and edges by (from, to, line) so two
    /// builds of the same graph compare and serialize identically.
    pub fn sort(&mut self) {
        self.nodes
            .sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.id.cmp(&b.id)));
        self.edges.sort_by(|a, b| {
            a.from
                .cmp(&b.from)
                .then_with(|| a.to.cmp(&b.to))
                .then_with(|| a.line.cmp(&b.line))
                .then_with(|| a.call_type.as_str().cmp(b.call_type.as_str()))
        });
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SetStats {
    pub total_events: usize,
    pub mapped_events: usize,
    pub built_graphs: usize,
    pub failed_graphs: usize,
    pub total_nodes: usize,
    pub total_edges: usize,
}

/// Call graphs for every event of one or more processes, keyed by event ID.
#[derive(Debug, Clone, Serialize)]
pub struct EventCallGraphSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_id: Option<String>,
    pub graphs: BTreeMap<String, CallGraph>,
    pub generated_at: DateTime<Utc>,
    pub stats: SetStats,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl EventCallGraphSet {
    pub fn new(process_id: Option<String>) -> Self {
        Self {
            process_id,
            graphs: BTreeMap::new(),
            generated_at: Utc::now(),
            stats: SetStats::default(),
            warnings: Vec::new(),
        }
    }
}
