//! Whole-program structure graph: packages, types and callables, and the
//! containment, import, usage, embedding and call relations between them.
use crate::indexer::{CallSite, Callable, SymbolIndex, TypeKind};
use crate::resolver::{Caller, Resolver, ResolverOptions, split_qualified};
use serde::Serialize;
use std::collections::HashSet;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Package,
    Struct,
    Interface,
    Type,
    Function,
    Method,
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Contains,
    Import,
    Uses,
    Embeds,
    Calls,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Contains => "contains",
            EdgeKind::Import => "import",
            EdgeKind::Uses => "uses",
            EdgeKind::Embeds => "embeds",
            EdgeKind::Calls => "calls",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchNode {
    pub id: String,
    pub title: String,
    pub entity: EntityKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ArchEdge {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ArchGraph {
    #[serde(rename = "components")]
    pub nodes: Vec<ArchNode>,
    #[serde(rename = "links")]
    pub edges: Vec<ArchEdge>,
}

impl ArchGraph {
    pub fn node(&self, id: &str) -> Option<&ArchNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn has_edge(&self, from: &str, to: &str, kind: EdgeKind) -> bool {
        self.edges
            .iter()
            .any(|e| e.from == from && e.to == to && e.kind == kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchitectureOptions {
    /// Add `calls` edges between functions and methods.
    pub include_calls: bool,
    /// Resolution flags shared with call-graph builds.
    pub resolver: ResolverOptions,
}

impl Default for ArchitectureOptions {
    fn default() -> Self {
        Self {
            include_calls: true,
            resolver: ResolverOptions::default(),
        }
    }
}

pub struct ArchitectureBuilder<'a> {
    index: &'a SymbolIndex,
    resolver: Resolver<'a>,
    options: ArchitectureOptions,
    graph: ArchGraph,
    seen_nodes: HashSet<String>,
    seen_edges: HashSet<ArchEdge>,
}

impl<'a> ArchitectureBuilder<'a> {
    pub fn new(index: &'a SymbolIndex, options: ArchitectureOptions) -> Self {
        Self {
            index,
            resolver: Resolver::new(index, options.resolver),
            options,
            graph: ArchGraph::default(),
            seen_nodes: HashSet::new(),
            seen_edges: HashSet::new(),
        }
    }

    pub fn build(mut self) -> ArchGraph {
        self.add_symbols();
        self.add_imports();
        self.add_type_dependencies();
        if self.options.include_calls {
            self.add_calls();
        }

        info!(
            "Architecture graph: {} components, {} links",
            self.graph.nodes.len(),
            self.graph.edges.len()
        );
        self.graph
    }

    // ── Nodes and containment ──

    fn add_symbols(&mut self) {
        let index = self.index;

        for (id, package) in index.packages() {
            self.add_node(id, &package.name, EntityKind::Package);
        }

        for (id, ty) in index.types() {
            let entity = match ty.kind {
                TypeKind::Struct => EntityKind::Struct,
                TypeKind::Interface => EntityKind::Interface,
                TypeKind::Other => EntityKind::Type,
            };
            self.add_node(id, &ty.name, entity);
            self.add_edge(&ty.package, id, EdgeKind::Contains);
        }

        for (id, f) in index.functions() {
            self.add_node(id, &f.name, EntityKind::Function);
            self.add_edge(&f.package, id, EdgeKind::Contains);
        }

        for (id, m) in index.methods() {
            self.add_node(id, &m.name, EntityKind::Method);
            let owner = m.receiver_type_id();
            if index.type_symbol(&owner).is_some() {
                self.add_edge(&owner, id, EdgeKind::Contains);
            } else {
                self.add_edge(&m.package, id, EdgeKind::Contains);
            }
        }
    }

    // ── Imports ──

    fn add_imports(&mut self) {
        let index = self.index;
        for (id, package) in index.packages() {
            for import in &package.imports {
                match index.find_package_by_import(import) {
                    Some(target) => self.add_edge(id, target, EdgeKind::Import),
                    None => {
                        let title = import.rsplit('/').next().unwrap_or(import);
                        self.add_node(import, title, EntityKind::External);
                        self.add_edge(id, import, EdgeKind::Import);
                    }
                }
            }
        }
    }

    // ── Type dependencies ──

    fn add_type_dependencies(&mut self) {
        let index = self.index;
        for (id, ty) in index.types() {
            for field in &ty.fields {
                let target = self.resolver.resolve_type_ref(
                    &field.type_name,
                    field.type_package.as_deref(),
                    &ty.package,
                );
                if let Some(target) = target.filter(|t| t != id) {
                    self.add_edge(id, &target, EdgeKind::Uses);
                }
            }

            for embed in &ty.embeds {
                let (hint, _) = split_qualified(embed);
                let target = self.resolver.resolve_type_ref(embed, hint, &ty.package);
                if let Some(target) = target.filter(|t| t != id) {
                    self.add_edge(id, &target, EdgeKind::Embeds);
                }
            }
        }
    }

    // ── Calls ──

    fn add_calls(&mut self) {
        let index = self.index;
        let callables = index
            .functions()
            .map(|(id, f)| (id, Callable::Function(f)))
            .chain(index.methods().map(|(id, m)| (id, Callable::Method(m))));

        for (id, callable) in callables {
            let caller = Caller::of(callable);
            for site in callable.calls() {
                if let Some(target) = self.call_target(site, &caller) {
                    if &target != id {
                        self.add_edge(id, &target, EdgeKind::Calls);
                    }
                }
            }
        }
    }

    fn call_target(&self, site: &CallSite, caller: &Caller) -> Option<String> {
        let target = self.resolver.resolve_call_from(site, caller)?;
        (!target.kind.is_leaf()).then_some(target.id)
    }

    fn add_node(&mut self, id: &str, title: &str, entity: EntityKind) {
        if !self.seen_nodes.insert(id.to_string()) {
            return;
        }
        self.graph.nodes.push(ArchNode {
            id: id.to_string(),
            title: title.to_string(),
            entity,
        });
    }

    fn add_edge(&mut self, from: &str, to: &str, kind: EdgeKind) {
        let edge = ArchEdge {
            from: from.to_string(),
            to: to.to_string(),
            kind,
        };
        if self.seen_edges.insert(edge.clone()) {
            self.graph.edges.push(edge);
        }
    }
}
