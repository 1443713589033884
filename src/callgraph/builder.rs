use super::BuildError;
use super::model::CallGraph;
use super::walker::CallWalker;
use crate::indexer::SymbolIndex;
use crate::resolver::{Resolver, ResolverOptions};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::time::Instant;
use tracing::debug;

pub const MIN_DEPTH_LIMIT: usize = 1;
pub const MAX_DEPTH_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub max_depth: usize,
    pub resolve_interfaces: bool,
    pub track_goroutines: bool,
    pub receiver_name_fallback: bool,
    /// Glob patterns over package IDs. Matching symbols appear in the graph
    /// but their calls are not followed.
    pub exclude_packages: Vec<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            max_depth: 10,
            resolve_interfaces: true,
            track_goroutines: true,
            receiver_name_fallback: true,
            exclude_packages: Vec::new(),
        }
    }
}

impl BuildOptions {
    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            resolve_interfaces: self.resolve_interfaces,
            track_goroutines: self.track_goroutines,
            receiver_name_fallback: self.receiver_name_fallback,
        }
    }
}

pub struct CallGraphBuilder<'a> {
    index: &'a SymbolIndex,
    options: BuildOptions,
    exclude: GlobSet,
}

impl<'a> CallGraphBuilder<'a> {
    pub fn new(index: &'a SymbolIndex, options: BuildOptions) -> Result<Self, BuildError> {
        if !(MIN_DEPTH_LIMIT..=MAX_DEPTH_LIMIT).contains(&options.max_depth) {
            return Err(BuildError::InvalidMaxDepth(options.max_depth));
        }
        if index.is_empty() {
            return Err(BuildError::EmptyIndex);
        }

        let mut exclude = GlobSetBuilder::new();
        for pattern in &options.exclude_packages {
            exclude.add(Glob::new(pattern)?);
        }

        Ok(Self {
            index,
            exclude: exclude.build()?,
            options,
        })
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn build(&self, entry: &str) -> Result<CallGraph, BuildError> {
        self.build_graph(None, None, entry)
    }

    pub fn build_for_event(
        &self,
        event_id: &str,
        event_name: &str,
        entry: &str,
    ) -> Result<CallGraph, BuildError> {
        let event_name = (!event_name.is_empty()).then(|| event_name.to_string());
        self.build_graph(Some(event_id.to_string()), event_name, entry)
    }

    fn build_graph(
        &self,
        event_id: Option<String>,
        event_name: Option<String>,
        entry: &str,
    ) -> Result<CallGraph, BuildError> {
        let start = Instant::now();
        if self.index.callable(entry).is_none() {
            return Err(BuildError::EntryPointNotFound(entry.to_string()));
        }

        let resolver = Resolver::new(self.index, self.options.resolver_options());
        let mut walker = CallWalker::new(self.index, &resolver, self.options.max_depth, &self.exclude);
        walker.walk(entry);
        let results = walker.into_results();

        let graph = CallGraph {
            event_id,
            event_name,
            entry_point: entry.to_string(),
            nodes: results.nodes,
            edges: results.edges,
            max_depth: self.options.max_depth,
            actual_depth: results.stats.max_depth_reached,
            stats: results.stats,
            warnings: results.warnings,
            build_time: start.elapsed(),
        };
        debug!(
            "Built call graph for {entry}: {} nodes, {} edges, depth {} in {:?}",
            graph.stats.total_nodes, graph.stats.total_edges, graph.actual_depth, graph.build_time
        );
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callgraph::model::{CallType, NodeKind};
    use crate::indexer::{IndexOptions, SymbolIndexer};
    use std::path::Path;

    const SOURCE: &str = r#"
package app

type Store interface {
    Load() string
}

type Handler struct {
    store Store
}

func (h *Handler) Serve() {
    h.store.Load()
    go h.audit()
}

func (h *Handler) audit() {
    log()
}

func log() {}
"#;

    fn index() -> SymbolIndex {
        let mut indexer = SymbolIndexer::new(IndexOptions::default()).unwrap();
        indexer
            .add_source(Path::new("app"), "app/handler.go", SOURCE.as_bytes())
            .unwrap();
        indexer.finish()
    }

    #[test]
    fn test_options_validation() {
        let index = index();
        for depth in [0, 51] {
            let options = BuildOptions {
                max_depth: depth,
                ..BuildOptions::default()
            };
            assert!(matches!(
                CallGraphBuilder::new(&index, options),
                Err(BuildError::InvalidMaxDepth(d)) if d == depth
            ));
        }

        let options = BuildOptions {
            exclude_packages: vec!["app/[".to_string()],
            ..BuildOptions::default()
        };
        assert!(matches!(
            CallGraphBuilder::new(&index, options),
            Err(BuildError::InvalidExcludePattern(_))
        ));

        assert!(matches!(
            CallGraphBuilder::new(&SymbolIndex::default(), BuildOptions::default()),
            Err(BuildError::EmptyIndex)
        ));
    }

    #[test]
    fn test_build_method_entry() {
        let index = index();
        let builder = CallGraphBuilder::new(&index, BuildOptions::default()).unwrap();
        let mut graph = builder.build("app.Handler.Serve").unwrap();
        graph.sort();

        assert_eq!(graph.entry_point, "app.Handler.Serve");
        assert_eq!(graph.max_depth, 10);
        assert_eq!(graph.actual_depth, 2);
        assert_eq!(graph.stats.interface_calls, 1);
        assert_eq!(graph.stats.goroutine_calls, 1);

        let load = graph.node("app.Store.Load").unwrap();
        assert_eq!(load.kind, NodeKind::InterfaceMethod);
        assert_eq!(load.depth, 1);

        let audit = graph
            .edges
            .iter()
            .find(|e| e.to == "app.Handler.audit")
            .unwrap();
        assert_eq!(audit.call_type, CallType::Goroutine);
        assert!(audit.is_async);
        assert!(graph.node("app.log").is_some());
    }

    #[test]
    fn test_build_for_event_and_missing_entry() {
        let index = index();
        let builder = CallGraphBuilder::new(&index, BuildOptions::default()).unwrap();

        let graph = builder.build_for_event("evt-1", "", "app.log").unwrap();
        assert_eq!(graph.event_id.as_deref(), Some("evt-1"));
        assert_eq!(graph.event_name, None);
        assert_eq!(graph.nodes.len(), 1);

        let err = builder.build("app.Missing").unwrap_err();
        assert!(matches!(err, BuildError::EntryPointNotFound(ref id) if id == "app.Missing"));
    }
}
