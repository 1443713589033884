use super::model::{CallEdge, CallNode, CallType, NodeKind, Stats};
use crate::indexer::{Callable, SymbolIndex};
use crate::resolver::{Caller, ResolvedTarget, Resolver};
use globset::GlobSet;
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Default)]
pub struct WalkResults {
    pub nodes: Vec<CallNode>,
    pub edges: Vec<CallEdge>,
    pub stats: Stats,
    pub warnings: Vec<String>,
}

/// Depth-first traversal from one entry point.
///
/// Every symbol is emitted once. Edges back to an already visited internal
/// symbol are kept and flagged as cycles instead of being followed.
pub struct CallWalker<'a> {
    index: &'a SymbolIndex,
    resolver: &'a Resolver<'a>,
    max_depth: usize,
    exclude: &'a GlobSet,
    visited: HashSet<String>,
    frontier: usize,
    results: WalkResults,
}

impl<'a> CallWalker<'a> {
    pub fn new(
        index: &'a SymbolIndex,
        resolver: &'a Resolver<'a>,
        max_depth: usize,
        exclude: &'a GlobSet,
    ) -> Self {
        Self {
            index,
            resolver,
            max_depth,
            exclude,
            visited: HashSet::new(),
            frontier: 0,
            results: WalkResults::default(),
        }
    }

    pub fn walk(&mut self, entry: &str) {
        self.visit(entry, 0);
    }

    pub fn into_results(mut self) -> WalkResults {
        if self.frontier > 0 {
            self.results.warnings.push(format!(
                "max depth {} reached: {} symbol(s) not expanded",
                self.max_depth, self.frontier
            ));
        }
        self.results.stats.total_nodes = self.results.nodes.len();
        self.results.stats.total_edges = self.results.edges.len();
        self.results
    }

    fn visit(&mut self, id: &str, depth: usize) {
        if depth > self.max_depth || !self.visited.insert(id.to_string()) {
            return;
        }
        let stats = &mut self.results.stats;
        stats.max_depth_reached = stats.max_depth_reached.max(depth);

        let Some(callable) = self.index.callable(id) else {
            self.push_leaf(id, id, None, NodeKind::External, depth);
            self.results.stats.unresolved_calls += 1;
            return;
        };
        self.push_symbol(id, callable, depth);

        let package = callable.package();
        if self.exclude.is_match(package) {
            debug!("Not expanding {id}: package {package} is excluded");
            return;
        }
        let caller = Caller::of(callable);
        if depth == self.max_depth {
            let cut = callable
                .calls()
                .iter()
                .any(|site| self.resolver.resolve_call_from(site, &caller).is_some());
            if cut {
                self.frontier += 1;
            }
            return;
        }

        for site in callable.calls() {
            let Some(target) = self.resolver.resolve_call_from(site, &caller) else {
                continue;
            };

            if !target.kind.is_leaf() && self.visited.contains(&target.id) {
                self.push_edge(id, &target, site.line, true);
                self.results.stats.cycles_detected += 1;
                continue;
            }

            self.push_edge(id, &target, site.line, false);
            self.count(&target);

            if target.kind.is_leaf() {
                if self.visited.insert(target.id.clone()) {
                    self.push_leaf(
                        &target.id,
                        &target.function,
                        target.package.clone(),
                        target.kind,
                        depth + 1,
                    );
                }
            } else {
                self.visit(&target.id, depth + 1);
            }
        }
    }

    fn push_symbol(&mut self, id: &str, callable: Callable, depth: usize) {
        let node = match callable {
            Callable::Function(f) => CallNode {
                id: id.to_string(),
                package: Some(f.package.clone()),
                function: f.name.clone(),
                receiver: None,
                kind: NodeKind::Function,
                file: Some(f.file.clone()),
                line: Some(f.line),
                depth,
            },
            Callable::Method(m) => CallNode {
                id: id.to_string(),
                package: Some(m.package.clone()),
                function: m.name.clone(),
                receiver: Some(m.receiver.clone()),
                kind: self.resolver.method_kind(m),
                file: Some(m.file.clone()),
                line: Some(m.line),
                depth,
            },
        };
        self.results.nodes.push(node);
    }

    fn push_leaf(
        &mut self,
        id: &str,
        function: &str,
        package: Option<String>,
        kind: NodeKind,
        depth: usize,
    ) {
        self.results.stats.max_depth_reached = self.results.stats.max_depth_reached.max(depth);
        self.results.nodes.push(CallNode {
            id: id.to_string(),
            package,
            function: function.to_string(),
            receiver: None,
            kind,
            file: None,
            line: None,
            depth,
        });
    }

    fn push_edge(&mut self, from: &str, target: &ResolvedTarget, line: usize, cycle: bool) {
        self.results.edges.push(CallEdge {
            from: from.to_string(),
            to: target.id.clone(),
            call_type: target.call_type,
            line,
            is_async: target.is_async,
            cycle,
        });
    }

    fn count(&mut self, target: &ResolvedTarget) {
        let stats = &mut self.results.stats;
        if target.call_type == CallType::Interface {
            stats.interface_calls += 1;
        }
        if target.is_async {
            stats.goroutine_calls += 1;
        }
        if target.kind == NodeKind::External {
            stats.unresolved_calls += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::{IndexOptions, SymbolIndexer};
    use crate::resolver::ResolverOptions;
    use globset::{Glob, GlobSetBuilder};
    use std::path::Path;

    const CHAIN: &str = r#"
package chain

func A() {
    B()
    fmt.Println("a")
    fmt.Println("again")
}

func B() {
    C()
    A()
}

func C() {
    go func() {}()
    go func() {}()
}
"#;

    fn index_of(dir: &str, source: &str) -> SymbolIndex {
        let mut indexer = SymbolIndexer::new(IndexOptions::default()).unwrap();
        indexer
            .add_source(Path::new(dir), &format!("{dir}/main.go"), source.as_bytes())
            .unwrap();
        indexer.finish()
    }

    fn walk(index: &SymbolIndex, entry: &str, max_depth: usize, exclude: &GlobSet) -> WalkResults {
        let resolver = Resolver::new(index, ResolverOptions::default());
        let mut walker = CallWalker::new(index, &resolver, max_depth, exclude);
        walker.walk(entry);
        walker.into_results()
    }

    #[test]
    fn test_walk_marks_back_edge_as_cycle() {
        let index = index_of("chain", CHAIN);
        let results = walk(&index, "chain.A", 10, &GlobSet::empty());

        let ids: Vec<&str> = results.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["chain.A", "chain.B", "chain.C", "chain.<closure>", "fmt.Println"]);

        let cycles: Vec<&CallEdge> = results.edges.iter().filter(|e| e.cycle).collect();
        assert_eq!(cycles.len(), 1);
        assert_eq!((cycles[0].from.as_str(), cycles[0].to.as_str()), ("chain.B", "chain.A"));
        assert_eq!(results.stats.cycles_detected, 1);

        // Repeated leaves are new edges, never cycles.
        assert_eq!(results.edges.iter().filter(|e| e.to == "fmt.Println").count(), 2);
        assert_eq!(results.stats.goroutine_calls, 2);
        assert_eq!(results.stats.unresolved_calls, 2);
        assert_eq!(results.stats.max_depth_reached, 3);
        assert_eq!(results.stats.total_nodes, 5);
        assert_eq!(results.stats.total_edges, 7);
        assert!(results.warnings.is_empty());
    }

    #[test]
    fn test_depth_limit_leaves_no_dangling_edges() {
        let index = index_of("chain", CHAIN);
        let results = walk(&index, "chain.A", 1, &GlobSet::empty());

        assert!(results.nodes.iter().all(|n| n.depth <= 1));
        for edge in &results.edges {
            assert!(results.nodes.iter().any(|n| n.id == edge.from));
            assert!(results.nodes.iter().any(|n| n.id == edge.to));
        }
        assert!(results.nodes.iter().all(|n| n.id != "chain.C"));
        assert_eq!(results.warnings.len(), 1);
        assert!(results.warnings[0].contains("1 symbol"));
    }

    #[test]
    fn test_builtin_only_frontier_is_not_reported() {
        const SOURCE: &str = r#"
package leafy

func Top() {
    Mid()
}

func Mid() {
    _ = len("x")
    panic("x")
}
"#;
        let index = index_of("leafy", SOURCE);
        let results = walk(&index, "leafy.Top", 1, &GlobSet::empty());

        assert_eq!(results.nodes.len(), 2);
        assert!(results.warnings.is_empty(), "{:?}", results.warnings);
    }

    #[test]
    fn test_excluded_package_is_not_expanded() {
        let index = index_of("chain", CHAIN);
        let mut builder = GlobSetBuilder::new();
        builder.add(Glob::new("chain*").unwrap());
        let exclude = builder.build().unwrap();

        let results = walk(&index, "chain.A", 10, &exclude);
        assert_eq!(results.nodes.len(), 1);
        assert!(results.edges.is_empty());
    }

    #[test]
    fn test_unknown_entry_becomes_external() {
        let index = index_of("chain", CHAIN);
        let results = walk(&index, "chain.Nope", 10, &GlobSet::empty());
        assert_eq!(results.nodes.len(), 1);
        assert_eq!(results.nodes[0].kind, NodeKind::External);
        assert_eq!(results.stats.unresolved_calls, 1);
    }
}
