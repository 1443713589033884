use super::BuildError;
use super::builder::{BuildOptions, CallGraphBuilder};
use super::model::EventCallGraphSet;
use crate::contexts::{EventMapping, ProcessContexts};
use crate::indexer::SymbolIndex;
use tracing::{info, warn};

/// Builds one call graph per mapped event.
///
/// A failing event is recorded in the set's warnings and counted in
/// `failed_graphs`; its siblings are still built.
pub struct EventBuilder<'a> {
    builder: CallGraphBuilder<'a>,
    contexts: &'a ProcessContexts,
}

impl<'a> EventBuilder<'a> {
    pub fn new(
        index: &'a SymbolIndex,
        contexts: &'a ProcessContexts,
        options: BuildOptions,
    ) -> Result<Self, BuildError> {
        Ok(Self {
            builder: CallGraphBuilder::new(index, options)?,
            contexts,
        })
    }

    pub fn build_all(&self) -> EventCallGraphSet {
        let mut set = EventCallGraphSet::new(None);
        for (name, context) in &self.contexts.contexts {
            self.build_events(&mut set, name, &context.events);
        }
        log_summary(&set);
        set
    }

    pub fn build_for_context(&self, name: &str) -> Result<EventCallGraphSet, BuildError> {
        let context = self
            .contexts
            .contexts
            .get(name)
            .ok_or_else(|| BuildError::ContextNotFound(name.to_string()))?;

        let mut set = EventCallGraphSet::new(Some(name.to_string()));
        self.build_events(&mut set, name, &context.events);
        log_summary(&set);
        Ok(set)
    }

    fn build_events(&self, set: &mut EventCallGraphSet, context: &str, events: &[EventMapping]) {
        for event in events {
            set.stats.total_events += 1;

            let entry = event.entry_point.symbol_id();
            match self
                .builder
                .build_for_event(&event.event_id, &event.event_name, &entry)
            {
                Ok(graph) => {
                    set.stats.mapped_events += 1;
                    set.stats.built_graphs += 1;
                    set.stats.total_nodes += graph.stats.total_nodes;
                    set.stats.total_edges += graph.stats.total_edges;
                    if set.graphs.insert(event.event_id.clone(), graph).is_some() {
                        set.warnings.push(format!(
                            "context {context:?}, event {:?}: replaces a graph from another context",
                            event.event_id
                        ));
                    }
                }
                Err(e) => {
                    warn!("Skipping event {} of context {context}: {e}", event.event_id);
                    set.warnings
                        .push(format!("context {context:?}, event {:?}: {e}", event.event_id));
                    set.stats.failed_graphs += 1;
                }
            }
        }
    }
}

fn log_summary(set: &EventCallGraphSet) {
    info!(
        "Built {} of {} event graphs ({} failed): {} nodes, {} edges",
        set.stats.built_graphs,
        set.stats.total_events,
        set.stats.failed_graphs,
        set.stats.total_nodes,
        set.stats.total_edges
    );
}
