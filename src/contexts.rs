//! Process contexts: which code entry point handles each business event.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContextError {
    #[error("failed to read contexts file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse contexts YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("contexts section is empty")]
    Empty,

    #[error("context {0:?} has no events")]
    NoEvents(String),

    #[error("context {context:?}, event #{position}: missing event_id")]
    MissingEventId { context: String, position: usize },

    #[error("context {context:?}: duplicate event_id {event_id:?}")]
    DuplicateEventId { context: String, event_id: String },

    #[error("context {context:?}, event {event_id:?}: missing entry_point.package")]
    MissingPackage { context: String, event_id: String },

    #[error("context {context:?}, event {event_id:?}: missing entry_point.function")]
    MissingFunction { context: String, event_id: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPointType {
    Http,
    Kafka,
    Grpc,
    Cron,
    #[default]
    Custom,
}

impl fmt::Display for EntryPointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryPointType::Http => "http",
            EntryPointType::Kafka => "kafka",
            EntryPointType::Grpc => "grpc",
            EntryPointType::Cron => "cron",
            EntryPointType::Custom => "custom",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPoint {
    #[serde(default)]
    pub package: String,
    /// `Func` or `Type.Method`.
    #[serde(default)]
    pub function: String,
    #[serde(rename = "type", default)]
    pub kind: EntryPointType,
}

impl EntryPoint {
    /// Symbol ID the call graph starts from.
    pub fn symbol_id(&self) -> String {
        format!("{}.{}", self.package, self.function)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMapping {
    #[serde(default)]
    pub event_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub event_name: String,
    #[serde(default)]
    pub entry_point: EntryPoint,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessContext {
    /// Process diagram this context was mapped from. Not read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bpmn_file: Option<String>,
    #[serde(default)]
    pub events: Vec<EventMapping>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessContexts {
    #[serde(default)]
    pub contexts: BTreeMap<String, ProcessContext>,
}

impl ProcessContexts {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ContextError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ContextError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ContextError> {
        let contexts: ProcessContexts = serde_yaml::from_str(content)?;
        contexts.validate()?;
        Ok(contexts)
    }

    pub fn validate(&self) -> Result<(), ContextError> {
        if self.contexts.is_empty() {
            return Err(ContextError::Empty);
        }

        for (name, context) in &self.contexts {
            if context.events.is_empty() {
                return Err(ContextError::NoEvents(name.clone()));
            }

            let mut seen = HashSet::new();
            for (i, event) in context.events.iter().enumerate() {
                if event.event_id.is_empty() {
                    return Err(ContextError::MissingEventId {
                        context: name.clone(),
                        position: i + 1,
                    });
                }
                if !seen.insert(event.event_id.as_str()) {
                    return Err(ContextError::DuplicateEventId {
                        context: name.clone(),
                        event_id: event.event_id.clone(),
                    });
                }
                if event.entry_point.package.is_empty() {
                    return Err(ContextError::MissingPackage {
                        context: name.clone(),
                        event_id: event.event_id.clone(),
                    });
                }
                if event.entry_point.function.is_empty() {
                    return Err(ContextError::MissingFunction {
                        context: name.clone(),
                        event_id: event.event_id.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn event_count(&self) -> usize {
        self.contexts.values().map(|c| c.events.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const CONTEXTS: &str = r#"
contexts:
  orders:
    bpmn_file: orders.bpmn
    events:
      - event_id: place
        event_name: Place order
        entry_point:
          package: app/service
          function: OrderService.Place
          type: http
      - event_id: expire
        entry_point:
          package: app/jobs
          function: Expire
          type: cron
"#;

    #[test]
    fn test_load_contexts() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("contexts.yaml");
        fs::write(&path, CONTEXTS).unwrap();

        let contexts = ProcessContexts::load(&path).unwrap();
        assert_eq!(contexts.event_count(), 2);

        let orders = &contexts.contexts["orders"];
        assert_eq!(orders.bpmn_file.as_deref(), Some("orders.bpmn"));
        assert_eq!(orders.events[0].entry_point.symbol_id(), "app/service.OrderService.Place");
        assert_eq!(orders.events[0].entry_point.kind, EntryPointType::Http);
        assert_eq!(orders.events[1].entry_point.kind.to_string(), "cron");
        assert_eq!(orders.events[1].event_name, "");
    }

    #[test]
    fn test_validation_errors() {
        assert!(matches!(
            ProcessContexts::from_yaml("contexts: {}\n"),
            Err(ContextError::Empty)
        ));
        assert!(matches!(
            ProcessContexts::from_yaml("contexts:\n  a:\n    events: []\n"),
            Err(ContextError::NoEvents(ref name)) if name == "a"
        ));

        let missing_id = "contexts:\n  a:\n    events:\n      - entry_point: {package: p, function: F}\n";
        assert!(matches!(
            ProcessContexts::from_yaml(missing_id),
            Err(ContextError::MissingEventId { position: 1, .. })
        ));

        let duplicate = r#"
contexts:
  a:
    events:
      - {event_id: e, entry_point: {package: p, function: F}}
      - {event_id: e, entry_point: {package: p, function: G}}
"#;
        assert!(matches!(
            ProcessContexts::from_yaml(duplicate),
            Err(ContextError::DuplicateEventId { ref event_id, .. }) if event_id == "e"
        ));

        let no_function = "contexts:\n  a:\n    events:\n      - {event_id: e, entry_point: {package: p}}\n";
        assert!(matches!(
            ProcessContexts::from_yaml(no_function),
            Err(ContextError::MissingFunction { .. })
        ));

        let bad_type = "contexts:\n  a:\n    events:\n      - {event_id: e, entry_point: {package: p, function: F, type: soap}}\n";
        assert!(matches!(
            ProcessContexts::from_yaml(bad_type),
            Err(ContextError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = ProcessContexts::load("/no/such/contexts.yaml").unwrap_err();
        assert!(matches!(err, ContextError::Read { .. }));
    }
}
