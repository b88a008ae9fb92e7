//! Environment variable pipeline.
//!
//! Launch environments are built by applying an ordered sequence of
//! operations to a base mapping. The pipeline is consumed by the launch
//! encoders right before the command is assembled.

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

/// Path-list separator used by `Append`/`Prepend`.
#[cfg(windows)]
const PATH_SEP: char = ';';
#[cfg(not(windows))]
const PATH_SEP: char = ':';

/// A single operation on an environment mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum EnvAction {
    /// Set an environment variable, overwriting any previous value.
    Set { key: String, value: String },
    /// Append to an environment variable, joining with the platform
    /// path-list separator.
    Append { key: String, value: String },
    /// Prepend to an environment variable, joining with the platform
    /// path-list separator.
    Prepend { key: String, value: String },
    /// Delete an environment variable if present.
    Delete { key: String },
    /// Drop all entries from the environment.
    Clear,
}

impl EnvAction {
    /// Apply this operation to the given environment in place.
    pub fn apply(&self, env: &mut HashMap<String, String>) {
        match self {
            EnvAction::Set { key, value } => {
                debug!("Set environment entry {}={}", key, value);
                env.insert(key.clone(), value.clone());
            }
            EnvAction::Append { key, value } => {
                debug!("Append {} to environment variable {}", value, key);
                match env.get_mut(key) {
                    Some(existing) => {
                        existing.push(PATH_SEP);
                        existing.push_str(value);
                    }
                    None => {
                        env.insert(key.clone(), value.clone());
                    }
                }
            }
            EnvAction::Prepend { key, value } => {
                debug!("Prepend {} to environment variable {}", value, key);
                match env.get(key) {
                    Some(existing) => {
                        let joined = format!("{}{}{}", value, PATH_SEP, existing);
                        env.insert(key.clone(), joined);
                    }
                    None => {
                        env.insert(key.clone(), value.clone());
                    }
                }
            }
            EnvAction::Delete { key } => {
                if env.remove(key).is_some() {
                    debug!("Delete environment variable {}", key);
                }
            }
            EnvAction::Clear => {
                debug!("Clear whole environment");
                env.clear();
            }
        }
    }
}

/// An ordered sequence of environment operations over a base mapping.
///
/// `execute` applies the operations left to right and returns the final
/// environment; the pipeline itself is not consumed, so further operations
/// can be pushed and the pipeline re-executed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvPipeline {
    /// The operations, applied in order.
    pub actions: Vec<EnvAction>,

    /// The base environment. Empty by default; use
    /// [`EnvPipeline::from_current_env`] to start from the process
    /// environment.
    pub initial: HashMap<String, String>,
}

impl EnvPipeline {
    /// Create an empty pipeline with the given operations.
    pub fn new(actions: Vec<EnvAction>) -> Self {
        Self {
            actions,
            initial: HashMap::new(),
        }
    }

    /// Create a pipeline whose base mapping is the current process
    /// environment.
    pub fn from_current_env(actions: Vec<EnvAction>) -> Self {
        Self {
            actions,
            initial: std::env::vars().collect(),
        }
    }

    /// Add another operation to the end of the pipeline.
    pub fn push(&mut self, action: EnvAction) {
        self.actions.push(action);
    }

    /// Add several operations to the end of the pipeline.
    pub fn extend(&mut self, actions: impl IntoIterator<Item = EnvAction>) {
        self.actions.extend(actions);
    }

    /// Apply all operations to the base mapping and return the result.
    pub fn execute(&self) -> HashMap<String, String> {
        let mut env = self.initial.clone();
        for action in &self.actions {
            action.apply(&mut env);
        }
        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(key: &str, value: &str) -> EnvAction {
        EnvAction::Set {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_set_and_delete() {
        let pipeline = EnvPipeline::new(vec![
            set("SOME_VALUE", "5"),
            set("OTHER_VALUE", "6"),
            EnvAction::Delete {
                key: "SOME_VALUE".to_string(),
            },
        ]);

        let env = pipeline.execute();
        assert_eq!(env.get("OTHER_VALUE").map(String::as_str), Some("6"));
        assert!(!env.contains_key("SOME_VALUE"));
    }

    #[test]
    fn test_append_joins_with_separator() {
        let pipeline = EnvPipeline::new(vec![
            EnvAction::Append {
                key: "LD_LIBRARY_PATH".to_string(),
                value: "/library/path".to_string(),
            },
            EnvAction::Append {
                key: "LD_LIBRARY_PATH".to_string(),
                value: "/more/paths".to_string(),
            },
        ]);

        let env = pipeline.execute();
        assert_eq!(
            env.get("LD_LIBRARY_PATH").map(String::as_str),
            Some("/library/path:/more/paths")
        );
    }

    #[test]
    fn test_prepend_joins_with_separator() {
        let mut pipeline = EnvPipeline::new(vec![set("PATH", "/usr/bin")]);
        pipeline.push(EnvAction::Prepend {
            key: "PATH".to_string(),
            value: "/opt/bin".to_string(),
        });

        let env = pipeline.execute();
        assert_eq!(env.get("PATH").map(String::as_str), Some("/opt/bin:/usr/bin"));
    }

    #[test]
    fn test_clear_drops_initial_environment() {
        let mut pipeline = EnvPipeline {
            actions: vec![set("A", "1")],
            initial: HashMap::from([("HOME".to_string(), "/home/user".to_string())]),
        };
        pipeline.push(EnvAction::Clear);
        pipeline.push(set("B", "2"));

        let env = pipeline.execute();
        assert_eq!(env.len(), 1);
        assert_eq!(env.get("B").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_execute_does_not_consume_pipeline() {
        let pipeline = EnvPipeline::new(vec![set("A", "1")]);
        let first = pipeline.execute();
        let second = pipeline.execute();
        assert_eq!(first, second);
    }

    #[test]
    fn test_action_deserialization() {
        let action: EnvAction =
            serde_json::from_str(r#"{"mode": "append", "key": "PATH", "value": "/opt"}"#).unwrap();
        assert_eq!(
            action,
            EnvAction::Append {
                key: "PATH".to_string(),
                value: "/opt".to_string()
            }
        );

        let action: EnvAction = serde_json::from_str(r#"{"mode": "clear"}"#).unwrap();
        assert_eq!(action, EnvAction::Clear);
    }
}
