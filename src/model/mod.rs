// src/model/mod.rs

use serde::{Deserialize, Serialize};

pub mod predicate;
pub use predicate::{Predicate, PredicateError};

/// The structured object a language model must produce from an instruction.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskSpecification {
    pub tasks: Vec<String>,
    pub objects: Vec<String>,
    #[serde(default)]
    pub initial_state: Vec<String>,
    pub constraints: Vec<String>,
    pub robots: Vec<String>,
    pub goal_predicates: Vec<String>,
}

impl TaskSpecification {
    /// Canonical instance with every field present and empty.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} tasks, {} objects, {} robots, {} goals",
            self.tasks.len(),
            self.objects.len(),
            self.robots.len(),
            self.goal_predicates.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_serializes_all_six_fields() {
        let value = serde_json::to_value(TaskSpecification::empty()).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 6);
        assert!(obj.values().all(|v| v.as_array().is_some_and(|a| a.is_empty())));
    }

    #[test]
    fn initial_state_defaults_when_absent() {
        let spec: TaskSpecification = serde_json::from_str(
            r#"{"tasks":["move"],"objects":[],"constraints":[],"robots":["r1"],"goal_predicates":[]}"#,
        )
        .unwrap();
        assert!(spec.initial_state.is_empty());
        assert_eq!(spec.tasks, vec!["move"]);
    }
}
