// src/validation/schema.rs

use crate::model::TaskSpecification;
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("schema violation on `{field}`: {reason}")]
    SchemaViolation { field: String, reason: String },
}

impl SchemaError {
    fn violation(field: &str, reason: &str) -> Self {
        SchemaError::SchemaViolation {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn hint(&self) -> (String, Option<Value>) {
        match self {
            SchemaError::MalformedPayload(_) => (
                "Output is not parseable JSON. Respond with a single JSON object.".to_string(),
                Some(serde_json::to_value(TaskSpecification::empty()).unwrap_or(Value::Null)),
            ),
            SchemaError::SchemaViolation { field, .. } => (
                "Every field must be a list of strings.".to_string(),
                Some(json!({ field.as_str(): ["<string>"] })),
            ),
        }
    }
}

/// Removes a surrounding markdown fence, preferring one tagged `json`.
pub fn strip_code_fence(content: &str) -> &str {
    if let Some((_, rest)) = content.split_once("```json") {
        return rest.split("```").next().unwrap_or(rest).trim();
    }
    if content.contains("```") {
        return content.split("```").nth(1).unwrap_or(content).trim();
    }
    content.trim()
}

fn string_list(obj: &Map<String, Value>, field: &str) -> Result<Option<Vec<String>>, SchemaError> {
    let Some(value) = obj.get(field) else {
        return Ok(None);
    };
    let Some(items) = value.as_array() else {
        return Err(SchemaError::violation(field, "expected a list"));
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                SchemaError::violation(field, &format!("item {i} is not a string"))
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

fn required(obj: &Map<String, Value>, field: &str) -> Result<Vec<String>, SchemaError> {
    string_list(obj, field)?.ok_or_else(|| SchemaError::violation(field, "field is missing"))
}

/// Validates raw model output against the task specification shape.
pub fn validate(raw: &str) -> Result<TaskSpecification, SchemaError> {
    let body = strip_code_fence(raw);
    let value: Value =
        serde_json::from_str(body).map_err(|e| SchemaError::MalformedPayload(e.to_string()))?;

    let Some(obj) = value.as_object() else {
        return Err(SchemaError::violation("<root>", "expected a JSON object"));
    };

    let spec = TaskSpecification {
        tasks: required(obj, "tasks")?,
        objects: required(obj, "objects")?,
        initial_state: string_list(obj, "initial_state")?.unwrap_or_default(),
        constraints: required(obj, "constraints")?,
        robots: required(obj, "robots")?,
        goal_predicates: required(obj, "goal_predicates")?,
    };

    debug!(summary = %spec.summary(), "payload matches task schema");
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const VALID: &str = r#"{"tasks":["move"],"objects":["block"],"constraints":[],"robots":["robot1"],"goal_predicates":["at(block, target)"]}"#;

    #[test]
    fn accepts_plain_payload() {
        let spec = validate(VALID).unwrap();
        assert_eq!(spec.tasks, vec!["move"]);
        assert_eq!(spec.goal_predicates, vec!["at(block, target)"]);
        assert!(spec.initial_state.is_empty());
    }

    #[test]
    fn strips_json_fence_before_plain_fence() {
        let raw = format!("Sure:\n```\nnot this\n```\n```json\n{VALID}\n```\ntrailing");
        assert_eq!(validate(&raw).unwrap().robots, vec!["robot1"]);

        let raw = format!("```\n{VALID}\n```");
        assert!(validate(&raw).is_ok());
    }

    #[test]
    fn broken_json_is_malformed() {
        assert!(matches!(
            validate("Invalid JSON string"),
            Err(SchemaError::MalformedPayload(_))
        ));
    }

    #[test]
    fn missing_field_is_a_violation() {
        let raw = r#"{"tasks":[],"objects":[],"constraints":[],"robots":[]}"#;
        assert_eq!(
            validate(raw),
            Err(SchemaError::SchemaViolation {
                field: "goal_predicates".into(),
                reason: "field is missing".into()
            })
        );
    }

    #[test]
    fn wrong_shapes_are_violations() {
        let raw = r#"{"tasks":"move","objects":[],"constraints":[],"robots":[],"goal_predicates":[]}"#;
        assert!(matches!(
            validate(raw),
            Err(SchemaError::SchemaViolation { field, .. }) if field == "tasks"
        ));

        let raw = r#"{"tasks":[1],"objects":[],"constraints":[],"robots":[],"goal_predicates":[]}"#;
        assert!(matches!(validate(raw), Err(SchemaError::SchemaViolation { .. })));

        let raw = r#"{"tasks":[],"objects":[],"initial_state":null,"constraints":[],"robots":[],"goal_predicates":[]}"#;
        assert!(matches!(
            validate(raw),
            Err(SchemaError::SchemaViolation { field, .. }) if field == "initial_state"
        ));

        assert!(matches!(validate("[1, 2]"), Err(SchemaError::SchemaViolation { .. })));
    }

    #[test]
    fn hint_points_at_field() {
        let err = SchemaError::violation("robots", "field is missing");
        let (_, example) = err.hint();
        assert_eq!(example, Some(json!({ "robots": ["<string>"] })));
    }
}
