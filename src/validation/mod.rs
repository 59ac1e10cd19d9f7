// src/validation/mod.rs

pub mod plan;
pub mod schema;

pub use plan::{PlanValidator, ValidationResult, Violation, ViolationKind, validate_actions};
pub use schema::SchemaError;
