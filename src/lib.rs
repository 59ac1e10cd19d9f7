// src/lib.rs

//! Instruction-to-plan pipeline: parse a robotics instruction with a
//! language model, allocate the resulting tasks across robots, and check
//! that the action sequence is physically consistent.

pub mod config;
pub mod memory;
pub mod model;
pub mod pipeline;
pub mod protocol;
pub mod tools;
pub mod validation;

pub use config::PipelineConfig;
pub use model::TaskSpecification;
pub use pipeline::{PipelineCoordinator, Trial, TrialRecord};
