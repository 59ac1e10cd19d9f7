// src/protocol/mod.rs

use crate::model::TaskSpecification;
use crate::tools::solver::SolveStatus;
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use std::time::Duration;

pub mod allocator;
pub mod parser;
pub mod profiles;

pub use allocator::{AllocationFormulator, AllocatorConfig, CostMatrix};
pub use parser::{ParserConfig, ParsingOrchestrator, ProviderHandle};
pub use profiles::{ProfileRegistry, RobotProfile};

fn as_secs<S: Serializer>(latency: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(latency.as_secs_f64())
}

/// Outcome of one call to the parsing orchestrator.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParseAttemptResult {
    pub data: TaskSpecification,
    #[serde(serialize_with = "as_secs")]
    pub latency: Duration,
    pub retries: u32,
    pub success: bool,
    pub provider: String,
    pub model: String,
    pub fallback_occurred: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "solver", rename_all = "snake_case")]
pub enum AllocationStatus {
    Optimal,
    /// The solver could not prove an optimum; nothing was assigned.
    Refused(SolveStatus),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AllocationResult {
    pub assignments: IndexMap<String, Vec<String>>,
    pub status: AllocationStatus,
    pub total_cost: Option<f64>,
}

impl AllocationResult {
    pub fn is_optimal(&self) -> bool {
        self.status == AllocationStatus::Optimal
    }

    pub fn tasks_for(&self, robot: &str) -> &[String] {
        self.assignments
            .get(robot)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn assigned_count(&self) -> usize {
        self.assignments.values().map(Vec::len).sum()
    }
}
