// src/pipeline/mod.rs

use crate::memory::{TrialLog, TrialSummary};
use crate::protocol::{
    AllocationFormulator, AllocationResult, CostMatrix, ParseAttemptResult, ParsingOrchestrator,
};
use crate::validation::{ValidationResult, validate_actions};
use serde::Serialize;
use tracing::info;

/// One instruction to run through the pipeline.
#[derive(Clone, Debug, Default)]
pub struct Trial {
    pub instruction_id: String,
    pub instruction: String,
    /// World predicates shown to the model alongside the instruction.
    pub environment_state: Vec<String>,
    /// Defaults to a uniform unit cost when absent.
    pub costs: Option<CostMatrix>,
}

impl Trial {
    pub fn new(instruction_id: &str, instruction: &str) -> Self {
        Self {
            instruction_id: instruction_id.to_string(),
            instruction: instruction.to_string(),
            ..Self::default()
        }
    }

    pub fn with_environment_state(mut self, state: Vec<String>) -> Self {
        self.environment_state = state;
        self
    }

    pub fn with_costs(mut self, costs: CostMatrix) -> Self {
        self.costs = Some(costs);
        self
    }

    pub fn prompt(&self) -> String {
        if self.environment_state.is_empty() {
            return self.instruction.clone();
        }
        let state = serde_json::to_string(&self.environment_state).unwrap_or_default();
        format!("Environment State: {state}\n\nTask: {}", self.instruction)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrialRecord {
    pub instruction_id: String,
    pub parse: ParseAttemptResult,
    pub allocation: Option<AllocationResult>,
    pub validation: Option<ValidationResult>,
    pub logical_score: f64,
}

/// Runs parse, allocate and validate for each trial, in that order.
pub struct PipelineCoordinator {
    parser: ParsingOrchestrator,
    allocator: AllocationFormulator,
    system_prompt: Option<String>,
}

impl PipelineCoordinator {
    pub fn new(parser: ParsingOrchestrator, allocator: AllocationFormulator) -> Self {
        Self {
            parser,
            allocator,
            system_prompt: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = Some(prompt.to_string());
        self
    }

    pub fn run_trial(&self, trial: &Trial) -> TrialRecord {
        let parse = self
            .parser
            .parse(&trial.prompt(), self.system_prompt.as_deref());

        if !parse.success {
            info!(instruction = %trial.instruction_id, retries = parse.retries, "trial failed to parse");
            return TrialRecord {
                instruction_id: trial.instruction_id.clone(),
                parse,
                allocation: None,
                validation: None,
                logical_score: 0.0,
            };
        }

        let spec = &parse.data;
        let costs = trial
            .costs
            .clone()
            .unwrap_or_else(|| CostMatrix::uniform(&spec.robots, &spec.tasks, 1.0));
        let allocation = self.allocator.allocate(&spec.robots, &spec.tasks, &costs);
        let validation = validate_actions(&spec.tasks, &spec.initial_state);

        info!(
            instruction = %trial.instruction_id,
            allocated = allocation.assigned_count(),
            valid = validation.valid,
            "trial complete"
        );

        TrialRecord {
            instruction_id: trial.instruction_id.clone(),
            logical_score: validation.score,
            allocation: Some(allocation),
            validation: Some(validation),
            parse,
        }
    }

    /// Runs `trials` repetitions sequentially, appending each record to `log`.
    pub fn run_evaluation(
        &self,
        trial: &Trial,
        trials: usize,
        log: &mut dyn TrialLog,
    ) -> TrialSummary {
        let start = log.records().len();
        for i in 0..trials {
            let record = self.run_trial(trial);
            info!(trial = i + 1, of = trials, success = record.parse.success, "trial logged");
            log.append(&record);
        }
        TrialSummary::from_records(&log.records()[start..])
    }
}
