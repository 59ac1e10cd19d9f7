// src/protocol/allocator.rs

use crate::protocol::profiles::{ProfileRegistry, required_capability};
use crate::protocol::{AllocationResult, AllocationStatus};
use crate::tools::solver::{BranchAndBound, Comparison, IntegerProgram, IpSolver, SolveStatus};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Cost of robot `r` performing task `t`, in energy cost units.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CostMatrix {
    costs: HashMap<String, HashMap<String, f64>>,
}

impl CostMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every robot pays `cost` for every task.
    pub fn uniform<R: AsRef<str>, T: AsRef<str>>(robots: &[R], tasks: &[T], cost: f64) -> Self {
        let mut matrix = Self::new();
        for robot in robots {
            for task in tasks {
                matrix.insert(robot.as_ref(), task.as_ref(), cost);
            }
        }
        matrix
    }

    pub fn insert(&mut self, robot: &str, task: &str, cost: f64) {
        self.costs
            .entry(robot.to_string())
            .or_default()
            .insert(task.to_string(), cost);
    }

    pub fn with(mut self, robot: &str, task: &str, cost: f64) -> Self {
        self.insert(robot, task, cost);
        self
    }

    pub fn get(&self, robot: &str, task: &str) -> Option<f64> {
        self.costs.get(robot).and_then(|row| row.get(task)).copied()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AllocatorConfig {
    /// Cost units one watt-hour of battery pays for.
    pub energy_cost_per_wh: f64,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            energy_cost_per_wh: 1.0,
        }
    }
}

/// Assigns every task to exactly one capable robot at minimum total cost.
pub struct AllocationFormulator {
    profiles: ProfileRegistry,
    config: AllocatorConfig,
    solver: Box<dyn IpSolver>,
}

impl Default for AllocationFormulator {
    fn default() -> Self {
        Self::new(ProfileRegistry::default(), AllocatorConfig::default())
    }
}

impl AllocationFormulator {
    pub fn new(profiles: ProfileRegistry, config: AllocatorConfig) -> Self {
        Self {
            profiles,
            config,
            solver: Box::new(BranchAndBound::default()),
        }
    }

    pub fn with_solver(mut self, solver: impl IpSolver + 'static) -> Self {
        self.solver = Box::new(solver);
        self
    }

    /// Energy budget of `robot` in cost units.
    pub fn budget(&self, robot: &str) -> f64 {
        self.profiles.resolve(robot).1.battery_capacity_wh * self.config.energy_cost_per_wh
    }

    /// Builds the binary program; returns it with the variable index of
    /// every (robot, task) pair.
    pub fn formulate<T: AsRef<str>>(
        &self,
        robots: &[&str],
        tasks: &[T],
        costs: &CostMatrix,
    ) -> (IntegerProgram, Vec<Vec<usize>>) {
        let mut ip = IntegerProgram::new("multi_robot_allocation");
        let mut x = vec![Vec::with_capacity(tasks.len()); robots.len()];

        for (r, robot) in robots.iter().enumerate() {
            let (profile_name, profile) = self.profiles.resolve(robot);
            debug!(robot, profile = profile_name, "resolved robot profile");

            for (t, task) in tasks.iter().enumerate() {
                let task = task.as_ref();
                let cost = costs.get(robot, task);
                let var = ip.add_binary(format!("x_{robot}_{t}"), cost.unwrap_or(0.0));
                x[r].push(var);

                if cost.is_none() {
                    warn!(robot, task, "no cost for pair; excluding it");
                    ip.fix_zero(var);
                } else if let Some(capability) = required_capability(task) {
                    if !profile.has(capability) {
                        ip.fix_zero(var);
                    }
                }
            }
        }

        for t in 0..tasks.len() {
            let terms = (0..robots.len()).map(|r| (x[r][t], 1.0)).collect();
            ip.add_constraint(format!("cover_{t}"), terms, Comparison::Equal, 1.0);
        }

        for (r, robot) in robots.iter().enumerate() {
            let terms = tasks
                .iter()
                .enumerate()
                .map(|(t, task)| (x[r][t], costs.get(robot, task.as_ref()).unwrap_or(0.0)))
                .collect();
            let budget = self.budget(robot);
            ip.add_constraint(format!("energy_{robot}"), terms, Comparison::AtMost, budget);
        }

        (ip, x)
    }

    pub fn allocate<R: AsRef<str>, T: AsRef<str>>(
        &self,
        robots: &[R],
        tasks: &[T],
        costs: &CostMatrix,
    ) -> AllocationResult {
        let robots: IndexSet<&str> = robots.iter().map(|r| r.as_ref()).collect();
        let robots: Vec<&str> = robots.into_iter().collect();

        let (ip, x) = self.formulate(&robots, tasks, costs);
        let outcome = self.solver.solve(&ip);

        let mut assignments: IndexMap<String, Vec<String>> =
            robots.iter().map(|r| (r.to_string(), Vec::new())).collect();

        if outcome.status != SolveStatus::Optimal {
            warn!(
                status = %outcome.status,
                tasks = tasks.len(),
                "allocation refused; no robot assigned"
            );
            return AllocationResult {
                assignments,
                status: AllocationStatus::Refused(outcome.status),
                total_cost: None,
            };
        }

        for (r, robot) in robots.iter().enumerate() {
            let assigned = tasks
                .iter()
                .enumerate()
                .filter(|(t, _)| outcome.values[x[r][*t]])
                .map(|(_, task)| task.as_ref().to_string());
            if let Some(list) = assignments.get_mut(*robot) {
                list.extend(assigned);
            }
        }

        info!(
            robots = robots.len(),
            tasks = tasks.len(),
            cost = outcome.objective.unwrap_or_default(),
            "allocation optimal"
        );

        AllocationResult {
            assignments,
            status: AllocationStatus::Optimal,
            total_cost: outcome.objective,
        }
    }
}
