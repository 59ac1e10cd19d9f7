// src/tools/solver.rs

use serde::Serialize;
use std::fmt;
use tracing::debug;

const EPS: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Comparison {
    Equal,
    AtMost,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BinaryVar {
    pub name: String,
    pub cost: f64,
    pub fixed_zero: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LinearConstraint {
    pub name: String,
    pub terms: Vec<(usize, f64)>,
    pub comparison: Comparison,
    pub rhs: f64,
}

impl LinearConstraint {
    fn activity(&self, values: &[bool]) -> f64 {
        self.terms
            .iter()
            .filter(|(var, _)| values[*var])
            .map(|(_, coef)| coef)
            .sum()
    }

    fn holds(&self, lhs_min: f64, lhs_max: f64) -> bool {
        match self.comparison {
            Comparison::Equal => lhs_min <= self.rhs + EPS && lhs_max >= self.rhs - EPS,
            Comparison::AtMost => lhs_min <= self.rhs + EPS,
        }
    }

    fn is_cover(&self) -> bool {
        self.comparison == Comparison::Equal
            && (self.rhs - 1.0).abs() < EPS
            && self.terms.iter().all(|(_, coef)| (coef - 1.0).abs() < EPS)
    }
}

/// Minimize a linear objective over binary variables.
#[derive(Clone, Debug, Default)]
pub struct IntegerProgram {
    pub name: String,
    vars: Vec<BinaryVar>,
    constraints: Vec<LinearConstraint>,
}

impl IntegerProgram {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn add_binary(&mut self, name: impl Into<String>, cost: f64) -> usize {
        self.vars.push(BinaryVar {
            name: name.into(),
            cost,
            fixed_zero: false,
        });
        self.vars.len() - 1
    }

    pub fn fix_zero(&mut self, var: usize) {
        if let Some(v) = self.vars.get_mut(var) {
            v.fixed_zero = true;
        }
    }

    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        terms: Vec<(usize, f64)>,
        comparison: Comparison,
        rhs: f64,
    ) {
        self.constraints.push(LinearConstraint {
            name: name.into(),
            terms,
            comparison,
            rhs,
        });
    }

    /// Read access for solver implementations.
    pub fn variables(&self) -> &[BinaryVar] {
        &self.vars
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub fn is_feasible(&self, values: &[bool]) -> bool {
        values.len() == self.vars.len()
            && self.vars.iter().zip(values).all(|(v, on)| !(v.fixed_zero && *on))
            && self.constraints.iter().all(|c| {
                let lhs = c.activity(values);
                c.holds(lhs, lhs)
            })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    NodeLimit,
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SolveStatus::Optimal => "optimal",
            SolveStatus::Infeasible => "infeasible",
            SolveStatus::NodeLimit => "node limit reached",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SolverOutcome {
    pub status: SolveStatus,
    /// One entry per variable; only meaningful when `status` is optimal.
    pub values: Vec<bool>,
    pub objective: Option<f64>,
    pub nodes: u64,
}

pub trait IpSolver: Send + Sync {
    fn solve(&self, program: &IntegerProgram) -> SolverOutcome;
}

/// Exact depth-first branch and bound for small binary programs.
#[derive(Clone, Debug)]
pub struct BranchAndBound {
    pub node_limit: u64,
}

impl Default for BranchAndBound {
    fn default() -> Self {
        Self {
            node_limit: 2_000_000,
        }
    }
}

impl BranchAndBound {
    pub fn with_node_limit(node_limit: u64) -> Self {
        Self { node_limit }
    }
}

struct Search<'a> {
    program: &'a IntegerProgram,
    order: Vec<usize>,
    touches: Vec<Vec<(usize, f64)>>,
    covers: Vec<usize>,
    in_cover: Vec<bool>,
    activity: Vec<f64>,
    free_min: Vec<f64>,
    free_max: Vec<f64>,
    assigned: Vec<bool>,
    values: Vec<bool>,
    cost: f64,
    best: Option<(f64, Vec<bool>)>,
    nodes: u64,
    limit: u64,
    aborted: bool,
}

impl<'a> Search<'a> {
    fn new(program: &'a IntegerProgram, limit: u64) -> Self {
        let vars = program.variables();
        let constraints = program.constraints();
        let n = vars.len();
        let m = constraints.len();
        let mut touches = vec![Vec::new(); n];
        let mut free_min = vec![0.0; m];
        let mut free_max = vec![0.0; m];
        let assigned: Vec<bool> = vars.iter().map(|v| v.fixed_zero).collect();

        for (c, constraint) in constraints.iter().enumerate() {
            for &(var, coef) in &constraint.terms {
                touches[var].push((c, coef));
                if !assigned[var] {
                    free_min[c] += coef.min(0.0);
                    free_max[c] += coef.max(0.0);
                }
            }
        }

        // Disjoint exactly-one constraints give a cheap lower bound and a
        // good branching order.
        let mut covers = Vec::new();
        let mut in_cover = vec![false; n];
        for (c, constraint) in constraints.iter().enumerate() {
            if constraint.is_cover() && constraint.terms.iter().all(|(v, _)| !in_cover[*v]) {
                for (v, _) in &constraint.terms {
                    in_cover[*v] = true;
                }
                covers.push(c);
            }
        }

        let mut order = Vec::with_capacity(n);
        for &c in &covers {
            let mut group: Vec<usize> = constraints[c]
                .terms
                .iter()
                .map(|(v, _)| *v)
                .filter(|v| !assigned[*v])
                .collect();
            group.sort_by(|a, b| vars[*a].cost.total_cmp(&vars[*b].cost));
            order.extend(group);
        }
        order.extend((0..n).filter(|v| !in_cover[*v] && !assigned[*v]));

        Self {
            program,
            order,
            touches,
            covers,
            in_cover,
            activity: vec![0.0; m],
            free_min,
            free_max,
            assigned,
            values: vec![false; n],
            cost: 0.0,
            best: None,
            nodes: 0,
            limit,
            aborted: false,
        }
    }

    fn root_feasible(&self) -> bool {
        self.program
            .constraints
            .iter()
            .enumerate()
            .all(|(c, constraint)| constraint.holds(self.free_min[c], self.free_max[c]))
    }

    fn lower_bound(&self) -> f64 {
        let mut bound = self.cost;
        for &c in &self.covers {
            if self.activity[c] > 0.5 {
                continue;
            }
            let cheapest = self.program.constraints[c]
                .terms
                .iter()
                .filter(|(v, _)| !self.assigned[*v])
                .map(|(v, _)| self.program.vars[*v].cost)
                .fold(f64::INFINITY, f64::min);
            bound += cheapest;
        }
        for (v, var) in self.program.vars.iter().enumerate() {
            if !self.assigned[v] && !self.in_cover[v] {
                bound += var.cost.min(0.0);
            }
        }
        bound
    }

    fn assign(&mut self, var: usize, value: bool) -> bool {
        self.assigned[var] = true;
        self.values[var] = value;
        if value {
            self.cost += self.program.vars[var].cost;
        }
        let mut feasible = true;
        for &(c, coef) in &self.touches[var] {
            self.free_min[c] -= coef.min(0.0);
            self.free_max[c] -= coef.max(0.0);
            if value {
                self.activity[c] += coef;
            }
            let constraint = &self.program.constraints[c];
            feasible &= constraint.holds(
                self.activity[c] + self.free_min[c],
                self.activity[c] + self.free_max[c],
            );
        }
        feasible
    }

    fn unassign(&mut self, var: usize) {
        let value = self.values[var];
        for &(c, coef) in &self.touches[var] {
            self.free_min[c] += coef.min(0.0);
            self.free_max[c] += coef.max(0.0);
            if value {
                self.activity[c] -= coef;
            }
        }
        if value {
            self.cost -= self.program.vars[var].cost;
        }
        self.values[var] = false;
        self.assigned[var] = false;
    }

    fn branch(&mut self, depth: usize) {
        if self.aborted {
            return;
        }
        self.nodes += 1;
        if self.nodes > self.limit {
            self.aborted = true;
            return;
        }
        if let Some((best, _)) = &self.best {
            if self.lower_bound() >= *best - EPS {
                return;
            }
        }
        let Some(&var) = self.order.get(depth) else {
            self.best = Some((self.cost, self.values.clone()));
            return;
        };

        let first = self.in_cover[var] || self.program.vars[var].cost < 0.0;
        for value in [first, !first] {
            if self.assign(var, value) {
                self.branch(depth + 1);
            }
            self.unassign(var);
        }
    }
}

impl IpSolver for BranchAndBound {
    fn solve(&self, program: &IntegerProgram) -> SolverOutcome {
        let mut search = Search::new(program, self.node_limit);
        if search.root_feasible() {
            search.branch(0);
        }

        let nodes = search.nodes;
        let status = match (&search.best, search.aborted) {
            (_, true) => SolveStatus::NodeLimit,
            (Some(_), false) => SolveStatus::Optimal,
            (None, false) => SolveStatus::Infeasible,
        };
        debug!(program = %program.name, %status, nodes, "branch and bound finished");

        match search.best {
            Some((objective, values)) if status == SolveStatus::Optimal => SolverOutcome {
                status,
                values,
                objective: Some(objective),
                nodes,
            },
            _ => SolverOutcome {
                status,
                values: vec![false; program.variables().len()],
                objective: None,
                nodes,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two workers, two jobs; the cheap diagonal costs 1 + 1.
    fn assignment() -> IntegerProgram {
        let costs = [[1.0, 5.0], [4.0, 1.0]];
        let mut ip = IntegerProgram::new("assign");
        let mut x = [[0usize; 2]; 2];
        for (w, row) in costs.iter().enumerate() {
            for (j, cost) in row.iter().enumerate() {
                x[w][j] = ip.add_binary(format!("x_{w}_{j}"), *cost);
            }
        }
        for j in 0..2 {
            ip.add_constraint(
                format!("cover_{j}"),
                vec![(x[0][j], 1.0), (x[1][j], 1.0)],
                Comparison::Equal,
                1.0,
            );
        }
        ip
    }

    #[test]
    fn finds_cheapest_assignment() {
        let ip = assignment();
        let outcome = BranchAndBound::default().solve(&ip);
        assert_eq!(outcome.status, SolveStatus::Optimal);
        assert_eq!(outcome.values, vec![true, false, false, true]);
        assert_eq!(outcome.objective, Some(2.0));
        assert!(ip.is_feasible(&outcome.values));
    }

    #[test]
    fn program_exposes_its_model() {
        let mut ip = assignment();
        ip.fix_zero(1);
        assert_eq!(ip.variables().len(), 4);
        assert_eq!(ip.variables()[1].name, "x_0_1");
        assert!(ip.variables()[1].fixed_zero);
        assert_eq!(ip.constraints().len(), 2);
        assert_eq!(ip.constraints()[0].comparison, Comparison::Equal);
    }

    #[test]
    fn respects_budgets_and_fixed_variables() {
        let mut ip = assignment();
        // Worker 1 cannot take job 1, and worker 0 cannot afford it either.
        ip.fix_zero(3);
        ip.add_constraint("budget_0", vec![(0, 1.0), (1, 5.0)], Comparison::AtMost, 4.0);
        let outcome = BranchAndBound::default().solve(&ip);
        assert_eq!(outcome.status, SolveStatus::Infeasible);

        let mut ip = assignment();
        ip.fix_zero(3);
        ip.add_constraint("budget_0", vec![(0, 1.0), (1, 5.0)], Comparison::AtMost, 6.0);
        let outcome = BranchAndBound::default().solve(&ip);
        assert_eq!(outcome.status, SolveStatus::Optimal);
        assert_eq!(outcome.values, vec![true, true, false, false]);
        assert_eq!(outcome.objective, Some(6.0));
    }

    #[test]
    fn empty_cover_is_infeasible_at_root() {
        let mut ip = IntegerProgram::new("nobody");
        ip.add_constraint("cover", Vec::new(), Comparison::Equal, 1.0);
        let outcome = BranchAndBound::default().solve(&ip);
        assert_eq!(outcome.status, SolveStatus::Infeasible);
        assert_eq!(outcome.nodes, 0);
    }

    #[test]
    fn negative_costs_are_taken_when_unconstrained() {
        let mut ip = IntegerProgram::new("free");
        ip.add_binary("gain", -3.0);
        ip.add_binary("loss", 2.0);
        let outcome = BranchAndBound::default().solve(&ip);
        assert_eq!(outcome.values, vec![true, false]);
        assert_eq!(outcome.objective, Some(-3.0));
    }

    #[test]
    fn node_limit_is_never_reported_as_optimal() {
        let outcome = BranchAndBound::with_node_limit(1).solve(&assignment());
        assert_eq!(outcome.status, SolveStatus::NodeLimit);
        assert_eq!(outcome.objective, None);
    }
}
