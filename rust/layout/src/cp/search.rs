// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Depth-first branch-and-bound search with a wall-clock deadline.

use std::time::{Duration, Instant};

use smallvec::SmallVec;

use super::model::{
    Constraint, CpModel, Domain, LinearConstraint, LinearExpr, Literal, ValueOrder, VarId,
};
use super::propagate::Propagator;

/// Outcome of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpStatus {
    /// Search space exhausted with a solution. Also reported for models
    /// without an objective once a solution exists.
    Optimal,
    /// Stopped early holding a solution.
    Feasible,
    /// Search space exhausted without a solution.
    Infeasible,
    /// Stopped early without a solution.
    Unknown,
}

#[derive(Debug, Clone)]
pub struct SolverParams {
    pub time_limit: Duration,
    /// Stop after this many improving solutions.
    pub solution_limit: Option<usize>,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(10),
            solution_limit: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub nodes: u64,
    pub failures: u64,
    pub solutions: u64,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct CpSolution {
    values: Vec<i64>,
    objective: Option<i64>,
}

impl CpSolution {
    pub fn value(&self, var: VarId) -> i64 {
        self.values[var.index()]
    }

    pub fn literal(&self, lit: Literal) -> bool {
        lit.eval(&self.values)
    }

    pub fn values(&self) -> &[i64] {
        &self.values
    }

    pub fn objective(&self) -> Option<i64> {
        self.objective
    }
}

#[derive(Debug, Clone)]
pub struct CpResult {
    pub status: CpStatus,
    pub solution: Option<CpSolution>,
    pub stats: SearchStats,
}

pub struct CpSolver {
    params: SolverParams,
}

enum Flow {
    Continue,
    Stop,
}

impl CpSolver {
    pub fn new(params: SolverParams) -> Self {
        Self { params }
    }

    pub fn solve(&self, model: &CpModel) -> CpResult {
        let started = Instant::now();
        // Limits too large to add to the clock run until the search ends.
        let deadline = started.checked_add(self.params.time_limit);
        let mut domains = model.domains.clone();
        let constraints = model.constraints.clone();
        let mut propagator = Propagator::new(domains.len(), &constraints);

        let root_ok =
            !domains.iter().any(Domain::is_empty) && propagator.run_all(&constraints, &mut domains).is_ok();
        if !root_ok {
            return CpResult {
                status: CpStatus::Infeasible,
                solution: None,
                stats: SearchStats {
                    elapsed: started.elapsed(),
                    ..SearchStats::default()
                },
            };
        }

        let mut search = Search {
            constraints,
            propagator,
            decisions: decision_order(model),
            objective: model.objective.clone(),
            bound: None,
            best: None,
            deadline,
            solution_limit: self.params.solution_limit,
            stats: SearchStats::default(),
            timed_out: false,
        };
        search.dfs(domains);

        let mut stats = search.stats;
        stats.elapsed = started.elapsed();
        let stopped_early = search.timed_out || search.limit_reached();
        let status = match (&search.best, stopped_early) {
            (Some(_), false) => CpStatus::Optimal,
            (Some(_), true) if search.objective.is_none() => CpStatus::Optimal,
            (Some(_), true) => CpStatus::Feasible,
            (None, false) => CpStatus::Infeasible,
            (None, true) => CpStatus::Unknown,
        };
        CpResult {
            status,
            solution: search.best,
            stats,
        }
    }
}

/// Strategy variables first, then everything else by index with `Min`.
fn decision_order(model: &CpModel) -> Vec<(VarId, ValueOrder)> {
    let mut seen = vec![false; model.num_vars()];
    let mut order = Vec::with_capacity(model.num_vars());
    for strategy in &model.strategies {
        for &v in &strategy.vars {
            if !std::mem::replace(&mut seen[v.index()], true) {
                order.push((v, strategy.order));
            }
        }
    }
    for (i, flag) in seen.iter().enumerate() {
        if !flag {
            order.push((VarId(i as u32), ValueOrder::Min));
        }
    }
    order
}

struct Search {
    constraints: Vec<Constraint>,
    propagator: Propagator,
    decisions: Vec<(VarId, ValueOrder)>,
    objective: Option<LinearExpr>,
    /// Index of the `objective ≥ best + 1` constraint once a solution exists.
    bound: Option<usize>,
    best: Option<CpSolution>,
    deadline: Option<Instant>,
    solution_limit: Option<usize>,
    stats: SearchStats,
    timed_out: bool,
}

impl Search {
    fn limit_reached(&self) -> bool {
        self.solution_limit
            .is_some_and(|limit| self.stats.solutions as usize >= limit)
    }

    fn dfs(&mut self, mut domains: Vec<Domain>) -> Flow {
        loop {
            if self.deadline.is_some_and(|d| Instant::now() >= d) {
                self.timed_out = true;
                return Flow::Stop;
            }
            self.stats.nodes += 1;

            let Some((var, order)) = self
                .decisions
                .iter()
                .copied()
                .find(|(v, _)| !domains[v.index()].is_fixed())
            else {
                return self.record(&domains);
            };

            let d = domains[var.index()];
            let value = match order {
                ValueOrder::Min => d.lb,
                ValueOrder::Max => d.ub,
            };

            let mut child = domains.clone();
            child[var.index()] = Domain::new(value, value);
            if self.propagate(&mut child, var) {
                if let Flow::Stop = self.dfs(child) {
                    return Flow::Stop;
                }
            } else {
                self.stats.failures += 1;
            }

            match order {
                ValueOrder::Min => domains[var.index()].lb = value + 1,
                ValueOrder::Max => domains[var.index()].ub = value - 1,
            }
            if domains[var.index()].is_empty() || !self.propagate(&mut domains, var) {
                self.stats.failures += 1;
                return Flow::Continue;
            }
        }
    }

    fn propagate(&mut self, domains: &mut [Domain], var: VarId) -> bool {
        self.propagator
            .run_from(&self.constraints, domains, var, self.bound)
            .is_ok()
    }

    fn record(&mut self, domains: &[Domain]) -> Flow {
        let values: Vec<i64> = domains.iter().map(|d| d.lb).collect();
        let objective = self.objective.as_ref().map(|obj| obj.eval(&values));
        self.stats.solutions += 1;
        self.best = Some(CpSolution { values, objective });

        let Some(value) = objective else {
            return Flow::Stop;
        };
        self.tighten(value);
        if self.limit_reached() {
            Flow::Stop
        } else {
            Flow::Continue
        }
    }

    /// Require strictly better solutions from now on.
    fn tighten(&mut self, value: i64) {
        let Some(obj) = &self.objective else {
            return;
        };
        // -Σ c·x ≤ k - (value + 1)
        let rhs = obj.offset() - (value + 1);
        match self.bound {
            Some(idx) => {
                if let Constraint::Linear(lin) = &mut self.constraints[idx] {
                    lin.rhs = rhs;
                }
            }
            None => {
                let lin = Constraint::Linear(LinearConstraint {
                    terms: obj.terms().iter().map(|&(c, v)| (-c, v)).collect(),
                    rhs,
                    enforcement: SmallVec::new(),
                });
                let idx = self.constraints.len();
                self.propagator.watch(idx, &lin);
                self.constraints.push(lin);
                self.bound = Some(idx);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(secs: u64) -> SolverParams {
        SolverParams {
            time_limit: Duration::from_secs(secs),
            solution_limit: None,
        }
    }

    #[test]
    fn proves_optimum_on_small_model() {
        let mut m = CpModel::new();
        let x = m.new_int_var(0, 6);
        let y = m.new_int_var(0, 6);
        m.add_le(2 * x + 3 * y, 12);
        m.maximize(3 * x + 4 * y);
        let result = CpSolver::new(params(5)).solve(&m);
        assert_eq!(result.status, CpStatus::Optimal);
        let sol = result.solution.unwrap();
        assert_eq!(sol.objective(), Some(18));
        assert!(m.check(sol.values()));
    }

    #[test]
    fn infeasible_at_root() {
        let mut m = CpModel::new();
        let x = m.new_int_var(0, 3);
        let y = m.new_int_var(0, 3);
        m.add_ge(x + y, 7);
        let result = CpSolver::new(params(5)).solve(&m);
        assert_eq!(result.status, CpStatus::Infeasible);
        assert!(result.solution.is_none());
    }

    #[test]
    fn infeasible_after_search() {
        let mut m = CpModel::new();
        let a = m.new_bool_var();
        let b = m.new_bool_var();
        let c = m.new_bool_var();
        // Pairwise distinct booleans cannot exist.
        for (p, q) in [(a, b), (b, c), (a, c)] {
            m.add_bool_or(&[p, q]);
            m.add_bool_or(&[!p, !q]);
        }
        let result = CpSolver::new(params(5)).solve(&m);
        assert_eq!(result.status, CpStatus::Infeasible);
    }

    #[test]
    fn zero_time_limit_reports_unknown() {
        let mut m = CpModel::new();
        let x = m.new_int_var(0, 3);
        m.maximize(x);
        let result = CpSolver::new(SolverParams {
            time_limit: Duration::ZERO,
            solution_limit: None,
        })
        .solve(&m);
        assert_eq!(result.status, CpStatus::Unknown);
    }

    #[test]
    fn satisfaction_model_stops_at_first_solution() {
        let mut m = CpModel::new();
        let x = m.new_int_var(0, 9);
        let b = m.new_bool_var();
        m.add_ge(x, 4).only_enforce_if(&[b]);
        m.add_bool_or(&[b]);
        m.add_decision_strategy(vec![x], ValueOrder::Max);
        let result = CpSolver::new(params(5)).solve(&m);
        assert_eq!(result.status, CpStatus::Optimal);
        assert_eq!(result.solution.unwrap().value(x), 9);
        assert_eq!(result.stats.solutions, 1);
    }

    #[test]
    fn solution_limit_reports_feasible() {
        let mut m = CpModel::new();
        let x = m.new_int_var(0, 50);
        m.maximize(LinearExpr::from(x));
        let result = CpSolver::new(SolverParams {
            time_limit: Duration::from_secs(5),
            solution_limit: Some(1),
        })
        .solve(&m);
        assert_eq!(result.status, CpStatus::Feasible);
        assert_eq!(result.solution.unwrap().value(x), 0);
    }
}
