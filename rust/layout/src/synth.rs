// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Constraint-based layout synthesis.
//!
//! Builds one [`CpModel`] per [`LayoutProblem`]: placement variables from the
//! binding table, constraints from the active rules, and a weighted objective.
//! The solver runs under the problem's wall-clock limit and the result is
//! read back into grid rectangles.

use std::cmp::Reverse;
use std::fmt;

use madori_core::{GridRect, GridSpec, RoomId, RoomInstance, RoomShape, RoomType, Side};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::audit::{audit_layout, AuditInput};
use crate::bindings::{LayoutVars, RoomKey};
use crate::constraints::BuildingConstraints;
use crate::cp::{CpModel, CpResult, CpSolver, CpStatus, LinearExpr, SearchStats, SolverParams, ValueOrder, VarId};
use crate::error::Result;
use crate::limits::{GridLimits, GridSite, RoomPlan, PERMILLE};
use crate::problem::{LayoutProblem, PairKind};
use crate::rules::{apply_rules, RuleContext, RuleSet};

/// Objective weights. The objective maximizes
/// `area · Σ cells − aspect · Σ |1000·w − ratio‰·h| − south · distance`,
/// where `distance` is how far the primary living room sits from the south
/// edge, in modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectiveWeights {
    pub area: i64,
    pub aspect: i64,
    pub south: i64,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            area: 1000,
            aspect: 1,
            south: 2000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolveStatus {
    /// The search space was exhausted; the layout is the best one.
    Optimal,
    /// A layout was found before the time limit.
    Feasible,
    /// No layout satisfies the active rules.
    Infeasible,
    /// The time limit passed before any layout was found.
    TimedOutNoSolution,
}

impl SolveStatus {
    pub fn has_solution(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SolveStatus::Optimal => "OPTIMAL",
            SolveStatus::Feasible => "FEASIBLE",
            SolveStatus::Infeasible => "INFEASIBLE",
            SolveStatus::TimedOutNoSolution => "TIMED_OUT_NO_SOLUTION",
        }
    }
}

impl From<CpStatus> for SolveStatus {
    fn from(status: CpStatus) -> Self {
        match status {
            CpStatus::Optimal => SolveStatus::Optimal,
            CpStatus::Feasible => SolveStatus::Feasible,
            CpStatus::Infeasible => SolveStatus::Infeasible,
            CpStatus::Unknown => SolveStatus::TimedOutNoSolution,
        }
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A room placed on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedRoom {
    pub id: RoomId,
    #[serde(rename = "type")]
    pub room_type: RoomType,
    pub floor: u32,
    pub rect: GridRect,
}

/// Result of one synthesizer invocation.
#[derive(Debug, Clone)]
pub struct LayoutSolution {
    pub status: SolveStatus,
    /// Empty unless the status has a solution. Sorted by id.
    pub rooms: Vec<PlacedRoom>,
    pub grid: GridSpec,
    pub site: GridSite,
    pub floor_count: u32,
    pub objective: Option<i64>,
    pub stats: SearchStats,
    pub warnings: Vec<String>,
}

impl LayoutSolution {
    pub fn room(&self, id: RoomId) -> Option<&PlacedRoom> {
        self.rooms.iter().find(|r| r.id == id)
    }

    /// Rooms as metric rectangles inside the site.
    pub fn room_instances(&self) -> Result<Vec<RoomInstance>> {
        self.rooms
            .iter()
            .map(|r| -> Result<RoomInstance> {
                let rect = r.rect.to_metric(&self.grid, self.site.origin)?;
                Ok(RoomInstance::new(r.id, r.room_type, r.floor, RoomShape::Rect(rect)))
            })
            .collect()
    }

    pub fn total_cells(&self) -> i64 {
        self.rooms.iter().map(|r| r.rect.area()).sum()
    }

    pub fn total_area_m2(&self) -> f64 {
        self.grid.cells_to_m2(self.total_cells())
    }

    /// Largest per-floor footprint ÷ site area.
    pub fn coverage_ratio(&self) -> f64 {
        let widest = (0..self.floor_count)
            .map(|f| {
                self.rooms
                    .iter()
                    .filter(|r| r.floor == f)
                    .map(|r| r.rect.area())
                    .sum::<i64>()
            })
            .max()
            .unwrap_or(0);
        self.grid.cells_to_m2(widest) / self.site.area_m2
    }

    pub fn floor_area_ratio(&self) -> f64 {
        self.total_area_m2() / self.site.area_m2
    }
}

/// A built model with its binding table, before solving.
pub struct BuiltModel {
    pub model: CpModel,
    pub vars: LayoutVars,
    pub limits: GridLimits,
}

/// Builds and solves layout models under a fixed set of building
/// constants, active rules and objective weights.
#[derive(Debug, Clone)]
pub struct Synthesizer {
    constraints: BuildingConstraints,
    rules: RuleSet,
    weights: ObjectiveWeights,
    solution_limit: Option<usize>,
}

impl Synthesizer {
    pub fn new(constraints: BuildingConstraints) -> Result<Self> {
        constraints.validate()?;
        Ok(Self {
            constraints,
            rules: RuleSet::all(),
            weights: ObjectiveWeights::default(),
            solution_limit: None,
        })
    }

    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_weights(mut self, weights: ObjectiveWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Stop after this many improving layouts; the result is then FEASIBLE.
    pub fn with_solution_limit(mut self, limit: Option<usize>) -> Self {
        self.solution_limit = limit;
        self
    }

    pub fn constraints(&self) -> &BuildingConstraints {
        &self.constraints
    }

    pub fn rules(&self) -> RuleSet {
        self.rules
    }

    pub fn weights(&self) -> ObjectiveWeights {
        self.weights
    }

    pub fn solution_limit(&self) -> Option<usize> {
        self.solution_limit
    }

    pub fn build(&self, problem: &LayoutProblem) -> Result<BuiltModel> {
        let limits = GridLimits::new(&problem.site, problem.floor_count, &self.constraints, &problem.grid)?;
        let plans: Vec<RoomPlan> = problem
            .rooms
            .iter()
            .cloned()
            .map(|spec| RoomPlan::new(spec, &limits, &problem.grid))
            .collect();

        let mut model = CpModel::new();
        let mut vars = LayoutVars::bind(&mut model, plans, &limits);

        let pairs_of = |kind: PairKind| -> Vec<(RoomKey, RoomKey)> {
            problem
                .adjacency
                .iter()
                .filter(|req| req.kind == kind)
                .filter_map(|req| Some((vars.key_of(req.a)?, vars.key_of(req.b)?)))
                .collect()
        };
        let adjacency = pairs_of(PairKind::Adjacent);
        let near = pairs_of(PairKind::Near);
        let stair_groups: Vec<Vec<RoomKey>> = problem
            .stair_groups
            .iter()
            .map(|group| group.iter().filter_map(|id| vars.key_of(*id)).collect())
            .collect();
        let primary = problem.primary_room().and_then(|id| vars.key_of(id));
        let ctx = RuleContext {
            limits: &limits,
            floor_count: problem.floor_count,
            adjacency: &adjacency,
            near: &near,
            primary,
            stair_groups: &stair_groups,
        };
        apply_rules(self.rules, &mut model, &mut vars, &ctx);

        self.post_objective(&mut model, &vars, &limits, primary);
        post_strategy(&mut model, &vars, primary);

        Ok(BuiltModel { model, vars, limits })
    }

    fn post_objective(&self, model: &mut CpModel, vars: &LayoutVars, limits: &GridLimits, primary: Option<RoomKey>) {
        let w = self.weights;
        let mut objective = LinearExpr::new();
        for (_, room) in vars.iter() {
            objective.add_term(w.area, room.vars.area);
        }

        if w.aspect > 0 {
            for (_, room) in vars.iter() {
                let v = room.vars;
                let ratio = room.plan.ratio_permille;
                let dev = model.new_int_var(0, PERMILLE * limits.width + ratio * limits.height);
                model.add_ge(dev, PERMILLE * v.w - ratio * v.h);
                model.add_ge(dev, ratio * v.h - PERMILLE * v.w);
                objective.add_term(-w.aspect, dev);
            }
        }

        if let (Some(key), true) = (primary, w.south > 0) {
            let v = vars[key].vars;
            let distance = match limits.south {
                Side::MinY => LinearExpr::from(v.y),
                Side::MinX => LinearExpr::from(v.x),
                Side::MaxY => LinearExpr::constant(limits.height) - v.y - v.h,
                Side::MaxX => LinearExpr::constant(limits.width) - v.x - v.w,
            };
            objective = objective - distance.scaled(w.south);
        }
        model.maximize(objective);
    }

    /// Solve a problem under its time limit.
    pub fn solve(&self, problem: &LayoutProblem) -> Result<LayoutSolution> {
        let built = self.build(problem)?;
        info!(
            rooms = problem.rooms.len(),
            floors = problem.floor_count,
            grid_width = built.limits.width,
            grid_height = built.limits.height,
            variables = built.model.num_vars(),
            constraints = built.model.num_constraints(),
            rules = ?self.rules,
            "Layout model built"
        );

        let params = SolverParams {
            time_limit: problem.time_limit,
            solution_limit: self.solution_limit,
        };
        let result = CpSolver::new(params).solve(&built.model);
        let mut solution = self.read_solution(problem, &built, result);
        info!(
            status = %solution.status,
            objective = ?solution.objective,
            nodes = solution.stats.nodes,
            solutions = solution.stats.solutions,
            elapsed_ms = solution.stats.elapsed.as_millis() as u64,
            "Layout search finished"
        );

        if solution.status.has_solution() {
            self.self_check(problem, &mut solution)?;
        }
        Ok(solution)
    }

    fn read_solution(&self, problem: &LayoutProblem, built: &BuiltModel, result: CpResult) -> LayoutSolution {
        let status = SolveStatus::from(result.status);
        let mut rooms = Vec::new();
        let mut objective = None;
        if let (true, Some(values)) = (status.has_solution(), &result.solution) {
            if !built.model.check(values.values()) {
                error!("Solver returned an assignment that violates the model");
            }
            objective = values.objective();
            rooms = built
                .vars
                .iter()
                .map(|(_, room)| PlacedRoom {
                    id: room.id(),
                    room_type: room.plan.room_type(),
                    floor: room.plan.floor(),
                    rect: GridRect::new(
                        values.value(room.vars.x),
                        values.value(room.vars.y),
                        values.value(room.vars.w),
                        values.value(room.vars.h),
                    ),
                })
                .collect();
            rooms.sort_by_key(|r| r.id);
        }
        LayoutSolution {
            status,
            rooms,
            grid: problem.grid,
            site: problem.site,
            floor_count: problem.floor_count,
            objective,
            stats: result.stats,
            warnings: problem.warnings.clone(),
        }
    }

    /// Re-check a solved layout in metric units. Any violation is a defect
    /// in model construction; each one is logged and kept as a warning so it
    /// reaches the output document.
    fn self_check(&self, problem: &LayoutProblem, solution: &mut LayoutSolution) -> Result<()> {
        let instances = solution.room_instances()?;
        let Some(buildable) = problem.site.buildable_rect(&problem.grid) else {
            return Ok(());
        };
        let site = buildable.to_polygon();
        let input = AuditInput {
            rooms: &instances,
            site: &site,
            site_area_m2: problem.site.area_m2,
            buildable: Some(buildable),
            north_angle_rad: problem.site.north_angle_rad,
            floor_count: problem.floor_count,
            specs: Some(&problem.rooms),
            required_pairs: &problem.adjacency,
            stair_groups: &problem.stair_groups,
        };
        let violations = audit_layout(&input, &self.constraints, self.rules);
        for v in &violations {
            error!(rule = %v.rule, rooms = ?v.rooms, message = %v.message, "Solved layout violates a rule");
            solution.warnings.push(format!("self-check: {v}"));
        }
        debug!(violations = violations.len(), "Layout self-check done");
        Ok(())
    }
}

/// Primary room first, then larger rooms; each placed by size then position.
/// Exposure flags prefer touching the site edge.
fn post_strategy(model: &mut CpModel, vars: &LayoutVars, primary: Option<RoomKey>) {
    let mut order: Vec<RoomKey> = vars.keys().collect();
    order.sort_by_key(|k| (Reverse(Some(*k) == primary), Reverse(vars[*k].plan.min_cells)));

    let placement: Vec<VarId> = order
        .iter()
        .flat_map(|k| {
            let v = vars[*k].vars;
            [v.w, v.h, v.x, v.y]
        })
        .collect();
    model.add_decision_strategy(placement, ValueOrder::Min);

    let exposure: Vec<VarId> = order
        .iter()
        .filter_map(|k| vars[*k].exposure)
        .flat_map(|e| e.touches.map(|t| t.var()))
        .collect();
    if !exposure.is_empty() {
        model.add_decision_strategy(exposure, ValueOrder::Max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{LayoutRequest, RoomRequest};
    use std::time::Duration;

    fn synth() -> Synthesizer {
        Synthesizer::new(BuildingConstraints::default()).unwrap()
    }

    #[test]
    fn status_strings() {
        assert_eq!(
            serde_json::to_string(&SolveStatus::TimedOutNoSolution).unwrap(),
            "\"TIMED_OUT_NO_SOLUTION\""
        );
        assert_eq!(SolveStatus::Optimal.to_string(), "OPTIMAL");
        assert!(!SolveStatus::Infeasible.has_solution());
    }

    #[test]
    fn places_single_room_at_origin() {
        let mut req = LayoutRequest::new(6.0, 6.0, vec![RoomRequest::new(RoomType::Bath)]);
        req.time_limit_seconds = 2.0;
        let problem = req.to_problem(&GridSpec::default()).unwrap();
        let solution = synth().with_solution_limit(Some(1)).solve(&problem).unwrap();
        assert_eq!(solution.status, SolveStatus::Feasible);
        let bath = solution.room(RoomId(1)).unwrap();
        assert_eq!(bath.rect, GridRect::new(0, 0, 2, 2));
    }

    #[test]
    fn self_check_findings_become_warnings() {
        let mut req = LayoutRequest::new(6.0, 6.0, vec![RoomRequest::new(RoomType::Bath)]);
        req.time_limit_seconds = 2.0;
        let problem = req.to_problem(&GridSpec::default()).unwrap();
        let synth = synth().with_solution_limit(Some(1));
        let mut solution = synth.solve(&problem).unwrap();
        assert!(!solution.warnings.iter().any(|w| w.starts_with("self-check:")));

        // Push the bath past the 6 × 6 grid edge.
        solution.rooms[0].rect = GridRect::new(5, 5, 2, 2);
        synth.self_check(&problem, &mut solution).unwrap();
        assert!(solution
            .warnings
            .iter()
            .any(|w| w.starts_with("self-check: error[containment]")));
    }

    #[test]
    fn absurd_site_is_rejected_before_solving() {
        let req = LayoutRequest::new(1e300, 1e300, vec![RoomRequest::new(RoomType::Bath)]);
        let problem = req.to_problem(&GridSpec::default()).unwrap();
        assert!(matches!(
            synth().solve(&problem),
            Err(crate::error::LayoutError::InvalidRequest(_))
        ));
    }

    #[test]
    fn zero_time_limit_times_out() {
        let mut req = LayoutRequest::new(10.0, 10.0, vec![RoomRequest::new(RoomType::Bedroom)]);
        req.time_limit_seconds = 0.0;
        let problem = req.to_problem(&GridSpec::default()).unwrap();
        let solution = synth().solve(&problem).unwrap();
        assert_eq!(solution.status, SolveStatus::TimedOutNoSolution);
        assert!(solution.rooms.is_empty());
    }

    #[test]
    fn aspect_weight_adds_deviation_terms() {
        let req = LayoutRequest::new(10.0, 10.0, vec![RoomRequest::new(RoomType::Bath)]);
        let problem = req.to_problem(&GridSpec::default()).unwrap();
        let with = synth().build(&problem).unwrap().model.num_vars();
        let without = synth()
            .with_weights(ObjectiveWeights { aspect: 0, ..Default::default() })
            .build(&problem)
            .unwrap()
            .model
            .num_vars();
        assert_eq!(with, without + 1);
    }

    #[test]
    fn south_follows_north_angle() {
        let mut req = LayoutRequest::new(9.1, 9.1, vec![RoomRequest::new(RoomType::Living)]);
        req.north_angle_rad = std::f64::consts::PI;
        req.time_limit_seconds = 2.0;
        let problem = req.to_problem(&GridSpec::default()).unwrap();
        let solution = synth().solve(&problem).unwrap();
        assert!(solution.status.has_solution());
        let ldk = solution.room(RoomId(1)).unwrap();
        // North points down the drawing, so south is the max-y edge.
        assert_eq!(ldk.rect.max_y(), 10);
        assert!(solution.stats.elapsed <= Duration::from_secs(3));
    }
}
