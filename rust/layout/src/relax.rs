// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Relaxation ladder for infeasible requests.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::problem::LayoutProblem;
use crate::synth::{LayoutSolution, ObjectiveWeights, SolveStatus, Synthesizer};

/// Increments applied by the density step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaxationConfig {
    pub coverage_step: f64,
    pub floor_area_ratio_step: f64,
}

impl Default for RelaxationConfig {
    fn default() -> Self {
        Self {
            coverage_step: 0.1,
            floor_area_ratio_step: 0.5,
        }
    }
}

/// One applied rung of the ladder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum RelaxationStep {
    DropAspectWeight,
    DropOptionalAdjacency { dropped: usize },
    RaiseDensityCaps { coverage: f64, floor_area_ratio: f64 },
}

impl fmt::Display for RelaxationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelaxationStep::DropAspectWeight => write!(f, "preferred-ratio weight set to 0"),
            RelaxationStep::DropOptionalAdjacency { dropped } => {
                write!(f, "dropped {dropped} non-critical adjacency requirement(s)")
            }
            RelaxationStep::RaiseDensityCaps {
                coverage,
                floor_area_ratio,
            } => write!(
                f,
                "raised max coverage to {coverage:.2} and max floor-area ratio to {floor_area_ratio:.2}"
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RelaxedOutcome {
    pub solution: LayoutSolution,
    pub steps: Vec<RelaxationStep>,
    /// The synthesizer and problem of the final attempt.
    pub synthesizer: Synthesizer,
    pub problem: LayoutProblem,
}

#[derive(Clone, Copy)]
enum Rung {
    Aspect,
    Adjacency,
    Density,
}

/// Solve, and while the result is INFEASIBLE relax one rung at a time:
/// aspect weight, then non-critical adjacency, then the coverage and FAR
/// ceilings. Timeouts are returned as they are. Each attempt gets the full
/// time limit.
pub fn synthesize_with_relaxation(
    synth: &Synthesizer,
    problem: &LayoutProblem,
    config: &RelaxationConfig,
) -> Result<RelaxedOutcome> {
    let mut synth = synth.clone();
    let mut problem = problem.clone();
    let mut steps = Vec::new();
    let mut solution = synth.solve(&problem)?;

    for rung in [Rung::Aspect, Rung::Adjacency, Rung::Density] {
        if solution.status != SolveStatus::Infeasible {
            break;
        }
        let step = match rung {
            Rung::Aspect => {
                let weights = synth.weights();
                if weights.aspect == 0 {
                    continue;
                }
                synth = synth.with_weights(ObjectiveWeights { aspect: 0, ..weights });
                RelaxationStep::DropAspectWeight
            }
            Rung::Adjacency => {
                let relaxed = problem.without_optional_adjacency();
                let dropped = problem.adjacency.len() - relaxed.adjacency.len();
                if dropped == 0 {
                    continue;
                }
                problem = relaxed;
                RelaxationStep::DropOptionalAdjacency { dropped }
            }
            Rung::Density => {
                let mut constraints = synth.constraints().clone();
                constraints.max_coverage_ratio = (constraints.max_coverage_ratio + config.coverage_step).min(1.0);
                constraints.max_floor_area_ratio += config.floor_area_ratio_step;
                let step = RelaxationStep::RaiseDensityCaps {
                    coverage: constraints.max_coverage_ratio,
                    floor_area_ratio: constraints.max_floor_area_ratio,
                };
                let (rules, weights, limit) = (synth.rules(), synth.weights(), synth.solution_limit());
                synth = Synthesizer::new(constraints)?
                    .with_rules(rules)
                    .with_weights(weights)
                    .with_solution_limit(limit);
                step
            }
        };
        warn!(step = %step, "Layout infeasible, relaxing");
        steps.push(step);
        solution = synth.solve(&problem)?;
    }

    info!(status = %solution.status, steps = steps.len(), "Relaxation finished");
    solution
        .warnings
        .extend(steps.iter().map(|s| format!("relaxed: {s}")));
    Ok(RelaxedOutcome {
        solution,
        steps,
        synthesizer: synth,
        problem,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::BuildingConstraints;
    use crate::problem::{LayoutRequest, RequiredPair, RoomRequest};
    use madori_core::{GridSpec, RoomType};

    #[test]
    fn density_step_rescues_tight_site() {
        // 6 × 5 grid, coverage cap 19 cells; the rooms need 22.
        let mut req = LayoutRequest::new(
            5.5,
            5.0,
            vec![
                RoomRequest::new(RoomType::Bedroom),
                RoomRequest::new(RoomType::Bedroom),
                RoomRequest::new(RoomType::Storage),
            ],
        );
        req.time_limit_seconds = 2.0;
        let problem = req.to_problem(&GridSpec::default()).unwrap();
        let synth = Synthesizer::new(BuildingConstraints::default())
            .unwrap()
            .with_solution_limit(Some(1));

        let plain = synth.solve(&problem).unwrap();
        assert_eq!(plain.status, SolveStatus::Infeasible);

        let outcome = synthesize_with_relaxation(&synth, &problem, &RelaxationConfig::default()).unwrap();
        assert!(outcome.solution.status.has_solution());
        assert_eq!(outcome.steps.len(), 2);
        assert_eq!(outcome.steps[0], RelaxationStep::DropAspectWeight);
        assert!(matches!(outcome.steps[1], RelaxationStep::RaiseDensityCaps { .. }));
        assert!(outcome.solution.warnings.iter().any(|w| w.starts_with("relaxed:")));
    }

    #[test]
    fn optional_pair_is_dropped_before_density() {
        // A 2 × 4 grid leaves no room for a door-wide shared wall.
        let mut req = LayoutRequest::new(
            2.0,
            4.0,
            vec![RoomRequest::new(RoomType::Bath), RoomRequest::new(RoomType::Storage)],
        );
        req.required_adjacent_pairs = vec![RequiredPair::Pair([RoomType::Bath, RoomType::Storage])];
        req.time_limit_seconds = 2.0;
        let problem = req.to_problem(&GridSpec::default()).unwrap();
        let synth = Synthesizer::new(BuildingConstraints {
            max_coverage_ratio: 1.0,
            min_door_width_m: 3.0,
            ..Default::default()
        })
        .unwrap()
        .with_weights(ObjectiveWeights { aspect: 0, ..Default::default() })
        .with_solution_limit(Some(1));

        let outcome = synthesize_with_relaxation(&synth, &problem, &RelaxationConfig::default()).unwrap();
        assert!(outcome.solution.status.has_solution());
        assert_eq!(outcome.steps, vec![RelaxationStep::DropOptionalAdjacency { dropped: 1 }]);
        assert!(outcome.problem.adjacency.is_empty());
    }
}
