// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Finite-domain constraint solver.
//!
//! Integer variables carry inclusive bounds. Constraints are linear
//! inequalities with optional enforcement literals, clauses, exactly-one
//! groups and non-negative products. Search is depth-first with bounds
//! propagation at each node and branch-and-bound on a maximized linear
//! objective, stopped by a wall-clock deadline.

mod model;
mod propagate;
mod search;

pub use model::{
    Constraint, ConstraintHandle, CpModel, DecisionStrategy, Domain, LinearConstraint, LinearExpr,
    Literal, ValueOrder, VarId,
};
pub use propagate::Conflict;
pub use search::{CpResult, CpSolution, CpSolver, CpStatus, SearchStats, SolverParams};
