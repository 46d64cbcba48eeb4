// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Madori Layout
//!
//! Building-code rules and constraint-based floor-plan synthesis on a module
//! grid.
//!
//! ## Overview
//!
//! A [`LayoutRequest`] (or a detector document through
//! [`plan_from_detections`]) becomes a [`LayoutProblem`] of room instances in
//! grid modules. The [`Synthesizer`] turns the problem into a finite-domain
//! model, one generator per [`Rule`], and searches it with the in-crate
//! [`cp`] solver under a wall-clock limit. Solutions are independently
//! re-checked by [`audit_layout`] and written out as a [`LayoutDocument`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use madori_layout::{plan_from_requirements, LayoutRequest, PlannerConfig};
//!
//! let request = LayoutRequest::from_json(&json)?;
//! let document = plan_from_requirements(&request, &PlannerConfig::default())?;
//! println!("{} {}", document.status, document.to_json_pretty()?);
//! ```
//!
//! Infeasible requests can be retried with progressively weaker soft rules via
//! [`synthesize_with_relaxation`].

pub mod audit;
pub mod bindings;
pub mod constraints;
pub mod cp;
pub mod error;
pub mod limits;
pub mod pipeline;
pub mod problem;
pub mod relax;
pub mod rules;
pub mod serialize;
pub mod synth;

pub use audit::{audit_document, audit_layout, AuditInput, Severity, Violation, AUDIT_EPS};
pub use constraints::{BuildingConstraints, OrientationFactors};
pub use error::{LayoutError, Result};
pub use limits::{GridLimits, GridSite, RoomPlan};
pub use pipeline::{plan_from_detections, plan_from_requirements, PlannerConfig};
pub use problem::{
    time_limit_from_secs, AdjacencyRequirement, LayoutProblem, LayoutRequest, PairKind, RequiredPair, RoomRequest,
    DEFAULT_TIME_LIMIT_SECS,
};
pub use relax::{synthesize_with_relaxation, RelaxationConfig, RelaxationStep, RelaxedOutcome};
pub use rules::{Rule, RuleSet};
pub use serialize::{
    build_document, DocumentContext, DocumentEdge, DocumentGraph, DocumentMetadata, DocumentRoom, LayoutDocument,
    LayoutMetrics, Source,
};
pub use synth::{LayoutSolution, ObjectiveWeights, PlacedRoom, SolveStatus, Synthesizer};
