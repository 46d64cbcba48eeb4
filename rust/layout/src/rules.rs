// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Building-code rule generators.
//!
//! Each [`Rule`] maps to an independent generator that adds constraints for
//! the rooms in a [`LayoutVars`] table. A [`RuleSet`] selects which
//! generators run, so callers can relax rules one at a time.

use std::fmt;

use madori_core::Side;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bindings::{ExposureVars, LayoutVars, RoomKey, RoomVars};
use crate::cp::{CpModel, LinearExpr, Literal, VarId};
use crate::limits::{GridLimits, PERMILLE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// (a) per-type area bounds and minimum side lengths
    MinimumArea,
    /// (b) pairwise non-overlap on each floor
    NonOverlap,
    /// (c) rooms inside the site
    Containment,
    /// (d) per-floor footprint ≤ site area × max coverage
    Coverage,
    /// (e) total floor area ≤ site area × max FAR
    FloorAreaRatio,
    /// (f) caller-required adjacent pairs
    Adjacency,
    /// (g) habitable rooms touch the site edge with enough window area
    Daylight,
    /// (h) stair width and run length
    StairFootprint,
    /// (i) stair replicas stacked exactly across floors
    StairCoincidence,
    /// (j) `near` pairs keep their centers within the near distance
    Near,
    /// (k) the primary living room sits in the southern half of the site
    LivingSouthHalf,
}

impl Rule {
    pub const ALL: [Rule; 11] = [
        Rule::MinimumArea,
        Rule::NonOverlap,
        Rule::Containment,
        Rule::Coverage,
        Rule::FloorAreaRatio,
        Rule::Adjacency,
        Rule::Daylight,
        Rule::StairFootprint,
        Rule::StairCoincidence,
        Rule::Near,
        Rule::LivingSouthHalf,
    ];

    fn bit(self) -> u16 {
        1 << (self as u16)
    }

    pub fn name(self) -> &'static str {
        match self {
            Rule::MinimumArea => "minimum_area",
            Rule::NonOverlap => "non_overlap",
            Rule::Containment => "containment",
            Rule::Coverage => "coverage",
            Rule::FloorAreaRatio => "floor_area_ratio",
            Rule::Adjacency => "adjacency",
            Rule::Daylight => "daylight",
            Rule::StairFootprint => "stair_footprint",
            Rule::StairCoincidence => "stair_coincidence",
            Rule::Near => "near",
            Rule::LivingSouthHalf => "living_south_half",
        }
    }

    pub fn generator(self) -> RuleGenerator {
        match self {
            Rule::MinimumArea => minimum_area,
            Rule::NonOverlap => non_overlap,
            Rule::Containment => containment,
            Rule::Coverage => coverage,
            Rule::FloorAreaRatio => floor_area_ratio,
            Rule::Adjacency => adjacency,
            Rule::Daylight => daylight,
            Rule::StairFootprint => stair_footprint,
            Rule::StairCoincidence => stair_coincidence,
            Rule::Near => near,
            Rule::LivingSouthHalf => living_south_half,
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of active rules. Serialized as a list of rule names.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Rule>", into = "Vec<Rule>")]
pub struct RuleSet(u16);

impl RuleSet {
    pub fn all() -> Self {
        Rule::ALL.into_iter().collect()
    }

    pub fn none() -> Self {
        RuleSet(0)
    }

    pub fn contains(&self, rule: Rule) -> bool {
        self.0 & rule.bit() != 0
    }

    pub fn with(mut self, rule: Rule) -> Self {
        self.0 |= rule.bit();
        self
    }

    pub fn without(mut self, rule: Rule) -> Self {
        self.0 &= !rule.bit();
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = Rule> + '_ {
        Rule::ALL.into_iter().filter(|r| self.contains(*r))
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::all()
    }
}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        iter.into_iter().fold(RuleSet::none(), RuleSet::with)
    }
}

impl From<Vec<Rule>> for RuleSet {
    fn from(rules: Vec<Rule>) -> Self {
        rules.into_iter().collect()
    }
}

impl From<RuleSet> for Vec<Rule> {
    fn from(set: RuleSet) -> Self {
        set.iter().collect()
    }
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Read-only inputs shared by all generators.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub limits: &'a GridLimits,
    pub floor_count: u32,
    /// Pairs that must share a wall wide enough for a door.
    pub adjacency: &'a [(RoomKey, RoomKey)],
    /// Pairs whose centers must stay close.
    pub near: &'a [(RoomKey, RoomKey)],
    /// The living room the south rules apply to.
    pub primary: Option<RoomKey>,
    /// Instances of one physical stair, ground floor first.
    pub stair_groups: &'a [Vec<RoomKey>],
}

pub type RuleGenerator = fn(&mut CpModel, &mut LayoutVars, &RuleContext<'_>);

/// Run the generators of every active rule.
pub fn apply_rules(rules: RuleSet, model: &mut CpModel, vars: &mut LayoutVars, ctx: &RuleContext<'_>) {
    for rule in rules.iter() {
        let before = model.num_constraints();
        (rule.generator())(model, vars, ctx);
        debug!(rule = %rule, added = model.num_constraints() - before, "Rule applied");
    }
}

/// Lower bounds on area and side lengths, upper bound on area.
pub fn minimum_area(model: &mut CpModel, vars: &mut LayoutVars, _ctx: &RuleContext<'_>) {
    for (_, room) in vars.iter() {
        let v = room.vars;
        model.add_ge(v.area, room.plan.min_cells);
        if let Some(max) = room.plan.max_cells {
            model.add_le(v.area, max);
        }
        model.add_ge(v.w, room.plan.min_side);
        model.add_ge(v.h, room.plan.min_side);
    }
}

/// Exactly one of left/right/below/above holds for each same-floor pair.
pub fn non_overlap(model: &mut CpModel, vars: &mut LayoutVars, _ctx: &RuleContext<'_>) {
    for (ka, kb) in vars.same_floor_pairs() {
        let (a, b) = (vars[ka].vars, vars[kb].vars);
        let separations = [
            (a.x + a.w, b.x),
            (b.x + b.w, a.x),
            (a.y + a.h, b.y),
            (b.y + b.h, a.y),
        ];
        let indicators: Vec<Literal> = separations
            .into_iter()
            .map(|(end, start)| {
                let lit = model.new_bool_var();
                model.add_le(end, start).only_enforce_if(&[lit]);
                lit
            })
            .collect();
        model.add_exactly_one(&indicators);
    }
}

pub fn containment(model: &mut CpModel, vars: &mut LayoutVars, ctx: &RuleContext<'_>) {
    for (_, room) in vars.iter() {
        let v = room.vars;
        model.add_le(v.x + v.w, ctx.limits.width);
        model.add_le(v.y + v.h, ctx.limits.height);
    }
}

pub fn coverage(model: &mut CpModel, vars: &mut LayoutVars, ctx: &RuleContext<'_>) {
    for floor in 0..ctx.floor_count {
        let areas: Vec<VarId> = vars
            .iter()
            .filter(|(_, r)| r.plan.floor() == floor)
            .map(|(_, r)| r.vars.area)
            .collect();
        if !areas.is_empty() {
            model.add_le(LinearExpr::sum(areas), ctx.limits.coverage_cap_cells);
        }
    }
}

pub fn floor_area_ratio(model: &mut CpModel, vars: &mut LayoutVars, ctx: &RuleContext<'_>) {
    let areas: Vec<VarId> = vars.iter().map(|(_, r)| r.vars.area).collect();
    if !areas.is_empty() {
        model.add_le(LinearExpr::sum(areas), ctx.limits.far_cap_cells);
    }
}

/// `[start, start + len)` spans of two rooms overlap by at least `min`.
fn span_overlap(
    model: &mut CpModel,
    (p0, l0): (VarId, VarId),
    (p1, l1): (VarId, VarId),
    min: i64,
    guard: Literal,
) {
    model.add_ge(p0 + l0 - p1, min).only_enforce_if(&[guard]);
    model.add_ge(p1 + l1 - p0, min).only_enforce_if(&[guard]);
    model.add_ge(l0, min).only_enforce_if(&[guard]);
    model.add_ge(l1, min).only_enforce_if(&[guard]);
}

/// One of four touching-side conditions, each with a door-wide overlap.
pub fn adjacency(model: &mut CpModel, vars: &mut LayoutVars, ctx: &RuleContext<'_>) {
    let door = ctx.limits.door_modules;
    for &(ka, kb) in ctx.adjacency {
        if vars[ka].plan.floor() != vars[kb].plan.floor() {
            continue;
        }
        let (a, b) = (vars[ka].vars, vars[kb].vars);
        let mut sides = Vec::with_capacity(4);

        // b beside a, along x
        for (left, right) in [(a, b), (b, a)] {
            let t = model.new_bool_var();
            model.add_eq(left.x + left.w, right.x).only_enforce_if(&[t]);
            span_overlap(model, (a.y, a.h), (b.y, b.h), door, t);
            sides.push(t);
        }
        // b above or below a
        for (lower, upper) in [(a, b), (b, a)] {
            let t = model.new_bool_var();
            model.add_eq(lower.y + lower.h, upper.y).only_enforce_if(&[t]);
            span_overlap(model, (a.x, a.w), (b.x, b.w), door, t);
            sides.push(t);
        }
        model.add_bool_or(&sides);
    }
}

/// Touch literal and window area for one side of a room.
fn exposure_side(model: &mut CpModel, v: &RoomVars, side: Side, limits: &GridLimits) -> (Literal, VarId) {
    let t = model.new_bool_var();
    let (w, h) = (limits.width, limits.height);
    match side {
        Side::MinY => {
            model.add_le(v.y, 0).only_enforce_if(&[t]);
            model.add_ge(v.y, 1).only_enforce_if(&[!t]);
        }
        Side::MaxY => {
            model.add_ge(v.y + v.h, h).only_enforce_if(&[t]);
            model.add_le(v.y + v.h, h - 1).only_enforce_if(&[!t]);
        }
        Side::MinX => {
            model.add_le(v.x, 0).only_enforce_if(&[t]);
            model.add_ge(v.x, 1).only_enforce_if(&[!t]);
        }
        Side::MaxX => {
            model.add_ge(v.x + v.w, w).only_enforce_if(&[t]);
            model.add_le(v.x + v.w, w - 1).only_enforce_if(&[!t]);
        }
    }

    let (len, max_len) = match side {
        Side::MinY | Side::MaxY => (v.w, w),
        Side::MinX | Side::MaxX => (v.h, h),
    };
    let coef = limits.window_coef[side.index()];
    let window = model.new_int_var(0, coef * max_len);
    model.add_eq(window, coef * len).only_enforce_if(&[t]);
    model.add_le(window, (coef * max_len) * t.var());
    (t, window)
}

/// Habitable rooms touch at least one site edge and carry window area of at
/// least floor area ÷ divisor.
pub fn daylight(model: &mut CpModel, vars: &mut LayoutVars, ctx: &RuleContext<'_>) {
    let habitable: Vec<RoomKey> = vars
        .iter()
        .filter(|(_, r)| r.plan.room_type().is_habitable())
        .map(|(k, _)| k)
        .collect();
    for key in habitable {
        let v = vars[key].vars;
        // Side::ALL is in index order.
        let sides = Side::ALL.map(|side| exposure_side(model, &v, side, ctx.limits));
        let touches = sides.map(|(t, _)| t);
        let windows = sides.map(|(_, w)| w);
        model.add_bool_or(&touches);

        let mut window_sum = LinearExpr::new();
        for window in windows {
            window_sum.add_term(ctx.limits.daylight_divisor, window);
        }
        model.add_ge(window_sum, PERMILLE * v.area);
        vars.set_exposure(key, ExposureVars { touches, windows });
    }
}

/// Stair width across the run and run length along it, in either orientation.
pub fn stair_footprint(model: &mut CpModel, vars: &mut LayoutVars, ctx: &RuleContext<'_>) {
    let (width, depth) = (ctx.limits.stair_width_modules, ctx.limits.stair_depth_modules);
    let stairs: Vec<RoomKey> = vars
        .iter()
        .filter(|(_, r)| r.plan.room_type() == madori_core::RoomType::Stair)
        .map(|(k, _)| k)
        .collect();
    for key in stairs {
        let v = vars[key].vars;
        let run_y = model.new_bool_var();
        model.add_ge(v.w, width).only_enforce_if(&[run_y]);
        model.add_ge(v.h, depth).only_enforce_if(&[run_y]);
        model.add_ge(v.w, depth).only_enforce_if(&[!run_y]);
        model.add_ge(v.h, width).only_enforce_if(&[!run_y]);
        vars.set_stair_run(key, run_y);
    }
}

/// Manhattan distance between room centers, compared in doubled
/// coordinates so odd widths stay integral.
pub fn near(model: &mut CpModel, vars: &mut LayoutVars, ctx: &RuleContext<'_>) {
    let (w, h) = (ctx.limits.width, ctx.limits.height);
    for &(ka, kb) in ctx.near {
        if vars[ka].plan.floor() != vars[kb].plan.floor() {
            continue;
        }
        let (a, b) = (vars[ka].vars, vars[kb].vars);
        let dx = model.new_int_var(0, 2 * w);
        let dy = model.new_int_var(0, 2 * h);
        let ax = LinearExpr::term(2, a.x) + a.w;
        let bx = LinearExpr::term(2, b.x) + b.w;
        let ay = LinearExpr::term(2, a.y) + a.h;
        let by = LinearExpr::term(2, b.y) + b.h;
        model.add_ge(dx, ax.clone() - bx.clone());
        model.add_ge(dx, bx - ax);
        model.add_ge(dy, ay.clone() - by.clone());
        model.add_ge(dy, by - ay);
        model.add_le(dx + dy, ctx.limits.near_doubled_modules);
    }
}

/// Distance from the south edge at most half the site depth, rounded down.
pub fn living_south_half(model: &mut CpModel, vars: &mut LayoutVars, ctx: &RuleContext<'_>) {
    let Some(key) = ctx.primary else {
        return;
    };
    let v = vars[key].vars;
    let (w, h) = (ctx.limits.width, ctx.limits.height);
    match ctx.limits.south {
        Side::MinY => model.add_le(v.y, h / 2),
        Side::MaxY => model.add_ge(v.y + v.h, h - h / 2),
        Side::MinX => model.add_le(v.x, w / 2),
        Side::MaxX => model.add_ge(v.x + v.w, w - w / 2),
    };
}

pub fn stair_coincidence(model: &mut CpModel, vars: &mut LayoutVars, ctx: &RuleContext<'_>) {
    for group in ctx.stair_groups {
        let Some((&first, rest)) = group.split_first() else {
            continue;
        };
        let base = vars[first].vars;
        for &key in rest {
            let v = vars[key].vars;
            model.add_eq(v.x, base.x);
            model.add_eq(v.y, base.y);
            model.add_eq(v.w, base.w);
            model.add_eq(v.h, base.h);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_set_round_trips_as_names() {
        let set = RuleSet::all().without(Rule::Daylight).without(Rule::Adjacency);
        assert_eq!(set.len(), 9);
        assert!(!set.contains(Rule::Daylight));
        let json = serde_json::to_string(&set).unwrap();
        assert!(json.starts_with("[\"minimum_area\",\"non_overlap\""));
        let back: RuleSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
        let parsed: RuleSet = serde_json::from_str(r#"["coverage"]"#).unwrap();
        assert_eq!(parsed.iter().collect::<Vec<_>>(), vec![Rule::Coverage]);
    }

    #[test]
    fn names_match_serde() {
        for rule in Rule::ALL {
            assert_eq!(serde_json::to_string(&rule).unwrap(), format!("\"{}\"", rule.name()));
        }
    }

    #[test]
    fn default_is_every_rule() {
        assert_eq!(RuleSet::default().len(), Rule::ALL.len());
        assert!(RuleSet::none().is_empty());
    }
}
