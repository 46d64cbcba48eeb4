// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Variable-binding table.
//!
//! Room requirements ([`RoomPlan`]) stay immutable; the decision-variable
//! handles that the model creates for them live here, in a slot map keyed by
//! [`RoomKey`] with a secondary index by [`RoomId`]. Rule generators only ever
//! read and extend this table.

use std::ops::Index;

use madori_core::{RoomId, Side};
use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};

use crate::cp::{CpModel, Literal, VarId};
use crate::limits::{GridLimits, RoomPlan};

new_key_type! {
    /// Key for one room instance in the binding table.
    pub struct RoomKey;
}

/// Placement variables of one room, in grid units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomVars {
    pub x: VarId,
    pub y: VarId,
    pub w: VarId,
    pub h: VarId,
    /// `w × h`
    pub area: VarId,
}

/// Daylight variables of a habitable room, indexed by [`Side::index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExposureVars {
    pub touches: [Literal; 4],
    /// Window area per side in per-mille cells.
    pub windows: [VarId; 4],
}

impl ExposureVars {
    pub fn touch(&self, side: Side) -> Literal {
        self.touches[side.index()]
    }
}

#[derive(Debug, Clone)]
pub struct RoomBinding {
    pub plan: RoomPlan,
    pub vars: RoomVars,
    pub exposure: Option<ExposureVars>,
    /// Set for stairs: true when the run lies along the y axis.
    pub stair_run_y: Option<Literal>,
}

impl RoomBinding {
    pub fn id(&self) -> RoomId {
        self.plan.spec.id
    }
}

#[derive(Debug, Default)]
pub struct LayoutVars {
    rooms: SlotMap<RoomKey, RoomBinding>,
    by_id: FxHashMap<RoomId, RoomKey>,
    order: Vec<RoomKey>,
}

impl LayoutVars {
    /// Create placement variables for every plan, plus the `area = w × h`
    /// products that every rule relies on.
    pub fn bind(model: &mut CpModel, plans: Vec<RoomPlan>, limits: &GridLimits) -> Self {
        let mut table = Self::default();
        for plan in plans {
            let vars = RoomVars {
                x: model.new_int_var(0, limits.width - 1),
                y: model.new_int_var(0, limits.height - 1),
                w: model.new_int_var(1, limits.width),
                h: model.new_int_var(1, limits.height),
                area: model.new_int_var(1, limits.width * limits.height),
            };
            model.add_multiplication_equality(vars.area, vars.w, vars.h);
            table.insert(RoomBinding {
                plan,
                vars,
                exposure: None,
                stair_run_y: None,
            });
        }
        table
    }

    pub fn insert(&mut self, binding: RoomBinding) -> RoomKey {
        let id = binding.id();
        let key = self.rooms.insert(binding);
        self.by_id.insert(id, key);
        self.order.push(key);
        key
    }

    pub fn get(&self, key: RoomKey) -> Option<&RoomBinding> {
        self.rooms.get(key)
    }

    pub fn key_of(&self, id: RoomId) -> Option<RoomKey> {
        self.by_id.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = RoomKey> + '_ {
        self.order.iter().copied()
    }

    /// Bindings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (RoomKey, &RoomBinding)> + '_ {
        self.order.iter().map(move |&k| (k, &self.rooms[k]))
    }

    /// Every unordered pair of rooms sharing a floor.
    pub fn same_floor_pairs(&self) -> Vec<(RoomKey, RoomKey)> {
        let mut pairs = Vec::new();
        for (i, &a) in self.order.iter().enumerate() {
            for &b in &self.order[i + 1..] {
                if self.rooms[a].plan.floor() == self.rooms[b].plan.floor() {
                    pairs.push((a, b));
                }
            }
        }
        pairs
    }

    pub fn set_exposure(&mut self, key: RoomKey, exposure: ExposureVars) {
        if let Some(binding) = self.rooms.get_mut(key) {
            binding.exposure = Some(exposure);
        }
    }

    pub fn set_stair_run(&mut self, key: RoomKey, run_y: Literal) {
        if let Some(binding) = self.rooms.get_mut(key) {
            binding.stair_run_y = Some(run_y);
        }
    }
}

impl Index<RoomKey> for LayoutVars {
    type Output = RoomBinding;

    fn index(&self, key: RoomKey) -> &RoomBinding {
        &self.rooms[key]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::BuildingConstraints;
    use crate::limits::GridSite;
    use madori_core::{GridSpec, RoomSpec, RoomType};
    use madori_geometry::Rect;

    #[test]
    fn binds_rooms_in_order() {
        let grid = GridSpec::default();
        let bounds = Rect::new(0.0, 0.0, 9.1, 9.1).unwrap();
        let site = GridSite::from_bounds(&bounds, 82.81, 0.0, &grid);
        let limits = GridLimits::new(&site, 2, &BuildingConstraints::default(), &grid).unwrap();
        let plans = vec![
            RoomPlan::new(RoomSpec::with_defaults(RoomId(1), RoomType::Bath, 0), &limits, &grid),
            RoomPlan::new(RoomSpec::with_defaults(RoomId(2), RoomType::Toilet, 0), &limits, &grid),
            RoomPlan::new(RoomSpec::with_defaults(RoomId(3), RoomType::Bedroom, 1), &limits, &grid),
        ];
        let mut model = CpModel::new();
        let vars = LayoutVars::bind(&mut model, plans, &limits);

        assert_eq!(vars.len(), 3);
        assert_eq!(model.num_vars(), 15);
        let ids: Vec<u32> = vars.iter().map(|(_, b)| b.id().0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(vars.same_floor_pairs().len(), 1);

        let key = vars.key_of(RoomId(2)).unwrap();
        assert_eq!(vars[key].plan.room_type(), RoomType::Toilet);
        assert_eq!(model.domain(vars[key].vars.w).ub, 10);
    }
}
