// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounds propagation to a fixpoint over watch lists.

use std::collections::VecDeque;

use super::model::{Constraint, Domain, LinearConstraint, Literal, VarId};

/// Some domain became empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conflict;

type Step = Result<(), Conflict>;

#[inline]
pub(crate) fn div_floor(a: i64, b: i64) -> i64 {
    let q = a / b;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

#[inline]
pub(crate) fn div_ceil(a: i64, b: i64) -> i64 {
    let q = a / b;
    if a % b != 0 && ((a < 0) == (b < 0)) {
        q + 1
    } else {
        q
    }
}

/// Domain store that records which variables changed.
struct Store<'d> {
    domains: &'d mut [Domain],
    changed: Vec<VarId>,
}

impl Store<'_> {
    #[inline]
    fn get(&self, v: VarId) -> Domain {
        self.domains[v.index()]
    }

    fn set_lb(&mut self, v: VarId, lb: i64) -> Step {
        let d = &mut self.domains[v.index()];
        if lb > d.lb {
            if lb > d.ub {
                return Err(Conflict);
            }
            d.lb = lb;
            self.changed.push(v);
        }
        Ok(())
    }

    fn set_ub(&mut self, v: VarId, ub: i64) -> Step {
        let d = &mut self.domains[v.index()];
        if ub < d.ub {
            if ub < d.lb {
                return Err(Conflict);
            }
            d.ub = ub;
            self.changed.push(v);
        }
        Ok(())
    }

    fn value(&self, lit: Literal) -> Option<bool> {
        let d = self.get(lit.var());
        let truth = if d.lb >= 1 {
            Some(true)
        } else if d.ub <= 0 {
            Some(false)
        } else {
            None
        };
        truth.map(|t| t != lit.is_negated())
    }

    fn make_true(&mut self, lit: Literal) -> Step {
        if lit.is_negated() {
            self.set_ub(lit.var(), 0)
        } else {
            self.set_lb(lit.var(), 1)
        }
    }

    fn make_false(&mut self, lit: Literal) -> Step {
        self.make_true(!lit)
    }
}

/// Wakes constraints when the variables they watch change bounds.
#[derive(Debug, Clone)]
pub(crate) struct Propagator {
    watchers: Vec<Vec<u32>>,
    queue: VecDeque<u32>,
    queued: Vec<bool>,
}

impl Propagator {
    pub fn new(num_vars: usize, constraints: &[Constraint]) -> Self {
        let mut prop = Self {
            watchers: vec![Vec::new(); num_vars],
            queue: VecDeque::new(),
            queued: Vec::with_capacity(constraints.len()),
        };
        for (idx, c) in constraints.iter().enumerate() {
            prop.watch(idx, c);
        }
        prop
    }

    /// Register a constraint appended after construction.
    pub fn watch(&mut self, idx: usize, constraint: &Constraint) {
        if self.queued.len() <= idx {
            self.queued.resize(idx + 1, false);
        }
        let mut vars = constraint.vars();
        vars.sort_unstable();
        vars.dedup();
        for v in vars {
            self.watchers[v.index()].push(idx as u32);
        }
    }

    /// Propagate every constraint.
    pub fn run_all(&mut self, constraints: &[Constraint], domains: &mut [Domain]) -> Step {
        for idx in 0..constraints.len() {
            self.enqueue(idx as u32);
        }
        self.drain(constraints, domains)
    }

    /// Propagate after `var` changed, plus any extra constraints.
    pub fn run_from(
        &mut self,
        constraints: &[Constraint],
        domains: &mut [Domain],
        var: VarId,
        extra: Option<usize>,
    ) -> Step {
        self.wake(var);
        if let Some(idx) = extra {
            self.enqueue(idx as u32);
        }
        self.drain(constraints, domains)
    }

    fn enqueue(&mut self, idx: u32) {
        let slot = &mut self.queued[idx as usize];
        if !*slot {
            *slot = true;
            self.queue.push_back(idx);
        }
    }

    fn wake(&mut self, var: VarId) {
        for i in 0..self.watchers[var.index()].len() {
            let idx = self.watchers[var.index()][i];
            self.enqueue(idx);
        }
    }

    fn drain(&mut self, constraints: &[Constraint], domains: &mut [Domain]) -> Step {
        let mut store = Store {
            domains,
            changed: Vec::new(),
        };
        while let Some(idx) = self.queue.pop_front() {
            self.queued[idx as usize] = false;
            if let Err(conflict) = propagate(&constraints[idx as usize], &mut store) {
                self.clear();
                return Err(conflict);
            }
            for v in std::mem::take(&mut store.changed) {
                self.wake(v);
            }
        }
        Ok(())
    }

    fn clear(&mut self) {
        while let Some(idx) = self.queue.pop_front() {
            self.queued[idx as usize] = false;
        }
    }
}

fn propagate(constraint: &Constraint, store: &mut Store<'_>) -> Step {
    match constraint {
        Constraint::Linear(lin) => propagate_linear(lin, store),
        Constraint::Clause(lits) => propagate_clause(lits, store),
        Constraint::ExactlyOne(lits) => propagate_exactly_one(lits, store),
        Constraint::Product { target, a, b } => propagate_product(*target, *a, *b, store),
    }
}

fn min_term(coef: i64, d: Domain) -> i64 {
    if coef > 0 {
        coef * d.lb
    } else {
        coef * d.ub
    }
}

fn propagate_linear(lin: &LinearConstraint, store: &mut Store<'_>) -> Step {
    let mut pending = None;
    let mut unknown = 0usize;
    for &lit in &lin.enforcement {
        match store.value(lit) {
            Some(false) => return Ok(()),
            Some(true) => {}
            None => {
                unknown += 1;
                pending = Some(lit);
            }
        }
    }

    let min_activity: i64 = lin
        .terms
        .iter()
        .map(|&(c, v)| min_term(c, store.get(v)))
        .sum();

    if unknown > 0 {
        // Violated body with a single open condition: the condition is false.
        if unknown == 1 && min_activity > lin.rhs {
            if let Some(lit) = pending {
                return store.make_false(lit);
            }
        }
        return Ok(());
    }

    if min_activity > lin.rhs {
        return Err(Conflict);
    }
    for &(c, v) in &lin.terms {
        let d = store.get(v);
        let slack = lin.rhs - (min_activity - min_term(c, d));
        if c > 0 {
            store.set_ub(v, div_floor(slack, c))?;
        } else {
            store.set_lb(v, div_ceil(slack, c))?;
        }
    }
    Ok(())
}

fn propagate_clause(lits: &[Literal], store: &mut Store<'_>) -> Step {
    let mut open = None;
    let mut open_count = 0;
    for &lit in lits {
        match store.value(lit) {
            Some(true) => return Ok(()),
            Some(false) => {}
            None => {
                open_count += 1;
                open = Some(lit);
            }
        }
    }
    match (open_count, open) {
        (0, _) => Err(Conflict),
        (1, Some(lit)) => store.make_true(lit),
        _ => Ok(()),
    }
}

fn propagate_exactly_one(lits: &[Literal], store: &mut Store<'_>) -> Step {
    let mut trues = 0;
    let mut open = None;
    let mut open_count = 0;
    for &lit in lits {
        match store.value(lit) {
            Some(true) => trues += 1,
            Some(false) => {}
            None => {
                open_count += 1;
                open = Some(lit);
            }
        }
    }
    if trues > 1 {
        return Err(Conflict);
    }
    if trues == 1 {
        for &lit in lits {
            if store.value(lit).is_none() {
                store.make_false(lit)?;
            }
        }
        return Ok(());
    }
    match (open_count, open) {
        (0, _) => Err(Conflict),
        (1, Some(lit)) => store.make_true(lit),
        _ => Ok(()),
    }
}

fn propagate_product(target: VarId, a: VarId, b: VarId, store: &mut Store<'_>) -> Step {
    let (da, db) = (store.get(a), store.get(b));
    store.set_lb(target, da.lb * db.lb)?;
    store.set_ub(target, da.ub * db.ub)?;

    let dt = store.get(target);
    for (x, y) in [(a, b), (b, a)] {
        let dy = store.get(y);
        if dy.ub > 0 {
            store.set_lb(x, div_ceil(dt.lb, dy.ub))?;
        }
        if dy.lb > 0 {
            store.set_ub(x, div_floor(dt.ub, dy.lb))?;
        }
    }
    Ok(())
}
