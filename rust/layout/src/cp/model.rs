// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Constraint model: integer variables, literals, linear expressions and
//! constraints.

use std::ops::{Add, Mul, Neg, Not, Range, Sub};

use smallvec::SmallVec;

/// Handle to an integer variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub(crate) u32);

impl VarId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A boolean variable (domain `[0, 1]`) or its negation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Literal {
    var: VarId,
    negated: bool,
}

impl Literal {
    pub fn var(self) -> VarId {
        self.var
    }

    pub fn is_negated(self) -> bool {
        self.negated
    }

    /// Truth value under a complete assignment.
    pub fn eval(self, values: &[i64]) -> bool {
        (values[self.var.index()] != 0) != self.negated
    }
}

impl Not for Literal {
    type Output = Literal;

    fn not(self) -> Literal {
        Literal {
            var: self.var,
            negated: !self.negated,
        }
    }
}

/// Inclusive integer bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Domain {
    pub lb: i64,
    pub ub: i64,
}

impl Domain {
    pub const fn new(lb: i64, ub: i64) -> Self {
        Self { lb, ub }
    }

    #[inline]
    pub fn is_fixed(&self) -> bool {
        self.lb == self.ub
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lb > self.ub
    }
}

/// `Σ coef·var + constant`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    terms: Vec<(i64, VarId)>,
    constant: i64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constant(value: i64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    pub fn term(coef: i64, var: VarId) -> Self {
        Self {
            terms: vec![(coef, var)],
            constant: 0,
        }
    }

    pub fn sum<I: IntoIterator<Item = VarId>>(vars: I) -> Self {
        Self {
            terms: vars.into_iter().map(|v| (1, v)).collect(),
            constant: 0,
        }
    }

    pub fn add_term(&mut self, coef: i64, var: VarId) -> &mut Self {
        self.terms.push((coef, var));
        self
    }

    pub fn add_constant(&mut self, value: i64) -> &mut Self {
        self.constant += value;
        self
    }

    pub fn terms(&self) -> &[(i64, VarId)] {
        &self.terms
    }

    pub fn offset(&self) -> i64 {
        self.constant
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn eval(&self, values: &[i64]) -> i64 {
        self.terms
            .iter()
            .map(|&(c, v)| c * values[v.index()])
            .sum::<i64>()
            + self.constant
    }

    pub fn scaled(mut self, factor: i64) -> Self {
        for (c, _) in &mut self.terms {
            *c *= factor;
        }
        self.constant *= factor;
        self
    }

    /// Sorted by variable with duplicate terms merged and zeros dropped.
    fn normalized(mut self) -> Self {
        self.terms.sort_by_key(|&(_, v)| v);
        let mut merged: Vec<(i64, VarId)> = Vec::with_capacity(self.terms.len());
        for (c, v) in self.terms {
            match merged.last_mut() {
                Some((mc, mv)) if *mv == v => *mc += c,
                _ => merged.push((c, v)),
            }
        }
        merged.retain(|&(c, _)| c != 0);
        self.terms = merged;
        self
    }
}

impl From<VarId> for LinearExpr {
    fn from(v: VarId) -> Self {
        LinearExpr::term(1, v)
    }
}

impl From<i64> for LinearExpr {
    fn from(k: i64) -> Self {
        LinearExpr::constant(k)
    }
}

impl From<i32> for LinearExpr {
    fn from(k: i32) -> Self {
        LinearExpr::constant(i64::from(k))
    }
}

impl From<Literal> for LinearExpr {
    /// `var` for a positive literal, `1 - var` for a negated one.
    fn from(l: Literal) -> Self {
        if l.negated {
            let mut e = LinearExpr::term(-1, l.var);
            e.constant = 1;
            e
        } else {
            LinearExpr::term(1, l.var)
        }
    }
}

impl<T: Into<LinearExpr>> Add<T> for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: T) -> LinearExpr {
        let rhs = rhs.into();
        self.terms.extend(rhs.terms);
        self.constant += rhs.constant;
        self
    }
}

impl<T: Into<LinearExpr>> Sub<T> for LinearExpr {
    type Output = LinearExpr;

    fn sub(self, rhs: T) -> LinearExpr {
        let rhs: LinearExpr = rhs.into();
        self + (-rhs)
    }
}

impl Neg for LinearExpr {
    type Output = LinearExpr;

    fn neg(self) -> LinearExpr {
        self.scaled(-1)
    }
}

impl<T: Into<LinearExpr>> Add<T> for VarId {
    type Output = LinearExpr;

    fn add(self, rhs: T) -> LinearExpr {
        LinearExpr::from(self) + rhs
    }
}

impl<T: Into<LinearExpr>> Sub<T> for VarId {
    type Output = LinearExpr;

    fn sub(self, rhs: T) -> LinearExpr {
        LinearExpr::from(self) - rhs
    }
}

impl Mul<VarId> for i64 {
    type Output = LinearExpr;

    fn mul(self, rhs: VarId) -> LinearExpr {
        LinearExpr::term(self, rhs)
    }
}

impl Mul<VarId> for i32 {
    type Output = LinearExpr;

    fn mul(self, rhs: VarId) -> LinearExpr {
        LinearExpr::term(i64::from(self), rhs)
    }
}

/// `Σ coef·var ≤ rhs`, active only when every enforcement literal holds.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub terms: Vec<(i64, VarId)>,
    pub rhs: i64,
    pub enforcement: SmallVec<[Literal; 2]>,
}

impl LinearConstraint {
    fn is_satisfied(&self, values: &[i64]) -> bool {
        if !self.enforcement.iter().all(|l| l.eval(values)) {
            return true;
        }
        self.terms.iter().map(|&(c, v)| c * values[v.index()]).sum::<i64>() <= self.rhs
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Linear(LinearConstraint),
    /// At least one literal holds.
    Clause(Vec<Literal>),
    /// Exactly one literal holds.
    ExactlyOne(Vec<Literal>),
    /// `target = a × b` over non-negative domains.
    Product { target: VarId, a: VarId, b: VarId },
}

impl Constraint {
    /// Variables whose bound changes can wake this constraint.
    pub fn vars(&self) -> SmallVec<[VarId; 8]> {
        match self {
            Constraint::Linear(lin) => lin
                .terms
                .iter()
                .map(|&(_, v)| v)
                .chain(lin.enforcement.iter().map(|l| l.var()))
                .collect(),
            Constraint::Clause(lits) | Constraint::ExactlyOne(lits) => {
                lits.iter().map(|l| l.var()).collect()
            }
            Constraint::Product { target, a, b } => SmallVec::from_slice(&[*target, *a, *b]),
        }
    }

    pub fn is_satisfied(&self, values: &[i64]) -> bool {
        match self {
            Constraint::Linear(lin) => lin.is_satisfied(values),
            Constraint::Clause(lits) => lits.iter().any(|l| l.eval(values)),
            Constraint::ExactlyOne(lits) => lits.iter().filter(|l| l.eval(values)).count() == 1,
            Constraint::Product { target, a, b } => {
                values[target.index()] == values[a.index()] * values[b.index()]
            }
        }
    }
}

/// Value to try first when branching on a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueOrder {
    Min,
    Max,
}

/// Variables to branch on, in order, with their value order.
#[derive(Debug, Clone)]
pub struct DecisionStrategy {
    pub vars: Vec<VarId>,
    pub order: ValueOrder,
}

/// Handle on freshly added linear constraints, used to attach enforcement
/// literals.
pub struct ConstraintHandle<'m> {
    model: &'m mut CpModel,
    range: Range<usize>,
}

impl ConstraintHandle<'_> {
    /// Make the constraint conditional on all `literals` holding.
    pub fn only_enforce_if(self, literals: &[Literal]) {
        for idx in self.range {
            if let Constraint::Linear(lin) = &mut self.model.constraints[idx] {
                lin.enforcement.extend_from_slice(literals);
            }
        }
    }
}

/// A constraint-programming model over bounded integer variables.
#[derive(Debug, Clone, Default)]
pub struct CpModel {
    pub(crate) domains: Vec<Domain>,
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) objective: Option<LinearExpr>,
    pub(crate) strategies: Vec<DecisionStrategy>,
}

impl CpModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// New integer variable with inclusive bounds. An empty range is allowed
    /// and makes the model infeasible.
    pub fn new_int_var(&mut self, lb: i64, ub: i64) -> VarId {
        let id = VarId(self.domains.len() as u32);
        self.domains.push(Domain::new(lb, ub));
        id
    }

    pub fn new_constant(&mut self, value: i64) -> VarId {
        self.new_int_var(value, value)
    }

    pub fn new_bool_var(&mut self) -> Literal {
        Literal {
            var: self.new_int_var(0, 1),
            negated: false,
        }
    }

    pub fn num_vars(&self) -> usize {
        self.domains.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn domain(&self, var: VarId) -> Domain {
        self.domains[var.index()]
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// `lhs ≤ rhs`
    pub fn add_le(&mut self, lhs: impl Into<LinearExpr>, rhs: impl Into<LinearExpr>) -> ConstraintHandle<'_> {
        let start = self.constraints.len();
        let lhs: LinearExpr = lhs.into();
        self.push_le(lhs - rhs);
        self.handle(start)
    }

    /// `lhs ≥ rhs`
    pub fn add_ge(&mut self, lhs: impl Into<LinearExpr>, rhs: impl Into<LinearExpr>) -> ConstraintHandle<'_> {
        self.add_le(rhs, lhs)
    }

    /// `lhs = rhs`
    pub fn add_eq(&mut self, lhs: impl Into<LinearExpr>, rhs: impl Into<LinearExpr>) -> ConstraintHandle<'_> {
        let start = self.constraints.len();
        let lhs: LinearExpr = lhs.into();
        let diff = lhs - rhs;
        self.push_le(diff.clone());
        self.push_le(-diff);
        self.handle(start)
    }

    pub fn add_bool_or(&mut self, literals: &[Literal]) {
        self.constraints.push(Constraint::Clause(literals.to_vec()));
    }

    pub fn add_exactly_one(&mut self, literals: &[Literal]) {
        self.constraints.push(Constraint::ExactlyOne(literals.to_vec()));
    }

    /// `a ⇒ b`
    pub fn add_implication(&mut self, a: Literal, b: Literal) {
        self.add_bool_or(&[!a, b]);
    }

    /// `target = a × b`. All three variables are clamped to be non-negative.
    pub fn add_multiplication_equality(&mut self, target: VarId, a: VarId, b: VarId) {
        for v in [target, a, b] {
            let d = &mut self.domains[v.index()];
            d.lb = d.lb.max(0);
        }
        self.constraints.push(Constraint::Product { target, a, b });
    }

    pub fn maximize(&mut self, objective: impl Into<LinearExpr>) {
        self.objective = Some(objective.into().normalized());
    }

    pub fn objective(&self) -> Option<&LinearExpr> {
        self.objective.as_ref()
    }

    pub fn add_decision_strategy(&mut self, vars: Vec<VarId>, order: ValueOrder) {
        self.strategies.push(DecisionStrategy { vars, order });
    }

    /// True when a complete assignment satisfies every constraint and domain.
    pub fn check(&self, values: &[i64]) -> bool {
        values.len() == self.domains.len()
            && self
                .domains
                .iter()
                .zip(values)
                .all(|(d, v)| d.lb <= *v && *v <= d.ub)
            && self.constraints.iter().all(|c| c.is_satisfied(values))
    }

    fn push_le(&mut self, expr: LinearExpr) {
        let expr = expr.normalized();
        self.constraints.push(Constraint::Linear(LinearConstraint {
            rhs: -expr.constant,
            terms: expr.terms,
            enforcement: SmallVec::new(),
        }));
    }

    fn handle(&mut self, start: usize) -> ConstraintHandle<'_> {
        let end = self.constraints.len();
        ConstraintHandle {
            model: self,
            range: start..end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expressions_merge_terms() {
        let mut m = CpModel::new();
        let x = m.new_int_var(0, 10);
        let y = m.new_int_var(0, 10);
        m.add_le(x + y + x, 3 * y + 4);
        let Constraint::Linear(lin) = &m.constraints()[0] else {
            panic!("expected a linear constraint");
        };
        assert_eq!(lin.terms, vec![(2, x), (-2, y)]);
        assert_eq!(lin.rhs, 4);
    }

    #[test]
    fn negated_literal_expression() {
        let mut m = CpModel::new();
        let b = m.new_bool_var();
        let e = LinearExpr::from(!b);
        assert_eq!(e.eval(&[0]), 1);
        assert_eq!(e.eval(&[1]), 0);
        assert!((!b).eval(&[0]));
    }

    #[test]
    fn check_honours_enforcement() {
        let mut m = CpModel::new();
        let x = m.new_int_var(0, 10);
        let b = m.new_bool_var();
        m.add_le(x, 2).only_enforce_if(&[b]);
        assert!(m.check(&[5, 0]));
        assert!(!m.check(&[5, 1]));
        assert!(m.check(&[2, 1]));
    }
}
