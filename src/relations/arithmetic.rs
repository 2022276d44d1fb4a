//! Arithmetic relations (spec §4.8): `pluso`, `minuso`, `timeso` bidirectional
//! where decidable; `divo`, `expo`, `logo` delegate to the hybrid FD solver
//! via attributed variables.
//!
//! Grounded on the teacher's `relation/{plusz,timesz,plusfd,minusfd,
//! timesfd}.rs` pairwise `u op v = w` constraint shape, generalized into a
//! single [`ArithOp`]-parameterized relation: when at least two of the
//! three operands are already ground at the goal's call site, the third is
//! derived immediately via `eq` (the teacher's `PlusZConstraint` does the
//! same `u + v = w` direct solve); otherwise the relation is posted as a
//! [`store::Constraint`] that stays `Pending` until enough of `u`/`v`/`w`
//! become ground through later bindings (spec §4.3's re-check pipeline) —
//! the "attributed variables" spec §4.8 refers to for the undecidable case.
use std::rc::Rc;

use crate::goal::primitives::eq;
use crate::goal::Goal;
use crate::store::{self, CheckResult, Constraint};
use crate::stream::Stream;
use crate::substitution::Subst;
use crate::term::{Term, VarId};

/// Which arithmetic identity an [`ArithmeticRelation`] enforces.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ArithOp {
    Plus,
    Minus,
    Times,
    Div,
    Pow,
    Log,
}

impl ArithOp {
    fn symbol(self) -> &'static str {
        match self {
            ArithOp::Plus => "+",
            ArithOp::Minus => "-",
            ArithOp::Times => "*",
            ArithOp::Div => "/",
            ArithOp::Pow => "^",
            ArithOp::Log => "log",
        }
    }

    /// Forward direction: `w = u op v`.
    fn apply(self, u: i64, v: i64) -> Option<i64> {
        match self {
            ArithOp::Plus => u.checked_add(v),
            ArithOp::Minus => u.checked_sub(v),
            ArithOp::Times => u.checked_mul(v),
            ArithOp::Div => {
                if v == 0 || u % v != 0 {
                    None
                } else {
                    Some(u / v)
                }
            }
            ArithOp::Pow => {
                if !(0..=u32::MAX as i64).contains(&v) {
                    None
                } else {
                    u.checked_pow(v as u32)
                }
            }
            ArithOp::Log => {
                if u <= 1 || v <= 0 {
                    None
                } else {
                    let mut n = v;
                    let mut count = 0i64;
                    while n > 1 {
                        if n % u != 0 {
                            return None;
                        }
                        n /= u;
                        count += 1;
                    }
                    Some(count)
                }
            }
        }
    }

    /// Solve for `v` given `u` and `w` (`u op v = w`).
    fn invert_rhs(self, u: i64, w: i64) -> Option<i64> {
        match self {
            ArithOp::Plus => w.checked_sub(u),
            ArithOp::Minus => u.checked_sub(w),
            ArithOp::Times => {
                if u == 0 || w % u != 0 {
                    None
                } else {
                    Some(w / u)
                }
            }
            ArithOp::Div => {
                if w == 0 || u % w != 0 {
                    None
                } else {
                    Some(u / w)
                }
            }
            ArithOp::Pow => None,
            ArithOp::Log => {
                if !(0..=62).contains(&w) {
                    None
                } else {
                    u.checked_pow(w as u32)
                }
            }
        }
    }

    /// Solve for `u` given `v` and `w` (`u op v = w`).
    fn invert_lhs(self, v: i64, w: i64) -> Option<i64> {
        match self {
            ArithOp::Plus => w.checked_sub(v),
            ArithOp::Minus => w.checked_add(v),
            ArithOp::Times => {
                if v == 0 || w % v != 0 {
                    None
                } else {
                    Some(w / v)
                }
            }
            ArithOp::Div => w.checked_mul(v),
            ArithOp::Pow => {
                if v <= 0 {
                    None
                } else {
                    integer_root(w, v)
                }
            }
            ArithOp::Log => None,
        }
    }
}

/// Largest `n >= 0` with `n.pow(exp) <= target`, used to invert `Pow` when
/// the base is unknown but the exponent and result are ground.
fn integer_root(target: i64, exp: i64) -> Option<i64> {
    if target < 0 || exp <= 0 {
        return None;
    }
    let mut lo: i64 = 0;
    let mut hi: i64 = target.max(1);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        match mid.checked_pow(exp as u32) {
            Some(v) if v < target => lo = mid + 1,
            _ => hi = mid,
        }
    }
    if lo.checked_pow(exp as u32) == Some(target) {
        Some(lo)
    } else {
        None
    }
}

/// A pending `u op v = w` relation, posted into the store once the goal
/// can't derive the missing operand directly (spec §4.3's `Pending`
/// outcome; spec §4.8's "delegates to the FD solver via attributed
/// variables" for the fully-undecidable case).
#[derive(Debug, Clone)]
pub struct ArithmeticRelation {
    id: u64,
    op: ArithOp,
    u: Term,
    v: Term,
    w: Term,
}

impl ArithmeticRelation {
    pub fn new(op: ArithOp, u: Term, v: Term, w: Term) -> Rc<dyn Constraint> {
        Rc::new(ArithmeticRelation {
            id: store::fresh_constraint_id(),
            op,
            u,
            v,
            w,
        })
    }
}

impl Constraint for ArithmeticRelation {
    fn id(&self) -> u64 {
        self.id
    }

    fn variables(&self) -> Vec<VarId> {
        let mut out = Vec::new();
        store::term_vars(&self.u, &mut out);
        store::term_vars(&self.v, &mut out);
        store::term_vars(&self.w, &mut out);
        out
    }

    fn check(&self, subst: &Subst) -> CheckResult {
        let u = subst.walk(&self.u).as_int();
        let v = subst.walk(&self.v).as_int();
        let w = subst.walk(&self.w).as_int();
        match (u, v, w) {
            (Some(u), Some(v), Some(w)) => {
                if self.op.apply(u, v) == Some(w) {
                    CheckResult::Satisfied
                } else {
                    CheckResult::Violated
                }
            }
            _ => CheckResult::Pending,
        }
    }

    fn clone_box(&self) -> Rc<dyn Constraint> {
        Rc::new(self.clone())
    }

    fn describe(&self) -> String {
        format!("{} {} {} = {}", self.u, self.op.symbol(), self.v, self.w)
    }
}

fn relate(op: ArithOp, u: Term, v: Term, w: Term) -> Goal {
    Goal::from_fn(move |ctx, s| {
        let wu = s.walk(&u);
        let wv = s.walk(&v);
        let ww = s.walk(&w);
        match (wu.as_int(), wv.as_int(), ww.as_int()) {
            (Some(a), Some(b), _) => match op.apply(a, b) {
                Some(r) => eq(w.clone(), Term::atom(r)).solve(ctx, s),
                None => Stream::empty(),
            },
            (Some(a), None, Some(r)) => match op.invert_rhs(a, r) {
                Some(b) => eq(v.clone(), Term::atom(b)).solve(ctx, s),
                None => Stream::empty(),
            },
            (None, Some(b), Some(r)) => match op.invert_lhs(b, r) {
                Some(a) => eq(u.clone(), Term::atom(a)).solve(ctx, s),
                None => Stream::empty(),
            },
            _ => match s.add_constraint(ArithmeticRelation::new(op, u.clone(), v.clone(), w.clone())) {
                Some(s2) => Stream::unit(s2),
                None => Stream::empty(),
            },
        }
    })
}

/// `pluso(u, v, w)`: `u + v = w`.
pub fn pluso(u: Term, v: Term, w: Term) -> Goal {
    relate(ArithOp::Plus, u, v, w)
}

/// `minuso(u, v, w)`: `u - v = w`.
pub fn minuso(u: Term, v: Term, w: Term) -> Goal {
    relate(ArithOp::Minus, u, v, w)
}

/// `timeso(u, v, w)`: `u * v = w`.
pub fn timeso(u: Term, v: Term, w: Term) -> Goal {
    relate(ArithOp::Times, u, v, w)
}

/// `divo(u, v, w)`: integer division `u / v = w` (exact; no remainder).
pub fn divo(u: Term, v: Term, w: Term) -> Goal {
    relate(ArithOp::Div, u, v, w)
}

/// `expo(u, v, w)`: `u ^ v = w`.
pub fn expo(u: Term, v: Term, w: Term) -> Goal {
    relate(ArithOp::Pow, u, v, w)
}

/// `logo(u, v, w)`: `w = log_u(v)` (`u` the base, `v` the value).
pub fn logo(u: Term, v: Term, w: Term) -> Goal {
    relate(ArithOp::Log, u, v, w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::combinators::conj;
    use crate::run::{run, run_star};

    #[test]
    fn pluso_forward() {
        let results = run(1, |q| pluso(Term::from(1i64), Term::from(2i64), q));
        assert_eq!(results, vec![Term::from(3i64)]);
    }

    #[test]
    fn pluso_solves_missing_rhs() {
        // 1 + r = 6 => r = 5, then r + 10 = 15 must hold too.
        let results = run(1, |q| {
            conj(vec![
                pluso(Term::from(1i64), q.clone(), Term::from(6i64)),
                pluso(q.clone(), Term::from(10i64), Term::from(15i64)),
            ])
        });
        assert_eq!(results, vec![Term::from(5i64)]);
    }

    #[test]
    fn pluso_solves_missing_lhs() {
        let results = run(1, |q| pluso(q.clone(), Term::from(3i64), Term::from(8i64)));
        assert_eq!(results, vec![Term::from(5i64)]);
    }

    #[test]
    fn timeso_forward_and_violation() {
        let results = run(1, |q| timeso(Term::from(3i64), Term::from(4i64), q));
        assert_eq!(results, vec![Term::from(12i64)]);

        let results = run_star(|q| {
            conj(vec![
                eq(q.clone(), Term::from(1i64)),
                timeso(Term::from(3i64), Term::from(4i64), Term::from(13i64)),
            ])
        });
        assert!(results.is_empty());
    }

    #[test]
    fn pluso_fully_unbound_stays_pending_until_grounded() {
        let results = run(1, |q| {
            let u = Term::fresh_var();
            let v = Term::fresh_var();
            conj(vec![
                pluso(u.clone(), v.clone(), q.clone()),
                eq(u, Term::from(2i64)),
                eq(v, Term::from(3i64)),
            ])
        });
        assert_eq!(results, vec![Term::from(5i64)]);
    }

    #[test]
    fn expo_forward() {
        let results = run(1, |q| expo(Term::from(2i64), Term::from(10i64), q));
        assert_eq!(results, vec![Term::from(1024i64)]);
    }

    #[test]
    fn logo_forward() {
        let results = run(1, |q| logo(Term::from(2i64), Term::from(1024i64), q));
        assert_eq!(results, vec![Term::from(10i64)]);
    }
}
