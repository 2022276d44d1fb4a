//! Primitive goals (spec §4.2): `eq`, `neq`, `fresh`, and the type
//! predicates. Grounded on the teacher's `relation/{eq,diseq}.rs` goal
//! shapes, generalized from `LTerm<U,E>` to the concrete `Term`.
use crate::goal::Goal;
use crate::store::{self, Disequality, Membership, Ordering, OrderOp, TypeKind, TypePredicate};
use crate::stream::Stream;
use crate::term::Term;

/// `eq(t1, t2)`: unify `t1` and `t2`.
pub fn eq(t1: Term, t2: Term) -> Goal {
    Goal::from_fn(move |_ctx, s| match store::unify(&t1, &t2, &s) {
        Ok(s2) => Stream::unit(s2),
        Err(_) => Stream::empty(),
    })
}

/// `neq(t1, t2)`: adds a disequality constraint.
pub fn neq(t1: Term, t2: Term) -> Goal {
    Goal::from_fn(move |_ctx, s| match s.add_constraint(Disequality::new(t1.clone(), t2.clone())) {
        Some(s2) => Stream::unit(s2),
        None => Stream::empty(),
    })
}

/// `fresh(name)`: introduces a new scope-free logic variable, relying on
/// globally unique ids (spec §4.2).
pub fn fresh(name: &str) -> Term {
    Term::var(name)
}

fn type_goal(kind: TypeKind, t: Term) -> Goal {
    Goal::from_fn(move |_ctx, s| match s.add_constraint(TypePredicate::new(kind, t.clone())) {
        Some(s2) => Stream::unit(s2),
        None => Stream::empty(),
    })
}

pub fn symbolo(t: Term) -> Goal {
    type_goal(TypeKind::Symbol, t)
}
pub fn numbero(t: Term) -> Goal {
    type_goal(TypeKind::Number, t)
}
pub fn stringo(t: Term) -> Goal {
    type_goal(TypeKind::String, t)
}
pub fn pairo(t: Term) -> Goal {
    type_goal(TypeKind::Pair, t)
}
pub fn booleano(t: Term) -> Goal {
    type_goal(TypeKind::Boolean, t)
}
pub fn nullo(t: Term) -> Goal {
    type_goal(TypeKind::Null, t)
}
pub fn vectoro(t: Term) -> Goal {
    type_goal(TypeKind::Vector, t)
}

/// `membero(element, list)` as a constraint-post (as opposed to
/// `relations::lists::membero`, which enumerates list positions via
/// disjunction); this version posts a [`Membership`] constraint that can
/// stay pending until the list is ground enough to decide.
pub fn member_constraint(element: Term, list: Term) -> Goal {
    Goal::from_fn(move |_ctx, s| match s.add_constraint(Membership::new(element.clone(), list.clone())) {
        Some(s2) => Stream::unit(s2),
        None => Stream::empty(),
    })
}

fn order_goal(op: OrderOp, lhs: Term, rhs: Term) -> Goal {
    Goal::from_fn(move |_ctx, s| match s.add_constraint(Ordering::new(op, lhs.clone(), rhs.clone())) {
        Some(s2) => Stream::unit(s2),
        None => Stream::empty(),
    })
}

pub fn lt(lhs: Term, rhs: Term) -> Goal {
    order_goal(OrderOp::Lt, lhs, rhs)
}
pub fn le(lhs: Term, rhs: Term) -> Goal {
    order_goal(OrderOp::Le, lhs, rhs)
}
pub fn gt(lhs: Term, rhs: Term) -> Goal {
    order_goal(OrderOp::Gt, lhs, rhs)
}
pub fn ge(lhs: Term, rhs: Term) -> Goal {
    order_goal(OrderOp::Ge, lhs, rhs)
}

/// `absento(needle, haystack)`.
pub fn absento(needle: Term, haystack: Term) -> Goal {
    Goal::from_fn(move |_ctx, s| {
        match s.add_constraint(store::Absence::new(needle.clone(), haystack.clone())) {
            Some(s2) => Stream::unit(s2),
            None => Stream::empty(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::Context;

    #[test]
    fn eq_unifies_vars() {
        let ctx = Context::new();
        let v = Term::fresh_var();
        let s = crate::store::Store::new();
        let out = eq(v.clone(), Term::atom(1i64)).solve(&ctx, s);
        let (s2, _) = out.uncons(&ctx).unwrap();
        assert_eq!(s2.walk(&v), Term::atom(1i64));
    }

    #[test]
    fn neq_then_eq_same_value_fails() {
        let ctx = Context::new();
        let v = Term::fresh_var();
        let s = crate::store::Store::new();
        let s = neq(v.clone(), Term::atom(5i64)).solve(&ctx, s);
        let (s, _) = s.uncons(&ctx).unwrap();
        let out = eq(v, Term::atom(5i64)).solve(&ctx, s);
        assert!(out.uncons(&ctx).is_none());
    }
}
