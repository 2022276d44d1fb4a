//! Nominal logic: binder forms, freshness, alpha-equivalence, capture-avoiding
//! substitution, and a small simply-typed lambda calculus (spec §4.10).
//!
//! No teacher analogue exists in `terohuttunen-proto-vulcan` (it has no
//! binder/`Tie` concept at all); built directly from spec §4.10's contracts,
//! in the same `Goal`-returning idiom the rest of `relations/` uses.
use std::rc::Rc;

use crate::goal::combinators::{conj2, disj2, onceo};
use crate::goal::primitives::eq;
use crate::goal::Goal;
use crate::store::{fresh_constraint_id, CheckResult, Constraint, Store};
use crate::term::{Term, VarId};

/// Renames every free occurrence of nominal atom `from` to `to` inside `t`,
/// stopping at a `Tie` that itself rebinds `from` (that occurrence is no
/// longer free). Used by [`crate::store::unify`] to alpha-match `Tie` forms
/// with differently-named binders.
pub fn rename_free(t: &Term, from: &str, to: &str) -> Term {
    match t {
        Term::Tie(name, body) => {
            if name.as_ref() == from {
                // `from` is rebound here; nothing deeper is free under it.
                t.clone()
            } else {
                Term::Tie(name.clone(), Rc::new(rename_free(body, from, to)))
            }
        }
        Term::Pair(a, b) => Term::pair(rename_free(a, from, to), rename_free(b, from, to)),
        Term::Atom(crate::value::Value::Symbol(s)) if s.as_ref() == from => {
            Term::atom(crate::value::Value::Symbol(Rc::from(to)))
        }
        _ => t.clone(),
    }
}

fn occurs_free(name: &str, t: &Term) -> bool {
    match t {
        Term::Tie(n, body) => n.as_ref() != name && occurs_free(name, body),
        Term::Pair(a, b) => occurs_free(name, a) || occurs_free(name, b),
        Term::Atom(crate::value::Value::Symbol(s)) => s.as_ref() == name,
        _ => false,
    }
}

/// `fresho(a, t)`: nominal atom `a` (a symbol) does not occur free in `t`.
/// Validated at add-time and on every subsequent binding (spec §4.10), via
/// the `Freshness` constraint below.
#[derive(Debug, Clone)]
pub struct Freshness {
    id: u64,
    atom: Term,
    term: Term,
}

impl Constraint for Freshness {
    fn id(&self) -> u64 {
        self.id
    }

    fn variables(&self) -> Vec<VarId> {
        let mut out = Vec::new();
        collect_vars(&self.atom, &mut out);
        collect_vars(&self.term, &mut out);
        out
    }

    fn check(&self, subst: &crate::substitution::Subst) -> CheckResult {
        let atom = subst.walk(&self.atom);
        let name = match &atom {
            Term::Atom(crate::value::Value::Symbol(s)) => s.clone(),
            Term::Var(_) => return CheckResult::Pending,
            _ => return CheckResult::Violated,
        };
        let term = subst.deep_walk(&self.term);
        if has_unbound(&term) {
            if occurs_free(&name, &term) {
                CheckResult::Violated
            } else {
                CheckResult::Pending
            }
        } else if occurs_free(&name, &term) {
            CheckResult::Violated
        } else {
            CheckResult::Satisfied
        }
    }

    fn clone_box(&self) -> Rc<dyn Constraint> {
        Rc::new(self.clone())
    }

    fn describe(&self) -> String {
        format!("fresh({}, {})", self.atom, self.term)
    }
}

fn collect_vars(t: &Term, out: &mut Vec<VarId>) {
    match t {
        Term::Var(v) => out.push(v.id()),
        Term::Pair(a, b) => {
            collect_vars(a, out);
            collect_vars(b, out);
        }
        Term::Tie(_, b) => collect_vars(b, out),
        _ => {}
    }
}

fn has_unbound(t: &Term) -> bool {
    match t {
        Term::Var(_) => true,
        Term::Pair(a, b) => has_unbound(a) || has_unbound(b),
        Term::Tie(_, b) => has_unbound(b),
        _ => false,
    }
}

/// `fresho(a, t)` as a [`Goal`]: adds a [`Freshness`] constraint to the store.
pub fn fresho(a: Term, t: Term) -> Goal {
    Goal::from_fn(move |_ctx, store: Store| {
        let c = Rc::new(Freshness {
            id: fresh_constraint_id(),
            atom: a.clone(),
            term: t.clone(),
        }) as Rc<dyn Constraint>;
        match store.add_constraint(c) {
            Some(s) => crate::stream::Stream::unit(s),
            None => crate::stream::Stream::empty(),
        }
    })
}

/// Alpha-equivalence modulo `Tie` renaming (spec §4.10): two binder forms
/// are equivalent if renaming one's bound name to the other's makes the
/// bodies structurally equal (recursively, through nested binders).
pub fn alpha_eq(t1: &Term, t2: &Term) -> bool {
    match (t1, t2) {
        (Term::Tie(n1, b1), Term::Tie(n2, b2)) => {
            if n1 == n2 {
                alpha_eq(b1, b2)
            } else {
                let renamed = rename_free(b2, n2, n1);
                !occurs_free(n1, b2) && alpha_eq(b1, &renamed)
            }
        }
        (Term::Pair(a1, a2), Term::Pair(b1, b2)) => alpha_eq(a1, b1) && alpha_eq(a2, b2),
        _ => t1 == t2,
    }
}

/// `AlphaEqo(t1, t2)`: relates two terms that are equal up to alpha-renaming
/// of their `Tie` binders. Walks both sides deeply first; fails (no stores)
/// if they are not alpha-equivalent once walked.
pub fn alpha_eqo(t1: Term, t2: Term) -> Goal {
    Goal::from_fn(move |_ctx, store: Store| {
        let w1 = store.deep_walk(&t1);
        let w2 = store.deep_walk(&t2);
        if alpha_eq(&w1, &w2) {
            crate::stream::Stream::unit(store)
        } else {
            crate::stream::Stream::empty()
        }
    })
}

/// Capture-avoiding substitution: relates `out` to `r` substituted for the
/// free nominal atom `a` in `t`. When the walked shape of `t` is concrete
/// enough to drive the substitution, renames the inner binder to a fresh
/// name if it would otherwise capture a free name of `r` (spec §4.10).
pub fn substo(t: Term, a: Term, r: Term, out: Term) -> Goal {
    Goal::from_fn(move |ctx, store: Store| {
        let wt = store.deep_walk(&t);
        let wa = store.walk(&a);
        let name = match &wa {
            Term::Atom(crate::value::Value::Symbol(s)) => s.clone(),
            _ => return crate::stream::Stream::empty(),
        };
        match capture_avoiding_subst(&wt, &name, &r) {
            Some(result) => eq(out.clone(), result).solve(ctx, store),
            None => crate::stream::Stream::empty(),
        }
    })
}

fn capture_avoiding_subst(t: &Term, name: &Rc<str>, r: &Term) -> Option<Term> {
    match t {
        Term::Atom(crate::value::Value::Symbol(s)) if s == name => Some(r.clone()),
        Term::Atom(_) | Term::Nil | Term::Var(_) => Some(t.clone()),
        Term::Pair(car, cdr) => {
            let car2 = capture_avoiding_subst(car, name, r)?;
            let cdr2 = capture_avoiding_subst(cdr, name, r)?;
            Some(Term::pair(car2, cdr2))
        }
        Term::Tie(bound, body) => {
            if bound.as_ref() == name.as_ref() {
                // `name` is rebound here; nothing deeper is free.
                Some(t.clone())
            } else if occurs_free(bound, r) {
                // Renaming needed to avoid capturing `r`'s free occurrence
                // of the inner binder's name.
                let fresh_name: Rc<str> = Rc::from(format!("{}%{}", bound, fresh_gensym()).as_str());
                let renamed_body = rename_free(body, bound, &fresh_name);
                let inner = capture_avoiding_subst(&renamed_body, name, r)?;
                Some(Term::Tie(fresh_name, Rc::new(inner)))
            } else {
                let inner = capture_avoiding_subst(body, name, r)?;
                Some(Term::Tie(bound.clone(), Rc::new(inner)))
            }
        }
    }
}

use std::sync::atomic::{AtomicU64, Ordering};
static GENSYM: AtomicU64 = AtomicU64::new(0);
fn fresh_gensym() -> u64 {
    GENSYM.fetch_add(1, Ordering::SeqCst)
}

/// A minimal lambda-calculus encoding used by [`beta_reduce`]/[`TypeChecko`]:
/// `(lam.body)` is `Tie("lam", body)`; application is `Pair(Pair(sym!"@",
/// fun), arg)`; a variable reference is a symbol atom.
fn is_app(t: &Term) -> Option<(Term, Term)> {
    match t {
        Term::Pair(head, rest) => match head.as_ref() {
            Term::Atom(crate::value::Value::Symbol(s)) if s.as_ref() == "@" => match rest.as_ref() {
                Term::Pair(fun, arg_tail) => match arg_tail.as_ref() {
                    Term::Pair(arg, tail) if tail.is_nil() => {
                        Some(((**fun).clone(), (**arg).clone()))
                    }
                    _ => None,
                },
                _ => None,
            },
            _ => None,
        },
        _ => None,
    }
}

pub fn app(fun: Term, arg: Term) -> Term {
    Term::list(vec![Term::from("@"), fun, arg])
}

/// `BetaReduceo`: a single leftmost-outermost beta step. Fails (no stores)
/// if the walked term is already in normal form.
pub fn beta_reduce(t: &Term) -> Option<Term> {
    if let Some((fun, arg)) = is_app(t) {
        if let Term::Tie(bound, body) = &fun {
            return Some(
                capture_avoiding_subst(body, bound, &arg).unwrap_or_else(|| (**body).clone()),
            );
        }
        if let Some(fun2) = beta_reduce(&fun) {
            return Some(app(fun2, arg));
        }
        if let Some(arg2) = beta_reduce(&arg) {
            return Some(app(fun, arg2));
        }
        return None;
    }
    match t {
        Term::Tie(name, body) => beta_reduce(body).map(|b| Term::tie(name, b)),
        Term::Pair(a, b) => {
            if let Some(a2) = beta_reduce(a) {
                Some(Term::pair(a2, (**b).clone()))
            } else {
                beta_reduce(b).map(|b2| Term::pair((**a).clone(), b2))
            }
        }
        _ => None,
    }
}

/// `BetaNormalizeo`: iterates [`beta_reduce`] to a normal form. Bounded to
/// guard against non-terminating reductions (e.g. an encoded Omega
/// combinator); exceeding the bound is a fatal error per spec §4.11
/// ("fixpoint overflow"), not a search failure.
pub fn beta_normalize(t: &Term, max_steps: usize) -> Result<Term, crate::error::Error> {
    let mut cur = t.clone();
    for _ in 0..max_steps {
        match beta_reduce(&cur) {
            Some(next) => cur = next,
            None => return Ok(cur),
        }
    }
    Err(crate::error::Error::FixpointOverflow {
        context: "beta_normalize".into(),
    })
}

pub fn beta_reduceo(t: Term, out: Term) -> Goal {
    Goal::from_fn(move |ctx, store: Store| {
        let wt = store.deep_walk(&t);
        match beta_reduce(&wt) {
            Some(result) => eq(out.clone(), result).solve(ctx, store),
            None => crate::stream::Stream::empty(),
        }
    })
}

pub fn beta_normalizeo(t: Term, out: Term) -> Goal {
    Goal::from_fn(move |ctx, store: Store| {
        let wt = store.deep_walk(&t);
        match beta_normalize(&wt, 10_000) {
            Ok(result) => eq(out.clone(), result).solve(ctx, store),
            Err(_) => crate::stream::Stream::empty(),
        }
    })
}

/// A simple type in the STLC used by [`TypeChecko`]: `Base(name)` or
/// `Arrow(dom, cod)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SimpleType {
    Base(Rc<str>),
    Arrow(Box<SimpleType>, Box<SimpleType>),
}

/// Association-list environment: variable-name -> type.
pub type TypeEnv = Vec<(Rc<str>, SimpleType)>;

/// `TypeChecko`: simply-typed lambda calculus type checking against an
/// association-list environment (spec §4.10). The term must encode typed
/// binders as `Tie(name, body)` paired with an external `env` giving each
/// bound variable's type, since `Tie` itself carries no type annotation.
pub fn type_check(t: &Term, env: &TypeEnv) -> Option<SimpleType> {
    if let Some((fun, arg)) = is_app(t) {
        let fun_ty = type_check(&fun, env)?;
        let arg_ty = type_check(&arg, env)?;
        match fun_ty {
            SimpleType::Arrow(dom, cod) if *dom == arg_ty => Some(*cod),
            _ => None,
        }
    } else {
        match t {
            Term::Atom(crate::value::Value::Symbol(s)) => {
                env.iter().rev().find(|(n, _)| n == s).map(|(_, ty)| ty.clone())
            }
            Term::Tie(_, _) => None, // requires a typed binder; see `type_check_lambda`.
            _ => None,
        }
    }
}

/// Type-checks a `Tie(name, body)` binder given the bound variable's
/// declared domain type, returning the lambda's arrow type.
pub fn type_check_lambda(
    bound: &str,
    dom: SimpleType,
    body: &Term,
    env: &TypeEnv,
) -> Option<SimpleType> {
    let mut env2 = env.clone();
    env2.push((Rc::from(bound), dom.clone()));
    let cod = type_check(body, &env2)?;
    Some(SimpleType::Arrow(Box::new(dom), Box::new(cod)))
}

/// `TypeChecko(t, env, ty)` as a goal: succeeds iff `t` type-checks to `ty`
/// under `env`. `t` must be fully ground (no unbound logic variables) since
/// type checking is not itself a unification procedure.
pub fn type_checko(t: Term, env: TypeEnv, ty: SimpleType) -> Goal {
    Goal::from_fn(move |_ctx, store: Store| match type_check(&store.deep_walk(&t), &env) {
        Some(found) if found == ty => crate::stream::Stream::unit(store),
        _ => crate::stream::Stream::empty(),
    })
}

/// `Noto`-free disjunction of `fresho`/`alpha_eqo` combined, the pattern
/// `relations/lists.rs` and friends use for composite nominal relations.
pub fn binds_distinct(a: Term, b: Term) -> Goal {
    onceo(disj2(
        conj2(fresho(a.clone(), b.clone()), eq(Term::from("distinct"), Term::from("distinct"))),
        eq(a, b),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_eq_ignores_bound_name() {
        let t1 = Term::tie("x", Term::from("x"));
        let t2 = Term::tie("y", Term::from("y"));
        assert!(alpha_eq(&t1, &t2));
    }

    #[test]
    fn alpha_eq_distinguishes_free_vs_bound() {
        let t1 = Term::tie("x", Term::from("x"));
        let t2 = Term::tie("y", Term::from("x"));
        assert!(!alpha_eq(&t1, &t2));
    }

    #[test]
    fn beta_reduce_identity_application() {
        let id = Term::tie("x", Term::from("x"));
        let applied = app(id, Term::from("z"));
        let reduced = beta_reduce(&applied).unwrap();
        assert_eq!(reduced, Term::from("z"));
    }

    #[test]
    fn beta_normalize_nested() {
        // (\x. \y. x) applied to a, then b => a
        let inner = Term::tie("y", Term::from("x"));
        let outer = Term::tie("x", inner);
        let step1 = app(outer, Term::from("a"));
        let step2 = app(step1, Term::from("b"));
        let normal = beta_normalize(&step2, 100).unwrap();
        assert_eq!(normal, Term::from("a"));
    }

    #[test]
    fn type_check_identity_function_body() {
        let env: TypeEnv = vec![];
        let base = SimpleType::Base(Rc::from("int"));
        let ty = type_check_lambda("x", base.clone(), &Term::from("x"), &env).unwrap();
        assert_eq!(ty, SimpleType::Arrow(Box::new(base.clone()), Box::new(base)));
    }
}
