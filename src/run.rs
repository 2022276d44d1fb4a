//! The `run`/`run_star` query entry points and the cancellation [`Context`]
//! threaded through goal evaluation, solver search, and SLG evaluate
//! (spec §4.2, §5, §6).
//!
//! Grounded on the teacher's `query.rs` (`Query`/`ResultIterator`) and
//! `solver.rs` (`Solver::new`/`context`/`next`). `Context` itself has no
//! teacher counterpart — the teacher never cancels a running query — and is
//! built from spec §5's "context-like token... threaded through goal
//! evaluation" description directly.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::goal::Goal;
use crate::store::Store;
use crate::term::Term;

/// A cancellation token, cheaply cloned and shared across worker threads
/// (spec §5). Once cancelled, every stream/solver/SLG loop observing it
/// stops producing further results and releases its resources.
#[derive(Clone, Debug)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
}

impl Context {
    pub fn new() -> Context {
        Context {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

impl Default for Context {
    fn default() -> Context {
        Context::new()
    }
}

/// A bound query: `n` fresh variables, a goal built from them, and the
/// machinery to drive it for up to `n` results.
pub struct Query {
    vars: Vec<Term>,
    goal: Goal,
}

impl Query {
    pub fn new(vars: Vec<Term>, goal: Goal) -> Query {
        Query { vars, goal }
    }

    pub fn vars(&self) -> &[Term] {
        &self.vars
    }

    pub fn goal(&self) -> &Goal {
        &self.goal
    }
}

/// Reifies a walked query-variable binding the way `run` reports results:
/// fully ground terms render as themselves, any remaining free variable
/// walks to an `Atom(Symbol("_.N"))` placeholder so the caller sees a
/// concrete, printable value rather than a dangling variable handle.
fn reify_one(store: &Store, t: &Term) -> Term {
    reify_rec(store, t)
}

fn reify_rec(store: &Store, t: &Term) -> Term {
    match store.walk(t) {
        Term::Var(v) => Term::atom(crate::value::Value::Symbol(
            format!("_.{}", v.id()).into(),
        )),
        Term::Pair(a, b) => Term::pair(reify_rec(store, &a), reify_rec(store, &b)),
        Term::Tie(name, body) => Term::Tie(name, std::rc::Rc::new(reify_rec(store, &body))),
        other => other,
    }
}

/// Runs `builder(q)` against a fresh query variable `q`, returning up to `n`
/// deep-walked values. `n = 0` returns an empty list without evaluating the
/// goal at all (spec §8's boundary case).
pub fn run<F: FnOnce(Term) -> Goal>(n: usize, builder: F) -> Vec<Term> {
    run_with_context(&Context::new(), Some(n), builder)
}

/// `run_star`: unbounded `run`.
pub fn run_star<F: FnOnce(Term) -> Goal>(builder: F) -> Vec<Term> {
    run_with_context(&Context::new(), None, builder)
}

/// `run` parameterized over an explicit [`Context`] so a caller can cancel
/// an in-flight query from another thread.
pub fn run_with_context<F: FnOnce(Term) -> Goal>(
    ctx: &Context,
    n: Option<usize>,
    builder: F,
) -> Vec<Term> {
    if n == Some(0) {
        return Vec::new();
    }
    let q = Term::fresh_var();
    let goal = builder(q.clone());
    let stream = goal.solve(ctx, Store::new());
    stream
        .take(ctx, n)
        .into_iter()
        .map(|s| reify_one(&s, &q))
        .collect()
}

/// `run`, but first drops every answer cached in the lazily-initialized
/// default SLG engine (spec §6, spec §9's redesign note on global engine
/// state), so tabled predicates evaluated by `builder`'s goal start from a
/// clean table instead of potentially reusing answers a prior, unrelated
/// call through that same default engine left behind.
#[cfg(feature = "slg")]
pub fn run_with_isolation<F: FnOnce(Term) -> Goal>(n: usize, builder: F) -> Vec<Term> {
    crate::slg::engine::reset_default_engine();
    run(n, builder)
}

#[cfg(not(feature = "slg"))]
pub fn run_with_isolation<F: FnOnce(Term) -> Goal>(n: usize, builder: F) -> Vec<Term> {
    run(n, builder)
}

/// Multi-variable variant: `run_n(n, k, builder)` introduces `k` fresh
/// variables and returns each solution as a vector of their reified values.
pub fn run_n<F: FnOnce(&[Term]) -> Goal>(n: Option<usize>, k: usize, builder: F) -> Vec<Vec<Term>> {
    run_n_with_context(&Context::new(), n, k, builder)
}

pub fn run_n_with_context<F: FnOnce(&[Term]) -> Goal>(
    ctx: &Context,
    n: Option<usize>,
    k: usize,
    builder: F,
) -> Vec<Vec<Term>> {
    if n == Some(0) {
        return Vec::new();
    }
    let vars: Vec<Term> = (0..k).map(|_| Term::fresh_var()).collect();
    let goal = builder(&vars);
    let stream = goal.solve(ctx, Store::new());
    stream
        .take(ctx, n)
        .into_iter()
        .map(|s| vars.iter().map(|v| reify_one(&s, v)).collect())
        .collect()
}

/// Runs a goal built against an explicit initial [`Store`] rather than an
/// empty one — used by the SLG engine and by tests that need to seed
/// bindings before evaluation.
pub fn run_from_store(ctx: &Context, store: Store, n: Option<usize>, goal: Goal) -> Vec<Store> {
    if n == Some(0) {
        return Vec::new();
    }
    goal.solve(ctx, store).take(ctx, n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::primitives::eq;

    #[test]
    fn run_zero_returns_empty_without_evaluating() {
        let results: Vec<Term> = run(0, |_q| Goal::failure());
        assert!(results.is_empty());
    }

    #[test]
    fn run_with_context_cancel_stops_early() {
        let ctx = Context::new();
        ctx.cancel();
        let results = run_with_context(&ctx, Some(5), |q| eq(q, Term::from("x")));
        assert!(results.is_empty());
    }

    #[cfg(feature = "slg")]
    #[test]
    fn run_with_isolation_resets_default_engine_table() {
        crate::slg::engine::with_default_engine(|engine| engine.reset());
        let results = run_with_isolation(1, |q| eq(q, Term::from("x")));
        assert_eq!(results, vec![Term::from("x")]);
        crate::slg::engine::with_default_engine(|engine| {
            assert_eq!(engine.table_len(), 0);
        });
    }
}
