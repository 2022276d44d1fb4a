//! Goal combinators (spec §4.2): `Conj`, `Disj`, `Conde`, committed-choice
//! (`Onceo`/`Conda`/`Condu`), `Project`, `Noto`.
//!
//! Grounded on `operator/{conj,disj,conde,onceo,conda,condu,project}.rs`;
//! dropped the teacher's `AnyGoal`/macro-facing plumbing (see DESIGN.md).
use crate::goal::Goal;
use crate::store::Store;
use crate::stream::Stream;

/// Sequential composition of two goals (spec §4.2's `Conj`).
pub fn conj2(g1: Goal, g2: Goal) -> Goal {
    Goal::from_fn(move |ctx, store: Store| g1.solve(ctx, store).bind(ctx, g2.clone()))
}

/// Variadic `Conj(g1, g2, ...)`.
pub fn conj(goals: Vec<Goal>) -> Goal {
    let mut it = goals.into_iter();
    match it.next() {
        None => Goal::success(),
        Some(first) => it.fold(first, conj2),
    }
}

/// `Disj(g1, g2)`: evaluates both branches; stores are merged with
/// unspecified cross-branch ordering when run in parallel, single-branch
/// order preserved (spec §4.2, §5).
pub fn disj2(g1: Goal, g2: Goal) -> Goal {
    Goal::from_fn(move |ctx, store: Store| {
        let s1 = g1.solve(ctx, store.clone());
        let s2 = g2.solve(ctx, store);
        s1.mplus(ctx, s2)
    })
}

pub fn disj(goals: Vec<Goal>) -> Goal {
    let mut it = goals.into_iter();
    match it.next() {
        None => Goal::failure(),
        Some(first) => it.fold(first, disj2),
    }
}

/// `Conde`: fair round-robin interleaving across branches, guaranteeing
/// progress even when a branch is infinite (spec §4.2).
pub fn conde(clauses: Vec<Goal>) -> Goal {
    Goal::from_fn(move |ctx, store: Store| {
        let mut streams: Vec<Stream> = clauses
            .iter()
            .map(|g| Stream::pause(store.clone(), g.clone()))
            .collect();
        let mut it = streams.drain(..);
        match it.next() {
            None => Stream::empty(),
            Some(first) => it.fold(first, |acc, next| acc.mplus_fair(ctx, next)),
        }
    })
}

/// `Onceo(g)`: commits to the first store `g` produces, discarding the rest.
pub fn onceo(g: Goal) -> Goal {
    Goal::from_fn(move |ctx, store: Store| match g.solve(ctx, store).uncons(ctx) {
        Some((s, _rest)) => Stream::unit(s),
        None => Stream::empty(),
    })
}

/// `Conda(cond, then, else)`: if `cond` produces at least one store, commit
/// to `then` run against *all* of `cond`'s stores; otherwise run `else`
/// against the original store. Soft-cut ("committed choice").
pub fn conda(cond: Goal, then: Goal, or_else: Goal) -> Goal {
    Goal::from_fn(move |ctx, store: Store| {
        let cond_stream = cond.solve(ctx, store.clone());
        match cond_stream.uncons(ctx) {
            Some((first, rest)) => {
                let remaining = Stream::cons(first, rest);
                remaining.bind(ctx, then.clone())
            }
            None => or_else.solve(ctx, store),
        }
    })
}

/// `Condu(cond, then, else)`: like `Conda` but additionally commits to only
/// the *first* answer of `cond` (i.e. `Conda(Onceo(cond), then, else)`).
pub fn condu(cond: Goal, then: Goal, or_else: Goal) -> Goal {
    conda(onceo(cond), then, or_else)
}

/// `Project(vars, f)`: reifies the current walked values of `vars` and
/// builds a new goal from them, run against the current store.
pub fn project<F: Fn(Vec<crate::term::Term>) -> Goal + 'static>(
    vars: Vec<crate::term::Term>,
    f: F,
) -> Goal {
    Goal::from_fn(move |ctx, store: Store| {
        let walked: Vec<_> = vars.iter().map(|v| store.deep_walk(v)).collect();
        f(walked).solve(ctx, store)
    })
}

/// `Noto(g)`: negation-as-failure. Succeeds with the *input* store iff `g`
/// produces no store in finite enumeration. Unsound on non-ground terms
/// (spec §4.2's documented caveat): if `g` would only fail because some
/// variable it depends on is still unbound, `Noto` cannot distinguish that
/// from genuine failure and will incorrectly succeed.
///
/// Always performs ordinary finite enumeration, even when `g` happens to be
/// backed by a tabled subgoal — see SPEC_FULL.md §4.6's Open Question
/// resolution; only `engine.negation_truth` gets three-valued WFS treatment.
pub fn noto(g: Goal) -> Goal {
    Goal::from_fn(move |ctx, store: Store| {
        if g.solve(ctx, store.clone()).uncons(ctx).is_none() {
            Stream::unit(store)
        } else {
            Stream::empty()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::primitives::eq;
    use crate::run::{run, run_star};
    use crate::term::Term;

    #[test]
    fn conj_identity_with_success() {
        let results = run(1, |q| conj2(eq(q.clone(), Term::from(1i64)), Goal::success()));
        assert_eq!(results, vec![Term::from(1i64)]);
    }

    #[test]
    fn conde_fair_interleaving_both_present() {
        let mut results = run(2, |q| {
            conde(vec![
                eq(q.clone(), Term::from(1i64)),
                eq(q.clone(), Term::from(2i64)),
            ])
        });
        results.sort_by_key(|t| t.as_int());
        assert_eq!(results, vec![Term::from(1i64), Term::from(2i64)]);
    }

    #[test]
    fn onceo_commits_to_first() {
        let results = run_star(|q| {
            onceo(disj2(
                eq(q.clone(), Term::from(1i64)),
                eq(q.clone(), Term::from(2i64)),
            ))
        });
        assert_eq!(results, vec![Term::from(1i64)]);
    }

    #[test]
    fn noto_fails_when_inner_succeeds() {
        let results = run(1, |q| {
            conj2(eq(q.clone(), Term::from(1i64)), noto(eq(q.clone(), Term::from(1i64))))
        });
        assert!(results.is_empty());
    }

    #[test]
    fn noto_succeeds_when_inner_fails() {
        let results = run(1, |q| {
            conj2(
                eq(q.clone(), Term::from(1i64)),
                noto(eq(q.clone(), Term::from(2i64))),
            )
        });
        assert_eq!(results, vec![Term::from(1i64)]);
    }
}
