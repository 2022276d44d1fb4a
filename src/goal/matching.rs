//! Pattern-matching helpers (spec §4.7): `Matche`/`Matcha`/`Matchu`.
//!
//! These reduce boilerplate over unification plus disjunction/committed
//! choice and have no semantic content beyond that (spec §4.7). Implemented
//! as ordinary functions over a clause list, per SPEC_FULL.md §1's DSL
//! boundary — no macro layer above them.
use crate::goal::combinators::{conda, conde, condu, disj};
use crate::goal::primitives::eq;
use crate::goal::Goal;
use crate::term::Term;

/// One `(pattern, goals)` clause: if `pattern` unifies with the scrutinee,
/// `body` (built from the clause, already closed over any fresh pattern
/// variables) runs next.
pub struct Clause {
    pub pattern: Term,
    pub body: Goal,
}

impl Clause {
    pub fn new(pattern: Term, body: Goal) -> Clause {
        Clause { pattern, body }
    }

    fn as_goal(&self, scrutinee: &Term) -> Goal {
        crate::goal::combinators::conj2(eq(scrutinee.clone(), self.pattern.clone()), self.body.clone())
    }
}

/// `Matche`: disjoins all matching clauses — every clause whose pattern
/// unifies with the scrutinee contributes its branch (exhaustive).
pub fn matche(scrutinee: Term, clauses: Vec<Clause>) -> Goal {
    disj(clauses.iter().map(|c| c.as_goal(&scrutinee)).collect())
}

/// `Matcha`: commits to the first pattern that unifies (soft cut across
/// clauses, implemented as a right fold of `Conda`).
pub fn matcha(scrutinee: Term, clauses: Vec<Clause>) -> Goal {
    clauses
        .into_iter()
        .rev()
        .fold(Goal::failure(), |rest, clause| {
            conda(eq(scrutinee.clone(), clause.pattern.clone()), clause.body, rest)
        })
}

/// `Matchu`: like `Matcha`, but additionally requires that exactly one
/// pattern unifies (first answer of the matching clause only).
pub fn matchu(scrutinee: Term, clauses: Vec<Clause>) -> Goal {
    clauses
        .into_iter()
        .rev()
        .fold(Goal::failure(), |rest, clause| {
            condu(eq(scrutinee.clone(), clause.pattern.clone()), clause.body, rest)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::run;

    #[test]
    fn matche_disjoins_matching_clauses() {
        let mut results = run(10, |q| {
            matche(
                q.clone(),
                vec![
                    Clause::new(Term::from(1i64), eq(Term::from("one"), Term::from("one"))),
                    Clause::new(Term::from(2i64), eq(Term::from("two"), Term::from("two"))),
                ],
            )
        });
        // q is unbound going in; matche should leave q bound per clause when run with a
        // fresh query var feeding both branches via disjunction over the scrutinee eq.
        results.sort_by_key(|t| t.as_int());
        assert_eq!(results, vec![Term::from(1i64), Term::from(2i64)]);
    }

    #[test]
    fn matcha_commits_to_first() {
        let results = run(10, |q| {
            matcha(
                Term::from(1i64),
                vec![
                    Clause::new(q.clone(), eq(Term::from("a"), Term::from("a"))),
                    Clause::new(Term::from(2i64), eq(Term::from("b"), Term::from("b"))),
                ],
            )
        });
        assert_eq!(results, vec![Term::from(1i64)]);
    }
}
