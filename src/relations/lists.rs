//! List relations (spec §4.8): `appendo`, `membero`, `lengtho`, `reverso`,
//! `permuteo`, `rembero`, `distincto`, `subseto`, `flatteno`.
//!
//! Grounded on `relation/{appendo,membero,permuteo,rembero,distincto}.rs`'s
//! goal shapes (kept as-is, modulo the macro-to-function translation);
//! `lengtho`, `reverso`, `subseto`, `flatteno` have no teacher counterpart
//! and are built in the same `conde`-over-`cons`/`nil` idiom per spec §4.8.
use crate::goal::combinators::{conde, conj};
use crate::goal::primitives::{eq, neq};
use crate::goal::Goal;
use crate::relations::arithmetic::pluso;
use crate::term::Term;

/// `appendo(l, s, ls)`: `ls` is `s` appended onto the end of proper list `l`.
pub fn appendo(l: Term, s: Term, ls: Term) -> Goal {
    let l2 = l.clone();
    let s2 = s.clone();
    let ls2 = ls.clone();
    conde(vec![
        conj(vec![eq(l.clone(), Term::nil()), eq(s.clone(), ls.clone())]),
        Goal::from_fn(move |ctx, store| {
            let x = Term::fresh_var();
            let l1 = Term::fresh_var();
            let l3 = Term::fresh_var();
            conj(vec![
                eq(l2.clone(), Term::pair(x.clone(), l1.clone())),
                eq(ls2.clone(), Term::pair(x.clone(), l3.clone())),
                appendo(l1, s2.clone(), l3),
            ])
            .solve(ctx, store)
        }),
    ])
}

/// `membero(x, l)`: succeeds once per occurrence of `x` in list `l`.
pub fn membero(x: Term, l: Term) -> Goal {
    let l1 = l.clone();
    let x1 = x.clone();
    let l2 = l.clone();
    conde(vec![
        Goal::from_fn(move |ctx, store| {
            let head = Term::fresh_var();
            let tail = Term::fresh_var();
            conj(vec![eq(l1.clone(), Term::pair(head.clone(), tail)), eq(head, x1.clone())]).solve(ctx, store)
        }),
        Goal::from_fn(move |ctx, store| {
            let head = Term::fresh_var();
            let tail = Term::fresh_var();
            conj(vec![eq(l2.clone(), Term::pair(head, tail.clone())), membero(x.clone(), tail)]).solve(ctx, store)
        }),
    ])
}

/// `lengtho(l, n)`: `n` is the length of proper list `l`, as an integer atom.
pub fn lengtho(l: Term, n: Term) -> Goal {
    let l2 = l.clone();
    let n2 = n.clone();
    conde(vec![
        conj(vec![eq(l.clone(), Term::nil()), eq(n.clone(), Term::atom(0i64))]),
        Goal::from_fn(move |ctx, store| {
            let head = Term::fresh_var();
            let tail = Term::fresh_var();
            let n1 = Term::fresh_var();
            conj(vec![
                eq(l2.clone(), Term::pair(head, tail.clone())),
                lengtho(tail, n1.clone()),
                pluso(n1, Term::atom(1i64), n2.clone()),
            ])
            .solve(ctx, store)
        }),
    ])
}

fn reverso_acc(l: Term, acc: Term, r: Term) -> Goal {
    let l2 = l.clone();
    let acc2 = acc.clone();
    let r2 = r.clone();
    conde(vec![
        conj(vec![eq(l.clone(), Term::nil()), eq(acc.clone(), r.clone())]),
        Goal::from_fn(move |ctx, store| {
            let head = Term::fresh_var();
            let tail = Term::fresh_var();
            conj(vec![
                eq(l2.clone(), Term::pair(head.clone(), tail.clone())),
                reverso_acc(tail, Term::pair(head, acc2.clone()), r2.clone()),
            ])
            .solve(ctx, store)
        }),
    ])
}

/// `reverso(l, r)`: `r` is `l` reversed.
pub fn reverso(l: Term, r: Term) -> Goal {
    reverso_acc(l, Term::nil(), r)
}

/// `permuteo(xl, yl)`: `yl` is some permutation of `xl`.
///
/// Grounded 1:1 on `relation/permuteo.rs`: peel the head off `xl`, permute
/// the remainder, then reinsert the head anywhere into the result via
/// `rembero` run backwards.
pub fn permuteo(xl: Term, yl: Term) -> Goal {
    let xl2 = xl.clone();
    let yl2 = yl.clone();
    conde(vec![
        conj(vec![eq(xl.clone(), Term::nil()), eq(yl.clone(), Term::nil())]),
        Goal::from_fn(move |ctx, store| {
            let x = Term::fresh_var();
            let xs = Term::fresh_var();
            let ys = Term::fresh_var();
            conj(vec![
                eq(xl2.clone(), Term::pair(x.clone(), xs.clone())),
                permuteo(xs, ys.clone()),
                rembero(x, yl2.clone(), ys),
            ])
            .solve(ctx, store)
        }),
    ])
}

/// `rembero(x, ls, out)`: `out` is `ls` with the first occurrence of `x`
/// removed (a no-op if `x` does not occur).
pub fn rembero(x: Term, ls: Term, out: Term) -> Goal {
    let ls2 = ls.clone();
    let ls3 = ls.clone();
    let out2 = out.clone();
    let out3 = out.clone();
    let x2 = x.clone();
    let x3 = x.clone();
    conde(vec![
        conj(vec![eq(ls.clone(), Term::nil()), eq(out.clone(), Term::nil())]),
        Goal::from_fn(move |ctx, store| {
            let a = Term::fresh_var();
            let d = Term::fresh_var();
            conj(vec![
                eq(ls2.clone(), Term::pair(a.clone(), d.clone())),
                eq(a, x2.clone()),
                eq(out2.clone(), d),
            ])
            .solve(ctx, store)
        }),
        Goal::from_fn(move |ctx, store| {
            let y = Term::fresh_var();
            let ys = Term::fresh_var();
            let zs = Term::fresh_var();
            conj(vec![
                eq(ls3.clone(), Term::pair(y.clone(), ys.clone())),
                neq(y.clone(), x3.clone()),
                eq(out3.clone(), Term::pair(y, zs.clone())),
                rembero(x3.clone(), ys, zs),
            ])
            .solve(ctx, store)
        }),
    ])
}

/// `distincto(l)`: every element of `l` is pairwise distinct from every
/// other element.
pub fn distincto(l: Term) -> Goal {
    let l2 = l.clone();
    conde(vec![
        eq(l.clone(), Term::nil()),
        Goal::from_fn(move |ctx, store| {
            let x = Term::fresh_var();
            eq(l.clone(), Term::pair(x, Term::nil())).solve(ctx, store)
        }),
        Goal::from_fn(move |ctx, store| {
            let first = Term::fresh_var();
            let second = Term::fresh_var();
            let rest = Term::fresh_var();
            conj(vec![
                eq(l2.clone(), Term::pair(first.clone(), Term::pair(second.clone(), rest.clone()))),
                neq(first.clone(), second.clone()),
                distincto(Term::pair(first.clone(), rest.clone())),
                distincto(Term::pair(second, rest)),
            ])
            .solve(ctx, store)
        }),
    ])
}

/// `subseto(sub, l)`: `sub` can be obtained from `l` by deleting zero or
/// more elements (order-preserving subsequence, not necessarily contiguous).
pub fn subseto(sub: Term, l: Term) -> Goal {
    let sub2 = sub.clone();
    let l2 = l.clone();
    let l3 = l.clone();
    conde(vec![
        eq(sub.clone(), Term::nil()),
        Goal::from_fn(move |ctx, store| {
            let head = Term::fresh_var();
            let sub_tail = Term::fresh_var();
            let l_tail = Term::fresh_var();
            conj(vec![
                eq(l2.clone(), Term::pair(head.clone(), l_tail.clone())),
                eq(sub2.clone(), Term::pair(head, sub_tail.clone())),
                subseto(sub_tail, l_tail),
            ])
            .solve(ctx, store)
        }),
        Goal::from_fn(move |ctx, store| {
            let head = Term::fresh_var();
            let l_tail = Term::fresh_var();
            conj(vec![
                eq(l3.clone(), Term::pair(head, l_tail.clone())),
                subseto(sub.clone(), l_tail),
            ])
            .solve(ctx, store)
        }),
    ])
}

/// `flatteno(l, flat)`: `flat` is the list of every atom reachable from `l`
/// by recursively flattening nested pairs, in left-to-right order.
///
/// Needs `l`'s shape at each recursion step, so it is built over
/// [`crate::goal::combinators::project`] rather than pure unification —
/// the teacher has no analogue (its lists are always proper, never nested),
/// this is built directly from spec §4.8's name and list-relation idiom.
pub fn flatteno(l: Term, flat: Term) -> Goal {
    crate::goal::combinators::project(vec![l], move |walked| {
        let l = walked[0].clone();
        match l {
            Term::Nil => eq(flat.clone(), Term::nil()),
            Term::Pair(head, tail) => {
                let fh = Term::fresh_var();
                let ft = Term::fresh_var();
                conj(vec![
                    flatteno((*head).clone(), fh.clone()),
                    flatteno((*tail).clone(), ft.clone()),
                    appendo(fh, ft, flat.clone()),
                ])
            }
            Term::Var(_) => Goal::failure(),
            atom => eq(flat.clone(), Term::pair(atom, Term::nil())),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::{run, run_star};

    #[test]
    fn membero_enumerates_occurrences() {
        let results = run_star(|q| membero(q, Term::list(vec![Term::from(1i64), Term::from(2i64), Term::from(1i64)])));
        let ints: Vec<i64> = results.iter().map(|t| t.as_int().unwrap()).collect();
        assert_eq!(ints, vec![1, 2, 1]);
    }

    #[test]
    fn membero_on_empty_list_fails() {
        let results = run_star(|q| membero(q, Term::nil()));
        assert!(results.is_empty());
    }

    #[test]
    fn lengtho_computes_length() {
        let results = run(1, |q| lengtho(Term::list(vec![Term::from(1i64), Term::from(2i64), Term::from(3i64)]), q));
        assert_eq!(results, vec![Term::from(3i64)]);
    }

    #[test]
    fn reverso_reverses() {
        let results = run(1, |q| reverso(Term::list(vec![Term::from(1i64), Term::from(2i64), Term::from(3i64)]), q));
        assert_eq!(results, vec![Term::list(vec![Term::from(3i64), Term::from(2i64), Term::from(1i64)])]);
    }

    #[test]
    fn rembero_removes_first_occurrence() {
        let results = run(1, |q| {
            rembero(
                Term::from(2i64),
                Term::list(vec![Term::from(1i64), Term::from(2i64), Term::from(3i64), Term::from(2i64)]),
                q,
            )
        });
        assert_eq!(
            results,
            vec![Term::list(vec![Term::from(1i64), Term::from(3i64), Term::from(2i64)])]
        );
    }

    #[test]
    fn distincto_rejects_duplicates() {
        let results = run_star(|q| {
            conj(vec![
                eq(q.clone(), Term::list(vec![Term::from(1i64), Term::from(1i64)])),
                distincto(q),
            ])
        });
        assert!(results.is_empty());
    }

    #[test]
    fn distincto_accepts_all_distinct() {
        let results = run_star(|q| {
            conj(vec![
                eq(q.clone(), Term::list(vec![Term::from(1i64), Term::from(2i64), Term::from(3i64)])),
                distincto(q),
            ])
        });
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn subseto_accepts_subsequence() {
        let results = run_star(|q| {
            conj(vec![
                eq(q.clone(), Term::list(vec![Term::from(1i64), Term::from(3i64)])),
                subseto(q, Term::list(vec![Term::from(1i64), Term::from(2i64), Term::from(3i64)])),
            ])
        });
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn flatteno_flattens_nested_pairs() {
        let nested = Term::pair(
            Term::pair(Term::from(1i64), Term::pair(Term::from(2i64), Term::nil())),
            Term::pair(Term::from(3i64), Term::nil()),
        );
        let results = run(1, |q| flatteno(nested.clone(), q));
        assert_eq!(
            results,
            vec![Term::list(vec![Term::from(1i64), Term::from(2i64), Term::from(3i64)])]
        );
    }
}
