//! Variable substitutions with walking and occur-checked binding.
//!
//! Grounded on the teacher's `state/substitution.rs` (`SMap::walk`/
//! `walk_star`/`occurs_check`), rebuilt over `Term`/`VarId` instead of the
//! teacher's generic `LTerm<U>`.
use std::collections::HashMap;
use std::rc::Rc;

use crate::term::{Term, VarId};

/// Persistent variable -> term mapping, cheap to clone (`Rc`-wrapped map),
/// matching the teacher's `Rc<SMap<..>>` field inside `State`.
#[derive(Clone, Debug)]
pub struct Subst(Rc<HashMap<VarId, Term>>);

impl Subst {
    pub fn new() -> Subst {
        Subst(Rc::new(HashMap::new()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, id: VarId) -> Option<&Term> {
        self.0.get(&id)
    }

    pub fn contains(&self, id: VarId) -> bool {
        self.0.contains_key(&id)
    }

    /// Returns a new substitution extended with `id -> term`. Does not
    /// occur-check; callers must call [`Subst::occurs_check`] first.
    pub fn extend(&self, id: VarId, term: Term) -> Subst {
        let mut map = (*self.0).clone();
        map.insert(id, term);
        Subst(Rc::new(map))
    }

    /// Walks a term through the substitution until a non-variable or an
    /// unbound variable is reached (spec §3).
    pub fn walk(&self, t: &Term) -> Term {
        let mut cur = t.clone();
        loop {
            match cur.as_var() {
                Some(id) => match self.0.get(&id) {
                    Some(next) => cur = next.clone(),
                    None => return cur,
                },
                None => return cur,
            }
        }
    }

    /// Walks, then additionally descends through `Pair`/`Tie` to walk every
    /// subterm, producing a tree whose leaves are all fully walked (spec
    /// §3, `deep_walk`). Idempotent: `deep_walk(deep_walk(t)) == deep_walk(t)`.
    pub fn deep_walk(&self, t: &Term) -> Term {
        let walked = self.walk(t);
        match &walked {
            Term::Pair(car, cdr) => Term::pair(self.deep_walk(car), self.deep_walk(cdr)),
            Term::Tie(name, body) => Term::Tie(name.clone(), Rc::new(self.deep_walk(body))),
            _ => walked,
        }
    }

    /// Occur check: does variable `x` occur (after walking) anywhere inside
    /// `t`? A bind that would fail this check is rejected (cycles forbidden,
    /// spec §3).
    pub fn occurs_check(&self, x: VarId, t: &Term) -> bool {
        match self.walk(t) {
            Term::Var(v) => v.id() == x,
            Term::Pair(car, cdr) => self.occurs_check(x, &car) || self.occurs_check(x, &cdr),
            Term::Tie(_, body) => self.occurs_check(x, &body),
            _ => false,
        }
    }

    /// Binds `id` to `term` if doing so does not create a cycle. Returns
    /// `None` on occur-check failure; constraint re-checking happens at the
    /// store layer (spec §4.3), not here.
    pub fn bind(&self, id: VarId, term: Term) -> Option<Subst> {
        if self.occurs_check(id, &term) {
            return None;
        }
        Some(self.extend(id, term))
    }

    /// All variable ids that are currently bound (keys only, not values).
    pub fn bound_vars(&self) -> impl Iterator<Item = VarId> + '_ {
        self.0.keys().copied()
    }

    /// All variable ids mentioned as keys or as variable-valued bindings.
    pub fn vars(&self) -> Vec<VarId> {
        let mut out = Vec::new();
        for (k, v) in self.0.iter() {
            out.push(*k);
            if let Term::Var(vh) = v {
                out.push(vh.id());
            }
        }
        out
    }
}

impl Default for Subst {
    fn default() -> Subst {
        Subst::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_follows_chain_to_value() {
        let v0 = Term::fresh_var();
        let v1 = Term::fresh_var();
        let val = Term::atom(42i64);
        let s = Subst::new()
            .bind(v0.as_var().unwrap(), v1.clone())
            .unwrap()
            .bind(v1.as_var().unwrap(), val.clone())
            .unwrap();
        assert_eq!(s.walk(&v0), val);
    }

    #[test]
    fn walk_stops_at_unbound_var() {
        let v0 = Term::fresh_var();
        let s = Subst::new();
        assert_eq!(s.walk(&v0), v0);
    }

    #[test]
    fn deep_walk_recurses_into_pairs() {
        let v0 = Term::fresh_var();
        let v1 = Term::fresh_var();
        let pair = Term::pair(v0.clone(), v1.clone());
        let s = Subst::new()
            .bind(v0.as_var().unwrap(), Term::atom(1i64))
            .unwrap()
            .bind(v1.as_var().unwrap(), Term::atom(2i64))
            .unwrap();
        let walked = s.deep_walk(&pair);
        assert_eq!(walked, Term::pair(Term::atom(1i64), Term::atom(2i64)));
        assert_eq!(s.deep_walk(&walked), walked);
    }

    #[test]
    fn occurs_check_rejects_self_reference() {
        let v0 = Term::fresh_var();
        let v1 = Term::fresh_var();
        let s = Subst::new().bind(v0.as_var().unwrap(), v1.clone()).unwrap();
        let cyclic = Term::pair(v1.clone(), Term::nil());
        assert!(s.bind(v1.as_var().unwrap(), cyclic).is_none());
    }
}
