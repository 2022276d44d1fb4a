//! Call patterns: a normalized, hashable key identifying a tabled subgoal
//! (spec §4.6).
//!
//! Two calls to the same predicate with differently-numbered but
//! structurally identical argument terms must table to the same entry, so
//! normalization renames each distinct unbound variable to a positional
//! placeholder (`_0`, `_1`, ...) in first-occurrence order before hashing —
//! the same canonicalization idea as `store.rs`'s `deep_walk`, extended
//! with variable renaming so the hash is stable across calls.
use std::collections::HashMap;
use std::fmt::Write as _;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::store::Store;
use crate::term::{Term, VarId};
use crate::value::Value;

/// A normalized, hashed identity for a tabled call: predicate name plus
/// the structural shape of its (deep-walked) arguments.
#[derive(Clone, Debug)]
pub struct CallPattern {
    predicate: Rc<str>,
    normalized: Rc<str>,
    hash: u64,
}

impl CallPattern {
    /// Builds the pattern for calling `predicate` with `args`, walked
    /// through `store` first so two calls differing only in which
    /// variable happens to represent "the same unbound slot" table
    /// together.
    pub fn new(predicate: &str, args: &[Term], store: &Store) -> CallPattern {
        let mut renumber = HashMap::new();
        let mut normalized = String::new();
        let _ = write!(normalized, "{}(", predicate);
        for (i, a) in args.iter().enumerate() {
            if i > 0 {
                normalized.push(',');
            }
            render(&store.deep_walk(a), &mut renumber, &mut normalized);
        }
        normalized.push(')');
        CallPattern {
            predicate: Rc::from(predicate),
            hash: hash_str(&normalized),
            normalized: Rc::from(normalized.as_str()),
        }
    }

    pub fn predicate(&self) -> &str {
        &self.predicate
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }
}

impl PartialEq for CallPattern {
    fn eq(&self, other: &CallPattern) -> bool {
        self.hash == other.hash && self.normalized == other.normalized
    }
}

impl Eq for CallPattern {}

fn render(t: &Term, renumber: &mut HashMap<VarId, usize>, out: &mut String) {
    match t {
        Term::Var(handle) => {
            let id = handle.id();
            let n = renumber.len();
            let slot = *renumber.entry(id).or_insert(n);
            let _ = write!(out, "_{}", slot);
        }
        Term::Atom(Value::Int(n)) => {
            let _ = write!(out, "i{}", n);
        }
        Term::Atom(Value::Bool(b)) => {
            let _ = write!(out, "b{}", b);
        }
        Term::Atom(Value::Char(c)) => {
            let _ = write!(out, "c{:?}", c);
        }
        Term::Atom(Value::String(s)) => {
            let _ = write!(out, "s{:?}", s);
        }
        Term::Atom(Value::Symbol(s)) => {
            let _ = write!(out, "y{:?}", s);
        }
        Term::Atom(Value::Vector(items)) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                render(item, renumber, out);
            }
            out.push(']');
        }
        Term::Nil => out.push_str("()"),
        Term::Pair(car, cdr) => {
            out.push('<');
            render(car, renumber, out);
            out.push('.');
            render(cdr, renumber, out);
            out.push('>');
        }
        Term::Tie(name, body) => {
            let _ = write!(out, "tie[{}](", name);
            render(body, renumber, out);
            out.push(')');
        }
    }
}

fn hash_str(s: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Term;

    #[test]
    fn distinct_unbound_vars_table_identically() {
        let store = Store::new();
        let a = CallPattern::new("path", &[Term::fresh_var(), Term::atom(1i64)], &store);
        let b = CallPattern::new("path", &[Term::fresh_var(), Term::atom(1i64)], &store);
        assert_eq!(a, b);
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn different_ground_args_table_differently() {
        let store = Store::new();
        let a = CallPattern::new("path", &[Term::atom(1i64), Term::atom(2i64)], &store);
        let b = CallPattern::new("path", &[Term::atom(1i64), Term::atom(3i64)], &store);
        assert_ne!(a, b);
    }

    #[test]
    fn different_predicates_table_differently() {
        let store = Store::new();
        let a = CallPattern::new("path", &[Term::atom(1i64)], &store);
        let b = CallPattern::new("edge", &[Term::atom(1i64)], &store);
        assert_ne!(a, b);
    }
}
