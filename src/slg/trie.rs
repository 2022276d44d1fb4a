//! `AnswerTrie`: insertion-ordered, deduplicated answer storage for one
//! tabled subgoal, plus `DelaySet`s for well-founded negation (spec §4.6).
//!
//! Answers are retracted, never removed (spec: "retraction marks an
//! answer rather than deleting it", mirroring `store.rs`'s append-only
//! constraint list rather than in-place mutation) so that a snapshot
//! iterator taken mid-evaluation never observes an index shift underfoot.
use std::collections::BTreeSet;

use crate::term::Term;

/// The set of subgoal hashes a conditional answer still depends on for
/// its truth value. An empty delay set means the answer is unconditional.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DelaySet(BTreeSet<u64>);

impl DelaySet {
    pub fn new() -> DelaySet {
        DelaySet(BTreeSet::new())
    }

    pub fn single(hash: u64) -> DelaySet {
        let mut s = BTreeSet::new();
        s.insert(hash);
        DelaySet(s)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, hash: u64) -> bool {
        self.0.contains(&hash)
    }

    pub fn remove(&mut self, hash: u64) {
        self.0.remove(&hash);
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.0.iter().copied()
    }

    pub fn union_with(&mut self, other: &DelaySet) {
        for h in other.iter() {
            self.0.insert(h);
        }
    }
}

/// One recorded answer: the tabled call's reified argument bindings, an
/// insertion index (stable even after later retraction), and the delay
/// set it depended on when produced.
#[derive(Clone, Debug)]
pub struct Answer {
    pub index: usize,
    pub bindings: Vec<Term>,
    pub delay: DelaySet,
    pub retracted: bool,
}

/// A tabled subgoal's answer store. Dedup is structural-equality over
/// `bindings` — since each answer is already a fully reified tuple of the
/// tabled call's parameters, structural equality *is* this engine's
/// subsumption relation (no partial-instance ordering over non-ground
/// terms is attempted).
#[derive(Debug, Default)]
pub struct AnswerTrie {
    answers: Vec<Answer>,
    next_index: usize,
}

impl AnswerTrie {
    pub fn new() -> AnswerTrie {
        AnswerTrie {
            answers: Vec::new(),
            next_index: 0,
        }
    }

    /// Inserts `bindings` with delay set `delay` unless an unretracted
    /// answer with identical bindings already exists. Returns the new
    /// answer's index, or `None` if it was a duplicate.
    pub fn insert(&mut self, bindings: Vec<Term>, delay: DelaySet) -> Option<usize> {
        if self
            .answers
            .iter()
            .any(|a| !a.retracted && a.bindings == bindings)
        {
            return None;
        }
        let index = self.next_index;
        self.next_index += 1;
        self.answers.push(Answer {
            index,
            bindings,
            delay,
            retracted: false,
        });
        Some(index)
    }

    /// Marks every unretracted answer matching `pred` as retracted,
    /// without removing it from the backing vector.
    pub fn retract_where(&mut self, mut pred: impl FnMut(&Answer) -> bool) {
        for a in self.answers.iter_mut() {
            if !a.retracted && pred(a) {
                a.retracted = true;
            }
        }
    }

    /// Removes `child` from every unretracted answer's delay set (spec:
    /// delay-set simplification when a depended-on subgoal resolves to
    /// `True`). Returns the indices of answers newly promoted to
    /// unconditional.
    pub fn simplify_remove(&mut self, child: u64) -> Vec<usize> {
        let mut promoted = Vec::new();
        for a in self.answers.iter_mut() {
            if a.retracted || !a.delay.contains(child) {
                continue;
            }
            a.delay.remove(child);
            if a.delay.is_empty() {
                promoted.push(a.index);
            }
        }
        promoted
    }

    pub fn iter_unretracted(&self) -> impl Iterator<Item = &Answer> {
        self.answers.iter().filter(|a| !a.retracted)
    }

    /// A snapshot of the unretracted answers as of this call, cheap to
    /// clone since `Term`'s payloads are `Rc`-backed.
    pub fn snapshot(&self) -> Vec<Answer> {
        self.iter_unretracted().cloned().collect()
    }

    pub fn len_unretracted(&self) -> usize {
        self.iter_unretracted().count()
    }

    pub fn has_unconditional(&self) -> bool {
        self.iter_unretracted().any(|a| a.delay.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_dedups_identical_bindings() {
        let mut trie = AnswerTrie::new();
        let a = vec![Term::atom(1i64)];
        assert!(trie.insert(a.clone(), DelaySet::new()).is_some());
        assert!(trie.insert(a, DelaySet::new()).is_none());
        assert_eq!(trie.len_unretracted(), 1);
    }

    #[test]
    fn retraction_marks_without_removing_index() {
        let mut trie = AnswerTrie::new();
        trie.insert(vec![Term::atom(1i64)], DelaySet::new());
        trie.retract_where(|a| a.bindings == vec![Term::atom(1i64)]);
        assert_eq!(trie.len_unretracted(), 0);
    }

    #[test]
    fn simplify_remove_promotes_to_unconditional() {
        let mut trie = AnswerTrie::new();
        trie.insert(vec![Term::atom(1i64)], DelaySet::single(42));
        assert!(!trie.has_unconditional());
        let promoted = trie.simplify_remove(42);
        assert_eq!(promoted, vec![0]);
        assert!(trie.has_unconditional());
    }
}
