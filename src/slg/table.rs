//! `SubgoalTable`: the hash-indexed store of every subgoal entry the SLG
//! engine has started or finished, plus the dependency graph between them
//! (spec §4.6).
//!
//! Entries are `Rc<SubgoalEntry>` with interior mutability via `RefCell`,
//! matching the rest of the crate's single-process model (the table is
//! never shared across real OS threads, same as `slg::engine`'s producer
//! loop). Dependency SCC decomposition uses `petgraph::algo::tarjan_scc`,
//! rebuilding a small `DiGraph` from the table's adjacency map on demand
//! rather than maintaining a persistent graph object through node
//! removals (`clear_predicate`/`reset`), which would otherwise need
//! `petgraph`'s index-invalidating `remove_node`.
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use petgraph::algo::tarjan_scc;
use petgraph::graph::DiGraph;

use crate::goal::Goal;
use crate::slg::pattern::CallPattern;
use crate::slg::trie::{AnswerTrie, DelaySet};
use crate::term::Term;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Status {
    New,
    InProgress,
    Complete,
    Cancelled,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Polarity {
    Positive,
    Negative,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Truth {
    True,
    False,
    Undefined,
}

/// One tabled subgoal's full bookkeeping: its pattern, the template
/// variables whose deep-walked bindings form each answer, its answer
/// trie, status, and producer so the fixpoint loop can re-run it.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct SubgoalEntry {
    pub pattern: CallPattern,
    pub params: Vec<Term>,
    #[derivative(Debug = "ignore")]
    pub producer: Goal,
    answers: RefCell<AnswerTrie>,
    status: Cell<Status>,
    stratum: Cell<Option<i64>>,
    event_seq: Cell<u64>,
    pending_delay: RefCell<Option<DelaySet>>,
    truth: Cell<Truth>,
}

impl SubgoalEntry {
    fn new(pattern: CallPattern, params: Vec<Term>, producer: Goal) -> SubgoalEntry {
        SubgoalEntry {
            pattern,
            params,
            producer,
            answers: RefCell::new(AnswerTrie::new()),
            status: Cell::new(Status::New),
            stratum: Cell::new(None),
            event_seq: Cell::new(0),
            pending_delay: RefCell::new(None),
            truth: Cell::new(Truth::Undefined),
        }
    }

    pub fn status(&self) -> Status {
        self.status.get()
    }

    pub fn set_status(&self, s: Status) {
        self.status.set(s);
    }

    pub fn stratum(&self) -> Option<i64> {
        self.stratum.get()
    }

    pub fn set_stratum(&self, s: i64) {
        self.stratum.set(Some(s));
    }

    pub fn event_seq(&self) -> u64 {
        self.event_seq.get()
    }

    pub fn bump_event(&self) {
        self.event_seq.set(self.event_seq.get() + 1);
    }

    /// Reports whether this entry's sequence number has moved past
    /// `since`. There is no thread to block on in this crate's
    /// synchronous single-process model (see this module's doc comment),
    /// so unlike a channel-backed `wait_change_since` this never blocks —
    /// it is a poll a caller makes after re-running a producer, not a
    /// suspension point.
    pub fn wait_change_since(&self, since: u64) -> bool {
        self.event_seq.get() != since
    }

    /// Takes whatever delay set was queued by a nested `negation_truth`
    /// call for the *next* answer this entry's producer inserts (spec:
    /// `queue_delay_set_for_next_answer`).
    pub fn take_pending_delay(&self) -> DelaySet {
        self.pending_delay.borrow_mut().take().unwrap_or_default()
    }

    pub fn queue_pending_delay(&self, extra: DelaySet) {
        let mut slot = self.pending_delay.borrow_mut();
        let mut merged = slot.take().unwrap_or_default();
        merged.union_with(&extra);
        *slot = Some(merged);
    }

    pub fn insert_answer(&self, bindings: Vec<Term>, delay: DelaySet) -> Option<usize> {
        self.answers.borrow_mut().insert(bindings, delay)
    }

    pub fn answers_len(&self) -> usize {
        self.answers.borrow().len_unretracted()
    }

    pub fn snapshot_answers(&self) -> Vec<crate::slg::trie::Answer> {
        self.answers.borrow().snapshot()
    }

    pub fn truth(&self) -> Truth {
        if self.status.get() != Status::Complete {
            return Truth::Undefined;
        }
        let trie = self.answers.borrow();
        if trie.len_unretracted() == 0 {
            Truth::True
        } else if trie.has_unconditional() {
            Truth::False
        } else {
            Truth::Undefined
        }
    }

    pub fn simplify_remove(&self, child: u64) -> Vec<usize> {
        let promoted = self.answers.borrow_mut().simplify_remove(child);
        if !promoted.is_empty() {
            self.bump_event();
        }
        promoted
    }

    pub fn retract_binding(&self, child: u64) {
        let before = self.answers.borrow().len_unretracted();
        self.answers.borrow_mut().retract_where(|a| a.delay.contains(child));
        if self.answers.borrow().len_unretracted() != before {
            self.bump_event();
        }
    }
}

/// The engine-wide index of subgoal entries and their dependency edges.
#[derive(Default)]
pub struct SubgoalTable {
    entries: RefCell<HashMap<u64, Rc<SubgoalEntry>>>,
    /// parent hash -> (child hash, polarity) edges recorded while the
    /// parent's producer was running.
    edges: RefCell<HashMap<u64, Vec<(u64, Polarity)>>>,
    /// child hash -> set of parent hashes, the reverse of `edges`, used to
    /// propagate delay-set simplification/retraction.
    reverse: RefCell<HashMap<u64, HashSet<u64>>>,
}

impl SubgoalTable {
    pub fn new() -> SubgoalTable {
        SubgoalTable::default()
    }

    pub fn get(&self, hash: u64) -> Option<Rc<SubgoalEntry>> {
        self.entries.borrow().get(&hash).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Returns the entry for `hash`, creating it (status `New`) if absent.
    /// The second element is `true` iff this call created it.
    pub fn get_or_create(&self, hash: u64, pattern: CallPattern, params: Vec<Term>, producer: Goal) -> (Rc<SubgoalEntry>, bool) {
        if let Some(existing) = self.entries.borrow().get(&hash) {
            return (existing.clone(), false);
        }
        let entry = Rc::new(SubgoalEntry::new(pattern, params, producer));
        self.entries.borrow_mut().insert(hash, entry.clone());
        (entry, true)
    }

    pub fn add_dependency(&self, parent: u64, child: u64, polarity: Polarity) {
        let mut edges = self.edges.borrow_mut();
        let list = edges.entry(parent).or_insert_with(Vec::new);
        if !list.iter().any(|(c, p)| *c == child && *p == polarity) {
            list.push((child, polarity));
        }
        drop(edges);
        self.reverse.borrow_mut().entry(child).or_insert_with(HashSet::new).insert(parent);
    }

    pub fn parents_of(&self, child: u64) -> Vec<u64> {
        self.reverse
            .borrow()
            .get(&child)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    /// The strongly-connected component (by hash) containing `hash`,
    /// considering only positive edges (negation never forms a tabling
    /// cycle that the naive fixpoint loop needs to iterate — a negative
    /// edge's target is driven to completion once via `negation_truth`,
    /// not re-run every fixpoint pass).
    pub fn scc_containing(&self, hash: u64) -> Vec<u64> {
        let entries = self.entries.borrow();
        let edges = self.edges.borrow();
        let mut graph = DiGraph::<u64, ()>::new();
        let mut index = HashMap::new();
        for &h in entries.keys() {
            let idx = graph.add_node(h);
            index.insert(h, idx);
        }
        for (parent, children) in edges.iter() {
            let Some(&pidx) = index.get(parent) else { continue };
            for (child, polarity) in children {
                if *polarity != Polarity::Positive {
                    continue;
                }
                if let Some(&cidx) = index.get(child) {
                    graph.add_edge(pidx, cidx, ());
                }
            }
        }
        for component in tarjan_scc(&graph) {
            if component.iter().any(|idx| graph[*idx] == hash) {
                return component.into_iter().map(|idx| graph[idx]).collect();
            }
        }
        vec![hash]
    }

    /// Removes every entry whose pattern's predicate is `predicate`
    /// (spec: predicate-based invalidation). Dependency edges referencing
    /// a removed hash are left in place but become inert, since
    /// `scc_containing`/lookups always guard on the entry still being
    /// present in `entries`.
    pub fn clear_predicate(&self, predicate: &str) {
        let removed: Vec<u64> = self
            .entries
            .borrow()
            .iter()
            .filter(|(_, e)| e.pattern.predicate() == predicate)
            .map(|(h, _)| *h)
            .collect();
        let mut entries = self.entries.borrow_mut();
        for h in &removed {
            entries.remove(h);
        }
    }

    /// Drops every entry and every recorded dependency edge.
    pub fn reset(&self) {
        self.entries.borrow_mut().clear();
        self.edges.borrow_mut().clear();
        self.reverse.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::Context;
    use crate::store::Store;
    use crate::stream::Stream;

    fn dummy_pattern(name: &str) -> CallPattern {
        CallPattern::new(name, &[], &Store::new())
    }

    fn dummy_goal() -> Goal {
        Goal::from_fn(|_ctx: &Context, s: Store| Stream::unit(s))
    }

    #[test]
    fn get_or_create_is_idempotent_per_hash() {
        let table = SubgoalTable::new();
        let pattern = dummy_pattern("p");
        let hash = pattern.hash();
        let (e1, created1) = table.get_or_create(hash, pattern.clone(), vec![], dummy_goal());
        let (e2, created2) = table.get_or_create(hash, pattern, vec![], dummy_goal());
        assert!(created1);
        assert!(!created2);
        assert!(Rc::ptr_eq(&e1, &e2));
    }

    #[test]
    fn scc_groups_mutually_dependent_hashes() {
        let table = SubgoalTable::new();
        let a = dummy_pattern("a").hash();
        let b = dummy_pattern("b").hash();
        table.get_or_create(a, dummy_pattern("a"), vec![], dummy_goal());
        table.get_or_create(b, dummy_pattern("b"), vec![], dummy_goal());
        table.add_dependency(a, b, Polarity::Positive);
        table.add_dependency(b, a, Polarity::Positive);
        let scc = table.scc_containing(a);
        assert_eq!(scc.len(), 2);
        assert!(scc.contains(&a) && scc.contains(&b));
    }

    #[test]
    fn clear_predicate_removes_only_matching_entries() {
        let table = SubgoalTable::new();
        let a = dummy_pattern("a").hash();
        let b = dummy_pattern("b").hash();
        table.get_or_create(a, dummy_pattern("a"), vec![], dummy_goal());
        table.get_or_create(b, dummy_pattern("b"), vec![], dummy_goal());
        table.clear_predicate("a");
        assert!(table.get(a).is_none());
        assert!(table.get(b).is_some());
    }
}
