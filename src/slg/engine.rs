//! The SLG tabling engine: evaluates tabled subgoals to a fixed point and
//! computes well-founded-semantics truth values for negation (spec §4.6).
//!
//! There is no real producer/consumer concurrency here — `Goal`/`Store`
//! are `Rc`-based and this crate is single-process by design (see
//! `executor.rs`'s doc comment) — so "the producer runs, the consumer
//! observes an event sequence number" becomes a synchronous, reentrancy-
//! guarded call stack plus a semi-naive SCC fixpoint loop: a nested call
//! to a pattern already on the stack returns whatever the trie already
//! holds (a "consumer sees a partial answer set"), and once the outermost
//! call in a cycle finishes, every member of its dependency SCC is re-run
//! from scratch until a full pass adds no new answer. This is the same
//! "repeatedly re-run to quiescence" contract spec §4.6 describes, just
//! without a literal background thread per subgoal.
use std::cell::RefCell;

use crate::config::SlgConfig;
use crate::error::{Error, Result};
use crate::goal::Goal;
use crate::run::Context;
use crate::slg::pattern::CallPattern;
use crate::slg::table::{Polarity, Status, SubgoalTable, Truth};
use crate::slg::trie::DelaySet;
use crate::store::Store;
use crate::term::Term;

pub use crate::slg::table::Truth as WfsTruth;

/// The tabling engine: one `SubgoalTable` plus the reentrancy-detecting
/// call stack and configuration bounds.
pub struct Engine {
    table: SubgoalTable,
    config: SlgConfig,
    call_stack: RefCell<Vec<u64>>,
}

impl Engine {
    pub fn new(config: SlgConfig) -> Engine {
        Engine {
            table: SubgoalTable::new(),
            config,
            call_stack: RefCell::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &SlgConfig {
        &self.config
    }

    fn current_parent(&self) -> Option<u64> {
        self.call_stack.borrow().last().copied()
    }

    /// Evaluates `pattern` (a call to `predicate` with reified `params`
    /// produced by `producer`), returning every currently-known answer as
    /// reified argument tuples. Driving a subgoal that is already on the
    /// call stack (a recursive tabled call) returns the trie's current
    /// snapshot without re-entering the producer.
    pub fn evaluate(&self, ctx: &Context, pattern: CallPattern, params: Vec<Term>, producer: Goal) -> Result<Vec<Vec<Term>>> {
        if let Some(parent) = self.current_parent() {
            self.table.add_dependency(parent, pattern.hash(), Polarity::Positive);
        }
        self.drive(ctx, pattern, params, producer)
    }

    /// The shared driving logic behind [`Engine::evaluate`] and
    /// [`Engine::negation_truth`], without recording a dependency edge
    /// itself — callers record the edge with the polarity appropriate to
    /// how they are calling in.
    fn drive(&self, ctx: &Context, pattern: CallPattern, params: Vec<Term>, producer: Goal) -> Result<Vec<Vec<Term>>> {
        let hash = pattern.hash();
        if self.call_stack.borrow().contains(&hash) {
            return Ok(self.snapshot_bindings(hash));
        }
        if self.table.get(hash).is_none() && self.table.len() >= self.config.max_table_size {
            return Err(Error::InvalidArgument(format!(
                "subgoal table at capacity ({} entries)",
                self.config.max_table_size
            )));
        }
        let (_entry, is_new) = self.table.get_or_create(hash, pattern, params, producer);
        if is_new {
            self.run_producer(ctx, hash)?;
            self.run_fixpoint(ctx, hash)?;
        }
        Ok(self.snapshot_bindings(hash))
    }

    fn snapshot_bindings(&self, hash: u64) -> Vec<Vec<Term>> {
        match self.table.get(hash) {
            Some(entry) => entry.snapshot_answers().into_iter().map(|a| a.bindings).collect(),
            None => Vec::new(),
        }
    }

    fn run_producer(&self, ctx: &Context, hash: u64) -> Result<()> {
        let entry = self.table.get(hash).expect("entry exists");
        entry.set_status(Status::InProgress);
        self.call_stack.borrow_mut().push(hash);

        let stream = entry.producer.solve(ctx, Store::new());
        let stores = stream.take(ctx, Some(self.config.max_answers_per_subgoal));
        for store in stores {
            let bindings: Vec<Term> = entry.params.iter().map(|p| store.deep_walk(p)).collect();
            let delay = if self.config.enable_subsumption_checking {
                entry.take_pending_delay()
            } else {
                entry.take_pending_delay();
                DelaySet::new()
            };
            let is_unconditional = delay.is_empty();
            if entry.insert_answer(bindings, delay).is_some() {
                entry.bump_event();
                if self.config.debug_wfs {
                    tracing::debug!(hash, seq = entry.event_seq(), unconditional = is_unconditional, "SLG answer inserted");
                }
                if is_unconditional {
                    self.propagate_unconditional(hash);
                }
            }
        }

        self.call_stack.borrow_mut().pop();
        entry.set_status(Status::Complete);
        if entry.answers_len() == 0 {
            self.propagate_completion_with_no_answers(hash);
        }
        Ok(())
    }

    /// When `hash` gains an unconditional answer, every tabled answer
    /// elsewhere in the table whose delay set mentions `hash` is
    /// retracted (spec: "a child subgoal gaining its first unconditional
    /// answer retracts parent answers that depended on its absence").
    fn propagate_unconditional(&self, hash: u64) {
        for parent_hash in self.table.parents_of(hash) {
            if let Some(parent) = self.table.get(parent_hash) {
                parent.retract_binding(hash);
            }
        }
    }

    /// When `hash` completes with zero answers, every parent's delay sets
    /// mentioning `hash` are simplified (the dependency is now
    /// unconditionally absent), possibly promoting answers to
    /// unconditional.
    fn propagate_completion_with_no_answers(&self, hash: u64) {
        for parent_hash in self.table.parents_of(hash) {
            if let Some(parent) = self.table.get(parent_hash) {
                parent.simplify_remove(hash);
            }
        }
    }

    fn run_fixpoint(&self, ctx: &Context, hash: u64) -> Result<()> {
        let scc = self.table.scc_containing(hash);
        if scc.len() <= 1 {
            return Ok(());
        }
        for pass in 0..self.config.max_fixpoint_iterations {
            tracing::trace!(pass, scc_size = scc.len(), "SLG SCC fixpoint pass");
            let mut changed = false;
            for &h in &scc {
                let Some(entry) = self.table.get(h) else { continue };
                let before_seq = entry.event_seq();
                entry.set_status(Status::InProgress);
                self.call_stack.borrow_mut().push(h);
                let stream = entry.producer.solve(ctx, Store::new());
                let stores = stream.take(ctx, Some(self.config.max_answers_per_subgoal));
                for store in stores {
                    let bindings: Vec<Term> = entry.params.iter().map(|p| store.deep_walk(p)).collect();
                    let delay = entry.take_pending_delay();
                    let is_unconditional = delay.is_empty();
                    if entry.insert_answer(bindings, delay).is_some() {
                        entry.bump_event();
                        if is_unconditional {
                            self.propagate_unconditional(h);
                        }
                    }
                }
                self.call_stack.borrow_mut().pop();
                entry.set_status(Status::Complete);
                if entry.wait_change_since(before_seq) {
                    changed = true;
                    if self.config.debug_wfs {
                        tracing::debug!(hash = h, seq = entry.event_seq(), "SLG event-sequence transition");
                    }
                }
            }
            if !changed {
                return Ok(());
            }
        }
        Err(Error::FixpointOverflow {
            context: format!("SLG SCC fixpoint over {} subgoals", scc.len()),
        })
    }

    /// Computes the well-founded truth value of `not inner`, recording a
    /// negative dependency edge from the currently-evaluating subgoal (if
    /// any) and, when the value is `Undefined`, queuing that dependency
    /// onto the current subgoal's *next* produced answer as a delay set
    /// entry (spec: `queue_delay_set_for_next_answer`).
    pub fn negation_truth(&self, ctx: &Context, pattern: CallPattern, params: Vec<Term>, producer: Goal) -> Result<WfsTruth> {
        let hash = pattern.hash();
        let parent = self.current_parent();
        if let Some(p) = parent {
            self.table.add_dependency(p, hash, Polarity::Negative);
            if self.config.enforce_stratification {
                if let (Some(pe), Some(ie)) = (self.table.get(p), self.stratum_of(hash)) {
                    if let Some(parent_stratum) = pe.stratum() {
                        if parent_stratum <= ie {
                            return Err(Error::StratificationViolation {
                                parent: parent_stratum,
                                inner: ie,
                            });
                        }
                    }
                }
            }
        }
        self.drive(ctx, pattern, params, producer)?;
        let truth = self.table.get(hash).map(|e| e.truth()).unwrap_or(Truth::Undefined);
        if self.config.debug_wfs {
            tracing::debug!(hash, ?truth, "SLG negation_truth computed");
        }
        if truth == Truth::Undefined {
            if let Some(p) = parent {
                if let Some(pe) = self.table.get(p) {
                    pe.queue_pending_delay(DelaySet::single(hash));
                }
            }
        }
        Ok(truth)
    }

    fn stratum_of(&self, hash: u64) -> Option<i64> {
        self.table.get(hash).and_then(|e| e.stratum())
    }

    /// Assigns `stratum` to the entry for `pattern`'s hash, creating a
    /// placeholder entry if none exists yet — lets callers declare strata
    /// up front (spec §4.6's stratification) before the first `evaluate`.
    pub fn set_stratum(&self, pattern: &CallPattern, stratum: i64) {
        let hash = pattern.hash();
        if self.table.get(hash).is_none() {
            self.table
                .get_or_create(hash, pattern.clone(), Vec::new(), Goal::failure());
        }
        if let Some(entry) = self.table.get(hash) {
            entry.set_stratum(stratum);
        }
    }

    /// Removes every subgoal tabled for `predicate` (spec: predicate-based
    /// invalidation — e.g. after a `pldb` fact change).
    pub fn clear_predicate(&self, predicate: &str) {
        self.table.clear_predicate(predicate);
    }

    /// Drops the entire subgoal table.
    pub fn reset(&self) {
        self.table.reset();
    }

    pub fn table_len(&self) -> usize {
        self.table.len()
    }
}

thread_local! {
    /// The process's (per-thread) convenience engine (spec §9's redesign
    /// note: "replace process-wide defaults with an explicit engine handle
    /// passed by the caller; keep a lazily initialized optional global for
    /// convenience"). A `thread_local! RefCell`, not a cross-thread
    /// `Mutex`/`OnceLock`, since `Engine`'s answer tries hold `Rc`-based
    /// `Term`s and can't cross a thread boundary (see this module's doc
    /// comment and `executor.rs`).
    static DEFAULT_ENGINE: RefCell<Engine> = RefCell::new(Engine::new(SlgConfig::default()));
}

/// Runs `f` against the lazily-initialized default engine.
pub fn with_default_engine<R>(f: impl FnOnce(&Engine) -> R) -> R {
    DEFAULT_ENGINE.with(|cell| f(&cell.borrow()))
}

/// Drops every tabled answer cached in the default engine, so a later call
/// through it can't observe answers left behind by an earlier, unrelated
/// query (used by `run::run_with_isolation`).
pub fn reset_default_engine() {
    DEFAULT_ENGINE.with(|cell| cell.borrow().reset());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::combinators::conj;
    use crate::goal::primitives::eq;

    fn facts_producer(px: Term, py: Term, pairs: &'static [(&'static str, &'static str)]) -> Goal {
        Goal::from_fn(move |ctx: &Context, s: Store| {
            let branches: Vec<Goal> = pairs
                .iter()
                .map(|(a, b)| conj(vec![eq(px.clone(), Term::from(*a)), eq(py.clone(), Term::from(*b))]))
                .collect();
            crate::goal::combinators::disj(branches).solve(ctx, s)
        })
    }

    #[test]
    fn evaluate_dedups_identical_answers_across_calls() {
        let engine = Engine::new(SlgConfig::default());
        let ctx = Context::new();
        static EDGES: &[(&str, &str)] = &[("a", "b"), ("a", "b"), ("b", "c")];
        let store = Store::new();
        let pattern = CallPattern::new("edge", &[Term::from("a"), Term::fresh_var()], &store);
        let px = Term::fresh_var();
        let py = Term::fresh_var();
        let producer = facts_producer(px.clone(), py.clone(), EDGES);
        let answers = engine.evaluate(&ctx, pattern.clone(), vec![px, py], producer).unwrap();
        // EDGES has three rows but ("a","b") repeats; the trie dedups by
        // structural equality so only two distinct answers remain.
        assert_eq!(answers.len(), 2);

        // Re-evaluating the identical pattern returns the cached snapshot
        // without re-running the producer (table size unchanged).
        let before = engine.table_len();
        let px2 = Term::fresh_var();
        let py2 = Term::fresh_var();
        let producer2 = facts_producer(px2.clone(), py2.clone(), EDGES);
        engine.evaluate(&ctx, pattern, vec![px2, py2], producer2).unwrap();
        assert_eq!(engine.table_len(), before);
    }

    #[test]
    fn negation_truth_is_false_when_an_unconditional_answer_exists() {
        let engine = Engine::new(SlgConfig::default());
        let ctx = Context::new();
        static EDGES: &[(&str, &str)] = &[("a", "b")];
        let store = Store::new();
        let pattern = CallPattern::new("edge", &[Term::from("a"), Term::from("b")], &store);
        let px = Term::fresh_var();
        let py = Term::fresh_var();
        let producer = facts_producer(px.clone(), py.clone(), EDGES);
        let truth = engine.negation_truth(&ctx, pattern, vec![px, py], producer).unwrap();
        assert_eq!(truth, WfsTruth::False);
    }

    #[test]
    fn negation_truth_is_true_when_the_subgoal_has_no_answers() {
        let engine = Engine::new(SlgConfig::default());
        let ctx = Context::new();
        static EDGES: &[(&str, &str)] = &[("a", "b")];
        let store = Store::new();
        let pattern = CallPattern::new("edge", &[Term::from("x"), Term::from("y")], &store);
        let px = Term::fresh_var();
        let py = Term::fresh_var();
        let producer = facts_producer(px.clone(), py.clone(), EDGES);
        let truth = engine.negation_truth(&ctx, pattern, vec![px, py], producer).unwrap();
        assert_eq!(truth, WfsTruth::True);
    }

    #[test]
    fn clear_predicate_empties_only_that_predicates_entries() {
        let engine = Engine::new(SlgConfig::default());
        let ctx = Context::new();
        static EDGES: &[(&str, &str)] = &[("a", "b")];
        let store = Store::new();
        let edge_pattern = CallPattern::new("edge", &[Term::fresh_var(), Term::fresh_var()], &store);
        let other_pattern = CallPattern::new("other", &[Term::fresh_var()], &store);
        let px = Term::fresh_var();
        let py = Term::fresh_var();
        engine
            .evaluate(&ctx, edge_pattern, vec![px, py], facts_producer(Term::fresh_var(), Term::fresh_var(), EDGES))
            .unwrap();
        engine.evaluate(&ctx, other_pattern, vec![Term::fresh_var()], Goal::success()).unwrap();
        assert_eq!(engine.table_len(), 2);
        engine.clear_predicate("edge");
        assert_eq!(engine.table_len(), 1);
    }
}
