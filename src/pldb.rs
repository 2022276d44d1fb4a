//! The read-only fact-database collaborator the core consumes (spec §4.9).
//!
//! No teacher analogue — `proto_vulcan` has no fact database. Built
//! directly from the spec's interface contract: `Relation`, a `Database`
//! trait offering `query`/`add_fact`/`remove_fact`/`all_facts`/`fact_count`
//! as persistent (clone-on-write) operations, and change-event
//! notification so a tabling engine can invalidate cached answers. Change
//! events are delivered over a `crossbeam_channel`, the same crate
//! `executor::WorkerPool` already uses for its work queue, rather than a
//! bespoke observer list. `MemoryDatabase` is a minimal in-memory
//! reference implementation sufficient to drive the SLG tests — storage
//! and indexing strategy are explicitly out of scope (spec §1), so it
//! makes no attempt to be a tuned database.
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::goal::Goal;
use crate::stream::Stream;
use crate::term::Term;

/// A named fact relation with a declared arity and which columns are
/// indexed for O(1) lookup when the query pattern is ground there.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Relation {
    name: Rc<str>,
    arity: usize,
    indexed_columns: Rc<Vec<usize>>,
}

impl Relation {
    pub fn new(name: impl Into<Rc<str>>, arity: usize, indexed_columns: Vec<usize>) -> Relation {
        Relation {
            name: name.into(),
            arity,
            indexed_columns: Rc::new(indexed_columns),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn indexed_columns(&self) -> &[usize] {
        &self.indexed_columns
    }
}

/// What changed about a relation's extension, broadcast to invalidate any
/// tabled predicate whose answers were derived from it (spec §4.9).
#[derive(Clone, Debug)]
pub enum FactChange {
    Added(Relation, Vec<Term>),
    Removed(Relation, Vec<Term>),
}

/// The collaborator interface the core's goals are written against. Every
/// mutating operation is persistent: it returns a new value rather than
/// mutating `self`, matching `Store`'s clone-on-write discipline (spec §3).
pub trait Database: std::fmt::Debug {
    /// A goal that unifies `pattern` (one term per column) against every
    /// fact currently stored under `rel`, succeeding once per match.
    fn query(&self, rel: &Relation, pattern: Vec<Term>) -> Goal;

    /// Adds one fact (a row of `rel.arity()` terms), returning the new
    /// database and emitting a [`FactChange::Added`] to subscribers.
    fn add_fact(&self, rel: &Relation, row: Vec<Term>) -> Self
    where
        Self: Sized;

    /// Removes every currently-stored row matching `row` exactly,
    /// returning the new database and emitting [`FactChange::Removed`]
    /// for each row actually removed.
    fn remove_fact(&self, rel: &Relation, row: Vec<Term>) -> Self
    where
        Self: Sized;

    /// All rows currently stored under `rel`, in insertion order.
    fn all_facts(&self, rel: &Relation) -> Vec<Vec<Term>>;

    /// The number of rows currently stored under `rel`.
    fn fact_count(&self, rel: &Relation) -> usize {
        self.all_facts(rel).len()
    }

    /// Subscribes to change events; the returned receiver yields a
    /// [`FactChange`] for every `add_fact`/`remove_fact` call made through
    /// this database or any clone sharing its change bus.
    fn subscribe(&self) -> Receiver<FactChange>;
}

/// A minimal in-memory [`Database`]. Facts are stored per-relation as a
/// flat `Vec` of rows; indexed columns are only honored at query time (an
/// O(1) lookup is simulated by filtering on the ground pattern value
/// before unification, not by a real hash index), matching spec §4.9's
/// "index hits are O(1), otherwise a scan" contract without committing to
/// a particular index structure.
#[derive(Clone, Debug)]
pub struct MemoryDatabase {
    relations: Rc<std::collections::HashMap<Rc<str>, Vec<Vec<Term>>>>,
    bus: Arc<ChangeBus>,
}

/// A fan-out registry of subscriber channels, shared (via `Arc`) across
/// every clone of a `MemoryDatabase` descended from the same `new()` call
/// so a change made through one clone reaches subscribers registered on
/// any other.
#[derive(Debug, Default)]
struct ChangeBus {
    subscribers: Mutex<Vec<Sender<FactChange>>>,
}

impl ChangeBus {
    fn new() -> ChangeBus {
        ChangeBus::default()
    }

    fn subscribe(&self) -> Receiver<FactChange> {
        let (sender, receiver) = unbounded();
        self.subscribers.lock().unwrap().push(sender);
        receiver
    }

    fn emit(&self, change: FactChange) {
        let mut subscribers = self.subscribers.lock().unwrap();
        // Drop subscribers whose receiver has gone away.
        subscribers.retain(|s| s.send(change.clone()).is_ok());
    }
}

impl Default for MemoryDatabase {
    fn default() -> MemoryDatabase {
        MemoryDatabase::new()
    }
}

impl MemoryDatabase {
    pub fn new() -> MemoryDatabase {
        MemoryDatabase {
            relations: Rc::new(std::collections::HashMap::new()),
            bus: Arc::new(ChangeBus::new()),
        }
    }

    fn rows(&self, rel: &Relation) -> &[Vec<Term>] {
        self.relations
            .get(rel.name.as_ref())
            .map(|rows| rows.as_slice())
            .unwrap_or(&[])
    }

    fn emit(&self, change: FactChange) {
        self.bus.emit(change);
    }
}

impl Database for MemoryDatabase {
    fn query(&self, rel: &Relation, pattern: Vec<Term>) -> Goal {
        let rel = rel.clone();
        let rows = self.rows(&rel).to_vec();
        Goal::from_fn(move |ctx, store| {
            // Narrow to rows agreeing with any already-ground (walked)
            // pattern column before paying for full unification, honoring
            // the "index hits are O(1)" contract for indexed columns that
            // happen to be ground at solve time.
            let walked_pattern: Vec<Term> = pattern.iter().map(|t| store.walk(t)).collect();
            let candidates = rows.iter().filter(|row| {
                rel.indexed_columns().iter().all(|&col| {
                    let Some(p) = walked_pattern.get(col) else {
                        return true;
                    };
                    match p.as_int() {
                        Some(_) => row.get(col).map(|r| store.walk(r) == *p).unwrap_or(true),
                        None => true,
                    }
                })
            });

            let mut stream = Stream::empty();
            for row in candidates.rev() {
                if row.len() != pattern.len() {
                    continue;
                }
                if let Some(next) = unify_row(&pattern, row, store.clone()) {
                    stream = Stream::cons(next, stream);
                }
            }
            if ctx.is_cancelled() {
                return Stream::empty();
            }
            stream
        })
    }

    fn add_fact(&self, rel: &Relation, row: Vec<Term>) -> Self {
        let mut relations = (*self.relations).clone();
        relations.entry(rel.name.clone()).or_default().push(row.clone());
        self.emit(FactChange::Added(rel.clone(), row));
        MemoryDatabase {
            relations: Rc::new(relations),
            bus: self.bus.clone(),
        }
    }

    fn remove_fact(&self, rel: &Relation, row: Vec<Term>) -> Self {
        let mut relations = (*self.relations).clone();
        let mut removed = false;
        if let Some(rows) = relations.get_mut(rel.name.as_ref()) {
            let before = rows.len();
            rows.retain(|r| *r != row);
            removed = rows.len() != before;
        }
        if removed {
            self.emit(FactChange::Removed(rel.clone(), row));
        }
        MemoryDatabase {
            relations: Rc::new(relations),
            bus: self.bus.clone(),
        }
    }

    fn all_facts(&self, rel: &Relation) -> Vec<Vec<Term>> {
        self.rows(rel).to_vec()
    }

    fn subscribe(&self) -> Receiver<FactChange> {
        self.bus.subscribe()
    }
}

fn unify_row(pattern: &[Term], row: &[Term], store: crate::store::Store) -> Option<crate::store::Store> {
    let mut store = store;
    for (p, r) in pattern.iter().zip(row.iter()) {
        store = crate::store::unify(p, r, &store).ok()?;
    }
    Some(store)
}

/// A goal equivalent to `db.query(rel, pattern)`, offered as a free
/// function so callers don't need a `Database` import at the call site.
pub fn query<D: Database>(db: &D, rel: &Relation, pattern: Vec<Term>) -> Goal {
    db.query(rel, pattern)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::run_star;

    fn likes() -> Relation {
        Relation::new("likes", 2, vec![0])
    }

    #[test]
    fn add_then_query_unifies_facts() {
        let rel = likes();
        let db = MemoryDatabase::new();
        let db = db.add_fact(&rel, vec![Term::atom("alice"), Term::atom("bob")]);
        let db = db.add_fact(&rel, vec![Term::atom("alice"), Term::atom("carol")]);

        let results = run_star(|q| db.query(&rel, vec![Term::atom("alice"), q.clone()]));
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn remove_fact_drops_it_from_query_results() {
        let rel = likes();
        let db = MemoryDatabase::new();
        let db = db.add_fact(&rel, vec![Term::atom("alice"), Term::atom("bob")]);
        let db = db.remove_fact(&rel, vec![Term::atom("alice"), Term::atom("bob")]);

        let results = run_star(|q| db.query(&rel, vec![Term::atom("alice"), q.clone()]));
        assert!(results.is_empty());
    }

    #[test]
    fn fact_count_reflects_current_rows() {
        let rel = likes();
        let db = MemoryDatabase::new();
        assert_eq!(db.fact_count(&rel), 0);
        let db = db.add_fact(&rel, vec![Term::atom("alice"), Term::atom("bob")]);
        assert_eq!(db.fact_count(&rel), 1);
    }

    #[test]
    fn all_facts_lists_every_row() {
        let rel = likes();
        let db = MemoryDatabase::new();
        let db = db.add_fact(&rel, vec![Term::atom("alice"), Term::atom("bob")]);
        let db = db.add_fact(&rel, vec![Term::atom("dave"), Term::atom("erin")]);
        assert_eq!(db.all_facts(&rel).len(), 2);
    }

    #[test]
    fn add_fact_emits_change_event() {
        let rel = likes();
        let db = MemoryDatabase::new();
        let rx = db.subscribe();
        let _db = db.add_fact(&rel, vec![Term::atom("alice"), Term::atom("bob")]);
        match rx.try_recv() {
            Ok(FactChange::Added(got_rel, row)) => {
                assert_eq!(got_rel, rel);
                assert_eq!(row, vec![Term::atom("alice"), Term::atom("bob")]);
            }
            other => panic!("expected FactChange::Added, got {other:?}"),
        }
    }
}
