//! The hybrid solver: cross-propagation between the relational store and
//! attributed FD domains (spec §4.5).
//!
//! Grounded on the teacher's `State::process_extension_{fd,diseq,user}`
//! trio in `src/state/mod.rs` — the teacher already runs exactly this kind
//! of cross-propagation (an FD domain narrowing to a singleton gets copied
//! into the relational substitution, and a relational binding of an FD
//! variable to a concrete integer narrows its domain) as private methods
//! folded into `State::unify`. This module generalizes that fold into an
//! explicit, registrable `Plugin` trio run to fixed point over a
//! `UnifiedStore`, per spec §4.5's "`HybridSolver` runs registered plugins
//! (Relational, FD, Nominal) to fixed point."
use crate::domain::Domain;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::term::Term;
use crate::value::Value;

/// One step of cross-solver propagation: either the store changed (run the
/// whole plugin trio again) or it reached a local fixed point.
#[derive(Debug)]
pub enum Step {
    Changed(Store),
    Unchanged,
}

/// A cross-solver propagation plugin (spec §4.5). Each plugin reads one
/// solver's state and, where it can, writes a conclusion into the other's
/// representation — e.g. the FD plugin copies a singleton domain into the
/// relational substitution.
pub trait Plugin {
    fn name(&self) -> &'static str;
    fn step(&self, store: &Store) -> Result<Step>;
}

/// Copies newly-bound integer variables into their FD domain as a
/// singleton, intersecting with whatever domain already exists (conflict
/// if disjoint). Grounded on `process_extension_fd`'s relational-to-FD
/// direction.
pub struct RelationalPlugin;

impl Plugin for RelationalPlugin {
    fn name(&self) -> &'static str {
        "relational"
    }

    fn step(&self, store: &Store) -> Result<Step> {
        for v in store.changed_vars() {
            let int_val = match store.subst().get(*v) {
                Some(Term::Atom(Value::Int(n))) => Some(*n),
                _ => None,
            };
            let Some(n) = int_val else { continue };
            match store.domain(*v) {
                Some(d) if d.is_singleton() && d.singleton_value() == Some(n) => continue,
                Some(d) => {
                    let narrowed = d.intersect(&Domain::singleton(n)).ok_or_else(|| Error::Inconsistent {
                        reason: format!("relational binding {} conflicts with FD domain", n),
                    })?;
                    return Ok(Step::Changed(store.set_domain(*v, narrowed)));
                }
                None => {
                    return Ok(Step::Changed(store.set_domain(*v, Domain::singleton(n))));
                }
            }
        }
        Ok(Step::Unchanged)
    }
}

/// Copies a variable's FD domain, once it narrows to a singleton, into the
/// relational substitution as a concrete integer binding. Grounded on
/// `process_extension_fd`'s FD-to-relational direction.
pub struct FdPlugin;

impl Plugin for FdPlugin {
    fn name(&self) -> &'static str {
        "fd"
    }

    fn step(&self, store: &Store) -> Result<Step> {
        for v in store.changed_vars() {
            let Some(d) = store.domain(*v) else { continue };
            let Some(n) = d.singleton_value() else { continue };
            match store.subst().get(*v) {
                None => {
                    let next = store.bind(*v, Term::atom(n)).ok_or_else(|| Error::Inconsistent {
                        reason: format!("FD singleton {} conflicts with an active constraint", n),
                    })?;
                    return Ok(Step::Changed(next));
                }
                Some(Term::Atom(Value::Int(bound))) if *bound == n => continue,
                Some(_) => {
                    return Err(Error::Inconsistent {
                        reason: format!("FD singleton {} conflicts with existing relational binding", n),
                    })
                }
            }
        }
        Ok(Step::Unchanged)
    }
}

/// A structural placeholder in the plugin trio (spec §4.5 names three
/// plugins explicitly): nominal freshness/alpha obligations already ride
/// the generic `Constraint` re-check channel (`Freshness` in
/// `nominal.rs`), so this plugin has no additional cross-representation
/// state to fold in — it exists so callers can still reason about "the
/// Relational/FD/Nominal trio" uniformly, and as the extension point for
/// any future nominal-specific promotion (e.g. caching ground normal
/// forms) without changing `HybridSolver`'s registration API.
pub struct NominalPlugin;

impl Plugin for NominalPlugin {
    fn name(&self) -> &'static str {
        "nominal"
    }

    fn step(&self, _store: &Store) -> Result<Step> {
        Ok(Step::Unchanged)
    }
}

/// Runs a fixed trio of plugins to a joint fixed point over a `Store`
/// (spec §4.5). `UnifiedStore` is the `Store` itself — the relational
/// substitution and the FD domain map already live side by side there
/// (`store.rs`'s `domains: Rc<HashMap<VarId, Domain>>` field), so no
/// separate merged representation is needed.
pub struct HybridSolver {
    plugins: Vec<Box<dyn Plugin>>,
    max_rounds: u32,
}

impl HybridSolver {
    pub fn new() -> HybridSolver {
        HybridSolver {
            plugins: vec![Box::new(RelationalPlugin), Box::new(FdPlugin), Box::new(NominalPlugin)],
            max_rounds: 10_000,
        }
    }

    pub fn register(&mut self, plugin: Box<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    /// Runs every plugin in order, repeating the whole pass whenever any
    /// plugin reports a change, until a full pass changes nothing or
    /// `max_rounds` is exceeded (spec §4.11's `FixpointOverflow`).
    pub fn propagate(&self, mut store: Store) -> Result<Store> {
        for _ in 0..self.max_rounds {
            let mut changed_this_round = false;
            for plugin in &self.plugins {
                match plugin.step(&store)? {
                    Step::Changed(next) => {
                        store = next;
                        changed_this_round = true;
                    }
                    Step::Unchanged => {}
                }
            }
            if !changed_this_round {
                return Ok(store);
            }
        }
        Err(Error::FixpointOverflow {
            context: "hybrid solver plugin trio".to_string(),
        })
    }
}

impl Default for HybridSolver {
    fn default() -> HybridSolver {
        HybridSolver::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::unify;

    #[test]
    fn fd_singleton_promotes_to_relational_binding() {
        let store = Store::new();
        let v = Term::fresh_var();
        let id = v.as_var().unwrap();
        let store = store.set_domain(id, Domain::singleton(7));
        let hybrid = HybridSolver::new();
        let result = hybrid.propagate(store).unwrap();
        assert_eq!(result.walk(&v), Term::atom(7i64));
    }

    #[test]
    fn relational_binding_promotes_to_fd_domain() {
        let store = Store::new();
        let v = Term::fresh_var();
        let id = v.as_var().unwrap();
        let store = store.set_domain(id, Domain::range(0, 10));
        let store = unify(&v, &Term::atom(5i64), &store).unwrap();
        let hybrid = HybridSolver::new();
        let result = hybrid.propagate(store).unwrap();
        assert_eq!(result.domain(id).unwrap().singleton_value(), Some(5));
    }

    #[test]
    fn conflicting_domain_and_binding_is_inconsistent() {
        let store = Store::new();
        let v = Term::fresh_var();
        let id = v.as_var().unwrap();
        let store = store.set_domain(id, Domain::range(0, 3));
        let store = unify(&v, &Term::atom(9i64), &store).unwrap();
        let hybrid = HybridSolver::new();
        assert!(hybrid.propagate(store).is_err());
    }
}
