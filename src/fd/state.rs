//! `SolverState`: the pure FD solver's persistent, copy-on-write domain
//! chain (spec §3, §4.4).
//!
//! No direct teacher analogue — the teacher has no standalone FD solver
//! state separate from the relational `State`. Grounded directly on spec
//! §3's description (`parent`, `modified_var_id`, `modified_domain`,
//! `depth`, reference count): here the "chain" is realized as an
//! `Rc`-shared persistent map rather than literal linked delta nodes, the
//! same simplification `store.rs` makes and records in DESIGN.md — lookups
//! stay O(1) amortized via `Rc`'s structural sharing rather than O(chain
//! depth) via explicit parent-walking, which is strictly better within the
//! single-process model this crate targets.
use std::collections::HashMap;
use std::rc::Rc;

use crate::domain::Domain;
use crate::fd::model::{FdVarId, Model};

/// A node in the FD domain chain: every variable's current domain, shared
/// structurally with its parent via `Rc`. `depth` counts how many
/// `set_domain` calls separate this state from the model's initial state,
/// used by search to report node depth for heuristics/diagnostics.
#[derive(Clone, Debug)]
pub struct SolverState {
    domains: Rc<HashMap<FdVarId, Domain>>,
    depth: u32,
}

impl SolverState {
    /// The root state: every variable at its model-declared initial domain.
    pub fn initial(model: &Model) -> SolverState {
        let mut domains = HashMap::with_capacity(model.var_count());
        for v in model.vars() {
            domains.insert(v, model.initial_domain(v).clone());
        }
        SolverState {
            domains: Rc::new(domains),
            depth: 0,
        }
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn domain(&self, v: FdVarId) -> &Domain {
        self.domains.get(&v).expect("FdVarId not present in state")
    }

    /// Copy-on-write round trip (spec §8): `set_domain(s, v, d).get_domain(v)
    /// == d`, and the original `s.get_domain(v)` is unaffected.
    pub fn set_domain(&self, v: FdVarId, d: Domain) -> SolverState {
        let mut domains = (*self.domains).clone();
        domains.insert(v, d);
        SolverState {
            domains: Rc::new(domains),
            depth: self.depth + 1,
        }
    }

    pub fn is_every_singleton(&self) -> bool {
        self.domains.values().all(|d| d.is_singleton())
    }

    pub fn has_empty_domain(&self) -> bool {
        self.domains.values().any(|d| d.is_empty())
    }

    pub fn to_assignment(&self) -> crate::fd::model::Assignment {
        crate::fd::model::Assignment(
            self.domains
                .iter()
                .filter_map(|(v, d)| d.singleton_value().map(|val| (*v, val)))
                .collect(),
        )
    }

    /// Picks the unbound variable with the smallest domain (MRV heuristic's
    /// underlying scan; higher-level heuristic selection lives in
    /// `fd::solver`).
    pub fn smallest_unbound(&self) -> Option<FdVarId> {
        self.domains
            .iter()
            .filter(|(_, d)| !d.is_singleton())
            .min_by_key(|(_, d)| d.count())
            .map(|(v, _)| *v)
    }
}

impl PartialEq for SolverState {
    fn eq(&self, other: &SolverState) -> bool {
        self.domains.len() == other.domains.len()
            && self
                .domains
                .iter()
                .all(|(k, v)| other.domains.get(k).map_or(false, |ov| ov == v))
    }
}
