//! The FD `Model`: a construction-time, then-read-only bag of variables and
//! constraints (spec §3, §4.4).
//!
//! No direct teacher analogue — `terohuttunen-proto-vulcan` folds FD
//! domains into the same `State` as relational bindings rather than
//! exposing a standalone `Model`/`Solver` pair. Built from spec §3/§4.4's
//! `Model`/`SolverState` description directly, in the same `Rc`-sharing,
//! validate-once idiom the rest of the crate uses.
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::domain::Domain;
use crate::error::{Error, Result};
use crate::fd::constraints::PropagationConstraint;

/// Opaque identifier for an FD variable within a [`Model`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Debug)]
pub struct FdVarId(pub u32);

/// A ground solution: every model variable's singleton value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assignment(pub HashMap<FdVarId, i64>);

impl Assignment {
    pub fn get(&self, v: FdVarId) -> Option<i64> {
        self.0.get(&v).copied()
    }
}

struct VarInfo {
    name: Option<String>,
    initial: Domain,
}

/// A `ModelConstraint` pairs a propagator with the variables it reads, so
/// the solver can index "which constraints does changing variable X wake
/// up" without downcasting.
pub struct ModelConstraint {
    pub propagator: Rc<dyn PropagationConstraint>,
    pub vars: Vec<FdVarId>,
}

/// A construction-time bag of FD variables and constraints, validated once
/// and then shared read-only by all search workers (spec §3).
pub struct Model {
    vars: Vec<VarInfo>,
    constraints: Vec<ModelConstraint>,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Model {{ {} vars, {} constraints }}",
            self.vars.len(),
            self.constraints.len()
        )
    }
}

impl Model {
    pub fn new() -> Model {
        Model {
            vars: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// `Model.new_int_var(min, max, name)`. Rejects `min > max` as malformed
    /// input (spec §7's `Error::InvalidValue`, carved out for exactly this
    /// — domain bounds the caller hands in directly, not a domain that
    /// became empty through propagation).
    pub fn new_int_var(&mut self, min: i64, max: i64, name: Option<&str>) -> Result<FdVarId> {
        if min > max {
            return Err(Error::InvalidValue(format!(
                "new_int_var bounds [{}, {}] are empty (min > max)",
                min, max
            )));
        }
        let id = FdVarId(self.vars.len() as u32);
        self.vars.push(VarInfo {
            name: name.map(String::from),
            initial: Domain::range(min, max),
        });
        Ok(id)
    }

    pub fn var_count(&self) -> usize {
        self.vars.len()
    }

    pub fn var_name(&self, v: FdVarId) -> Option<&str> {
        self.vars.get(v.0 as usize).and_then(|i| i.name.as_deref())
    }

    pub fn initial_domain(&self, v: FdVarId) -> &Domain {
        &self.vars[v.0 as usize].initial
    }

    pub fn vars(&self) -> impl Iterator<Item = FdVarId> + '_ {
        (0..self.vars.len()).map(|i| FdVarId(i as u32))
    }

    pub fn add_constraint(&mut self, propagator: Rc<dyn PropagationConstraint>) {
        let vars = propagator.variables();
        self.constraints.push(ModelConstraint { propagator, vars });
    }

    pub fn constraints(&self) -> &[ModelConstraint] {
        &self.constraints
    }

    /// `all_different(vars)`.
    pub fn all_different(&mut self, vars: Vec<FdVarId>) {
        self.add_constraint(Rc::new(crate::fd::constraints::AllDifferent::new(vars)));
    }

    /// `linear_sum(coeffs, vars, total)`: Σ coeffs[i]*vars[i] = total.
    pub fn linear_sum(&mut self, terms: Vec<(i64, FdVarId)>, total: i64) {
        self.add_constraint(Rc::new(crate::fd::constraints::LinearSum::new(terms, total)));
    }

    /// `arithmetic(dst, src, k)`: dst = src + k.
    pub fn arithmetic(&mut self, dst: FdVarId, src: FdVarId, k: i64) {
        self.add_constraint(Rc::new(crate::fd::constraints::Arithmetic::new(dst, src, k)));
    }

    pub fn inequality(&mut self, op: crate::fd::constraints::InequalityOp, x: FdVarId, y: FdVarId) {
        self.add_constraint(Rc::new(crate::fd::constraints::Inequality::new(op, x, y)));
    }

    pub fn reified(&mut self, inner: Rc<dyn PropagationConstraint>, b: FdVarId) {
        self.add_constraint(Rc::new(crate::fd::constraints::Reified::new(inner, b)));
    }

    /// Validates the model once at construction time: every variable's
    /// initial domain must be non-empty (spec §3's "empty FD domain is a
    /// conflict" — for initial domains, it is a malformed-model error
    /// instead, since it can never be fixed by propagation).
    pub fn validate(&self) -> Result<()> {
        for (i, v) in self.vars.iter().enumerate() {
            if v.initial.is_empty() {
                return Err(Error::MalformedModel(format!(
                    "variable {} ({}) has an empty initial domain",
                    i,
                    v.name.as_deref().unwrap_or("<unnamed>")
                )));
            }
        }
        Ok(())
    }
}

impl Default for Model {
    fn default() -> Model {
        Model::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_int_var_rejects_empty_bounds() {
        let mut m = Model::new();
        let err = m.new_int_var(5, 1, None).unwrap_err();
        assert!(matches!(err, Error::InvalidValue(_)));
    }

    #[test]
    fn new_int_var_accepts_singleton_bounds() {
        let mut m = Model::new();
        assert!(m.new_int_var(3, 3, None).is_ok());
    }
}
