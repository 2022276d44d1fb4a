//! The persistent, unified constraint store (spec §3, §4.3).
//!
//! Grounded on the teacher's `State` (`state/mod.rs`): four `Rc`-wrapped
//! clone-on-write fields (substitution, constraint list, FD domain map, user
//! data) that are replaced wholesale on write rather than mutated in place.
//! `Constraint` and the built-in kinds are grounded on
//! `state/constraint/{mod,store}.rs`'s trait shape and
//! `relation/diseq.rs`'s `DisequalityConstraint` for the disequality kind;
//! the remaining built-ins (Absence, type predicates, Membership, Ordering,
//! Freshness) have no teacher counterpart and are built from spec §4.3's
//! contract prose directly.
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use crate::domain::Domain;
use crate::term::{Term, VarId};
use crate::substitution::Subst;

static NEXT_CONSTRAINT_ID: AtomicU64 = AtomicU64::new(0);

pub fn fresh_constraint_id() -> u64 {
    NEXT_CONSTRAINT_ID.fetch_add(1, AtomicOrdering::SeqCst)
}

/// Outcome of re-checking a [`Constraint`] against a substitution (spec §4.3).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum CheckResult {
    /// No further checks are required under the current bindings.
    Satisfied,
    /// Depends on as-yet-unbound variables; keep it around.
    Pending,
    /// The enclosing binding/store is invalid.
    Violated,
}

/// A constraint attached to a [`Store`]. Re-checked whenever any of its
/// [`Constraint::variables`] gains a new binding (spec §4.3).
pub trait Constraint: fmt::Debug {
    fn id(&self) -> u64;

    /// Whether this constraint is confined to a single store (no
    /// `ConstraintBus` coordination needed). Built-ins are all local.
    fn is_local(&self) -> bool {
        true
    }

    fn variables(&self) -> Vec<VarId>;

    fn check(&self, subst: &Subst) -> CheckResult;

    fn clone_box(&self) -> Rc<dyn Constraint>;

    fn describe(&self) -> String;
}

impl fmt::Display for dyn Constraint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}

/// The unification failure signal (spec §4.1): an ordinary dead end, not an
/// error. Carries no payload by design.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct UnificationFailure;

/// A persistent, unified constraint store: relational bindings, FD domains,
/// and the active constraint list, all clone-on-write (spec §3).
#[derive(Clone, Debug)]
pub struct Store {
    subst: Subst,
    domains: Rc<HashMap<VarId, Domain>>,
    constraints: Rc<Vec<Rc<dyn Constraint>>>,
    /// Variables touched since the store's creation, used to scope
    /// constraint re-checks to the constraints that mention them.
    changed: Rc<Vec<VarId>>,
}

impl Store {
    pub fn new() -> Store {
        Store {
            subst: Subst::new(),
            domains: Rc::new(HashMap::new()),
            constraints: Rc::new(Vec::new()),
            changed: Rc::new(Vec::new()),
        }
    }

    pub fn subst(&self) -> &Subst {
        &self.subst
    }

    pub fn walk(&self, t: &Term) -> Term {
        self.subst.walk(t)
    }

    pub fn deep_walk(&self, t: &Term) -> Term {
        self.subst.deep_walk(t)
    }

    pub fn constraints(&self) -> &[Rc<dyn Constraint>] {
        &self.constraints
    }

    pub fn domain(&self, v: VarId) -> Option<&Domain> {
        self.domains.get(&v)
    }

    /// All variable ids that currently carry an attributed FD domain.
    pub fn domain_vars(&self) -> impl Iterator<Item = VarId> + '_ {
        self.domains.keys().copied()
    }

    /// Binds `id -> term`, occur-checking first, then re-checking every
    /// active constraint mentioning `id` under the extended substitution
    /// (spec §4.3's `AddBinding`). Returns `None` on occur-check failure or
    /// constraint violation.
    pub fn bind(&self, id: VarId, term: Term) -> Option<Store> {
        let subst = self.subst.bind(id, term)?;
        let mut next = Store {
            subst,
            domains: self.domains.clone(),
            constraints: self.constraints.clone(),
            changed: self.changed.clone(),
        };
        Rc::make_mut(&mut next.changed).push(id);
        next.recheck_constraints_mentioning(id)
    }

    /// Re-checks every active constraint that mentions `var`; drops those
    /// that become `Satisfied`, keeps `Pending` ones, fails on `Violated`.
    fn recheck_constraints_mentioning(&self, var: VarId) -> Option<Store> {
        let mut kept = Vec::with_capacity(self.constraints.len());
        for c in self.constraints.iter() {
            if !c.variables().contains(&var) {
                kept.push(c.clone());
                continue;
            }
            match c.check(&self.subst) {
                CheckResult::Violated => return None,
                CheckResult::Satisfied => {}
                CheckResult::Pending => kept.push(c.clone()),
            }
        }
        Some(Store {
            subst: self.subst.clone(),
            domains: self.domains.clone(),
            constraints: Rc::new(kept),
            changed: self.changed.clone(),
        })
    }

    /// Adds a constraint after an initial check (spec §4.3's `AddConstraint`):
    /// re-checked once under current bindings, admitted unless `Violated`.
    /// A `Satisfied` constraint is admitted too (it may still need to guard
    /// against later bindings of variables it mentions only conditionally,
    /// e.g. a disequality whose only difference is currently realized).
    pub fn add_constraint(&self, c: Rc<dyn Constraint>) -> Option<Store> {
        match c.check(&self.subst) {
            CheckResult::Violated => None,
            CheckResult::Satisfied => Some(self.clone()),
            CheckResult::Pending => {
                let mut constraints = (*self.constraints).clone();
                constraints.push(c);
                Some(Store {
                    subst: self.subst.clone(),
                    domains: self.domains.clone(),
                    constraints: Rc::new(constraints),
                    changed: self.changed.clone(),
                })
            }
        }
    }

    /// Sets an FD variable's current domain. An empty domain is a conflict,
    /// never a valid state (spec §3) — callers must check `!domain.is_empty()`
    /// before calling this, or treat a subsequent `domain()` lookup of an
    /// absent key as "no domain yet assigned" rather than empty.
    pub fn set_domain(&self, v: VarId, d: Domain) -> Store {
        let mut domains = (*self.domains).clone();
        domains.insert(v, d);
        Store {
            subst: self.subst.clone(),
            domains: Rc::new(domains),
            constraints: self.constraints.clone(),
            changed: self.changed.clone(),
        }
    }

    pub fn changed_vars(&self) -> &[VarId] {
        &self.changed
    }
}

impl Default for Store {
    fn default() -> Store {
        Store::new()
    }
}

/// Walks both terms and unifies them against `store`, admitting each bind
/// through the constraint re-check pipeline (spec §4.1).
pub fn unify(t1: &Term, t2: &Term, store: &Store) -> Result<Store, UnificationFailure> {
    let w1 = store.walk(t1);
    let w2 = store.walk(t2);
    match (&w1, &w2) {
        (Term::Var(a), Term::Var(b)) if a.id() == b.id() => Ok(store.clone()),
        (Term::Var(a), _) => store.bind(a.id(), w2.clone()).ok_or(UnificationFailure),
        (_, Term::Var(b)) => store.bind(b.id(), w1.clone()).ok_or(UnificationFailure),
        (Term::Atom(a), Term::Atom(b)) => {
            if a == b {
                Ok(store.clone())
            } else {
                Err(UnificationFailure)
            }
        }
        (Term::Nil, Term::Nil) => Ok(store.clone()),
        (Term::Pair(a1, a2), Term::Pair(b1, b2)) => {
            let s1 = unify(a1, b1, store)?;
            unify(a2, b2, &s1)
        }
        (Term::Tie(n1, b1), Term::Tie(n2, b2)) => {
            if n1 == n2 {
                unify(b1, b2, store)
            } else {
                #[cfg(feature = "nominal")]
                {
                    // alpha-aware: unify under a renaming of n2 -> n1 in b2.
                    let renamed = crate::nominal::rename_free(b2, n2, n1);
                    unify(b1, &renamed, store)
                }
                #[cfg(not(feature = "nominal"))]
                {
                    // Without the nominal feature there's no alpha-renaming
                    // pass available, so differently-named ties never unify.
                    Err(UnificationFailure)
                }
            }
        }
        _ => Err(UnificationFailure),
    }
}

// ---------------------------------------------------------------------
// Built-in constraint kinds (spec §4.3)
// ---------------------------------------------------------------------

/// `t1 != t2`: `Satisfied` once the walked terms are provably distinct,
/// `Violated` once they'd unify as equal, `Pending` while it could go
/// either way. Grounded on `relation/diseq.rs`'s `DisequalityConstraint`,
/// re-derived per-check rather than storing an extension substitution map
/// (simpler given this store does not expose the teacher's raw `SMap`
/// extension machinery).
#[derive(Debug, Clone)]
pub struct Disequality {
    id: u64,
    t1: Term,
    t2: Term,
}

impl Disequality {
    pub fn new(t1: Term, t2: Term) -> Rc<dyn Constraint> {
        Rc::new(Disequality {
            id: fresh_constraint_id(),
            t1,
            t2,
        })
    }
}

pub(crate) fn term_vars(t: &Term, out: &mut Vec<VarId>) {
    match t {
        Term::Var(v) => out.push(v.id()),
        Term::Pair(a, b) => {
            term_vars(a, out);
            term_vars(b, out);
        }
        Term::Tie(_, b) => term_vars(b, out),
        _ => {}
    }
}

impl Constraint for Disequality {
    fn id(&self) -> u64 {
        self.id
    }

    fn variables(&self) -> Vec<VarId> {
        let mut out = Vec::new();
        term_vars(&self.t1, &mut out);
        term_vars(&self.t2, &mut out);
        out
    }

    fn check(&self, subst: &Subst) -> CheckResult {
        let w1 = subst.deep_walk(&self.t1);
        let w2 = subst.deep_walk(&self.t2);
        if !has_unbound_var(&w1) && !has_unbound_var(&w2) {
            if w1 == w2 {
                CheckResult::Violated
            } else {
                CheckResult::Satisfied
            }
        } else if terms_provably_distinct(&w1, &w2) {
            CheckResult::Satisfied
        } else if w1 == w2 {
            // Structurally identical but containing unbound vars: cannot
            // yet rule out equality, stay pending.
            CheckResult::Pending
        } else {
            CheckResult::Pending
        }
    }

    fn clone_box(&self) -> Rc<dyn Constraint> {
        Rc::new(self.clone())
    }

    fn describe(&self) -> String {
        format!("{} != {}", self.t1, self.t2)
    }
}

fn has_unbound_var(t: &Term) -> bool {
    match t {
        Term::Var(_) => true,
        Term::Pair(a, b) => has_unbound_var(a) || has_unbound_var(b),
        Term::Tie(_, b) => has_unbound_var(b),
        _ => false,
    }
}

/// Two ground-at-the-top terms are provably distinct if their outer shapes
/// can never unify regardless of how inner variables resolve (e.g.
/// different atoms, or a pair vs. an atom).
fn terms_provably_distinct(a: &Term, b: &Term) -> bool {
    match (a, b) {
        (Term::Var(_), _) | (_, Term::Var(_)) => false,
        (Term::Atom(x), Term::Atom(y)) => x != y,
        (Term::Nil, Term::Nil) => false,
        (Term::Pair(a1, a2), Term::Pair(b1, b2)) => {
            terms_provably_distinct(a1, b1) || terms_provably_distinct(a2, b2)
        }
        (Term::Tie(n1, b1), Term::Tie(n2, b2)) => n1 != n2 && terms_provably_distinct(b1, b2),
        _ => true, // different shapes (pair vs atom, nil vs pair, ...)
    }
}

/// `absento(a, c)`: atom `a` never occurs anywhere within container `c`.
/// Recurses transparently into `Tie` bodies (Open Question resolution, see
/// DESIGN.md / SPEC_FULL.md §4.3).
#[derive(Debug, Clone)]
pub struct Absence {
    id: u64,
    needle: Term,
    haystack: Term,
}

impl Absence {
    pub fn new(needle: Term, haystack: Term) -> Rc<dyn Constraint> {
        Rc::new(Absence {
            id: fresh_constraint_id(),
            needle,
            haystack,
        })
    }
}

impl Constraint for Absence {
    fn id(&self) -> u64 {
        self.id
    }

    fn variables(&self) -> Vec<VarId> {
        let mut out = Vec::new();
        term_vars(&self.needle, &mut out);
        term_vars(&self.haystack, &mut out);
        out
    }

    fn check(&self, subst: &Subst) -> CheckResult {
        let needle = subst.deep_walk(&self.needle);
        let hay = subst.deep_walk(&self.haystack);
        absence_check(&needle, &hay)
    }

    fn clone_box(&self) -> Rc<dyn Constraint> {
        Rc::new(self.clone())
    }

    fn describe(&self) -> String {
        format!("absento({}, {})", self.needle, self.haystack)
    }
}

fn absence_check(needle: &Term, hay: &Term) -> CheckResult {
    if !has_unbound_var(needle) && !has_unbound_var(hay) && needle == hay {
        return CheckResult::Violated;
    }
    match hay {
        Term::Var(_) => CheckResult::Pending,
        Term::Pair(a, b) => {
            let ca = absence_check(needle, a);
            let cb = absence_check(needle, b);
            combine_conjunctive(ca, cb)
        }
        Term::Tie(_, body) => absence_check(needle, body),
        Term::Atom(_) | Term::Nil => {
            if needle == hay {
                CheckResult::Violated
            } else {
                CheckResult::Satisfied
            }
        }
    }
}

fn combine_conjunctive(a: CheckResult, b: CheckResult) -> CheckResult {
    use CheckResult::*;
    match (a, b) {
        (Violated, _) | (_, Violated) => Violated,
        (Pending, _) | (_, Pending) => Pending,
        (Satisfied, Satisfied) => Satisfied,
    }
}

/// A type predicate kind for `TypePredicate` (spec §4.3).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum TypeKind {
    Symbol,
    Number,
    String,
    Pair,
    Boolean,
    Null,
    Vector,
}

#[derive(Debug, Clone)]
pub struct TypePredicate {
    id: u64,
    kind: TypeKind,
    term: Term,
}

impl TypePredicate {
    pub fn new(kind: TypeKind, term: Term) -> Rc<dyn Constraint> {
        Rc::new(TypePredicate {
            id: fresh_constraint_id(),
            kind,
            term,
        })
    }
}

impl Constraint for TypePredicate {
    fn id(&self) -> u64 {
        self.id
    }

    fn variables(&self) -> Vec<VarId> {
        let mut out = Vec::new();
        term_vars(&self.term, &mut out);
        out
    }

    fn check(&self, subst: &Subst) -> CheckResult {
        use crate::value::Value;
        match subst.walk(&self.term) {
            Term::Var(_) => CheckResult::Pending,
            Term::Nil => {
                if self.kind == TypeKind::Null {
                    CheckResult::Satisfied
                } else {
                    CheckResult::Violated
                }
            }
            Term::Pair(_, _) => {
                if self.kind == TypeKind::Pair {
                    CheckResult::Satisfied
                } else {
                    CheckResult::Violated
                }
            }
            Term::Tie(_, _) => CheckResult::Violated,
            Term::Atom(v) => {
                let matches = match (&self.kind, &v) {
                    (TypeKind::Symbol, Value::Symbol(_)) => true,
                    (TypeKind::Number, Value::Int(_)) => true,
                    (TypeKind::String, Value::String(_)) => true,
                    (TypeKind::Boolean, Value::Bool(_)) => true,
                    (TypeKind::Vector, Value::Vector(_)) => true,
                    _ => false,
                };
                if matches {
                    CheckResult::Satisfied
                } else {
                    CheckResult::Violated
                }
            }
        }
    }

    fn clone_box(&self) -> Rc<dyn Constraint> {
        Rc::new(self.clone())
    }

    fn describe(&self) -> String {
        format!("{:?}({})", self.kind, self.term)
    }
}

/// `element ∈ list`: Satisfied when found; Violated when the list is proper
/// and the element is provably absent; Pending otherwise.
#[derive(Debug, Clone)]
pub struct Membership {
    id: u64,
    element: Term,
    list: Term,
}

impl Membership {
    pub fn new(element: Term, list: Term) -> Rc<dyn Constraint> {
        Rc::new(Membership {
            id: fresh_constraint_id(),
            element,
            list,
        })
    }
}

impl Constraint for Membership {
    fn id(&self) -> u64 {
        self.id
    }

    fn variables(&self) -> Vec<VarId> {
        let mut out = Vec::new();
        term_vars(&self.element, &mut out);
        term_vars(&self.list, &mut out);
        out
    }

    fn check(&self, subst: &Subst) -> CheckResult {
        let el = subst.deep_walk(&self.element);
        let mut cur = subst.deep_walk(&self.list);
        loop {
            match cur {
                Term::Pair(head, tail) => {
                    if !has_unbound_var(&head) && !has_unbound_var(&el) {
                        if *head == el {
                            return CheckResult::Satisfied;
                        }
                    } else if *head == el {
                        return CheckResult::Satisfied;
                    } else {
                        return CheckResult::Pending;
                    }
                    cur = (*tail).clone();
                }
                Term::Nil => return CheckResult::Violated,
                Term::Var(_) => return CheckResult::Pending,
                _ => return CheckResult::Violated,
            }
        }
    }

    fn clone_box(&self) -> Rc<dyn Constraint> {
        Rc::new(self.clone())
    }

    fn describe(&self) -> String {
        format!("member({}, {})", self.element, self.list)
    }
}

/// Ordering operators for [`Ordering`] (spec §4.3: `<`, `<=`, `>`, `>=`).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum OrderOp {
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone)]
pub struct Ordering {
    id: u64,
    op: OrderOp,
    lhs: Term,
    rhs: Term,
}

impl Ordering {
    pub fn new(op: OrderOp, lhs: Term, rhs: Term) -> Rc<dyn Constraint> {
        Rc::new(Ordering {
            id: fresh_constraint_id(),
            op,
            lhs,
            rhs,
        })
    }
}

impl Constraint for Ordering {
    fn id(&self) -> u64 {
        self.id
    }

    fn variables(&self) -> Vec<VarId> {
        let mut out = Vec::new();
        term_vars(&self.lhs, &mut out);
        term_vars(&self.rhs, &mut out);
        out
    }

    fn check(&self, subst: &Subst) -> CheckResult {
        let l = subst.walk(&self.lhs);
        let r = subst.walk(&self.rhs);
        match (l.as_int(), r.as_int()) {
            (Some(a), Some(b)) => {
                let ok = match self.op {
                    OrderOp::Lt => a < b,
                    OrderOp::Le => a <= b,
                    OrderOp::Gt => a > b,
                    OrderOp::Ge => a >= b,
                };
                if ok {
                    CheckResult::Satisfied
                } else {
                    CheckResult::Violated
                }
            }
            _ => CheckResult::Pending,
        }
    }

    fn clone_box(&self) -> Rc<dyn Constraint> {
        Rc::new(self.clone())
    }

    fn describe(&self) -> String {
        let sym = match self.op {
            OrderOp::Lt => "<",
            OrderOp::Le => "<=",
            OrderOp::Gt => ">",
            OrderOp::Ge => ">=",
        };
        format!("{} {} {}", self.lhs, sym, self.rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unify_atoms() {
        let s = Store::new();
        let r = unify(&Term::atom(1i64), &Term::atom(1i64), &s);
        assert!(r.is_ok());
        let r2 = unify(&Term::atom(1i64), &Term::atom(2i64), &s);
        assert!(r2.is_err());
    }

    #[test]
    fn unify_var_binds() {
        let s = Store::new();
        let v = Term::fresh_var();
        let s2 = unify(&v, &Term::atom(5i64), &s).unwrap();
        assert_eq!(s2.walk(&v), Term::atom(5i64));
    }

    #[test]
    fn unify_pairs() {
        let s = Store::new();
        let v0 = Term::fresh_var();
        let v1 = Term::fresh_var();
        let lhs = Term::pair(v0.clone(), v1.clone());
        let rhs = Term::pair(Term::atom(1i64), Term::atom(2i64));
        let s2 = unify(&lhs, &rhs, &s).unwrap();
        assert_eq!(s2.walk(&v0), Term::atom(1i64));
        assert_eq!(s2.walk(&v1), Term::atom(2i64));
    }

    #[test]
    fn disequality_violated_on_equal_bind() {
        let s = Store::new();
        let v = Term::fresh_var();
        let c = Disequality::new(v.clone(), Term::atom(3i64));
        let s = s.add_constraint(c).unwrap();
        assert!(s.bind(v.as_var().unwrap(), Term::atom(3i64)).is_none());
    }

    #[test]
    fn disequality_satisfied_on_distinct_bind() {
        let s = Store::new();
        let v = Term::fresh_var();
        let c = Disequality::new(v.clone(), Term::atom(3i64));
        let s = s.add_constraint(c).unwrap();
        let s2 = s.bind(v.as_var().unwrap(), Term::atom(4i64)).unwrap();
        assert!(s2.constraints().is_empty());
    }

    #[test]
    fn add_constraint_violated_immediately_fails() {
        let s = Store::new();
        let c = Disequality::new(Term::atom(1i64), Term::atom(1i64));
        assert!(s.add_constraint(c).is_none());
    }
}
