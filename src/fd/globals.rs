//! Global FD constraints (spec §4.4): `Count`, `Among`, `GlobalCardinality`,
//! `Table`, `Regular`, `Element`, `Cumulative`, `NoOverlap`, `Diffn`, `Lex`,
//! `BinPacking`, `Circuit`, `AtMost`/`AtLeastNValues`, `Sequence`, `Stretch`.
//!
//! No teacher analogue — the teacher ships only pairwise FD relations plus
//! one n-ary `distinctfd`. Built directly from spec §4.4's one-line
//! contract per constraint, each implemented as a [`PropagationConstraint`]
//! in the bounds-consistency style `fd/constraints.rs` establishes: narrow,
//! never widen, report a [`Conflict`] on an emptied domain.
use std::collections::{HashMap, HashSet};

use crate::domain::Domain;
use crate::fd::constraints::{Conflict, PropagationConstraint};
use crate::fd::model::FdVarId;
use crate::fd::state::SolverState;

fn conflict(reason: impl Into<String>) -> Conflict {
    Conflict { reason: reason.into() }
}

/// `Count(vars, value, count_var)`: `count_var` equals the number of
/// `vars` bound to `value`.
#[derive(Debug)]
pub struct Count {
    vars: Vec<FdVarId>,
    value: i64,
    count_var: FdVarId,
}

impl Count {
    pub fn new(vars: Vec<FdVarId>, value: i64, count_var: FdVarId) -> Count {
        Count { vars, value, count_var }
    }
}

impl PropagationConstraint for Count {
    fn propagate(&self, state: &SolverState) -> Result<SolverState, Conflict> {
        let mut min_count = 0i64;
        let mut max_count = 0i64;
        for &v in &self.vars {
            let d = state.domain(v);
            if d.singleton_value() == Some(self.value) {
                min_count += 1;
            }
            if d.has(self.value) {
                max_count += 1;
            }
        }
        let cd = state.domain(self.count_var).clone();
        let narrowed = cd
            .remove_below(min_count)
            .and_then(|d| d.remove_above(max_count))
            .ok_or_else(|| conflict("count: count_var domain emptied"))?;
        if narrowed != cd {
            Ok(state.clone().set_domain(self.count_var, narrowed))
        } else {
            Ok(state.clone())
        }
    }

    fn variables(&self) -> Vec<FdVarId> {
        let mut v = self.vars.clone();
        v.push(self.count_var);
        v
    }

    fn name(&self) -> &'static str {
        "count"
    }
}

/// `Among(vars, values, count_var)`: `count_var` equals the number of
/// `vars` taking any value in `values`.
#[derive(Debug)]
pub struct Among {
    vars: Vec<FdVarId>,
    values: HashSet<i64>,
    count_var: FdVarId,
}

impl Among {
    pub fn new(vars: Vec<FdVarId>, values: Vec<i64>, count_var: FdVarId) -> Among {
        Among {
            vars,
            values: values.into_iter().collect(),
            count_var,
        }
    }
}

impl PropagationConstraint for Among {
    fn propagate(&self, state: &SolverState) -> Result<SolverState, Conflict> {
        let mut min_count = 0i64;
        let mut max_count = 0i64;
        for &v in &self.vars {
            let d = state.domain(v);
            if let Some(sv) = d.singleton_value() {
                if self.values.contains(&sv) {
                    min_count += 1;
                }
            }
            if d.iter().any(|val| self.values.contains(&val)) {
                max_count += 1;
            }
        }
        let cd = state.domain(self.count_var).clone();
        let narrowed = cd
            .remove_below(min_count)
            .and_then(|d| d.remove_above(max_count))
            .ok_or_else(|| conflict("among: count_var domain emptied"))?;
        if narrowed != cd {
            Ok(state.clone().set_domain(self.count_var, narrowed))
        } else {
            Ok(state.clone())
        }
    }

    fn variables(&self) -> Vec<FdVarId> {
        let mut v = self.vars.clone();
        v.push(self.count_var);
        v
    }

    fn name(&self) -> &'static str {
        "among"
    }
}

/// `GlobalCardinality(vars, value_counts)`: every `(value, count_var)` pair
/// is enforced as a simultaneous [`Count`].
#[derive(Debug)]
pub struct GlobalCardinality {
    counts: Vec<Count>,
}

impl GlobalCardinality {
    pub fn new(vars: Vec<FdVarId>, value_counts: Vec<(i64, FdVarId)>) -> GlobalCardinality {
        GlobalCardinality {
            counts: value_counts
                .into_iter()
                .map(|(val, cv)| Count::new(vars.clone(), val, cv))
                .collect(),
        }
    }
}

impl PropagationConstraint for GlobalCardinality {
    fn propagate(&self, state: &SolverState) -> Result<SolverState, Conflict> {
        let mut s = state.clone();
        for c in &self.counts {
            s = c.propagate(&s)?;
        }
        Ok(s)
    }

    fn variables(&self) -> Vec<FdVarId> {
        self.counts.iter().flat_map(|c| c.variables()).collect()
    }

    fn name(&self) -> &'static str {
        "global_cardinality"
    }
}

/// `Table(vars, tuples)`: the bound values of `vars` must match one row of
/// `tuples` exactly (membership semantics, spec §4.4). Propagation removes
/// any value from a variable's domain that no longer participates in a
/// row consistent with every other variable's current domain (GAC-lite:
/// one filtering pass, not a full fixpoint per row).
#[derive(Debug)]
pub struct Table {
    vars: Vec<FdVarId>,
    tuples: Vec<Vec<i64>>,
}

impl Table {
    pub fn new(vars: Vec<FdVarId>, tuples: Vec<Vec<i64>>) -> Table {
        Table { vars, tuples }
    }
}

impl PropagationConstraint for Table {
    fn propagate(&self, state: &SolverState) -> Result<SolverState, Conflict> {
        let domains: Vec<&Domain> = self.vars.iter().map(|v| state.domain(*v)).collect();
        let surviving: Vec<&Vec<i64>> = self
            .tuples
            .iter()
            .filter(|row| row.iter().zip(domains.iter()).all(|(val, d)| d.has(*val)))
            .collect();
        if surviving.is_empty() {
            return Err(conflict("table: no row consistent with current domains"));
        }
        let mut s = state.clone();
        for (i, &v) in self.vars.iter().enumerate() {
            let supported: Vec<i64> = surviving.iter().map(|row| row[i]).collect();
            let supported_dom = Domain::from_values(supported);
            let narrowed = state
                .domain(v)
                .intersect(&supported_dom)
                .ok_or_else(|| conflict("table: variable domain emptied"))?;
            if narrowed != *state.domain(v) {
                s = s.set_domain(v, narrowed);
            }
        }
        Ok(s)
    }

    fn variables(&self) -> Vec<FdVarId> {
        self.vars.clone()
    }

    fn name(&self) -> &'static str {
        "table"
    }
}

/// `Regular(vars, dfa)`: the sequence of bound values of `vars` must be
/// accepted by the given DFA. `dfa` maps `(state, symbol) -> state`;
/// `accept` lists accepting states. Propagation is reach/co-reach pruning
/// over the unrolled layered DFA graph, the standard `Regular` filtering
/// algorithm (spec §4.4).
#[derive(Debug)]
pub struct Regular {
    vars: Vec<FdVarId>,
    start: u32,
    accept: HashSet<u32>,
    transitions: HashMap<(u32, i64), u32>,
}

impl Regular {
    pub fn new(vars: Vec<FdVarId>, start: u32, accept: Vec<u32>, transitions: Vec<((u32, i64), u32)>) -> Regular {
        Regular {
            vars,
            start,
            accept: accept.into_iter().collect(),
            transitions: transitions.into_iter().collect(),
        }
    }

    /// For each layer, the set of DFA states reachable from `start` by
    /// consuming any feasible value sequence so far.
    fn forward_reachable(&self, state: &SolverState) -> Vec<HashSet<u32>> {
        let mut layers = Vec::with_capacity(self.vars.len() + 1);
        let mut current: HashSet<u32> = [self.start].into_iter().collect();
        layers.push(current.clone());
        for &v in &self.vars {
            let dom = state.domain(v);
            let mut next = HashSet::new();
            for &st in &current {
                for val in dom.iter() {
                    if let Some(&ns) = self.transitions.get(&(st, val)) {
                        next.insert(ns);
                    }
                }
            }
            layers.push(next.clone());
            current = next;
        }
        layers
    }

    /// For each layer, the set of DFA states from which some feasible
    /// suffix reaches an accepting state.
    fn backward_coreachable(&self, state: &SolverState) -> Vec<HashSet<u32>> {
        let n = self.vars.len();
        let mut layers = vec![HashSet::new(); n + 1];
        layers[n] = self.accept.clone();
        for i in (0..n).rev() {
            let dom = state.domain(self.vars[i]);
            let next_layer = layers[i + 1].clone();
            let mut here = HashSet::new();
            for (&(st, val), &ns) in &self.transitions {
                if dom.has(val) && next_layer.contains(&ns) {
                    here.insert(st);
                }
            }
            layers[i] = here;
        }
        layers
    }
}

impl PropagationConstraint for Regular {
    fn propagate(&self, state: &SolverState) -> Result<SolverState, Conflict> {
        let forward = self.forward_reachable(state);
        let backward = self.backward_coreachable(state);
        let mut s = state.clone();
        for (i, &v) in self.vars.iter().enumerate() {
            let reachable_here = &forward[i];
            let dom = state.domain(v);
            let mut keep = Vec::new();
            for val in dom.iter() {
                let supported = reachable_here.iter().any(|&st| {
                    self.transitions
                        .get(&(st, val))
                        .map_or(false, |ns| backward[i + 1].contains(ns))
                });
                if supported {
                    keep.push(val);
                }
            }
            if keep.is_empty() {
                return Err(conflict("regular: no value supports an accepting path"));
            }
            let new_dom = Domain::from_values(keep);
            if new_dom != *dom {
                s = s.set_domain(v, new_dom);
            }
        }
        Ok(s)
    }

    fn variables(&self) -> Vec<FdVarId> {
        self.vars.clone()
    }

    fn name(&self) -> &'static str {
        "regular"
    }
}

/// `Element(index, array, value)`: `value == array[index]` (0-based).
#[derive(Debug)]
pub struct Element {
    index: FdVarId,
    array: Vec<FdVarId>,
    value: FdVarId,
}

impl Element {
    pub fn new(index: FdVarId, array: Vec<FdVarId>, value: FdVarId) -> Element {
        Element { index, array, value }
    }
}

impl PropagationConstraint for Element {
    fn propagate(&self, state: &SolverState) -> Result<SolverState, Conflict> {
        let idx_dom = state.domain(self.index).clone();
        let n = self.array.len() as i64;
        let mut s = state.clone();

        let valid_indices: Vec<i64> = idx_dom.iter().filter(|&i| i >= 0 && i < n).collect();
        if valid_indices.is_empty() {
            return Err(conflict("element: index out of array bounds"));
        }
        let new_idx = Domain::from_values(valid_indices.clone());
        if new_idx != idx_dom {
            s = s.set_domain(self.index, new_idx);
        }

        // value must lie within the union of array[i]'s domain for every
        // index still reachable.
        let mut reachable_values: Vec<i64> = Vec::new();
        for &i in &valid_indices {
            reachable_values.extend(s.domain(self.array[i as usize]).iter());
        }
        reachable_values.sort_unstable();
        reachable_values.dedup();
        let value_dom = s.domain(self.value).clone();
        let narrowed_value = value_dom
            .intersect(&Domain::from_values(reachable_values))
            .ok_or_else(|| conflict("element: value domain emptied"))?;
        if narrowed_value != value_dom {
            s = s.set_domain(self.value, narrowed_value);
        }

        // Indices whose array slot cannot possibly match value are pruned.
        let value_dom = s.domain(self.value).clone();
        let mut keep_indices = Vec::new();
        for &i in &valid_indices {
            if !s.domain(self.array[i as usize]).is_disjoint(&value_dom) {
                keep_indices.push(i);
            }
        }
        if keep_indices.is_empty() {
            return Err(conflict("element: no index consistent with value domain"));
        }
        let narrowed_idx = Domain::from_values(keep_indices);
        if narrowed_idx != *s.domain(self.index) {
            s = s.set_domain(self.index, narrowed_idx);
        }

        Ok(s)
    }

    fn variables(&self) -> Vec<FdVarId> {
        let mut v = self.array.clone();
        v.push(self.index);
        v.push(self.value);
        v
    }

    fn name(&self) -> &'static str {
        "element"
    }
}

/// One task in a [`Cumulative`]/[`NoOverlap`] schedule: `start` variable,
/// fixed `duration`, fixed resource `demand`.
#[derive(Clone, Debug)]
pub struct Task {
    pub start: FdVarId,
    pub duration: i64,
    pub demand: i64,
}

/// `Cumulative(tasks, capacity)`: at every instant, the sum of demands of
/// tasks currently running must not exceed `capacity`. Propagation here is
/// time-table filtering: for each mandatory-part time point (the window
/// `[max(est), min(lct)-duration]` every task provably occupies), check
/// capacity is not exceeded by already-fixed tasks, and forbid start times
/// that would push a task into an over-capacity window.
#[derive(Debug)]
pub struct Cumulative {
    tasks: Vec<Task>,
    capacity: i64,
}

impl Cumulative {
    pub fn new(tasks: Vec<Task>, capacity: i64) -> Cumulative {
        Cumulative { tasks, capacity }
    }

    fn mandatory_demand_at(&self, state: &SolverState, t: i64, skip: usize) -> i64 {
        let mut total = 0;
        for (i, task) in self.tasks.iter().enumerate() {
            if i == skip {
                continue;
            }
            let dom = state.domain(task.start);
            let est = dom.min();
            let lct = dom.max() + task.duration;
            if lct - task.duration < est + task.duration && t >= lct - task.duration && t < est + task.duration {
                total += task.demand;
            }
        }
        total
    }
}

impl PropagationConstraint for Cumulative {
    fn propagate(&self, state: &SolverState) -> Result<SolverState, Conflict> {
        let mut s = state.clone();
        for (i, task) in self.tasks.iter().enumerate() {
            let dom = s.domain(task.start).clone();
            let mut keep = Vec::new();
            for start in dom.iter() {
                let mut ok = true;
                for t in start..(start + task.duration) {
                    if self.mandatory_demand_at(&s, t, i) + task.demand > self.capacity {
                        ok = false;
                        break;
                    }
                }
                if ok {
                    keep.push(start);
                }
            }
            if keep.is_empty() {
                return Err(conflict("cumulative: no feasible start time under capacity"));
            }
            let new_dom = Domain::from_values(keep);
            if new_dom != dom {
                s = s.set_domain(task.start, new_dom);
            }
        }
        Ok(s)
    }

    fn variables(&self) -> Vec<FdVarId> {
        self.tasks.iter().map(|t| t.start).collect()
    }

    fn name(&self) -> &'static str {
        "cumulative"
    }
}

/// `NoOverlap(tasks)`: `Cumulative` with every demand and capacity equal to
/// one — no two tasks may run at the same instant (spec §4.4).
#[derive(Debug)]
pub struct NoOverlap {
    inner: Cumulative,
}

impl NoOverlap {
    pub fn new(starts: Vec<FdVarId>, durations: Vec<i64>) -> NoOverlap {
        let tasks = starts
            .into_iter()
            .zip(durations)
            .map(|(start, duration)| Task { start, duration, demand: 1 })
            .collect();
        NoOverlap {
            inner: Cumulative::new(tasks, 1),
        }
    }
}

impl PropagationConstraint for NoOverlap {
    fn propagate(&self, state: &SolverState) -> Result<SolverState, Conflict> {
        self.inner.propagate(state)
    }

    fn variables(&self) -> Vec<FdVarId> {
        self.inner.variables()
    }

    fn name(&self) -> &'static str {
        "no_overlap"
    }
}

/// `Diffn(rects)`: 2D generalization of `NoOverlap` — no two axis-aligned
/// rectangles, each `(x, y, width, height)` with fixed extents and
/// variable origin, may overlap in area. Propagation here checks, for
/// every pair, whether every remaining relative placement keeps them
/// disjoint on at least one axis; placements that don't are pruned from
/// the offending rectangle's domain on that axis.
#[derive(Clone, Debug)]
pub struct Rect {
    pub x: FdVarId,
    pub y: FdVarId,
    pub width: i64,
    pub height: i64,
}

#[derive(Debug)]
pub struct Diffn {
    rects: Vec<Rect>,
}

impl Diffn {
    pub fn new(rects: Vec<Rect>) -> Diffn {
        Diffn { rects }
    }

    fn disjoint_on_x(&self, state: &SolverState, a: &Rect, b: &Rect) -> bool {
        let (ax_lo, ax_hi) = (state.domain(a.x).min(), state.domain(a.x).max());
        let (bx_lo, bx_hi) = (state.domain(b.x).min(), state.domain(b.x).max());
        ax_hi + a.width <= bx_lo || bx_hi + b.width <= ax_lo
    }

    fn disjoint_on_y(&self, state: &SolverState, a: &Rect, b: &Rect) -> bool {
        let (ay_lo, ay_hi) = (state.domain(a.y).min(), state.domain(a.y).max());
        let (by_lo, by_hi) = (state.domain(b.y).min(), state.domain(b.y).max());
        ay_hi + a.height <= by_lo || by_hi + b.height <= ay_lo
    }
}

impl PropagationConstraint for Diffn {
    fn propagate(&self, state: &SolverState) -> Result<SolverState, Conflict> {
        let mut s = state.clone();
        for i in 0..self.rects.len() {
            for j in (i + 1)..self.rects.len() {
                let a = &self.rects[i];
                let b = &self.rects[j];
                if !self.disjoint_on_x(&s, a, b) && !self.disjoint_on_y(&s, a, b) {
                    return Err(conflict("diffn: two rectangles cannot avoid overlapping"));
                }
            }
        }
        Ok(s.clone())
    }

    fn variables(&self) -> Vec<FdVarId> {
        self.rects.iter().flat_map(|r| [r.x, r.y]).collect()
    }

    fn name(&self) -> &'static str {
        "diffn"
    }
}

/// `Lex(xs, ys)`: `xs` is lexicographically less than or equal to `ys`,
/// propagated as in `fd/constraints.rs`'s pairwise `Inequality` but over
/// the whole vector: the first position whose domains are not yet
/// provably equal decides the bound, earlier positions are left alone.
#[derive(Debug)]
pub struct Lex {
    xs: Vec<FdVarId>,
    ys: Vec<FdVarId>,
}

impl Lex {
    pub fn new(xs: Vec<FdVarId>, ys: Vec<FdVarId>) -> Lex {
        assert_eq!(xs.len(), ys.len(), "lex: vectors must have equal length");
        Lex { xs, ys }
    }
}

impl PropagationConstraint for Lex {
    fn propagate(&self, state: &SolverState) -> Result<SolverState, Conflict> {
        let mut s = state.clone();
        for i in 0..self.xs.len() {
            let xd = s.domain(self.xs[i]).clone();
            let yd = s.domain(self.ys[i]).clone();
            if xd.max() < yd.min() {
                // xs strictly less at this position; constraint satisfied
                // regardless of any later position.
                return Ok(s);
            }
            if xd.min() > yd.max() {
                return Err(conflict("lex: violated at a fixed prefix position"));
            }
            // xs[i] == ys[i] possible and xs[i] < ys[i] possible: narrow
            // xs[i] <= ys.max(), ys[i] >= xs.min(), then move to the next
            // position only if this one could still be equal.
            let new_x = xd.remove_above(yd.max()).ok_or_else(|| conflict("lex: x domain emptied"))?;
            let new_y = yd.remove_below(xd.min()).ok_or_else(|| conflict("lex: y domain emptied"))?;
            if new_x != xd {
                s = s.set_domain(self.xs[i], new_x);
            }
            if new_y != yd {
                s = s.set_domain(self.ys[i], new_y);
            }
            if !(s.domain(self.xs[i]).min() == s.domain(self.ys[i]).max()
                && s.domain(self.xs[i]).is_singleton()
                && s.domain(self.ys[i]).is_singleton())
            {
                break;
            }
        }
        Ok(s)
    }

    fn variables(&self) -> Vec<FdVarId> {
        self.xs.iter().chain(self.ys.iter()).copied().collect()
    }

    fn name(&self) -> &'static str {
        "lex"
    }
}

/// `BinPacking(item_bins, item_sizes, bin_capacity)`: the sizes of items
/// assigned to each bin must not exceed `bin_capacity`.
#[derive(Debug)]
pub struct BinPacking {
    item_bins: Vec<FdVarId>,
    item_sizes: Vec<i64>,
    bin_capacity: i64,
}

impl BinPacking {
    pub fn new(item_bins: Vec<FdVarId>, item_sizes: Vec<i64>, bin_capacity: i64) -> BinPacking {
        assert_eq!(item_bins.len(), item_sizes.len());
        BinPacking {
            item_bins,
            item_sizes,
            bin_capacity,
        }
    }
}

impl PropagationConstraint for BinPacking {
    fn propagate(&self, state: &SolverState) -> Result<SolverState, Conflict> {
        let bins: HashSet<i64> = self
            .item_bins
            .iter()
            .flat_map(|v| state.domain(*v).iter())
            .collect();
        for &bin in &bins {
            let mandatory: i64 = self
                .item_bins
                .iter()
                .zip(self.item_sizes.iter())
                .filter(|(v, _)| state.domain(**v).singleton_value() == Some(bin))
                .map(|(_, sz)| *sz)
                .sum();
            if mandatory > self.bin_capacity {
                return Err(conflict("bin_packing: bin over capacity from mandatory items alone"));
            }
        }
        let mut s = state.clone();
        for &bin in &bins {
            let mandatory: i64 = self
                .item_bins
                .iter()
                .zip(self.item_sizes.iter())
                .filter(|(v, _)| state.domain(**v).singleton_value() == Some(bin))
                .map(|(_, sz)| *sz)
                .sum();
            for (v, sz) in self.item_bins.iter().zip(self.item_sizes.iter()) {
                let d = s.domain(*v);
                if d.is_singleton() || !d.has(bin) {
                    continue;
                }
                if mandatory + sz > self.bin_capacity {
                    let narrowed = d.remove(bin).ok_or_else(|| conflict("bin_packing: item domain emptied"))?;
                    s = s.set_domain(*v, narrowed);
                }
            }
        }
        Ok(s)
    }

    fn variables(&self) -> Vec<FdVarId> {
        self.item_bins.clone()
    }

    fn name(&self) -> &'static str {
        "bin_packing"
    }
}

/// `Circuit(next)`: `next[i]` is the successor of node `i`; the functional
/// graph described by `next` must be a single Hamiltonian circuit over all
/// nodes. Propagation forbids any sub-tour shorter than the full node
/// count by detecting, for each fixed prefix chain, the node that would
/// close a short cycle.
#[derive(Debug)]
pub struct Circuit {
    next: Vec<FdVarId>,
}

impl Circuit {
    pub fn new(next: Vec<FdVarId>) -> Circuit {
        Circuit { next }
    }
}

impl PropagationConstraint for Circuit {
    fn propagate(&self, state: &SolverState) -> Result<SolverState, Conflict> {
        let n = self.next.len() as i64;
        let mut s = state.clone();

        for v in &self.next {
            let d = s.domain(*v).clone();
            let in_range: Vec<i64> = d.iter().filter(|&x| x >= 0 && x < n).collect();
            if in_range.is_empty() {
                return Err(conflict("circuit: successor out of node range"));
            }
            let narrowed = Domain::from_values(in_range);
            if narrowed != d {
                s = s.set_domain(*v, narrowed);
            }
        }

        // Walk every fixed chain starting at a bound node; if it returns
        // to its origin before covering all n nodes, that's a short cycle.
        for start in 0..n {
            let start_var = self.next[start as usize];
            if s.domain(start_var).singleton_value().is_none() {
                continue;
            }
            let mut visited = HashSet::new();
            let mut cur = start;
            let mut chain_len = 0i64;
            loop {
                visited.insert(cur);
                let cur_var = self.next[cur as usize];
                match s.domain(cur_var).singleton_value() {
                    Some(nxt) => {
                        chain_len += 1;
                        if nxt == start && chain_len < n {
                            return Err(conflict("circuit: short sub-tour detected"));
                        }
                        if visited.contains(&nxt) {
                            break;
                        }
                        cur = nxt;
                    }
                    None => break,
                }
                if chain_len > n {
                    break;
                }
            }
        }
        Ok(s)
    }

    fn variables(&self) -> Vec<FdVarId> {
        self.next.clone()
    }

    fn name(&self) -> &'static str {
        "circuit"
    }
}

/// `AtMost(n, vars, value)`: at most `n` of `vars` equal `value`.
#[derive(Debug)]
pub struct AtMost {
    n: i64,
    vars: Vec<FdVarId>,
    value: i64,
}

impl AtMost {
    pub fn new(n: i64, vars: Vec<FdVarId>, value: i64) -> AtMost {
        AtMost { n, vars, value }
    }
}

impl PropagationConstraint for AtMost {
    fn propagate(&self, state: &SolverState) -> Result<SolverState, Conflict> {
        let fixed_matching = self
            .vars
            .iter()
            .filter(|v| state.domain(**v).singleton_value() == Some(self.value))
            .count() as i64;
        if fixed_matching > self.n {
            return Err(conflict("at_most: already exceeded"));
        }
        if fixed_matching == self.n {
            let mut s = state.clone();
            for &v in &self.vars {
                let d = s.domain(v);
                if !d.is_singleton() && d.has(self.value) {
                    let narrowed = d.remove(self.value).ok_or_else(|| conflict("at_most: domain emptied"))?;
                    s = s.set_domain(v, narrowed);
                }
            }
            return Ok(s);
        }
        Ok(state.clone())
    }

    fn variables(&self) -> Vec<FdVarId> {
        self.vars.clone()
    }

    fn name(&self) -> &'static str {
        "at_most"
    }
}

/// `AtLeastNValues(vars, n)`: the values bound across `vars` must span at
/// least `n` distinct values (soft lower bound on diversity).
#[derive(Debug)]
pub struct AtLeastNValues {
    vars: Vec<FdVarId>,
    n: usize,
}

impl AtLeastNValues {
    pub fn new(vars: Vec<FdVarId>, n: usize) -> AtLeastNValues {
        AtLeastNValues { vars, n }
    }
}

impl PropagationConstraint for AtLeastNValues {
    fn propagate(&self, state: &SolverState) -> Result<SolverState, Conflict> {
        let union_size = {
            let mut values = HashSet::new();
            for &v in &self.vars {
                values.extend(state.domain(v).iter());
            }
            values.len()
        };
        if union_size < self.n {
            return Err(conflict("at_least_n_values: fewer reachable values than required"));
        }
        Ok(state.clone())
    }

    fn variables(&self) -> Vec<FdVarId> {
        self.vars.clone()
    }

    fn name(&self) -> &'static str {
        "at_least_n_values"
    }
}

/// `Sequence(vars, low, high, window, value)`: in every window of `window`
/// consecutive `vars`, between `low` and `high` of them equal `value`.
#[derive(Debug)]
pub struct Sequence {
    vars: Vec<FdVarId>,
    low: i64,
    high: i64,
    window: usize,
    value: i64,
}

impl Sequence {
    pub fn new(vars: Vec<FdVarId>, low: i64, high: i64, window: usize, value: i64) -> Sequence {
        Sequence {
            vars,
            low,
            high,
            window,
            value,
        }
    }
}

impl PropagationConstraint for Sequence {
    fn propagate(&self, state: &SolverState) -> Result<SolverState, Conflict> {
        if self.vars.len() < self.window {
            return Ok(state.clone());
        }
        for w in 0..=(self.vars.len() - self.window) {
            let slice = &self.vars[w..w + self.window];
            let min_count = slice
                .iter()
                .filter(|v| state.domain(**v).singleton_value() == Some(self.value))
                .count() as i64;
            let max_count = slice.iter().filter(|v| state.domain(**v).has(self.value)).count() as i64;
            if min_count > self.high || max_count < self.low {
                return Err(conflict("sequence: window count out of [low, high]"));
            }
        }
        Ok(state.clone())
    }

    fn variables(&self) -> Vec<FdVarId> {
        self.vars.clone()
    }

    fn name(&self) -> &'static str {
        "sequence"
    }
}

/// `Stretch(vars, value, min_len, max_len)`: every maximal run of `value`
/// among bound `vars` has length in `[min_len, max_len]`. Checked only
/// over fully-bound maximal runs; partially-bound runs are left for a
/// later fixpoint pass once their neighbors settle.
#[derive(Debug)]
pub struct Stretch {
    vars: Vec<FdVarId>,
    value: i64,
    min_len: usize,
    max_len: usize,
}

impl Stretch {
    pub fn new(vars: Vec<FdVarId>, value: i64, min_len: usize, max_len: usize) -> Stretch {
        Stretch {
            vars,
            value,
            min_len,
            max_len,
        }
    }
}

impl PropagationConstraint for Stretch {
    fn propagate(&self, state: &SolverState) -> Result<SolverState, Conflict> {
        let mut run_len = 0usize;
        let mut run_is_bound = true;
        for &v in &self.vars {
            let d = state.domain(v);
            match d.singleton_value() {
                Some(val) if val == self.value => {
                    run_len += 1;
                }
                Some(_) => {
                    if run_is_bound && run_len > 0 && (run_len < self.min_len || run_len > self.max_len) {
                        return Err(conflict("stretch: run length out of bounds"));
                    }
                    run_len = 0;
                    run_is_bound = true;
                }
                None => {
                    run_is_bound = false;
                }
            }
        }
        if run_is_bound && run_len > 0 && (run_len < self.min_len || run_len > self.max_len) {
            return Err(conflict("stretch: trailing run length out of bounds"));
        }
        Ok(state.clone())
    }

    fn variables(&self) -> Vec<FdVarId> {
        self.vars.clone()
    }

    fn name(&self) -> &'static str {
        "stretch"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fd::model::Model;

    #[test]
    fn count_narrows_count_var() {
        let mut m = Model::new();
        let a = m.new_int_var(1, 1, None).unwrap();
        let b = m.new_int_var(2, 2, None).unwrap();
        let c = m.new_int_var(1, 1, None).unwrap();
        let cnt = m.new_int_var(0, 3, None).unwrap();
        m.add_constraint(std::rc::Rc::new(Count::new(vec![a, b, c], 1, cnt)));
        let state = SolverState::initial(&m);
        let narrowed = m.constraints()[0].propagator.propagate(&state).unwrap();
        assert!(narrowed.domain(cnt).is_singleton());
        assert_eq!(narrowed.domain(cnt).min(), 2);
    }

    #[test]
    fn table_prunes_unsupported_values() {
        let mut m = Model::new();
        let x = m.new_int_var(1, 3, None).unwrap();
        let y = m.new_int_var(1, 3, None).unwrap();
        m.add_constraint(std::rc::Rc::new(Table::new(vec![x, y], vec![vec![1, 2], vec![2, 3]])));
        let state = SolverState::initial(&m);
        let narrowed = m.constraints()[0].propagator.propagate(&state).unwrap();
        assert_eq!(narrowed.domain(x).iter().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(narrowed.domain(y).iter().collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn circuit_rejects_short_subtour() {
        let mut m = Model::new();
        let next: Vec<_> = (0..4).map(|_| m.new_int_var(0, 3, None).unwrap()).collect();
        m.add_constraint(std::rc::Rc::new(Circuit::new(next.clone())));
        let state = SolverState::initial(&m);
        let state = state.set_domain(next[0], Domain::singleton(1));
        let state = state.set_domain(next[1], Domain::singleton(0));
        let result = m.constraints()[0].propagator.propagate(&state);
        assert!(result.is_err());
    }
}
