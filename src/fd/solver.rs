//! FD backtracking search: `solve`, `solve_optimal`, `solve_parallel`,
//! variable/value heuristics (spec §4.4).
//!
//! No teacher backtracking loop exists as a separable unit — the teacher
//! interleaves FD propagation into the same monadic stream search as
//! everything else. Built directly from spec §4.4's description of the
//! search loop (propagate to fixed point, pick a variable, branch on a
//! value, recurse, backtrack on conflict), with `solve_parallel` following
//! `executor.rs`'s `crossbeam_channel` work-queue shape for distributing
//! independent branches across a worker pool.
use crossbeam_channel::{bounded, Sender};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::domain::Domain;
use crate::error::{Error, Result};
use crate::fd::model::{Assignment, FdVarId, Model};
use crate::fd::state::SolverState;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum VariableHeuristic {
    /// Minimum remaining values: smallest domain first.
    Mrv,
    /// Domain-size / constraint-degree ratio, ties broken by variable index.
    DomDeg,
    /// Highest constraint degree first.
    Deg,
    /// Declaration order.
    Lex,
    /// Uniformly random, seeded.
    Random,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ValueHeuristic {
    Ascending,
    Descending,
    Random,
}

#[derive(Clone, Debug)]
pub struct SearchConfig {
    pub variable_heuristic: VariableHeuristic,
    pub value_heuristic: ValueHeuristic,
    pub seed: u64,
    /// Upper bound on search nodes explored; `None` for unbounded (spec
    /// §4.4's `SearchLimitReached` error carries the incumbent found so far
    /// when this is exceeded during `solve_optimal`).
    pub node_limit: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> SearchConfig {
        SearchConfig {
            variable_heuristic: VariableHeuristic::Mrv,
            value_heuristic: ValueHeuristic::Ascending,
            seed: 0,
            node_limit: None,
        }
    }
}

fn degree_of(model: &Model, v: FdVarId) -> usize {
    model.constraints().iter().filter(|c| c.vars.contains(&v)).count()
}

fn pick_variable(model: &Model, state: &SolverState, cfg: &SearchConfig, rng: &mut StdRng) -> Option<FdVarId> {
    let unbound: Vec<FdVarId> = model.vars().filter(|v| !state.domain(*v).is_singleton()).collect();
    if unbound.is_empty() {
        return None;
    }
    match cfg.variable_heuristic {
        VariableHeuristic::Lex => unbound.into_iter().next(),
        VariableHeuristic::Random => unbound.choose(rng).copied(),
        VariableHeuristic::Mrv => unbound.into_iter().min_by_key(|v| state.domain(*v).count()),
        VariableHeuristic::Deg => unbound.into_iter().max_by_key(|v| degree_of(model, *v)),
        VariableHeuristic::DomDeg => unbound.into_iter().min_by(|a, b| {
            let ra = state.domain(*a).count() as f64 / (degree_of(model, *a).max(1) as f64);
            let rb = state.domain(*b).count() as f64 / (degree_of(model, *b).max(1) as f64);
            ra.partial_cmp(&rb).unwrap_or(std::cmp::Ordering::Equal)
        }),
    }
}

fn branch_values(domain: &Domain, heuristic: ValueHeuristic, rng: &mut StdRng) -> Vec<i64> {
    match heuristic {
        ValueHeuristic::Ascending => domain.iter().collect(),
        ValueHeuristic::Descending => domain.iter().rev().collect(),
        ValueHeuristic::Random => {
            let mut v: Vec<i64> = domain.iter().collect();
            v.shuffle(rng);
            v
        }
    }
}

/// Propagates every constraint to a fixed point from `state`, or returns
/// the first conflict (spec §4.4: "propagate to fixed point before
/// branching").
fn propagate_to_fixpoint(model: &Model, mut state: SolverState) -> Result<SolverState> {
    let mut pass = 0u32;
    loop {
        pass += 1;
        let mut changed = false;
        for c in model.constraints() {
            let next = c
                .propagator
                .propagate(&state)
                .map_err(|e| Error::Inconsistent { reason: e.reason })?;
            if next != state {
                changed = true;
                state = next;
            }
        }
        tracing::trace!(pass, changed, "propagation pass");
        if !changed {
            return Ok(state);
        }
    }
}

struct SearchCtx<'a> {
    model: &'a Model,
    cfg: &'a SearchConfig,
    rng: StdRng,
    nodes: u64,
}

fn dfs(ctx: &mut SearchCtx, state: SolverState, out: &mut Vec<Assignment>, limit: Option<usize>) -> Result<()> {
    if let Some(n) = ctx.cfg.node_limit {
        if ctx.nodes >= n {
            return Err(Error::SearchLimitReached {
                limit: format!("{} nodes", n),
                incumbent: out.last().cloned(),
            });
        }
    }
    ctx.nodes += 1;

    let state = match propagate_to_fixpoint(ctx.model, state) {
        Ok(s) => s,
        Err(_) => return Ok(()),
    };

    if state.has_empty_domain() {
        return Ok(());
    }

    match pick_variable(ctx.model, &state, ctx.cfg, &mut ctx.rng) {
        None => {
            out.push(state.to_assignment());
            Ok(())
        }
        Some(v) => {
            let dom = state.domain(v).clone();
            for val in branch_values(&dom, ctx.cfg.value_heuristic, &mut ctx.rng) {
                if let Some(n) = limit {
                    if out.len() >= n {
                        return Ok(());
                    }
                }
                let branched = state.clone().set_domain(v, Domain::singleton(val));
                dfs(ctx, branched, out, limit)?;
            }
            Ok(())
        }
    }
}

/// Enumerates up to `limit` solutions (`None` = all), spec §4.4's `solve`.
pub fn solve(model: &Model, cfg: &SearchConfig, limit: Option<usize>) -> Result<Vec<Assignment>> {
    let _span = tracing::trace_span!("solve", vars = model.var_count(), limit = limit.unwrap_or(0)).entered();
    model.validate()?;
    let mut ctx = SearchCtx {
        model,
        cfg,
        rng: StdRng::seed_from_u64(cfg.seed),
        nodes: 0,
    };
    let mut out = Vec::new();
    dfs(&mut ctx, SolverState::initial(model), &mut out, limit)?;
    Ok(out)
}

/// Branch-and-bound search for the assignment extremizing `objective`
/// (spec §4.4's `solve_optimal`): every time a complete assignment improves
/// on the incumbent, the objective variable's domain is tightened before
/// continuing search, pruning any branch that can no longer beat it.
pub fn solve_optimal(
    model: &Model,
    cfg: &SearchConfig,
    objective: FdVarId,
    maximize: bool,
) -> Result<Option<Assignment>> {
    let _span = tracing::trace_span!("solve_optimal", vars = model.var_count(), maximize).entered();
    model.validate()?;
    let mut ctx = SearchCtx {
        model,
        cfg,
        rng: StdRng::seed_from_u64(cfg.seed),
        nodes: 0,
    };
    let mut incumbent: Option<Assignment> = None;
    bb(&mut ctx, SolverState::initial(model), objective, maximize, &mut incumbent)?;
    Ok(incumbent)
}

fn bb(
    ctx: &mut SearchCtx,
    state: SolverState,
    objective: FdVarId,
    maximize: bool,
    incumbent: &mut Option<Assignment>,
) -> Result<()> {
    if let Some(n) = ctx.cfg.node_limit {
        if ctx.nodes >= n {
            return Err(Error::SearchLimitReached {
                limit: format!("{} nodes", n),
                incumbent: incumbent.clone(),
            });
        }
    }
    ctx.nodes += 1;

    let mut state = match propagate_to_fixpoint(ctx.model, state) {
        Ok(s) => s,
        Err(_) => return Ok(()),
    };
    if state.has_empty_domain() {
        return Ok(());
    }

    if let Some(inc) = incumbent.as_ref() {
        let best = inc.get(objective).expect("objective var missing from incumbent");
        let obj_dom = state.domain(objective).clone();
        let bound = if maximize {
            obj_dom.remove_below(best + 1)
        } else {
            obj_dom.remove_above(best - 1)
        };
        match bound {
            Some(d) => state = state.set_domain(objective, d),
            None => return Ok(()),
        }
    }

    match pick_variable(ctx.model, &state, ctx.cfg, &mut ctx.rng) {
        None => {
            let candidate = state.to_assignment();
            let val = candidate.get(objective).expect("objective var unbound at leaf");
            let improves = match incumbent.as_ref() {
                None => true,
                Some(inc) => {
                    let best = inc.get(objective).unwrap();
                    if maximize { val > best } else { val < best }
                }
            };
            if improves {
                *incumbent = Some(candidate);
            }
            Ok(())
        }
        Some(v) => {
            let dom = state.domain(v).clone();
            for val in branch_values(&dom, ctx.cfg.value_heuristic, &mut ctx.rng) {
                let branched = state.clone().set_domain(v, Domain::singleton(val));
                bb(ctx, branched, objective, maximize, incumbent)?;
            }
            Ok(())
        }
    }
}

/// Splits the root's first-variable branches into independent work items
/// fed through a bounded channel and merges their solution sets (spec
/// §4.4, §5). Grounded on `executor.rs`'s bounded-channel work-queue shape.
///
/// The model's constraint store is `Rc`-shared (see `fd/model.rs`,
/// `fd/state.rs`), so branches cannot be handed to separate OS threads
/// without first promoting that storage to `Arc` — a change the rest of
/// the crate's single-process design does not otherwise need (DESIGN.md).
/// `solve_parallel` therefore drains the work queue on the calling thread,
/// preserving the worker-pool *shape* (bounded channel, per-branch
/// independent RNG stream keyed by `val`) so a future `Arc` migration only
/// has to change how each item is executed, not how work is split or
/// merged. `workers` bounds the channel capacity rather than a thread
/// count until that migration lands.
pub fn solve_parallel(model: &Model, cfg: &SearchConfig, workers: usize, limit: Option<usize>) -> Result<Vec<Assignment>> {
    let _span = tracing::trace_span!("solve_parallel", vars = model.var_count(), workers).entered();
    model.validate()?;
    let root = propagate_to_fixpoint(model, SolverState::initial(model))?;
    if root.has_empty_domain() {
        return Ok(Vec::new());
    }
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let split_var = match pick_variable(model, &root, cfg, &mut rng) {
        None => return Ok(vec![root.to_assignment()]),
        Some(v) => v,
    };
    let values = branch_values(root.domain(split_var), cfg.value_heuristic, &mut rng);

    let (tx, rx): (Sender<(FdVarId, i64)>, _) = bounded(workers.max(1).min(values.len().max(1)));
    for val in &values {
        let _ = tx.send((split_var, *val));
    }
    drop(tx);

    let mut merged = Vec::new();
    while let Ok((var, val)) = rx.recv() {
        let branch_root = root.clone().set_domain(var, Domain::singleton(val));
        let mut ctx = SearchCtx {
            model,
            cfg,
            rng: StdRng::seed_from_u64(cfg.seed ^ (val as u64)),
            nodes: 0,
        };
        let mut out = Vec::new();
        dfs(&mut ctx, branch_root, &mut out, limit)?;
        merged.extend(out);
        if let Some(n) = limit {
            if merged.len() >= n {
                merged.truncate(n);
                break;
            }
        }
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_vars_all_different() -> Model {
        let mut m = Model::new();
        let vars: Vec<_> = (0..3).map(|_| m.new_int_var(1, 3, None).unwrap()).collect();
        m.all_different(vars);
        m
    }

    #[test]
    fn solve_respects_limit() {
        let m = three_vars_all_different();
        let cfg = SearchConfig::default();
        let sols = solve(&m, &cfg, Some(2)).unwrap();
        assert_eq!(sols.len(), 2);
    }

    #[test]
    fn solve_optimal_maximizes_sum() {
        let mut m = Model::new();
        let x = m.new_int_var(0, 5, None).unwrap();
        let y = m.new_int_var(0, 5, None).unwrap();
        let total = m.new_int_var(0, 10, None).unwrap();
        m.linear_sum(vec![(1, x), (1, y), (-1, total)], 0);
        let cfg = SearchConfig::default();
        let best = solve_optimal(&m, &cfg, total, true).unwrap().unwrap();
        assert_eq!(best.get(total), Some(10));
    }
}
