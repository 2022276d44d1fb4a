//! The bounded work-queue / worker-pool shape used for `Disj` fan-out and
//! referenced by `fd::solver::solve_parallel` (spec §5, §9).
//!
//! `Goal` and `Store` are `Rc`-based, so this module cannot hand work to
//! separate OS threads without promoting the whole crate to `Arc` — a
//! change the rest of the crate deliberately avoids (see
//! `fd::solver::solve_parallel`'s doc comment and DESIGN.md). `WorkerPool`
//! therefore queues work through `crossbeam_channel` exactly as a real
//! pool would, and drains it on the calling thread; a later `Arc`
//! migration would only need to change how an item is executed, not how
//! work is queued, rate-limited, or backpressured.
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::config::ExecutorConfig;
use crate::run::Context;
use crate::store::Store;
use crate::stream::Stream;

/// Token-bucket rate limiter (spec §5, §9): refills `rate` tokens per
/// `period` and admits a submission only while a token is available.
/// Grounded on the teacher's fuel/depth bound in `engine::DefaultEngine`,
/// generalized from a single depth counter into a refilling bucket.
#[derive(Debug)]
pub struct RateLimiter {
    capacity: usize,
    tokens: usize,
    period: Duration,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new(capacity: usize, period: Duration) -> RateLimiter {
        RateLimiter {
            capacity,
            tokens: capacity,
            period,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let elapsed = self.last_refill.elapsed();
        if elapsed >= self.period {
            self.tokens = self.capacity;
            self.last_refill = Instant::now();
        }
    }

    /// Consumes one token if available; returns whether the caller may
    /// proceed.
    pub fn try_acquire(&mut self) -> bool {
        self.refill();
        if self.tokens == 0 {
            return false;
        }
        self.tokens -= 1;
        true
    }
}

/// High/low water-mark backpressure over the work queue's current depth
/// (spec §5, §9): once depth reaches `high`, `should_block` reports true
/// until depth drains back to `low`.
#[derive(Debug)]
pub struct BackpressureController {
    high: usize,
    low: usize,
    blocked: bool,
}

impl BackpressureController {
    pub fn new(high: usize, low: usize) -> BackpressureController {
        BackpressureController {
            high,
            low: low.min(high),
            blocked: false,
        }
    }

    pub fn observe(&mut self, depth: usize) -> bool {
        let was_blocked = self.blocked;
        if depth >= self.high {
            self.blocked = true;
        } else if depth <= self.low {
            self.blocked = false;
        }
        if self.blocked != was_blocked {
            tracing::trace!(depth, high = self.high, low = self.low, blocked = self.blocked, "backpressure state changed");
        }
        self.blocked
    }
}

/// A bounded work queue fed by `submit` and drained by `drain_all`,
/// carrying `Goal`-producing thunks rather than `Goal`s themselves so the
/// channel's item type stays `Send`-agnostic (closures here still capture
/// `Rc` state and run on the calling thread, per the module doc comment).
pub struct WorkerPool<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
    backpressure: BackpressureController,
    limiter: Option<RateLimiter>,
    depth: usize,
}

impl<T> WorkerPool<T> {
    pub fn new(cfg: &ExecutorConfig) -> WorkerPool<T> {
        let (tx, rx) = bounded(cfg.max_queue_size.max(1));
        let backpressure = BackpressureController::new(cfg.max_queue_size, cfg.max_queue_size / 2);
        let limiter = cfg
            .rate_limit
            .map(|n| RateLimiter::new(n, Duration::from_millis(100)));
        WorkerPool {
            tx,
            rx,
            backpressure,
            limiter,
            depth: 0,
        }
    }

    /// Queues one work item. Returns `false` without queuing it if
    /// backpressure or the rate limiter currently refuses admission.
    pub fn submit(&mut self, item: T) -> bool {
        if self.backpressure.observe(self.depth) {
            return false;
        }
        if let Some(limiter) = &mut self.limiter {
            if !limiter.try_acquire() {
                return false;
            }
        }
        if self.tx.send(item).is_err() {
            return false;
        }
        self.depth += 1;
        true
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Drains every queued item through `f`, in submission order, updating
    /// queue depth as each item completes — the worker-pool *shape*
    /// without actual concurrent execution (see module doc comment).
    pub fn drain_all<R>(mut self, mut f: impl FnMut(T) -> R) -> Vec<R> {
        drop(self.tx);
        let mut out = Vec::new();
        while let Ok(item) = self.rx.recv() {
            self.depth = self.depth.saturating_sub(1);
            self.backpressure.observe(self.depth);
            out.push(f(item));
        }
        out
    }
}

/// Fans a `Disj` over `goals` out through a [`WorkerPool`] before merging
/// the resulting streams with [`Stream::mplus_fair`] (spec §5's
/// "`Disj` fan-out" over the bounded work channel), instead of the plain
/// left-to-right fold `goal::combinators::disj` uses. Useful when `goals`
/// is large enough that fair round-robin interleaving over the whole set
/// at once (rather than pairwise) matters for answer ordering.
pub fn disj_parallel(goals: Vec<crate::goal::Goal>, cfg: &ExecutorConfig) -> crate::goal::Goal {
    crate::goal::Goal::from_fn(move |ctx: &Context, store: Store| {
        let mut pool: WorkerPool<crate::goal::Goal> = WorkerPool::new(cfg);
        for g in &goals {
            pool.submit(g.clone());
        }
        let streams: Vec<Stream> = pool.drain_all(|g| g.solve(ctx, store.clone()));
        streams
            .into_iter()
            .fold(Stream::empty(), |acc, s| acc.mplus_fair(ctx, s))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limiter_refuses_past_capacity_until_refill() {
        let mut rl = RateLimiter::new(2, Duration::from_secs(60));
        assert!(rl.try_acquire());
        assert!(rl.try_acquire());
        assert!(!rl.try_acquire());
    }

    #[test]
    fn backpressure_blocks_at_high_and_releases_at_low() {
        let mut bp = BackpressureController::new(10, 2);
        assert!(!bp.observe(5));
        assert!(bp.observe(10));
        assert!(bp.observe(9));
        assert!(!bp.observe(2));
    }

    #[test]
    fn worker_pool_drains_in_submission_order() {
        let cfg = ExecutorConfig::default();
        let mut pool: WorkerPool<i64> = WorkerPool::new(&cfg);
        for i in 0..5 {
            assert!(pool.submit(i));
        }
        let out = pool.drain_all(|i| i * 2);
        assert_eq!(out, vec![0, 2, 4, 6, 8]);
    }

    #[test]
    fn disj_parallel_merges_all_branches() {
        use crate::goal::primitives::eq;
        use crate::run::run_star;
        use crate::term::Term;

        let cfg = ExecutorConfig::default();
        let results = run_star(|q| {
            disj_parallel(
                vec![
                    eq(q.clone(), Term::from(1i64)),
                    eq(q.clone(), Term::from(2i64)),
                    eq(q.clone(), Term::from(3i64)),
                ],
                &cfg,
            )
        });
        let mut ints: Vec<i64> = results.iter().map(|t| t.as_int().unwrap()).collect();
        ints.sort();
        assert_eq!(ints, vec![1, 2, 3]);
    }
}
