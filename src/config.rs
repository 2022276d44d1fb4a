//! Ambient configuration surface (spec §6): knobs for the parallel
//! executor, the SLG tabling engine, and (by reference) the finite-domain
//! search configuration that already lives in [`crate::fd::solver::SearchConfig`].
//!
//! Grounded on the teacher's `Engine`/`Solver` construction parameters
//! (`proto_vulcan::engine::DefaultEngine::new` takes a depth/fuel bound) —
//! this crate collects the equivalent knobs into plain config structs
//! rather than constructor arguments, since there are several independent
//! subsystems (executor, SLG, FD search) each with their own bounds.

/// Configuration for the bounded work-queue / worker-pool shape used for
/// `Disj` fan-out and FD parallel search (spec §5, §9).
///
/// The queue and backpressure/rate-limiter bookkeeping in [`crate::executor`]
/// is real; the work itself still runs on the calling thread, the same
/// single-process simplification `fd::solver::solve_parallel` already makes
/// and documents, since `Goal`/`Store` are `Rc`-based and not `Send`.
#[derive(Clone, Debug)]
pub struct ExecutorConfig {
    /// Nominal worker count for the pool shape (drives queue sizing and
    /// the round-robin drain order, not actual OS threads).
    pub max_workers: usize,
    /// Bound on the number of queued-but-not-yet-drained work items.
    pub max_queue_size: usize,
    /// When set, `submit` blocks (cooperatively, via the bounded channel)
    /// once the queue reaches `max_queue_size` rather than growing it.
    pub enable_backpressure: bool,
    /// Token-bucket rate limit: `Some(n)` admits at most `n` submissions
    /// per `drain` cycle; `None` disables rate limiting.
    pub rate_limit: Option<usize>,
}

impl Default for ExecutorConfig {
    fn default() -> ExecutorConfig {
        ExecutorConfig {
            max_workers: 4,
            max_queue_size: 1024,
            enable_backpressure: true,
            rate_limit: None,
        }
    }
}

/// Configuration for the SLG tabling engine (spec §4.6, §6).
#[derive(Clone, Debug)]
pub struct SlgConfig {
    /// Upper bound on the number of distinct call patterns the subgoal
    /// table will hold before `evaluate` starts refusing new entries.
    pub max_table_size: usize,
    /// Upper bound on answers recorded per subgoal, mirroring
    /// `fd::solver`'s `limit` parameter so a runaway producer can't
    /// exhaust memory.
    pub max_answers_per_subgoal: usize,
    /// Upper bound on passes through an SCC's fixpoint loop before it is
    /// reported as [`crate::error::Error::FixpointOverflow`].
    pub max_fixpoint_iterations: u32,
    /// Reserved for a future multi-producer evaluation strategy; currently
    /// every producer still runs on the calling thread regardless of this
    /// flag (see [`ExecutorConfig`]'s doc comment for why).
    pub enable_parallel_producers: bool,
    /// When `false`, every produced answer is inserted into the trie
    /// unconditionally (no structural-equality dedup pass). Tests that
    /// want to observe raw producer output without the trie's usual
    /// deduplication can disable this.
    pub enable_subsumption_checking: bool,
    /// When `true`, a negative call from stratum `p` into a subgoal whose
    /// stratum is `>= p` is reported as
    /// [`crate::error::Error::StratificationViolation`] instead of being
    /// silently accepted (default: soft — see DESIGN.md).
    pub enforce_stratification: bool,
    /// Emits one `tracing::trace!` event per answer insertion, retraction,
    /// and truth-value computation when set. Also settable via the
    /// `WFS_TRACE` environment variable (any non-empty value enables it),
    /// read by [`SlgConfig::from_env`].
    pub debug_wfs: bool,
}

impl Default for SlgConfig {
    fn default() -> SlgConfig {
        SlgConfig {
            max_table_size: 10_000,
            max_answers_per_subgoal: 10_000,
            max_fixpoint_iterations: 10_000,
            enable_parallel_producers: false,
            enable_subsumption_checking: true,
            enforce_stratification: false,
            debug_wfs: false,
        }
    }
}

impl SlgConfig {
    /// Starts from [`SlgConfig::default`] and overlays `debug_wfs` from the
    /// `WFS_TRACE` environment variable, per spec §6.
    pub fn from_env() -> SlgConfig {
        let mut cfg = SlgConfig::default();
        if std::env::var("WFS_TRACE").map(|v| !v.is_empty()).unwrap_or(false) {
            cfg.debug_wfs = true;
        }
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executor_config_defaults_enable_backpressure() {
        let cfg = ExecutorConfig::default();
        assert!(cfg.enable_backpressure);
        assert_eq!(cfg.rate_limit, None);
    }

    #[test]
    fn slg_config_defaults_are_soft_stratification() {
        let cfg = SlgConfig::default();
        assert!(!cfg.enforce_stratification);
        assert!(cfg.enable_subsumption_checking);
    }
}
