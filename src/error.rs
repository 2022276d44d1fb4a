//! The engine's typed error taxonomy (spec §7).
//!
//! Local failures (unification dead ends, domain conflicts, constraint
//! violations) never reach this type — they are recovered by backtracking
//! inside [`crate::store`]/[`crate::fd`]. Only malformed input, corrupt
//! state, or exceeded safety limits surface here. `thiserror` is the
//! teacher's own dependency (gated behind its `debugger` feature in
//! `terohuttunen-proto-vulcan`); promoted to an unconditional dependency
//! here since spec §7 wants a first-class typed error regardless of which
//! optional feature set is enabled.
use thiserror::Error;

use crate::fd::model::Assignment;

#[derive(Error, Debug, Clone)]
pub enum Error {
    /// A finite domain became empty, or a constraint became unsatisfiable
    /// under the current state. Used as a local failure signal inside the
    /// solver; this variant is for callers who need it surfaced explicitly
    /// (e.g. a `Model` validated at construction time).
    #[error("constraint store is inconsistent: {reason}")]
    Inconsistent { reason: String },

    /// A domain became empty (spec §7's explicit variant of `Inconsistent`
    /// "for diagnostic clarity").
    #[error("domain of variable {var} became empty")]
    DomainEmpty { var: String },

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Node/time limit hit during `solve_optimal`; the incumbent (if any) is
    /// still returned to the caller alongside this error.
    #[error("search limit reached ({limit})")]
    SearchLimitReached {
        limit: String,
        incumbent: Option<Assignment>,
    },

    /// A stratification violation, reported only when
    /// `SlgConfig::enforce_stratification` is set (default: soft, silently
    /// reported as zero answers — see DESIGN.md / SPEC_FULL.md §4.6).
    #[error("stratification violation: negation from stratum {parent} into {inner}")]
    StratificationViolation { parent: i64, inner: i64 },

    /// The SLG SCC fixpoint loop exceeded `max_fixpoint_iterations` without
    /// reaching quiescence, or a `beta_normalize` reduction exceeded its
    /// step bound.
    #[error("fixpoint did not converge: {context}")]
    FixpointOverflow { context: String },

    /// An unknown predicate was referenced while enforcing stratification.
    #[error("unknown predicate: {0}")]
    UnknownPredicate(String),

    #[error("model is malformed: {0}")]
    MalformedModel(String),
}

pub type Result<T> = std::result::Result<T, Error>;
