//! A miniKanren-family relational logic engine with finite-domain
//! constraints, a hybrid cross-solver fixpoint, nominal logic, and SLG
//! tabling with well-founded negation.
//!
//! Module layout follows the teacher crate's flat `pub mod` style: each
//! layer (`term`/`value`/`substitution`/`store` for unification and
//! constraints, `stream`/`goal`/`run` for the search engine, `fd` for
//! finite-domain propagation and search, `hybrid` for cross-solver
//! propagation, `nominal` for binder logic, `slg`/`pldb` for tabled
//! resolution over a fact database, `relations` for the reusable goal
//! library, `executor`/`config` for the ambient concurrency and
//! configuration surface) is its own top-level module.
#[macro_use]
extern crate derivative;

pub mod config;
pub mod domain;
pub mod error;
pub mod executor;
pub mod goal;
pub mod hybrid;
pub mod run;
pub mod store;
pub mod stream;
pub mod substitution;
pub mod term;
pub mod value;

#[cfg(feature = "fd")]
pub mod fd;

#[cfg(feature = "nominal")]
pub mod nominal;

#[cfg(feature = "slg")]
pub mod pldb;
#[cfg(feature = "slg")]
pub mod slg;

pub mod relations;

/// The crate's common public surface, re-exported the way the teacher
/// groups its own `prelude` module.
pub mod prelude {
    pub use crate::config::{ExecutorConfig, SlgConfig};
    pub use crate::error::{Error, Result};
    pub use crate::goal::combinators::{conda, conde, condu, conj, conj2, disj, disj2, onceo, project};
    pub use crate::goal::matching::{matcha, matche, matchu, Clause};
    pub use crate::goal::primitives::*;
    pub use crate::goal::Goal;
    pub use crate::run::{run, run_n, run_star, run_with_context, run_with_isolation, Context, Query};
    pub use crate::store::{unify, Store};
    pub use crate::term::{Term, VarId};
    pub use crate::value::Value;

    pub use crate::relations::arithmetic::{divo, expo, logo, minuso, pluso, timeso};
    pub use crate::relations::lists::{
        appendo, distincto, flatteno, lengtho, membero, permuteo, rembero, reverso, subseto,
    };

    #[cfg(feature = "fd")]
    pub use crate::fd::model::{Assignment, FdVarId, Model};
    #[cfg(feature = "fd")]
    pub use crate::fd::solver::{solve, solve_optimal, solve_parallel, SearchConfig};

    #[cfg(feature = "nominal")]
    pub use crate::nominal::{alpha_eqo, fresho, substo, Freshness, SimpleType, TypeEnv};

    #[cfg(feature = "slg")]
    pub use crate::pldb::{Database, FactChange, MemoryDatabase, Relation};
    #[cfg(feature = "slg")]
    pub use crate::slg::engine::{Engine as SlgEngine, WfsTruth};
    #[cfg(feature = "slg")]
    pub use crate::slg::pattern::CallPattern;
}
