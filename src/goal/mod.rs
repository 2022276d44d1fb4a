//! Goals: functions `(ctx, store) -> Stream<Store>` (spec §4.2).
//!
//! Grounded on the teacher's `goal.rs` (`Goal`/`Solve` trait-object
//! dispatch), collapsed from the teacher's generic `Goal<U, E>` (parametric
//! over user-data and engine type) to a single concrete `Rc<dyn Fn>` closure
//! type — this crate drops the teacher's pluggable `Engine`/`AnyGoal`
//! machinery (see DESIGN.md "Dropped / trimmed"), so there is exactly one
//! search engine and no need for the extra type parameters.
pub mod combinators;
pub mod matching;
pub mod primitives;

use std::fmt;
use std::rc::Rc;

use crate::run::Context;
use crate::store::Store;
use crate::stream::Stream;

type GoalFn = dyn Fn(&Context, Store) -> Stream;

/// A goal: applied to a store under a context, it produces a stream of
/// stores. Cheap to clone (`Rc`-wrapped closure), matching the teacher's
/// `Rc<dyn Solve<U, E>>`-backed `Goal`.
#[derive(Clone)]
pub struct Goal(Rc<GoalFn>);

impl Goal {
    pub fn from_fn<F: Fn(&Context, Store) -> Stream + 'static>(f: F) -> Goal {
        Goal(Rc::new(f))
    }

    pub fn solve(&self, ctx: &Context, store: Store) -> Stream {
        (self.0)(ctx, store)
    }

    /// Always succeeds, yielding the input store unchanged.
    pub fn success() -> Goal {
        Goal::from_fn(|_ctx, store| Stream::unit(store))
    }

    /// Never succeeds.
    pub fn failure() -> Goal {
        Goal::from_fn(|_ctx, _store| Stream::empty())
    }
}

impl fmt::Debug for Goal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Goal(..)")
    }
}
