//! Lazy, possibly-infinite streams of stores (spec §4.2).
//!
//! Grounded almost 1:1 on the teacher's `stream.rs`/`solver.rs` split: a
//! `Lazy` enum of suspended computations (`Bind`, `MPlus`, `Pause`, `Delay`)
//! driven by an explicit trampoline rather than native recursion, so deep
//! `Conj`/`Disj` chains (routine in `run_star` queries) never blow the Rust
//! call stack.
use crate::goal::Goal;
use crate::run::Context;
use crate::store::Store;

/// A suspended stream computation, forced one step at a time by
/// [`Stream::advance`].
pub enum Lazy {
    Bind(Box<Stream>, Goal),
    MPlus(Box<Stream>, Box<Stream>),
    Pause(Box<Store>, Goal),
}

/// A lazy, possibly-infinite ordered sequence of stores.
pub enum Stream {
    Empty,
    Unit(Box<Store>),
    Cons(Box<Store>, Box<Stream>),
    Lazy(Box<Lazy>),
}

impl Stream {
    pub fn empty() -> Stream {
        Stream::Empty
    }

    pub fn unit(s: Store) -> Stream {
        Stream::Unit(Box::new(s))
    }

    pub fn cons(s: Store, rest: Stream) -> Stream {
        Stream::Cons(Box::new(s), Box::new(rest))
    }

    pub fn pause(s: Store, g: Goal) -> Stream {
        Stream::Lazy(Box::new(Lazy::Pause(Box::new(s), g)))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Stream::Empty)
    }

    fn is_mature(&self) -> bool {
        !matches!(self, Stream::Lazy(_))
    }

    /// `mplus`: merges a mature stream with a (possibly lazy) continuation,
    /// preserving per-branch emission order (spec §5).
    pub fn mplus(self, ctx: &Context, other: Stream) -> Stream {
        match self {
            Stream::Empty => other,
            Stream::Unit(s) => Stream::cons(*s, other),
            Stream::Cons(s, rest) => Stream::cons(*s, rest.mplus(ctx, other)),
            Stream::Lazy(lazy) => {
                if ctx.is_cancelled() {
                    return Stream::Empty;
                }
                Stream::Lazy(Box::new(Lazy::MPlus(Box::new(Stream::Lazy(lazy)), Box::new(other))))
            }
        }
    }

    /// Fair interleaving variant used by `Conde` (spec §4.2): swaps operand
    /// order on each lazy step so every branch gets a turn.
    pub fn mplus_fair(self, ctx: &Context, other: Stream) -> Stream {
        match self {
            Stream::Empty => other,
            Stream::Unit(s) => Stream::cons(*s, other),
            Stream::Cons(s, rest) => Stream::cons(*s, other.mplus_fair(ctx, *rest)),
            Stream::Lazy(lazy) => {
                if ctx.is_cancelled() {
                    return Stream::Empty;
                }
                other.advance_one(ctx).mplus_fair_delay(ctx, Stream::Lazy(lazy))
            }
        }
    }

    fn mplus_fair_delay(self, ctx: &Context, other: Stream) -> Stream {
        match self {
            Stream::Empty => other,
            Stream::Unit(s) => Stream::cons(*s, other),
            Stream::Cons(s, rest) => Stream::cons(*s, other.mplus_fair(ctx, *rest)),
            Stream::Lazy(_) => self.mplus_fair(ctx, other),
        }
    }

    /// `bind`: threads every store in `self` through `goal`, concatenating
    /// the resulting streams (spec §4.2's `Conj` semantics).
    pub fn bind(self, ctx: &Context, goal: Goal) -> Stream {
        match self {
            Stream::Empty => Stream::Empty,
            Stream::Unit(s) => Stream::pause(*s, goal),
            Stream::Cons(s, rest) => {
                let head = Stream::pause(*s, goal.clone());
                let tail = Box::new(Lazy::Bind(rest, goal));
                head.mplus(ctx, Stream::Lazy(tail))
            }
            Stream::Lazy(lazy) => {
                if ctx.is_cancelled() {
                    return Stream::Empty;
                }
                Stream::Lazy(Box::new(Lazy::Bind(Box::new(Stream::Lazy(lazy)), goal)))
            }
        }
    }

    /// Forces one step of laziness, returning a mature (`Empty`/`Unit`/
    /// `Cons`) stream. Honors cancellation: once `ctx` is cancelled, no
    /// further stores are produced.
    pub fn advance_one(self, ctx: &Context) -> Stream {
        let mut cur = self;
        loop {
            if ctx.is_cancelled() {
                return Stream::Empty;
            }
            match cur {
                Stream::Lazy(lazy) => match *lazy {
                    Lazy::Bind(stream, goal) => {
                        let forced = stream.advance_one(ctx);
                        cur = forced.bind(ctx, goal);
                    }
                    Lazy::MPlus(a, b) => {
                        let forced = a.advance_one(ctx);
                        cur = forced.mplus(ctx, *b);
                    }
                    Lazy::Pause(store, goal) => {
                        cur = goal.solve(ctx, *store);
                    }
                },
                mature => return mature,
            }
        }
    }

    /// Forces one step under fair (`Conde`-style) interleaving.
    pub fn advance_one_fair(self, ctx: &Context) -> Stream {
        let mut cur = self;
        loop {
            if ctx.is_cancelled() {
                return Stream::Empty;
            }
            match cur {
                Stream::Lazy(lazy) => match *lazy {
                    Lazy::Bind(stream, goal) => {
                        let forced = stream.advance_one_fair(ctx);
                        cur = forced.bind(ctx, goal);
                    }
                    Lazy::MPlus(a, b) => {
                        let forced = a.advance_one_fair(ctx);
                        cur = forced.mplus_fair(ctx, *b);
                    }
                    Lazy::Pause(store, goal) => {
                        cur = goal.solve(ctx, *store);
                    }
                },
                mature => return mature,
            }
        }
    }

    /// Pops the next store, if any, advancing laziness as needed.
    pub fn uncons(self, ctx: &Context) -> Option<(Store, Stream)> {
        match self.advance_one(ctx) {
            Stream::Empty => None,
            Stream::Unit(s) => Some((*s, Stream::Empty)),
            Stream::Cons(s, rest) => Some((*s, *rest)),
            Stream::Lazy(_) => unreachable!("advance_one always matures"),
        }
    }

    pub fn uncons_fair(self, ctx: &Context) -> Option<(Store, Stream)> {
        match self.advance_one_fair(ctx) {
            Stream::Empty => None,
            Stream::Unit(s) => Some((*s, Stream::Empty)),
            Stream::Cons(s, rest) => Some((*s, *rest)),
            Stream::Lazy(_) => unreachable!("advance_one_fair always matures"),
        }
    }

    /// Takes up to `n` stores (`0` returns an empty vector without driving
    /// the stream at all, per spec §8's `run(0, ...)` boundary case).
    pub fn take(self, ctx: &Context, n: Option<usize>) -> Vec<Store> {
        let mut out = Vec::new();
        if n == Some(0) {
            return out;
        }
        let mut cur = self;
        loop {
            if ctx.is_cancelled() {
                return out;
            }
            if let Some(limit) = n {
                if out.len() >= limit {
                    return out;
                }
            }
            match cur.uncons(ctx) {
                Some((s, rest)) => {
                    out.push(s);
                    cur = rest;
                }
                None => return out,
            }
        }
    }

    /// Closes the stream: honored implicitly by simply dropping it, since no
    /// resources here outlive a `Store`'s `Rc` fields. Present for symmetry
    /// with spec §4.2's `close` operation and so callers have an explicit
    /// place to hang cleanup if a future store kind needs it.
    pub fn close(self) {
        drop(self);
    }
}
