//! The reusable relational library (spec §4.8): list relations and
//! arithmetic relations built from `Conj`/`Conde` over the core goal DSL.
//!
//! Grounded on the teacher's `relation/*.rs` modules (`appendo.rs`,
//! `membero.rs`, `permuteo.rs`, `rembero.rs`, `distincto.rs`,
//! `plusz.rs`/`timesz.rs`/`plusfd.rs`/`minusfd.rs`/`timesfd.rs`) —
//! generalized from the teacher's `LTerm<U, E>`/`proto_vulcan_closure!`
//! macro shape to plain recursive functions building `Goal` values over
//! this crate's concrete `Term`, since the macro layer itself is out of
//! scope (see SPEC_FULL.md §1's DSL boundary).
pub mod arithmetic;
pub mod lists;
