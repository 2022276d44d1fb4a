//! Finite-domain constraint solving (spec §4.4).
//!
//! Split the way the teacher keeps its own concerns apart (`lterm.rs` vs.
//! `state/` vs. `engine.rs`): `model` declares variables/constraints,
//! `state` is the persistent domain chain over a model, `solver` runs
//! propagation and search over a state, `constraints`/`globals` are the
//! propagator catalogue.
pub mod constraints;
pub mod globals;
pub mod model;
pub mod solver;
pub mod state;
