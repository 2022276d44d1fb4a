//! SLG tabled resolution with well-founded negation (spec §4.6).
//!
//! No teacher analogue — `proto_vulcan` has no tabling engine. Grounded on
//! the chalk family's SLG lineage for vocabulary (`chalk-engine`'s
//! `SlgContext`/producer-table split, `chalk-slg`'s `Context` trait
//! separating pattern/answer/environment concerns), reshaped into concrete
//! types over this crate's own `Term`/`Store`/`Goal` rather than chalk's
//! generic-over-`Context` design, since the rest of the crate is
//! deliberately monomorphic. Dependency-graph SCC decomposition uses
//! `petgraph`, already a crate dependency.
pub mod engine;
pub mod pattern;
pub mod table;
pub mod trie;
