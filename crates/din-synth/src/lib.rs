//! Decomposition of finite-state Set Notation specifications into networks
//! of delay-insensitive primitives.
//!
//! The entry point is [`synthesize`]. A specification classified non-arb
//! or eq-arb (classification is supplied, never recomputed here) is turned
//! into a [`din_core::Circuit`] of Forks, Joins, Choice and Merge trees,
//! and query-augmented serializer instances, wired so that the network's
//! external behaviour matches the specification's transitions.

pub mod assemble;
pub mod error;
pub mod pipeline;
pub mod primitives;
pub mod serializer;
pub mod stage;
pub mod stage2;
pub mod update;

pub use error::SynthesisError;
pub use pipeline::synthesize;
pub use serializer::{sernq, sernq_dual, SerN, SerRule};
pub use stage::{build_stage, elide_narrow_fanout, Stage};
pub use stage2::{build_irreversible, invert_stage, StageTwo};
pub use update::{connect_update, UpdateStage};
