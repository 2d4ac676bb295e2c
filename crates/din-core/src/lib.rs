//! Core data model for din: Set Notation specifications, module instances,
//! the netlist arena, and the finalized circuit.
//!
//! A Set Notation specification is a finite-state machine whose transitions
//! are labelled by *sets* of concurrently active input/output lines. The
//! synthesis engine (the `din-synth` crate) translates such a specification
//! into a network of primitive delay-insensitive components; this crate
//! holds everything that network is made of.

pub mod behavior;
pub mod circuit;
pub mod module;
pub mod netlist;
pub mod spec;

pub use behavior::{Behavior, Rule};
pub use circuit::{Circuit, CircuitModule};
pub use module::{Module, ModuleKind, SerializerRole};
pub use netlist::{ModuleId, Netlist, PortRef, Wire};
pub use spec::{LineSet, SpecClass, SpecError, Specification, Transition};
