//! Module instances: named components with ordered ports and a behaviour.
//!
//! Ports are stored as plain name lists; a port is addressed from outside
//! as a `(ModuleId, index)` pair, so modules never hold references to one
//! another. Serializer reclassification (SerNQ ↔ SerNQ′) is modelled as a
//! role variant on the kind; converted modules are constructed afresh
//! rather than mutated mid-transformation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::behavior::Behavior;

/// The behavioural role of a serializer-derived module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SerializerRole {
    /// SerN: the bare deterministic serializer.
    Plain,
    /// SerNQ: exposes the current state through per-state query outputs.
    QueryExposing,
    /// SerNQ′: consumes per-state query inputs, emitting one aggregate output.
    QueryConsuming,
}

/// What kind of component a module instance is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleKind {
    /// M×N Fork: one input per (row, col) cell, each firing its row and
    /// column broadcast outputs together.
    Fork { rows: usize, cols: usize },
    /// n-way broadcast: one input, all outputs fire.
    ForkTree,
    /// M×N Join: one input per row and per column, one rendezvous output
    /// per cell.
    Join { rows: usize, cols: usize },
    /// n-way rendezvous: all inputs, one output.
    JoinTree,
    /// n-way non-deterministic selection: one input, exactly one output.
    ChoiceTree,
    /// n-way unsynchronized fan-in: any input, one output.
    MergeTree,
    Serializer(SerializerRole),
}

impl ModuleKind {
    /// Fan-out kinds, subject to the ≤1-output elision pass.
    pub fn is_fanout(&self) -> bool {
        matches!(self, ModuleKind::Fork { .. } | ModuleKind::ForkTree)
    }

    /// Input index of row `r` on a Join.
    pub fn join_row_input(&self, r: usize) -> usize {
        match self {
            ModuleKind::Join { rows, .. } => {
                debug_assert!(r < *rows);
                r
            }
            _ => panic!("join_row_input on {self}"),
        }
    }

    /// Input index of column `c` on a Join.
    pub fn join_col_input(&self, c: usize) -> usize {
        match self {
            ModuleKind::Join { rows, cols } => {
                debug_assert!(c < *cols);
                rows + c
            }
            _ => panic!("join_col_input on {self}"),
        }
    }

    /// Output index of cell `(r, c)` on a Join (row-major).
    pub fn join_cell_output(&self, r: usize, c: usize) -> usize {
        match self {
            ModuleKind::Join { rows, cols } => {
                debug_assert!(r < *rows && c < *cols);
                r * cols + c
            }
            _ => panic!("join_cell_output on {self}"),
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleKind::Fork { rows, cols } => write!(f, "Fork({rows}x{cols})"),
            ModuleKind::ForkTree => write!(f, "ForkTree"),
            ModuleKind::Join { rows, cols } => write!(f, "Join({rows}x{cols})"),
            ModuleKind::JoinTree => write!(f, "JoinTree"),
            ModuleKind::ChoiceTree => write!(f, "ChoiceTree"),
            ModuleKind::MergeTree => write!(f, "MergeTree"),
            ModuleKind::Serializer(SerializerRole::Plain) => write!(f, "SerN"),
            ModuleKind::Serializer(SerializerRole::QueryExposing) => write!(f, "SerNQ"),
            ModuleKind::Serializer(SerializerRole::QueryConsuming) => write!(f, "SerNQ'"),
        }
    }
}

/// A module instance: a component of the generated network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub kind: ModuleKind,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub behavior: Behavior,
}

impl Module {
    pub fn new(
        name: impl Into<String>,
        kind: ModuleKind,
        inputs: Vec<String>,
        outputs: Vec<String>,
        behavior: Behavior,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            inputs,
            outputs,
            behavior,
        }
    }
}
