//! The finalized circuit: numbered modules, wires, and external bindings.
//!
//! A circuit is created once, at the end of synthesis, and is immutable
//! thereafter. Besides the structural contract (module list, wire list,
//! external port table) it offers two terminal, human-readable renderings:
//! the `Display` listing and a process-algebra style network expression.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::behavior::Behavior;
use crate::module::ModuleKind;
use crate::netlist::{PortRef, Wire};

/// A module of the finalized circuit. Its `id` equals its position in the
/// circuit's module list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitModule {
    pub id: usize,
    pub name: String,
    pub kind: ModuleKind,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub behavior: Behavior,
}

/// The finalized, numbered collection of modules and wires, plus the
/// labelling from external specification line names to ports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Circuit {
    pub name: String,
    pub modules: Vec<CircuitModule>,
    pub wires: Vec<Wire>,
    /// Each original specification input name, bound to exactly one input port.
    pub external_inputs: Vec<(String, PortRef)>,
    /// Each original specification output name, bound to exactly one output port.
    pub external_outputs: Vec<(String, PortRef)>,
}

impl Circuit {
    /// The source feeding an input port, if wired.
    pub fn source_into(&self, target: PortRef) -> Option<PortRef> {
        self.wires
            .iter()
            .find(|w| w.target == target)
            .map(|w| w.source)
    }

    /// The target fed by an output port, if wired.
    pub fn target_of(&self, source: PortRef) -> Option<PortRef> {
        self.wires
            .iter()
            .find(|w| w.source == source)
            .map(|w| w.target)
    }

    /// The external output name bound to a port, if any.
    pub fn external_output_name(&self, port: PortRef) -> Option<&str> {
        self.external_outputs
            .iter()
            .find(|(_, p)| *p == port)
            .map(|(n, _)| n.as_str())
    }

    /// Process-algebra style rendering: a parallel composition of module
    /// terms with internal wires hidden as numbered channels. External
    /// ports keep their specification names; unwired ports are omitted.
    pub fn network_expression(&self) -> String {
        let channel = |port: PortRef, as_source: bool| -> Option<String> {
            if as_source {
                if let Some(name) = self.external_output_name(port) {
                    return Some(name.to_string());
                }
                self.wires
                    .iter()
                    .position(|w| w.source == port)
                    .map(|i| format!("w{i}"))
            } else {
                if let Some((name, _)) = self
                    .external_inputs
                    .iter()
                    .find(|(_, p)| *p == port)
                {
                    return Some(name.clone());
                }
                self.wires
                    .iter()
                    .position(|w| w.target == port)
                    .map(|i| format!("w{i}"))
            }
        };

        let mut terms = Vec::with_capacity(self.modules.len());
        for m in &self.modules {
            let mut ports = Vec::new();
            for i in 0..m.inputs.len() {
                if let Some(ch) = channel((m.id, i), false) {
                    ports.push(format!("{}?{}", ch, m.inputs[i]));
                }
            }
            for o in 0..m.outputs.len() {
                if let Some(ch) = channel((m.id, o), true) {
                    ports.push(format!("{}!{}", ch, m.outputs[o]));
                }
            }
            terms.push(format!("{}[{}]", m.name, ports.join(", ")));
        }
        format!(
            "hide w0..w{} in\n  {}",
            self.wires.len().saturating_sub(1),
            terms.join("\n| ")
        )
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "circuit {}", self.name)?;
        writeln!(f, "modules:")?;
        for m in &self.modules {
            writeln!(
                f,
                "  {:3}  {:<12} {}  in[{}] out[{}]",
                m.id,
                m.kind.to_string(),
                m.name,
                m.inputs.join(","),
                m.outputs.join(","),
            )?;
        }
        writeln!(f, "wires:")?;
        for w in &self.wires {
            writeln!(f, "  {w}")?;
        }
        writeln!(f, "external inputs:")?;
        for (name, (m, p)) in &self.external_inputs {
            writeln!(f, "  {name} -> ({m}.{p})")?;
        }
        writeln!(f, "external outputs:")?;
        for (name, (m, p)) in &self.external_outputs {
            writeln!(f, "  {name} <- ({m}.{p})")?;
        }
        Ok(())
    }
}
