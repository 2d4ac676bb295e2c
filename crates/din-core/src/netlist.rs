//! The netlist arena: module instances addressed by stable integer id,
//! plus the point-to-point wires between their ports.
//!
//! Wires hold `(ModuleId, portIndex)` pairs rather than references, so the
//! construction passes can rewire freely without aliasing hazards. Two
//! structural invariants are enforced at wiring time and treated as fatal
//! when violated, since a violation means a defect in the synthesis
//! algorithm itself: every input port is the target of at most one wire,
//! and every output port feeds at most one wire (fan-out must go through
//! an explicit Fork).

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::module::Module;

/// Stable arena identifier of a module instance.
pub type ModuleId = usize;

/// A port address: `(module, port index)`. Whether the index refers to the
/// input or the output list depends on position — wire sources are output
/// ports, wire targets are input ports.
pub type PortRef = (ModuleId, usize);

/// A wire from a source output port to a target input port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wire {
    pub source: PortRef,
    pub target: PortRef,
}

impl fmt::Display for Wire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}.{}) -> ({}.{})",
            self.source.0, self.source.1, self.target.0, self.target.1
        )
    }
}

/// Arena of modules and wires under construction.
#[derive(Debug, Default)]
pub struct Netlist {
    modules: Vec<Option<Module>>,
    wires: Vec<Option<Wire>>,
    by_source: HashMap<PortRef, usize>,
    by_target: HashMap<PortRef, usize>,
}

impl Netlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a module, returning its arena id.
    pub fn add(&mut self, module: Module) -> ModuleId {
        self.modules.push(Some(module));
        self.modules.len() - 1
    }

    pub fn module(&self, id: ModuleId) -> &Module {
        self.modules[id]
            .as_ref()
            .unwrap_or_else(|| panic!("module {id} was removed"))
    }

    /// Number of live modules.
    pub fn module_count(&self) -> usize {
        self.modules.iter().filter(|m| m.is_some()).count()
    }

    /// Connect an output port to an input port.
    pub fn connect(&mut self, source: PortRef, target: PortRef) {
        let src_mod = self.module(source.0);
        assert!(
            source.1 < src_mod.outputs.len(),
            "output port {}.{} out of range on {}",
            source.0,
            source.1,
            src_mod.name
        );
        let dst_mod = self.module(target.0);
        assert!(
            target.1 < dst_mod.inputs.len(),
            "input port {}.{} out of range on {}",
            target.0,
            target.1,
            dst_mod.name
        );
        assert!(
            !self.by_source.contains_key(&source),
            "output port {}.{} already drives a wire",
            source.0,
            source.1
        );
        assert!(
            !self.by_target.contains_key(&target),
            "input port {}.{} already receives a wire",
            target.0,
            target.1
        );
        let idx = self.wires.len();
        self.wires.push(Some(Wire { source, target }));
        self.by_source.insert(source, idx);
        self.by_target.insert(target, idx);
    }

    /// The source feeding an input port, if wired.
    pub fn source_into(&self, target: PortRef) -> Option<PortRef> {
        self.by_target
            .get(&target)
            .map(|&i| self.wires[i].expect("indexed wire").source)
    }

    /// The target fed by an output port, if wired.
    pub fn target_of(&self, source: PortRef) -> Option<PortRef> {
        self.by_source
            .get(&source)
            .map(|&i| self.wires[i].expect("indexed wire").target)
    }

    /// Remove the wire into an input port, returning its source.
    pub fn disconnect_into(&mut self, target: PortRef) -> Option<PortRef> {
        let idx = self.by_target.remove(&target)?;
        let wire = self.wires[idx].take().expect("indexed wire");
        self.by_source.remove(&wire.source);
        Some(wire.source)
    }

    /// Remove the wire out of an output port, returning its target.
    pub fn disconnect_from(&mut self, source: PortRef) -> Option<PortRef> {
        let idx = self.by_source.remove(&source)?;
        let wire = self.wires[idx].take().expect("indexed wire");
        self.by_target.remove(&wire.target);
        Some(wire.target)
    }

    /// Remove a module. Only the fan-out elision pass deletes modules, and
    /// it disconnects them first; remaining wires are a fatal defect.
    pub fn remove(&mut self, id: ModuleId) -> Module {
        let module = self.modules[id]
            .take()
            .unwrap_or_else(|| panic!("module {id} was already removed"));
        let touches = self
            .wires
            .iter()
            .flatten()
            .any(|w| w.source.0 == id || w.target.0 == id);
        assert!(!touches, "removed module {} is still wired", module.name);
        module
    }

    /// Iterate live wires.
    pub fn wires(&self) -> impl Iterator<Item = &Wire> {
        self.wires.iter().flatten()
    }

    /// Iterate live modules with their ids.
    pub fn modules(&self) -> impl Iterator<Item = (ModuleId, &Module)> {
        self.modules
            .iter()
            .enumerate()
            .filter_map(|(id, m)| m.as_ref().map(|m| (id, m)))
    }
}
