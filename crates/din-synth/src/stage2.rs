//! Stage-2 construction: routing serialized output events back out to the
//! environment's output lines.
//!
//! Two constructions, selected by the specification's class:
//!
//! * **Reversible** (no b-arb): build a complete stage over the inverted
//!   specification and serializer in a scratch netlist, then mirror it
//!   into the main netlist with [`invert_stage`] — every module replaced
//!   by its structural dual, every wire reversed with its port indices
//!   carried over unchanged.
//! * **Irreversible** (b-arb): a flat fan-out layer — one Fork tree per
//!   output set broadcasting to one Merge tree per output line.

use std::collections::HashMap;

use din_core::{ModuleId, ModuleKind, Netlist, SerializerRole, Specification};

use crate::primitives::{choice_tree, fork, fork_tree, join, join_tree, merge_tree};
use crate::serializer::{sernq, sernq_dual, SerN};
use crate::stage::Stage;

/// The output-side half of the network.
pub enum StageTwo {
    Reversible(Stage),
    Irreversible {
        forks: Vec<ModuleId>,
        merges: Vec<ModuleId>,
    },
}

impl StageTwo {
    pub fn modules(&self) -> Vec<ModuleId> {
        match self {
            StageTwo::Reversible(stage) => stage.modules().collect(),
            StageTwo::Irreversible { forks, merges } => {
                forks.iter().chain(merges).copied().collect()
            }
        }
    }
}

/// Build the irreversible stage 2: a Fork tree per serializer output set
/// feeding a Merge tree per output line. Returns `(forks, merges)` with
/// the merges indexed by output line.
pub fn build_irreversible(
    spec: &Specification,
    sern: &SerN,
    net: &mut Netlist,
) -> (Vec<ModuleId>, Vec<ModuleId>) {
    let mut merges = Vec::with_capacity(spec.outputs.len());
    for (line, name) in spec.outputs.iter().enumerate() {
        let n = sern.output_sets.iter().filter(|s| s.contains(line)).count();
        merges.push(net.add(merge_tree(format!("MT({name})"), n)));
    }

    let mut cursors = vec![0usize; spec.outputs.len()];
    let mut forks = Vec::with_capacity(sern.output_sets.len());
    for set in &sern.output_sets {
        let ft = net.add(fork_tree(format!("FT({})", set.label(&spec.outputs)), set.len()));
        for (k, &line) in set.lines().iter().enumerate() {
            net.connect((ft, k), (merges[line], cursors[line]));
            cursors[line] += 1;
        }
        forks.push(ft);
    }
    (forks, merges)
}

/// Mirror a stage built in `old_net` into `net`, replacing every module by
/// its structural dual and reversing every wire. `sern` and `spec` give
/// the orientation the mirrored stage serves (the inverse of the one the
/// old stage was built from); serializer duals are constructed over them
/// so port indices carry over unchanged.
pub fn invert_stage(
    old: &Stage,
    old_net: &Netlist,
    sern: &SerN,
    spec: &Specification,
    net: &mut Netlist,
) -> Stage {
    let mut map: HashMap<ModuleId, ModuleId> = HashMap::new();
    for id in old.modules() {
        let m = old_net.module(id);
        let name = dual_name(&m.name);
        let dual = match m.kind {
            ModuleKind::Serializer(SerializerRole::QueryExposing) => sernq_dual(sern, spec, name),
            ModuleKind::Serializer(SerializerRole::QueryConsuming) => sernq(sern, spec, name),
            ModuleKind::Serializer(SerializerRole::Plain) => {
                unreachable!("bare SerN is never instantiated")
            }
            ModuleKind::Fork { rows, cols } => join(name, rows, cols),
            ModuleKind::Join { rows, cols } => fork(name, rows, cols),
            ModuleKind::ForkTree => join_tree(name, m.outputs.len()),
            ModuleKind::JoinTree => fork_tree(name, m.inputs.len()),
            ModuleKind::ChoiceTree => merge_tree(name, m.outputs.len()),
            ModuleKind::MergeTree => choice_tree(name, m.inputs.len()),
        };
        map.insert(id, net.add(dual));
    }

    // Reversed wires: source output index becomes the dual's input index
    // and vice versa.
    for w in old_net.wires() {
        net.connect((map[&w.target.0], w.target.1), (map[&w.source.0], w.source.1));
    }

    let remap = |ids: &[ModuleId]| ids.iter().map(|id| map[id]).collect();
    Stage {
        per_line: remap(&old.per_line),
        per_set: remap(&old.per_set),
        choices: remap(&old.choices),
        forks: remap(&old.forks),
        join_columns: remap(&old.join_columns),
    }
}

fn dual_name(old: &str) -> String {
    let Some((prefix, rest)) = old.split_once('(') else {
        return old.to_string();
    };
    let dual = match prefix {
        "SerNQ" => "SerNQ'",
        "SerNQ'" => "SerNQ",
        "FT" => "JT",
        "JT" => "FT",
        "CT" => "MT",
        "MT" => "CT",
        "F" => "J",
        "J" => "F",
        other => other,
    };
    format!("{dual}({rest}")
}
