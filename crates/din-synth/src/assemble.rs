//! Final assembly: renumber the construction arena into a dense, ordered
//! circuit and bind the external lines.
//!
//! Module order is documented and stable: stage-1 serializer instances
//! first (per-line SerNQ, then per-set SerNQ′), stage-1 fabric, stage-2
//! modules, then the update layer. External inputs are the stage-1 SerNQ
//! aggregate query inputs; external outputs are the stage-2 SerNQ′
//! aggregate query outputs (reversible) or the per-line Merge trees
//! (irreversible).

use std::collections::HashMap;

use din_core::{Circuit, CircuitModule, ModuleId, Netlist, Specification, Wire};

use crate::serializer::SerN;
use crate::stage::Stage;
use crate::stage2::StageTwo;
use crate::update::UpdateStage;

pub fn assemble(
    spec: &Specification,
    sern: &SerN,
    stage1: &Stage,
    stage2: &StageTwo,
    update: &UpdateStage,
    net: &Netlist,
) -> Circuit {
    let mut order: Vec<ModuleId> = stage1.modules().collect();
    order.extend(stage2.modules());
    order.extend(update.modules());

    let map: HashMap<ModuleId, usize> =
        order.iter().enumerate().map(|(i, &id)| (id, i)).collect();

    let modules = order
        .iter()
        .enumerate()
        .map(|(i, &id)| {
            let m = net.module(id).clone();
            CircuitModule {
                id: i,
                name: m.name,
                kind: m.kind,
                inputs: m.inputs,
                outputs: m.outputs,
                behavior: m.behavior,
            }
        })
        .collect();

    let wires = net
        .wires()
        .map(|w| Wire {
            source: (map[&w.source.0], w.source.1),
            target: (map[&w.target.0], w.target.1),
        })
        .collect();

    let external_inputs = spec
        .inputs
        .iter()
        .enumerate()
        .map(|(line, name)| {
            (
                name.clone(),
                (map[&stage1.per_line[line]], sern.nq_query_input()),
            )
        })
        .collect();

    let external_outputs = spec
        .outputs
        .iter()
        .enumerate()
        .map(|(line, name)| {
            let port = match stage2 {
                StageTwo::Reversible(s2) => {
                    (map[&s2.per_line[line]], sern.dual_query_output())
                }
                StageTwo::Irreversible { merges, .. } => (map[&merges[line]], 0),
            };
            (name.clone(), port)
        })
        .collect();

    Circuit {
        name: spec.name.clone(),
        modules,
        wires,
        external_inputs,
        external_outputs,
    }
}
