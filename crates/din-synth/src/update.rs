//! Update stage: state feedback between the two halves of the network.
//!
//! Every serializer instance in the network tracks the same machine, so
//! every committed event must advance all of them. When a stage-1 SerNQ′
//! commits an input set, its aggregate query output broadcasts through an
//! update Fork tree to that set's input on every instance. When every
//! instance has emitted an output set's line, the set's update Join tree
//! rendezvous fires it into stage 2 (the matching SerNQ's query input for
//! the reversible construction, the set's Fork tree for the irreversible
//! one).

use din_core::{ModuleId, Netlist, Specification};

use crate::primitives::{fork_tree, join_tree};
use crate::serializer::SerN;
use crate::stage::Stage;
use crate::stage2::StageTwo;

/// The update layer's modules: one Fork tree per serializer input set and
/// one Join tree per serializer output set.
pub struct UpdateStage {
    pub forks: Vec<ModuleId>,
    pub joins: Vec<ModuleId>,
}

impl UpdateStage {
    pub fn modules(&self) -> impl Iterator<Item = ModuleId> + '_ {
        self.forks.iter().chain(&self.joins).copied()
    }
}

pub fn connect_update(
    spec: &Specification,
    sern: &SerN,
    stage1: &Stage,
    stage2: &StageTwo,
    net: &mut Netlist,
) -> UpdateStage {
    let mut instances: Vec<ModuleId> = Vec::new();
    instances.extend(&stage1.per_line);
    instances.extend(&stage1.per_set);
    if let StageTwo::Reversible(s2) = stage2 {
        instances.extend(&s2.per_line);
        instances.extend(&s2.per_set);
    }
    let total = instances.len();

    let mut forks = Vec::with_capacity(sern.input_sets.len());
    for (set_id, set) in sern.input_sets.iter().enumerate() {
        let uf = net.add(fork_tree(format!("UF({})", set.label(&spec.inputs)), total));
        net.connect((stage1.per_set[set_id], sern.dual_query_output()), (uf, 0));
        for (k, &inst) in instances.iter().enumerate() {
            net.connect((uf, k), (inst, set_id));
        }
        forks.push(uf);
    }

    let mut joins = Vec::with_capacity(sern.output_sets.len());
    for (oset_id, set) in sern.output_sets.iter().enumerate() {
        let uj = net.add(join_tree(format!("UJ({})", set.label(&spec.outputs)), total));
        for (k, &inst) in instances.iter().enumerate() {
            net.connect((inst, oset_id), (uj, k));
        }
        let consumer = match stage2 {
            StageTwo::Reversible(s2) => (s2.per_set[oset_id], sern.nq_query_input()),
            StageTwo::Irreversible { forks, .. } => (forks[oset_id], 0),
        };
        net.connect((uj, 0), consumer);
        joins.push(uj);
    }

    UpdateStage { forks, joins }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::build_stage;
    use crate::stage2::build_irreversible;
    use din_core::{LineSet, SpecClass, Transition};

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn spec() -> Specification {
        Specification {
            name: "m".into(),
            states: names(&["S0", "S1"]),
            inputs: names(&["a", "b"]),
            outputs: names(&["x"]),
            transitions: vec![
                Transition::new(0, LineSet::new(vec![0, 1]), 1, LineSet::new(vec![0])),
                Transition::new(1, LineSet::new(vec![0]), 0, LineSet::new(vec![0])),
            ],
            class: SpecClass {
                non_arb: true,
                b_arb: true,
                ..Default::default()
            },
        }
    }

    #[test]
    fn broadcast_reaches_every_instance_and_rendezvous_feeds_stage_two() {
        let s = spec().mark_duplicates();
        let sern = SerN::derive(&s);
        let mut net = Netlist::new();
        let stage1 = build_stage(&s, &sern, &mut net);
        let (forks, merges) = build_irreversible(&s, &sern, &mut net);
        let stage2 = StageTwo::Irreversible { forks, merges };

        let update = connect_update(&s, &sern, &stage1, &stage2, &mut net);

        // 2 input sets, 1 output set; 4 stage-1 instances each.
        assert_eq!(update.forks.len(), 2);
        assert_eq!(update.joins.len(), 1);
        let uf = update.forks[0];
        assert_eq!(net.module(uf).outputs.len(), 4);
        assert_eq!(
            net.source_into((uf, 0)),
            Some((stage1.per_set[0], sern.dual_query_output()))
        );
        // Broadcast output 0 lands on the first SerNQ's input for set 0.
        assert_eq!(net.target_of((uf, 0)), Some((stage1.per_line[0], 0)));

        let uj = update.joins[0];
        assert_eq!(net.module(uj).inputs.len(), 4);
        // The rendezvous collects output set 0 from every instance and
        // feeds that set's stage-2 fork.
        assert_eq!(net.source_into((uj, 1)), Some((stage1.per_line[1], 0)));
        let StageTwo::Irreversible { forks, .. } = &stage2 else {
            unreachable!()
        };
        assert_eq!(net.target_of((uj, 0)), Some((forks[0], 0)));
    }
}
