//! Stage builder: serializer instances, per-state Fork trees, Join
//! columns, and the cross-column cancellation network.
//!
//! One stage turns "these member lines arrived together" into "this
//! concurrent set occurred". Per state, every concurrent input set gets a
//! column of Joins accumulating its members pairwise; lines shared between
//! sets fan out through per-(line, state) Fork trees into every column
//! that wants them. When one column completes, the partial signals it left
//! behind on overlapping columns must be retracted: the completed column's
//! committed output threads through an extra axis slot on each Join
//! holding a stray, consuming it, before announcing the set to its SerNQ′.
//!
//! The same routine builds the forward stage and, run on the inverted
//! specification, the stage that stage-2 assembly mirrors.

use std::collections::HashMap;

use din_core::{LineSet, ModuleId, Netlist, PortRef, Specification};

use crate::primitives::{choice_tree, fork_tree, join};
use crate::serializer::{sernq, sernq_dual, SerN};

/// The five collections a stage populates. Wires go into the shared
/// netlist; the stage records module ids in assembly order.
///
/// In a freshly built stage `per_line` holds SerNQ instances (one per
/// specification input line) and `per_set` SerNQ′ instances (one per
/// tagged serializer input set). An inverted stage holds the dual kinds in
/// the same slots: the field names follow the stage's origin, not its
/// current orientation.
#[derive(Debug, Default)]
pub struct Stage {
    pub per_line: Vec<ModuleId>,
    pub per_set: Vec<ModuleId>,
    pub choices: Vec<ModuleId>,
    pub forks: Vec<ModuleId>,
    pub join_columns: Vec<ModuleId>,
}

impl Stage {
    /// Module ids in the documented assembly order.
    pub fn modules(&self) -> impl Iterator<Item = ModuleId> + '_ {
        self.per_line
            .iter()
            .chain(&self.per_set)
            .chain(&self.choices)
            .chain(&self.forks)
            .chain(&self.join_columns)
            .copied()
    }

    pub fn module_count(&self) -> usize {
        self.modules().count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Row,
    Col,
}

/// A recorded retraction: when `canceller` completes, it must consume the
/// stray signal waiting on `axis` slot `slot` of `target`'s join `join`.
#[derive(Debug)]
struct CancelEdge {
    canceller: usize,
    target: usize,
    join: usize,
    axis: Axis,
    slot: usize,
}

/// One concurrent set active in a state: its untagged membership, the
/// serializer input ids of its occurrences (several only for eq-arb
/// duplicates), and the sized joins of its column.
struct ColumnPlan {
    set: LineSet,
    sern_ids: Vec<usize>,
    joins: Vec<(usize, usize)>,
}

/// Build a stage for `spec` (which must have duplicate input sets tagged)
/// against its derived serializer.
pub fn build_stage(spec: &Specification, sern: &SerN, net: &mut Netlist) -> Stage {
    let mut stage = Stage::default();

    // One SerNQ per input line, one SerNQ' per tagged serializer input.
    for name in &spec.inputs {
        stage
            .per_line
            .push(net.add(sernq(sern, spec, format!("SerNQ({name})"))));
    }
    for set in &sern.input_sets {
        let label = set.label(&spec.inputs);
        stage
            .per_set
            .push(net.add(sernq_dual(sern, spec, format!("SerNQ'({label})"))));
    }

    for state in 0..spec.states.len() {
        build_state(spec, sern, net, &mut stage, state);
    }

    elide_narrow_fanout(net, &mut stage.forks);
    stage
}

fn build_state(
    spec: &Specification,
    sern: &SerN,
    net: &mut Netlist,
    stage: &mut Stage,
    state: usize,
) {
    let state_name = &spec.states[state];

    // Distinct untagged sets active in this state, in first-appearance
    // order, each with the serializer ids of its occurrences.
    let mut columns: Vec<ColumnPlan> = Vec::new();
    for t in spec
        .transitions
        .iter()
        .filter(|t| t.source == state && !t.inputs.is_empty())
    {
        let key = t.inputs.untagged();
        let id = sern
            .input_id(&t.inputs)
            .expect("transition input set is a serializer input");
        match columns.iter_mut().find(|c| c.set == key) {
            Some(c) => {
                if !c.sern_ids.contains(&id) {
                    c.sern_ids.push(id);
                }
            }
            None => columns.push(ColumnPlan {
                set: key,
                sern_ids: vec![id],
                joins: Vec::new(),
            }),
        }
    }
    if columns.is_empty() {
        return;
    }

    // Fork tree per (line, state), sized to the sets that want the line,
    // fed from the line's SerNQ query output for this state. The cursor
    // is the next unused tree output.
    let mut fork_of: HashMap<usize, (ModuleId, usize)> = HashMap::new();
    for line in 0..spec.inputs.len() {
        let n = columns.iter().filter(|c| c.set.contains(line)).count();
        if n == 0 {
            continue;
        }
        let ft = net.add(fork_tree(
            format!("FT({}@{})", spec.inputs[line], state_name),
            n,
        ));
        net.connect((stage.per_line[line], sern.nq_state_output(state)), (ft, 0));
        stage.forks.push(ft);
        fork_of.insert(line, (ft, 0));
    }

    // Size every join before emitting any wire: axis sizes depend on the
    // full cross-set comparison within the state. A k-member set gets k-1
    // joins of progressive pairwise accumulation; each join starts 1x1 and
    // grows an axis per recorded cancellation.
    let mut edges: Vec<CancelEdge> = Vec::new();
    for ai in 0..columns.len() {
        let members = columns[ai].set.lines().to_vec();
        let mut joins = Vec::new();
        for j in 0..members.len().saturating_sub(1) {
            let acc = &members[..j + 1];
            let next = members[j + 1];
            let (mut rows, mut cols) = (1, 1);
            for (bi, other) in columns.iter().enumerate() {
                if bi == ai {
                    continue;
                }
                let acc_inside = acc.iter().all(|&l| other.set.contains(l));
                if acc_inside && !other.set.contains(next) {
                    // When `other` completes, the accumulation sits stray
                    // on this join's row side; the retraction enters on a
                    // fresh column slot.
                    edges.push(CancelEdge {
                        canceller: bi,
                        target: ai,
                        join: j,
                        axis: Axis::Col,
                        slot: cols,
                    });
                    cols += 1;
                } else if other.set.contains(next) && !acc_inside {
                    // The stray is the lone next member on the column
                    // side; the retraction enters on a fresh row slot.
                    edges.push(CancelEdge {
                        canceller: bi,
                        target: ai,
                        join: j,
                        axis: Axis::Row,
                        slot: rows,
                    });
                    rows += 1;
                }
                // The two conditions are mutually exclusive for one
                // (join, other) pair: they disagree on whether the
                // accumulation lies inside `other`.
            }
            joins.push((rows, cols));
        }
        columns[ai].joins = joins;
    }

    let join_ids: Vec<Vec<ModuleId>> = columns
        .iter()
        .map(|c| {
            let label = c.set.label(&spec.inputs);
            c.joins
                .iter()
                .enumerate()
                .map(|(j, &(rows, cols))| {
                    let id = net.add(join(format!("J({label}@{state_name})/{j}"), rows, cols));
                    stage.join_columns.push(id);
                    id
                })
                .collect()
        })
        .collect();

    // Member attachment and the internal accumulation chain. Singleton
    // sets have no joins; their fork output is consumed below as the
    // column's committed source.
    for (ai, c) in columns.iter().enumerate() {
        let members = c.set.lines();
        if members.len() < 2 {
            continue;
        }
        for (m, &line) in members.iter().enumerate() {
            let src = next_fork_output(&mut fork_of, line);
            let (jid, port) = if m == 0 {
                let jid = join_ids[ai][0];
                (jid, net.module(jid).kind.join_row_input(0))
            } else {
                let jid = join_ids[ai][m - 1];
                (jid, net.module(jid).kind.join_col_input(0))
            };
            net.connect(src, (jid, port));
        }
        for j in 0..join_ids[ai].len() - 1 {
            let src = join_ids[ai][j];
            let cell = net.module(src).kind.join_cell_output(0, 0);
            let dst = join_ids[ai][j + 1];
            let row = net.module(dst).kind.join_row_input(0);
            net.connect((src, cell), (dst, row));
        }
    }

    // Cancellation chains, then completion. Each set's committed output
    // threads through every axis slot recorded against it — the tail cell
    // of one retraction feeds the next — and the final tail announces the
    // set to its SerNQ' (via a Choice tree for eq-arb duplicates).
    for (bi, c) in columns.iter().enumerate() {
        let mut src: PortRef = if c.set.len() < 2 {
            next_fork_output(&mut fork_of, c.set.lines()[0])
        } else {
            let last = *join_ids[bi].last().expect("multi-member column has joins");
            (last, net.module(last).kind.join_cell_output(0, 0))
        };
        for e in edges.iter().filter(|e| e.canceller == bi) {
            let jid = join_ids[e.target][e.join];
            let kind = net.module(jid).kind;
            let (dst, tail) = match e.axis {
                Axis::Col => (kind.join_col_input(e.slot), kind.join_cell_output(0, e.slot)),
                Axis::Row => (kind.join_row_input(e.slot), kind.join_cell_output(e.slot, 0)),
            };
            net.connect(src, (jid, dst));
            src = (jid, tail);
        }

        if c.sern_ids.len() > 1 {
            let label = c.set.label(&spec.inputs);
            let ct = net.add(choice_tree(
                format!("CT({label}@{state_name})"),
                c.sern_ids.len(),
            ));
            stage.choices.push(ct);
            net.connect(src, (ct, 0));
            for (k, &sid) in c.sern_ids.iter().enumerate() {
                net.connect((ct, k), (stage.per_set[sid], sern.dual_state_input(state)));
            }
        } else {
            net.connect(src, (stage.per_set[c.sern_ids[0]], sern.dual_state_input(state)));
        }
    }

    for (line, (ft, cursor)) in &fork_of {
        assert_eq!(
            *cursor,
            net.module(*ft).outputs.len(),
            "fork for line {line} in state {state} has unused outputs"
        );
    }
}

fn next_fork_output(fork_of: &mut HashMap<usize, (ModuleId, usize)>, line: usize) -> PortRef {
    let entry = fork_of
        .get_mut(&line)
        .expect("fork tree exists for every member line");
    let port = entry.1;
    entry.1 += 1;
    (entry.0, port)
}

/// Remove every fan-out module left with fewer than two outputs, splicing
/// its single live connection to the recorded upstream source. `ids` is
/// replaced by the surviving modules.
pub fn elide_narrow_fanout(net: &mut Netlist, ids: &mut Vec<ModuleId>) {
    let mut kept = Vec::with_capacity(ids.len());
    for &id in ids.iter() {
        let (fanout, n_out) = {
            let m = net.module(id);
            (m.kind.is_fanout(), m.outputs.len())
        };
        if !fanout || n_out >= 2 {
            kept.push(id);
            continue;
        }
        let upstream = net.disconnect_into((id, 0));
        let downstream = if n_out == 0 {
            None
        } else {
            net.disconnect_from((id, 0))
        };
        if let (Some(up), Some(down)) = (upstream, downstream) {
            net.connect(up, down);
        }
        net.remove(id);
    }
    *ids = kept;
}

#[cfg(test)]
mod tests {
    use super::*;
    use din_core::{ModuleKind, SpecClass, Transition};

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    /// S0 = ({a,b},{x}).S0 + ({b,c},{y}).S0 — the overlapping pair.
    fn overlap_spec() -> Specification {
        Specification {
            name: "overlap".into(),
            states: names(&["S0"]),
            inputs: names(&["a", "b", "c"]),
            outputs: names(&["x", "y"]),
            transitions: vec![
                Transition::new(
                    0,
                    LineSet::new(vec![0, 1]),
                    0,
                    LineSet::new(vec![0]),
                ),
                Transition::new(
                    0,
                    LineSet::new(vec![1, 2]),
                    0,
                    LineSet::new(vec![1]),
                ),
            ],
            class: SpecClass {
                non_arb: true,
                ..Default::default()
            },
        }
    }

    /// S0 = ({a},{x}).S0 + ({a},{y}).S0 — the eq-arb duplicate.
    fn eq_arb_spec() -> Specification {
        Specification {
            name: "dup".into(),
            states: names(&["S0"]),
            inputs: names(&["a"]),
            outputs: names(&["x", "y"]),
            transitions: vec![
                Transition::new(0, LineSet::new(vec![0]), 0, LineSet::new(vec![0])),
                Transition::new(0, LineSet::new(vec![0]), 0, LineSet::new(vec![1])),
            ],
            class: SpecClass {
                eq_arb: true,
                ..Default::default()
            },
        }
    }

    #[test]
    fn overlapping_sets_cancel_each_other() {
        let spec = overlap_spec().mark_duplicates();
        let sern = SerN::derive(&spec);
        let mut net = Netlist::new();
        let stage = build_stage(&spec, &sern, &mut net);

        // Only b fans out; a and c feed their columns directly.
        assert_eq!(stage.forks.len(), 1);
        assert_eq!(net.module(stage.forks[0]).outputs.len(), 2);

        // One join per column. {a,b} grew a row slot (stray b on its
        // column side), {b,c} grew a column slot (stray b on its row side).
        assert_eq!(stage.join_columns.len(), 2);
        let ab = stage.join_columns[0];
        let bc = stage.join_columns[1];
        assert_eq!(net.module(ab).kind, ModuleKind::Join { rows: 2, cols: 1 });
        assert_eq!(net.module(bc).kind, ModuleKind::Join { rows: 1, cols: 2 });

        // {a,b}'s committed output retracts the stray on {b,c}'s extra
        // column slot, and vice versa.
        let bc_kind = net.module(bc).kind;
        assert_eq!(
            net.source_into((bc, bc_kind.join_col_input(1))),
            Some((ab, net.module(ab).kind.join_cell_output(0, 0)))
        );
        let ab_kind = net.module(ab).kind;
        assert_eq!(
            net.source_into((ab, ab_kind.join_row_input(1))),
            Some((bc, bc_kind.join_cell_output(0, 0)))
        );

        // Each chain tail lands on the set's own SerNQ'.
        assert_eq!(
            net.source_into((stage.per_set[0], sern.dual_state_input(0))),
            Some((bc, bc_kind.join_cell_output(0, 1)))
        );
        assert_eq!(
            net.source_into((stage.per_set[1], sern.dual_state_input(0))),
            Some((ab, ab_kind.join_cell_output(1, 0)))
        );

        // No surviving fan-out has fewer than two outputs.
        for (_, m) in net.modules() {
            if m.kind.is_fanout() {
                assert!(m.outputs.len() >= 2);
            }
        }
    }

    #[test]
    fn eq_arb_duplicates_get_one_choice_tree() {
        let spec = eq_arb_spec().mark_duplicates();
        let sern = SerN::derive(&spec);
        assert_eq!(sern.input_sets.len(), 2);

        let mut net = Netlist::new();
        let stage = build_stage(&spec, &sern, &mut net);

        assert_eq!(stage.choices.len(), 1);
        assert!(stage.forks.is_empty());
        assert!(stage.join_columns.is_empty());

        // The single-line fork was elided: the SerNQ feeds the choice
        // directly, and the choice feeds both duplicate SerNQ' instances.
        let ct = stage.choices[0];
        assert_eq!(
            net.source_into((ct, 0)),
            Some((stage.per_line[0], sern.nq_state_output(0)))
        );
        assert_eq!(net.target_of((ct, 0)), Some((stage.per_set[0], sern.dual_state_input(0))));
        assert_eq!(net.target_of((ct, 1)), Some((stage.per_set[1], sern.dual_state_input(0))));
    }

    #[test]
    fn multi_member_column_accumulates_pairwise() {
        // Single set {a,b,c}: two joins, no cancellation, direct completion.
        let spec = Specification {
            name: "chain".into(),
            states: names(&["S0"]),
            inputs: names(&["a", "b", "c"]),
            outputs: names(&["x"]),
            transitions: vec![Transition::new(
                0,
                LineSet::new(vec![0, 1, 2]),
                0,
                LineSet::new(vec![0]),
            )],
            class: SpecClass {
                non_arb: true,
                ..Default::default()
            },
        };
        let sern = SerN::derive(&spec);
        let mut net = Netlist::new();
        let stage = build_stage(&spec, &sern, &mut net);

        assert_eq!(stage.join_columns.len(), 2);
        let j0 = stage.join_columns[0];
        let j1 = stage.join_columns[1];
        assert_eq!(net.module(j0).kind, ModuleKind::Join { rows: 1, cols: 1 });
        // Accumulation: j0's committed cell feeds j1's row.
        assert_eq!(net.source_into((j1, 0)), Some((j0, 0)));
        // Completion: j1's committed cell feeds the SerNQ'.
        assert_eq!(
            net.source_into((stage.per_set[0], sern.dual_state_input(0))),
            Some((j1, net.module(j1).kind.join_cell_output(0, 0)))
        );
        // All forks were single-output and elided.
        assert!(stage.forks.is_empty());
    }
}
