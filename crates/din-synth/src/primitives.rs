//! Primitive module factory.
//!
//! Pure constructors for the atomic delay-insensitive components. Port
//! orders are fixed so that structural inversion is index-preserving:
//! a Join's inputs (rows, then columns) line up with a Fork's outputs, a
//! Join's row-major cell outputs line up with a Fork's cell inputs, and the
//! tree components pair up the same way (ForkTree ↔ JoinTree, ChoiceTree ↔
//! MergeTree). Degenerate sizes are valid constructions; callers elide
//! fan-outs that end up with fewer than two outputs.

use din_core::{Behavior, Module, ModuleKind};

fn numbered(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{prefix}{i}")).collect()
}

/// M×N Fork: one input per (row, col) cell; input (r, c) fires row output
/// `r` and column output `c` together.
pub fn fork(name: impl Into<String>, rows: usize, cols: usize) -> Module {
    let inputs: Vec<String> = (0..rows)
        .flat_map(|r| (0..cols).map(move |c| format!("i{r}_{c}")))
        .collect();
    let mut outputs = numbered("r", rows);
    outputs.extend(numbered("c", cols));
    let rules = (0..rows)
        .flat_map(|r| (0..cols).map(move |c| (vec![r * cols + c], vec![r, rows + c])))
        .collect();
    Module::new(
        name,
        ModuleKind::Fork { rows, cols },
        inputs,
        outputs,
        Behavior::single_state(rules),
    )
}

/// n-way broadcast: one input, all n outputs fire together.
pub fn fork_tree(name: impl Into<String>, n: usize) -> Module {
    Module::new(
        name,
        ModuleKind::ForkTree,
        vec!["i".into()],
        numbered("o", n),
        Behavior::single_state(vec![(vec![0], (0..n).collect())]),
    )
}

/// n-way non-deterministic selection: one input, exactly one output fires.
pub fn choice_tree(name: impl Into<String>, n: usize) -> Module {
    Module::new(
        name,
        ModuleKind::ChoiceTree,
        vec!["i".into()],
        numbered("o", n),
        Behavior::single_state((0..n).map(|k| (vec![0], vec![k])).collect()),
    )
}

/// M×N Join: one input per row and per column; cell (r, c) fires once both
/// the row `r` and column `c` signals have arrived.
pub fn join(name: impl Into<String>, rows: usize, cols: usize) -> Module {
    let mut inputs = numbered("r", rows);
    inputs.extend(numbered("c", cols));
    let outputs: Vec<String> = (0..rows)
        .flat_map(|r| (0..cols).map(move |c| format!("o{r}_{c}")))
        .collect();
    let rules = (0..rows)
        .flat_map(|r| (0..cols).map(move |c| (vec![r, rows + c], vec![r * cols + c])))
        .collect();
    Module::new(
        name,
        ModuleKind::Join { rows, cols },
        inputs,
        outputs,
        Behavior::single_state(rules),
    )
}

/// n-way rendezvous: the output fires once all n inputs have arrived.
pub fn join_tree(name: impl Into<String>, n: usize) -> Module {
    Module::new(
        name,
        ModuleKind::JoinTree,
        numbered("i", n),
        vec!["o".into()],
        Behavior::single_state(vec![((0..n).collect(), vec![0])]),
    )
}

/// n-way unsynchronized fan-in: any single input fires the output.
pub fn merge_tree(name: impl Into<String>, n: usize) -> Module {
    Module::new(
        name,
        ModuleKind::MergeTree,
        numbered("i", n),
        vec!["o".into()],
        Behavior::single_state((0..n).map(|k| (vec![k], vec![0])).collect()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fork_fires_row_and_column_together() {
        let f = fork("F", 2, 3);
        assert_eq!(f.inputs.len(), 6);
        assert_eq!(f.outputs.len(), 5);
        // Cell (1, 2) fires row 1 and column 2.
        let rule = &f.behavior.rules[5];
        assert_eq!(rule.inputs, vec![5]);
        assert_eq!(rule.outputs, vec![1, 2 + 2]);
    }

    #[test]
    fn join_cell_requires_both_axes() {
        let j = join("J", 2, 2);
        assert_eq!(j.inputs.len(), 4);
        assert_eq!(j.outputs.len(), 4);
        let rule = &j.behavior.rules[j.kind.join_cell_output(1, 0)];
        assert_eq!(rule.inputs, vec![1, 2]);
        assert_eq!(rule.outputs, vec![2]);
    }

    #[test]
    fn trees() {
        let ft = fork_tree("FT", 3);
        assert_eq!(ft.behavior.rules.len(), 1);
        assert_eq!(ft.behavior.rules[0].outputs, vec![0, 1, 2]);

        let ct = choice_tree("CT", 3);
        assert_eq!(ct.behavior.rules.len(), 3);
        assert_eq!(ct.behavior.rules[2].outputs, vec![2]);

        let jt = join_tree("JT", 3);
        assert_eq!(jt.behavior.rules[0].inputs, vec![0, 1, 2]);

        let mt = merge_tree("MT", 2);
        assert_eq!(mt.behavior.rules.len(), 2);
        assert_eq!(mt.behavior.rules[1].inputs, vec![1]);
    }

    #[test]
    fn degenerate_sizes_are_valid() {
        assert_eq!(fork_tree("FT", 1).outputs.len(), 1);
        assert_eq!(join("J", 1, 1).inputs.len(), 2);
        assert_eq!(join("J", 1, 1).outputs.len(), 1);
    }
}
