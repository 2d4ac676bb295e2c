//! Serializer derivation.
//!
//! From a (duplicate-marked) specification we derive SerN, a deterministic
//! serializer with one input line per distinct concurrent input set and one
//! output line per distinct non-empty concurrent output set; each original
//! transition becomes a single-input/single-output rule. SerN is never
//! instantiated directly — the network uses its two query-augmented
//! variants:
//!
//! * **SerNQ** adds an aggregate query input `q` and one query output per
//!   state; receiving `q` in state `i` emits state `i`'s query output.
//! * **SerNQ′** is the dual: one query input per state and one aggregate
//!   query output.
//!
//! Port layouts are chosen so that a SerNQ built over the inverted SerN,
//! once structurally inverted, coincides index-for-index with a SerNQ′
//! built over the forward SerN (and vice versa). Stage-2 inversion relies
//! on this to reclassify serializer instances by constructing the dual
//! module afresh and carrying every wire index over unchanged.

use din_core::{Behavior, LineSet, Module, ModuleKind, Rule, SerializerRole, Specification};

/// One SerN rule: `from --input/output--> to`, with serializer line ids.
///
/// `input` is `None` only in inverted serializers, for rules mirroring a
/// transition with an empty output set; such rules never survive into an
/// instantiated behaviour (stage-2 instances are rebuilt over the forward
/// serializer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerRule {
    pub from: usize,
    pub input: Option<usize>,
    pub to: usize,
    pub output: Option<usize>,
}

/// The derived serializer: line enumerations plus the serialized rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerN {
    pub states: usize,
    /// Distinct tagged input sets, in first-appearance order.
    pub input_sets: Vec<LineSet>,
    /// Distinct non-empty output sets, in first-appearance order.
    pub output_sets: Vec<LineSet>,
    pub rules: Vec<SerRule>,
}

impl SerN {
    /// Derive SerN from a specification whose per-state duplicate input
    /// sets have already been tagged (see `Specification::mark_duplicates`).
    pub fn derive(spec: &Specification) -> SerN {
        let mut input_sets: Vec<LineSet> = Vec::new();
        let mut output_sets: Vec<LineSet> = Vec::new();
        let mut rules = Vec::with_capacity(spec.transitions.len());
        for t in &spec.transitions {
            let input = Some(intern(&mut input_sets, &t.inputs));
            let output = if t.outputs.is_empty() {
                None
            } else {
                Some(intern(&mut output_sets, &t.outputs))
            };
            rules.push(SerRule {
                from: t.source,
                input,
                to: t.target,
                output,
            });
        }
        SerN {
            states: spec.states.len(),
            input_sets,
            output_sets,
            rules,
        }
    }

    /// Structural inverse: inputs and outputs swap, each rule reverses.
    /// Line enumeration order is preserved, so the inverted serializer's
    /// lines align index-for-index with the original's.
    pub fn invert(&self) -> SerN {
        SerN {
            states: self.states,
            input_sets: self.output_sets.clone(),
            output_sets: self.input_sets.clone(),
            rules: self
                .rules
                .iter()
                .map(|r| SerRule {
                    from: r.to,
                    input: r.output,
                    to: r.from,
                    output: r.input,
                })
                .collect(),
        }
    }

    /// Serializer input id of a tagged set.
    pub fn input_id(&self, set: &LineSet) -> Option<usize> {
        self.input_sets.iter().position(|s| s == set)
    }

    /// Serializer output id of an output set.
    pub fn output_id(&self, set: &LineSet) -> Option<usize> {
        self.output_sets.iter().position(|s| s == set)
    }

    /// SerNQ: index of the aggregate query input `q`.
    pub fn nq_query_input(&self) -> usize {
        self.input_sets.len()
    }

    /// SerNQ: index of state `s`'s query output.
    pub fn nq_state_output(&self, s: usize) -> usize {
        self.output_sets.len() + s
    }

    /// SerNQ′: index of state `s`'s query input.
    pub fn dual_state_input(&self, s: usize) -> usize {
        self.input_sets.len() + s
    }

    /// SerNQ′: index of the aggregate query output `q`.
    pub fn dual_query_output(&self) -> usize {
        self.output_sets.len()
    }
}

fn intern(sets: &mut Vec<LineSet>, set: &LineSet) -> usize {
    match sets.iter().position(|s| s == set) {
        Some(id) => id,
        None => {
            sets.push(set.clone());
            sets.len() - 1
        }
    }
}

fn ser_rules(sern: &SerN) -> Vec<Rule> {
    sern.rules
        .iter()
        .map(|r| Rule::new(
            r.from,
            r.input.into_iter().collect(),
            r.to,
            r.output.into_iter().collect(),
        ))
        .collect()
}

fn set_port_names(sets: &[LineSet], names: &[String]) -> Vec<String> {
    sets.iter().map(|s| s.label(names)).collect()
}

/// Build a SerNQ module instance. `spec` supplies line and state names for
/// port labelling and must have the same orientation as `sern`.
pub fn sernq(sern: &SerN, spec: &Specification, name: impl Into<String>) -> Module {
    let mut inputs = set_port_names(&sern.input_sets, &spec.inputs);
    inputs.push("q".into());
    let mut outputs = set_port_names(&sern.output_sets, &spec.outputs);
    outputs.extend(spec.states.iter().map(|s| format!("q_{s}")));

    let mut rules = ser_rules(sern);
    for s in 0..sern.states {
        rules.push(Rule::new(
            s,
            vec![sern.nq_query_input()],
            s,
            vec![sern.nq_state_output(s)],
        ));
    }
    Module::new(
        name,
        ModuleKind::Serializer(SerializerRole::QueryExposing),
        inputs,
        outputs,
        Behavior::new(sern.states, 0, rules),
    )
}

/// Build a SerNQ′ module instance, the query-consuming dual of [`sernq`].
pub fn sernq_dual(sern: &SerN, spec: &Specification, name: impl Into<String>) -> Module {
    let mut inputs = set_port_names(&sern.input_sets, &spec.inputs);
    inputs.extend(spec.states.iter().map(|s| format!("q_{s}")));
    let mut outputs = set_port_names(&sern.output_sets, &spec.outputs);
    outputs.push("q".into());

    let mut rules = ser_rules(sern);
    for s in 0..sern.states {
        rules.push(Rule::new(
            s,
            vec![sern.dual_state_input(s)],
            s,
            vec![sern.dual_query_output()],
        ));
    }
    Module::new(
        name,
        ModuleKind::Serializer(SerializerRole::QueryConsuming),
        inputs,
        outputs,
        Behavior::new(sern.states, 0, rules),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use din_core::{SpecClass, Transition};

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    /// S0: {a,b}/{x} -> S1; S1: {a}/{} -> S0; S1: {a,b}/{x} -> S1.
    fn spec() -> Specification {
        Specification {
            name: "m".into(),
            states: names(&["S0", "S1"]),
            inputs: names(&["a", "b"]),
            outputs: names(&["x"]),
            transitions: vec![
                Transition::new(0, LineSet::new(vec![0, 1]), 1, LineSet::new(vec![0])),
                Transition::new(1, LineSet::new(vec![0]), 0, LineSet::empty()),
                Transition::new(1, LineSet::new(vec![0, 1]), 1, LineSet::new(vec![0])),
            ],
            class: SpecClass {
                non_arb: true,
                ..Default::default()
            },
        }
    }

    #[test]
    fn derive_dedupes_sets_across_states() {
        let sern = SerN::derive(&spec());
        // {a,b} appears in both states but is one serializer input.
        assert_eq!(sern.input_sets.len(), 2);
        assert_eq!(sern.output_sets.len(), 1);
        assert_eq!(sern.rules.len(), 3);
        assert_eq!(sern.rules[1].output, None);
        assert_eq!(sern.rules[2].input, sern.rules[0].input);
    }

    #[test]
    fn tagged_duplicates_get_distinct_inputs() {
        let mut s = spec();
        s.transitions.push(Transition::new(
            0,
            LineSet::new(vec![0, 1]),
            0,
            LineSet::empty(),
        ));
        let sern = SerN::derive(&s.mark_duplicates());
        // {a,b}#1 and {a,b}#2 in S0, untagged {a,b} in S1, {a} in S1.
        assert_eq!(sern.input_sets.len(), 4);
        assert_ne!(sern.rules[0].input, sern.rules[3].input);
    }

    #[test]
    fn invert_preserves_line_order() {
        let sern = SerN::derive(&spec());
        let inv = sern.invert();
        assert_eq!(inv.input_sets, sern.output_sets);
        assert_eq!(inv.output_sets, sern.input_sets);
        let r = &inv.rules[0];
        assert_eq!((r.from, r.to), (1, 0));
        assert_eq!(r.input, Some(0));
        assert_eq!(r.output, Some(0));
    }

    #[test]
    fn sernq_layout_and_query_rules() {
        let s = spec();
        let sern = SerN::derive(&s);
        let m = sernq(&sern, &s, "SerNQ(a)");
        assert_eq!(m.inputs.len(), 3); // 2 sets + q
        assert_eq!(m.outputs.len(), 3); // 1 output set + 2 state queries
        assert_eq!(m.inputs[sern.nq_query_input()], "q");
        assert_eq!(m.outputs[sern.nq_state_output(1)], "q_S1");
        // Query rules keep the state and expose it.
        let rule = &m.behavior.rules[3];
        assert_eq!((rule.from, rule.to), (0, 0));
        assert_eq!(rule.outputs, vec![sern.nq_state_output(0)]);
    }

    #[test]
    fn dual_mirrors_sernq_indices() {
        let s = spec();
        let sern = SerN::derive(&s);
        let d = sernq_dual(&sern, &s, "SerNQ'({a,b})");
        assert_eq!(d.inputs[sern.dual_state_input(0)], "q_S0");
        assert_eq!(d.outputs[sern.dual_query_output()], "q");
        // A SerNQ over the inverted serializer, inverted structurally,
        // must coincide with this dual: input i <-> output i.
        let inv = sern.invert();
        let q = sernq(&inv, &s.invert(), "SerNQ(x)");
        assert_eq!(q.inputs.len(), d.outputs.len());
        assert_eq!(q.outputs.len(), d.inputs.len());
        assert_eq!(q.inputs[inv.nq_query_input()], "q");
        assert_eq!(d.outputs[sern.dual_query_output()], "q");
        assert_eq!(inv.nq_query_input(), sern.dual_query_output());
    }
}
