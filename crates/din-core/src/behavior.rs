//! Finite-state behaviours attached to module instances.
//!
//! Every module instance carries a small Set Notation-style definition of
//! its own behaviour: a state count and a list of rules, each consuming a
//! set of input ports and firing a set of output ports. Primitive
//! components are single-state; serializer modules track the states of the
//! specification they were derived from.

use serde::{Deserialize, Serialize};

/// One transition rule of a module behaviour.
///
/// Port references are indices into the owning module's input and output
/// port lists. A rule is enabled when the module is in `from` and a signal
/// is pending on every port in `inputs`; firing consumes those signals,
/// moves the module to `to`, and emits one signal on every port in
/// `outputs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub from: usize,
    pub inputs: Vec<usize>,
    pub to: usize,
    pub outputs: Vec<usize>,
}

impl Rule {
    pub fn new(from: usize, inputs: Vec<usize>, to: usize, outputs: Vec<usize>) -> Self {
        Self {
            from,
            inputs,
            to,
            outputs,
        }
    }
}

/// A module behaviour: `states` many states, starting in `initial`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Behavior {
    pub states: usize,
    pub initial: usize,
    pub rules: Vec<Rule>,
}

impl Behavior {
    pub fn new(states: usize, initial: usize, rules: Vec<Rule>) -> Self {
        Self {
            states,
            initial,
            rules,
        }
    }

    /// Single-state behaviour from `(inputs, outputs)` rule pairs.
    pub fn single_state(rules: Vec<(Vec<usize>, Vec<usize>)>) -> Self {
        Self {
            states: 1,
            initial: 0,
            rules: rules
                .into_iter()
                .map(|(inputs, outputs)| Rule::new(0, inputs, 0, outputs))
                .collect(),
        }
    }
}
