//! Set Notation specifications.
//!
//! A specification is an ordered list of state names, input line names, and
//! output line names, plus a set of transitions `(source, inputSet, target,
//! outputSet)` where the sets contain line indices that are active
//! simultaneously. Classification booleans (`SpecClass`) are produced by an
//! upstream analysis and carried here verbatim; the synthesis engine only
//! consults them, it never recomputes them.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by [`Specification::validate`].
///
/// The synthesis core assumes a pre-validated specification; this check
/// exists for the benefit of edges that accept specifications from files.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("specification has no states")]
    NoStates,

    #[error("transition {transition}: state index {state} out of range")]
    StateOutOfRange { transition: usize, state: usize },

    #[error("transition {transition}: input line index {line} out of range")]
    InputLineOutOfRange { transition: usize, line: usize },

    #[error("transition {transition}: output line index {line} out of range")]
    OutputLineOutOfRange { transition: usize, line: usize },

    #[error("transition {transition}: empty input set")]
    EmptyInputSet { transition: usize },
}

/// A set of concurrently active lines, identified by index.
///
/// The optional `tag` is the synthetic occurrence marker given to input
/// sets that appear more than once in the same source state: each tagged
/// occurrence maps to a distinct serializer input, which keeps the derived
/// serializer deterministic while leaving the genuine duplicates to be
/// arbitrated by an explicit Choice tree. Equality and ordering include the
/// tag; the line membership operations ignore it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineSet {
    lines: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tag: Option<u32>,
}

impl LineSet {
    /// Build a set from line indices; sorts and deduplicates.
    pub fn new(mut lines: Vec<usize>) -> Self {
        lines.sort_unstable();
        lines.dedup();
        Self { lines, tag: None }
    }

    pub fn empty() -> Self {
        Self {
            lines: Vec::new(),
            tag: None,
        }
    }

    pub fn with_tag(mut self, tag: u32) -> Self {
        self.tag = Some(tag);
        self
    }

    /// The same membership without any occurrence tag.
    pub fn untagged(&self) -> Self {
        Self {
            lines: self.lines.clone(),
            tag: None,
        }
    }

    pub fn tag(&self) -> Option<u32> {
        self.tag
    }

    pub fn lines(&self) -> &[usize] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn contains(&self, line: usize) -> bool {
        self.lines.binary_search(&line).is_ok()
    }

    /// Membership-only subset test (tags are irrelevant here).
    pub fn is_subset_of(&self, other: &LineSet) -> bool {
        self.lines.iter().all(|&l| other.contains(l))
    }

    /// Render the set against a name table, e.g. `{a,b}` or `{a}#2`.
    pub fn label(&self, names: &[String]) -> String {
        let mut s = String::from("{");
        for (k, &line) in self.lines.iter().enumerate() {
            if k > 0 {
                s.push(',');
            }
            match names.get(line) {
                Some(name) => s.push_str(name),
                None => s.push_str(&line.to_string()),
            }
        }
        s.push('}');
        if let Some(tag) = self.tag {
            s.push('#');
            s.push_str(&tag.to_string());
        }
        s
    }
}

impl fmt::Display for LineSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label(&[]))
    }
}

/// One specification transition: in `source`, the concurrent arrival of
/// every line in `inputs` moves the machine to `target` and fires every
/// line in `outputs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub source: usize,
    pub inputs: LineSet,
    pub target: usize,
    pub outputs: LineSet,
}

impl Transition {
    pub fn new(source: usize, inputs: LineSet, target: usize, outputs: LineSet) -> Self {
        Self {
            source,
            inputs,
            target,
            outputs,
        }
    }
}

/// Upstream classification of a specification.
///
/// `non_arb`: concurrent input sets within a state overlap only in ways the
/// cancellation network resolves deterministically. `eq_arb`: the only
/// remaining overlaps are exact-set duplicates (arbitrated by Choice
/// trees). `b_arb`: the output side requires arbitration, selecting the
/// irreversible stage-2 construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecClass {
    pub non_arb: bool,
    pub eq_arb: bool,
    pub b_arb: bool,
}

/// A Set Notation specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specification {
    pub name: String,
    pub states: Vec<String>,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub transitions: Vec<Transition>,
    pub class: SpecClass,
}

impl Specification {
    /// Whether the decomposition algorithm supports this specification.
    pub fn supported(&self) -> bool {
        self.class.non_arb || self.class.eq_arb
    }

    /// Check well-formedness of indices. Intended for specifications read
    /// from files; synthesis itself assumes a validated specification.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.states.is_empty() {
            return Err(SpecError::NoStates);
        }
        for (i, t) in self.transitions.iter().enumerate() {
            for state in [t.source, t.target] {
                if state >= self.states.len() {
                    return Err(SpecError::StateOutOfRange {
                        transition: i,
                        state,
                    });
                }
            }
            if t.inputs.is_empty() {
                return Err(SpecError::EmptyInputSet { transition: i });
            }
            for &line in t.inputs.lines() {
                if line >= self.inputs.len() {
                    return Err(SpecError::InputLineOutOfRange {
                        transition: i,
                        line,
                    });
                }
            }
            for &line in t.outputs.lines() {
                if line >= self.outputs.len() {
                    return Err(SpecError::OutputLineOutOfRange {
                        transition: i,
                        line,
                    });
                }
            }
        }
        Ok(())
    }

    /// Tag input sets that occur more than once in the same source state
    /// with occurrence markers `1..k`, in transition order, so that each
    /// occurrence maps to a distinct serializer input.
    pub fn mark_duplicates(&self) -> Specification {
        let mut marked = self.clone();
        for state in 0..self.states.len() {
            // Count occurrences of each untagged set among this state's
            // transitions, then tag the ones that repeat.
            let mut seen: Vec<(LineSet, u32)> = Vec::new();
            for t in self.transitions.iter().filter(|t| t.source == state) {
                let key = t.inputs.untagged();
                match seen.iter_mut().find(|(s, _)| *s == key) {
                    Some((_, n)) => *n += 1,
                    None => seen.push((key, 1)),
                }
            }
            let mut next: Vec<(LineSet, u32)> = Vec::new();
            for t in marked
                .transitions
                .iter_mut()
                .filter(|t| t.source == state)
            {
                let key = t.inputs.untagged();
                let count = seen
                    .iter()
                    .find(|(s, _)| *s == key)
                    .map(|(_, n)| *n)
                    .unwrap_or(0);
                if count > 1 {
                    let occurrence = match next.iter_mut().find(|(s, _)| *s == key) {
                        Some((_, n)) => {
                            *n += 1;
                            *n
                        }
                        None => {
                            next.push((key.clone(), 1));
                            1
                        }
                    };
                    t.inputs = key.with_tag(occurrence);
                }
            }
        }
        marked
    }

    /// Structural inverse: input and output line lists swap, and each
    /// transition `(s, X, t, Y)` becomes `(t, Y, s, X)`. The output set is
    /// active in the state the original transition *enters*, because by
    /// the time the mirrored network routes an output event every
    /// serializer instance has already advanced past the transition.
    pub fn invert(&self) -> Specification {
        Specification {
            name: format!("{}'", self.name),
            states: self.states.clone(),
            inputs: self.outputs.clone(),
            outputs: self.inputs.clone(),
            transitions: self
                .transitions
                .iter()
                .map(|t| Transition::new(t.target, t.outputs.clone(), t.source, t.inputs.clone()))
                .collect(),
            class: self.class,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn two_state_spec() -> Specification {
        Specification {
            name: "m".into(),
            states: names(&["S0", "S1"]),
            inputs: names(&["a", "b"]),
            outputs: names(&["x"]),
            transitions: vec![
                Transition::new(0, LineSet::new(vec![0, 1]), 1, LineSet::new(vec![0])),
                Transition::new(1, LineSet::new(vec![0]), 0, LineSet::empty()),
            ],
            class: SpecClass {
                non_arb: true,
                ..Default::default()
            },
        }
    }

    #[test]
    fn line_set_normalizes() {
        let s = LineSet::new(vec![3, 1, 3, 0]);
        assert_eq!(s.lines(), &[0, 1, 3]);
        assert!(s.contains(1));
        assert!(!s.contains(2));
    }

    #[test]
    fn tags_distinguish_equal_sets() {
        let a = LineSet::new(vec![0]).with_tag(1);
        let b = LineSet::new(vec![0]).with_tag(2);
        assert_ne!(a, b);
        assert_eq!(a.untagged(), b.untagged());
        assert!(a.is_subset_of(&b));
    }

    #[test]
    fn label_uses_names() {
        let s = LineSet::new(vec![0, 2]).with_tag(1);
        assert_eq!(s.label(&names(&["a", "b", "c"])), "{a,c}#1");
    }

    #[test]
    fn mark_duplicates_tags_per_state() {
        let mut spec = two_state_spec();
        spec.transitions.push(Transition::new(
            0,
            LineSet::new(vec![0, 1]),
            0,
            LineSet::empty(),
        ));
        let marked = spec.mark_duplicates();
        assert_eq!(marked.transitions[0].inputs.tag(), Some(1));
        assert_eq!(marked.transitions[2].inputs.tag(), Some(2));
        // The singleton in S1 is unique and stays untagged.
        assert_eq!(marked.transitions[1].inputs.tag(), None);
    }

    #[test]
    fn invert_swaps_orientation() {
        let inv = two_state_spec().invert();
        assert_eq!(inv.inputs, names(&["x"]));
        assert_eq!(inv.outputs, names(&["a", "b"]));
        let t = &inv.transitions[0];
        assert_eq!(t.source, 1);
        assert_eq!(t.target, 0);
        assert_eq!(t.inputs.lines(), &[0]);
        assert_eq!(t.outputs.lines(), &[0, 1]);
    }

    #[test]
    fn validate_rejects_bad_indices() {
        let mut spec = two_state_spec();
        spec.transitions
            .push(Transition::new(0, LineSet::new(vec![7]), 0, LineSet::empty()));
        assert!(matches!(
            spec.validate(),
            Err(SpecError::InputLineOutOfRange { line: 7, .. })
        ));
    }
}
