//! `din inspect` — specification summary.

use std::path::Path;

use anyhow::Result;
use din_synth::SerN;

use crate::commands::load_spec;

pub fn run(spec_path: &Path) -> Result<()> {
    let spec = load_spec(spec_path)?;

    println!("specification {}", spec.name);
    println!("  states:      {}", spec.states.join(", "));
    println!("  inputs:      {}", spec.inputs.join(", "));
    println!("  outputs:     {}", spec.outputs.join(", "));
    println!("  transitions:");
    for t in &spec.transitions {
        println!(
            "    {}: {} / {} -> {}",
            spec.states[t.source],
            t.inputs.label(&spec.inputs),
            t.outputs.label(&spec.outputs),
            spec.states[t.target],
        );
    }

    let mut class = Vec::new();
    if spec.class.non_arb {
        class.push("non-arb");
    }
    if spec.class.eq_arb {
        class.push("eq-arb");
    }
    if spec.class.b_arb {
        class.push("b-arb");
    }
    let class = if class.is_empty() {
        "unsupported".to_string()
    } else {
        class.join(", ")
    };
    println!("  class:       {class}");

    let sern = SerN::derive(&spec.mark_duplicates());
    println!(
        "  serializer:  {} input sets, {} output sets, {} rules",
        sern.input_sets.len(),
        sern.output_sets.len(),
        sern.rules.len()
    );
    Ok(())
}
