//! `din synth` — decompose a specification and emit the network.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use din_core::Circuit;
use din_synth::synthesize;

use crate::commands::load_spec;

pub fn run(spec_path: &Path, export: &str, output: Option<&Path>) -> Result<()> {
    let spec = load_spec(spec_path)?;
    let circuit = synthesize(&spec)?;
    let rendered = render(&circuit, export)?;

    match output {
        Some(path) => {
            fs::write(path, rendered)
                .with_context(|| format!("writing {}", path.display()))?;
            println!(
                "Wrote {} ({} modules, {} wires)",
                path.display(),
                circuit.modules.len(),
                circuit.wires.len()
            );
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

fn render(circuit: &Circuit, export: &str) -> Result<String> {
    Ok(match export {
        "text" => circuit.to_string(),
        "json" => {
            let mut s = serde_json::to_string_pretty(circuit)?;
            s.push('\n');
            s
        }
        "network" => {
            let mut s = circuit.network_expression();
            s.push('\n');
            s
        }
        other => bail!("unknown export format {other:?} (expected text, json, or network)"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use din_core::{LineSet, SpecClass, Specification, Transition};

    fn spec() -> Specification {
        Specification {
            name: "wire".into(),
            states: vec!["S0".into()],
            inputs: vec!["a".into()],
            outputs: vec!["x".into()],
            transitions: vec![Transition::new(
                0,
                LineSet::new(vec![0]),
                0,
                LineSet::new(vec![0]),
            )],
            class: SpecClass {
                non_arb: true,
                ..Default::default()
            },
        }
    }

    #[test]
    fn render_formats() {
        let circuit = synthesize(&spec()).unwrap();

        let text = render(&circuit, "text").unwrap();
        assert!(text.contains("circuit wire"));

        let json = render(&circuit, "json").unwrap();
        let back: Circuit = serde_json::from_str(&json).unwrap();
        assert_eq!(back.modules.len(), circuit.modules.len());

        let network = render(&circuit, "network").unwrap();
        assert!(network.contains("hide w0"));

        assert!(render(&circuit, "dot").is_err());
    }
}
