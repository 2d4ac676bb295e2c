//! CLI command implementations.

pub mod inspect;
pub mod synth;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use din_core::Specification;

/// Load and validate a specification from a JSON file.
pub fn load_spec(path: &Path) -> Result<Specification> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let spec: Specification =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    spec.validate()
        .with_context(|| format!("invalid specification in {}", path.display()))?;
    Ok(spec)
}
