//! Synthesis errors.

use thiserror::Error;

/// Errors that can occur when entering the synthesis pipeline.
///
/// Everything past the entry check is a total function over a well-formed
/// specification; internal inconsistencies (cursor overruns, double wiring)
/// indicate a defect in the algorithm itself and abort instead of being
/// reported here.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("specification {name} is neither non-arb nor eq-arb and cannot be decomposed")]
    UnsupportedClass { name: String },
}
