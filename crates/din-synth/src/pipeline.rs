//! The synthesis pipeline, end to end.

use din_core::{Circuit, Netlist, Specification};

use crate::assemble::assemble;
use crate::error::SynthesisError;
use crate::serializer::SerN;
use crate::stage::{build_stage, elide_narrow_fanout};
use crate::stage2::{build_irreversible, invert_stage, StageTwo};
use crate::update::connect_update;

/// Decompose a specification into a delay-insensitive module network.
///
/// Stage 1 resolves concurrent input sets per state; stage 2 routes the
/// serialized output sets back out (mirrored reversibly unless the class
/// is b-arb); the update layer keeps every serializer instance's state in
/// step. Fan-outs left with fewer than two outputs are spliced away before
/// final assembly.
pub fn synthesize(spec: &Specification) -> Result<Circuit, SynthesisError> {
    if !spec.supported() {
        return Err(SynthesisError::UnsupportedClass {
            name: spec.name.clone(),
        });
    }

    let marked = spec.mark_duplicates();
    let sern = SerN::derive(&marked);
    let mut net = Netlist::new();

    let stage1 = build_stage(&marked, &sern, &mut net);

    let mut stage2 = if marked.class.b_arb {
        let (forks, merges) = build_irreversible(&marked, &sern, &mut net);
        StageTwo::Irreversible { forks, merges }
    } else {
        let inv_spec = marked.invert();
        let inv_sern = sern.invert();
        let mut scratch = Netlist::new();
        let inner = build_stage(&inv_spec, &inv_sern, &mut scratch);
        StageTwo::Reversible(invert_stage(&inner, &scratch, &sern, &marked, &mut net))
    };

    let update = connect_update(&marked, &sern, &stage1, &stage2, &mut net);

    // Irreversible stage-2 fan-outs are sized by set width, so singleton
    // output sets leave single-output forks behind the update joins.
    if let StageTwo::Irreversible { forks, .. } = &mut stage2 {
        elide_narrow_fanout(&mut net, forks);
    }

    Ok(assemble(&marked, &sern, &stage1, &stage2, &update, &net))
}
