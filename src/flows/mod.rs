//! Declarative step registries, one per journey module.
//!
//! Everything in here is data plus pure functions over `(ctx, response,
//! state)`; sequencing, delays, and history belong to the engine.

pub mod buy;
pub mod dashboard;
pub mod income;
pub mod medical;
pub mod post_payment;

use crate::error::GraphError;
use crate::step::{StepId, StepRegistry};

/// Entry points exposed to the engine: fresh purchase, post-payment
/// servicing, and the dashboard.
pub fn entries() -> Vec<StepId> {
    vec![buy::ENTRY, post_payment::ENTRY, dashboard::ENTRY]
}

/// The union registry of all five flows.
pub fn registry() -> Result<StepRegistry, GraphError> {
    StepRegistry::from_flows(
        vec![
            buy::steps(),
            income::steps(),
            medical::steps(),
            post_payment::steps(),
            dashboard::steps(),
        ],
        entries(),
    )
}

/// Deterministic demo reference number ("CLM-482913") derived from the
/// journey's own answers, so reprocessing the same state yields the same
/// reference.
pub(crate) fn demo_ref(prefix: &str, parts: &[&str]) -> String {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for part in parts {
        for byte in part.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
    }
    format!("{prefix}-{:06}", hash % 1_000_000)
}
