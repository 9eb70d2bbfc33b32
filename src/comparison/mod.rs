//! Survey Comparison
//!
//! Pure, stateless stages that turn two surveys into a `ComparisonSession`:
//!
//! 1. [`resampler::align`] puts both surveys on one MD grid
//! 2. [`deltas::compute`] derives per-station deltas and statistics
//!
//! Neither stage holds shared state, so comparisons for different survey
//! pairs can run concurrently.

pub mod angles;
pub mod deltas;
pub mod resampler;

pub use deltas::compute;
pub use resampler::align;

use crate::error::CompareError;
use crate::types::{ComparisonSession, Survey};

/// Align and diff two surveys in one step.
pub fn compare(
    primary: &Survey,
    reference: &Survey,
    resolution: u32,
) -> Result<ComparisonSession, CompareError> {
    let aligned = align(primary, reference, resolution)?;
    compute(aligned)
}
