//! Shared data structures for survey comparison
//!
//! - `Station` / `Survey`: solver-supplied input paths
//! - `AlignedGrid`: both surveys resampled onto one MD grid
//! - `ComparisonSession`: deltas + statistics, the adjustment baseline
//! - `AdjustmentRecord` / `AdjustmentState`: offset edits and their read model

mod station;
mod session;
mod adjustment;

pub use station::*;
pub use session::*;
pub use adjustment::*;
