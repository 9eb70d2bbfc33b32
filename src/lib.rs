//! survey-compare: Directional Survey Comparison and Curve Adjustment
//!
//! Compares a primary survey against a reference survey of the same wellbore.
//!
//! ## Architecture
//!
//! - **Comparison**: common MD grid, interpolation, per-station deltas and statistics
//! - **Adjustment**: undoable offset edits to the primary path, angle recalculation
//! - **Storage**: surveys, sessions and histories behind `ComparisonStore` (in-memory or sled)
//! - **Service / API**: command surface and its axum HTTP front end

pub mod adjustment;
pub mod api;
pub mod comparison;
pub mod config;
pub mod error;
pub mod service;
pub mod storage;
pub mod types;

// Re-export configuration
pub use config::CompareConfig;

pub use error::CompareError;
pub use service::ComparisonService;

// Re-export commonly used types
pub use types::{
    AdjustmentRecord, AdjustmentState, ComparisonSession, HistoryPosition, OffsetRequest,
    Station, Statistics, Survey, SurveyRole,
};

pub use adjustment::{AdjustmentEngine, AdjustmentHistory};
pub use comparison::compare;
pub use storage::{ComparisonStore, InMemoryStore, SledStore};
