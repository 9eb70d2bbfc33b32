//! Offset adjustment of a comparison session's primary path
//!
//! `history` holds the pure undo/redo state machine; `engine` serializes
//! commands per session and persists the result.

pub mod engine;
pub mod history;

pub use engine::AdjustmentEngine;
pub use history::{derive_angles, AdjustmentHistory};
