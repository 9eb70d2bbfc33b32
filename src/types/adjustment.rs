//! Adjustment records and the read model exposed to consumers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A spatial offset applied to a sub-range of the grid.
///
/// `x` shifts east, `y` shifts north, `z` shifts TVD.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OffsetRequest {
    pub md_start: f64,
    pub md_end: f64,
    #[serde(default)]
    pub x_offset: f64,
    #[serde(default)]
    pub y_offset: f64,
    #[serde(default)]
    pub z_offset: f64,
}

/// One offset edit in a session's history.
///
/// The adjusted arrays are full length: identical to the previous effective
/// path outside `[md_start, md_end]` and shifted inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentRecord {
    pub sequence: u64,
    pub md_start: f64,
    pub md_end: f64,
    pub x_offset: f64,
    pub y_offset: f64,
    pub z_offset: f64,
    pub points_affected: usize,
    pub north_adjusted: Vec<f64>,
    pub east_adjusted: Vec<f64>,
    pub tvd_adjusted: Vec<f64>,
    #[serde(default)]
    pub inc_recalculated: Option<Vec<f64>>,
    #[serde(default)]
    pub azi_recalculated: Option<Vec<f64>>,
    pub created_at: DateTime<Utc>,
}

impl AdjustmentRecord {
    pub fn has_recalculated_angles(&self) -> bool {
        self.inc_recalculated.is_some() && self.azi_recalculated.is_some()
    }
}

/// Where the cursor sits after an undo/redo/reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "position", rename_all = "snake_case")]
pub enum HistoryPosition {
    /// Cursor 0: the unadjusted session path.
    Baseline,
    Adjusted { record: Box<AdjustmentRecord> },
}

impl HistoryPosition {
    pub fn sequence(&self) -> u64 {
        match self {
            HistoryPosition::Baseline => 0,
            HistoryPosition::Adjusted { record } => record.sequence,
        }
    }
}

/// Current effective path of a session.
///
/// This is what visualisation and export read; they never look at raw records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentState {
    pub session_id: String,
    pub sequence: u64,
    pub has_adjustment: bool,
    pub md_grid: Vec<f64>,
    pub north: Vec<f64>,
    pub east: Vec<f64>,
    pub tvd: Vec<f64>,
    pub inc_recalculated: Option<Vec<f64>>,
    pub azi_recalculated: Option<Vec<f64>>,
}

/// Record metadata without the path arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentSummary {
    pub sequence: u64,
    pub md_start: f64,
    pub md_end: f64,
    pub x_offset: f64,
    pub y_offset: f64,
    pub z_offset: f64,
    pub points_affected: usize,
    pub recalculated: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&AdjustmentRecord> for AdjustmentSummary {
    fn from(record: &AdjustmentRecord) -> Self {
        Self {
            sequence: record.sequence,
            md_start: record.md_start,
            md_end: record.md_end,
            x_offset: record.x_offset,
            y_offset: record.y_offset,
            z_offset: record.z_offset,
            points_affected: record.points_affected,
            recalculated: record.has_recalculated_angles(),
            created_at: record.created_at,
        }
    }
}

/// Log overview: every record plus the cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryOverview {
    pub session_id: String,
    pub cursor: u64,
    pub can_undo: bool,
    pub can_redo: bool,
    pub records: Vec<AdjustmentSummary>,
}
