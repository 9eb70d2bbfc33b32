//! Comparison session data: aligned grids, deltas and statistics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One survey resampled onto a common MD grid.
///
/// Every field has one value per grid point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResampledPath {
    pub inc: Vec<f64>,
    pub azi: Vec<f64>,
    pub north: Vec<f64>,
    pub east: Vec<f64>,
    pub tvd: Vec<f64>,
}

impl ResampledPath {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            inc: Vec::with_capacity(n),
            azi: Vec::with_capacity(n),
            north: Vec::with_capacity(n),
            east: Vec::with_capacity(n),
            tvd: Vec::with_capacity(n),
        }
    }

    pub fn len(&self) -> usize {
        self.north.len()
    }

    pub fn is_empty(&self) -> bool {
        self.north.is_empty()
    }

    /// True when every channel holds exactly `n` values.
    pub fn has_len(&self, n: usize) -> bool {
        [&self.inc, &self.azi, &self.north, &self.east, &self.tvd]
            .iter()
            .all(|v| v.len() == n)
    }
}

/// Output of the resampler: both surveys on one MD grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedGrid {
    pub primary_survey_id: String,
    pub reference_survey_id: String,
    pub resolution: u32,
    pub md_grid: Vec<f64>,
    pub primary: ResampledPath,
    pub reference: ResampledPath,
}

impl AlignedGrid {
    pub fn len(&self) -> usize {
        self.md_grid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.md_grid.is_empty()
    }
}

/// Per-grid-point deltas, primary minus reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeltaSeries {
    /// East difference (m)
    pub delta_x: Vec<f64>,
    /// North difference (m)
    pub delta_y: Vec<f64>,
    /// TVD difference (m)
    pub delta_z: Vec<f64>,
    pub delta_horizontal: Vec<f64>,
    pub delta_total: Vec<f64>,
    /// Inclination difference (deg)
    pub delta_inc: Vec<f64>,
    /// Signed azimuth difference in (-180, 180] (deg)
    pub delta_azi: Vec<f64>,
}

/// The delta channels statistics are reported for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaChannel {
    X,
    Y,
    Z,
    Horizontal,
    Total,
    Inc,
    Azi,
}

impl DeltaChannel {
    pub const ALL: [DeltaChannel; 7] = [
        DeltaChannel::X,
        DeltaChannel::Y,
        DeltaChannel::Z,
        DeltaChannel::Horizontal,
        DeltaChannel::Total,
        DeltaChannel::Inc,
        DeltaChannel::Azi,
    ];
}

impl DeltaSeries {
    pub fn channel(&self, channel: DeltaChannel) -> &[f64] {
        match channel {
            DeltaChannel::X => &self.delta_x,
            DeltaChannel::Y => &self.delta_y,
            DeltaChannel::Z => &self.delta_z,
            DeltaChannel::Horizontal => &self.delta_horizontal,
            DeltaChannel::Total => &self.delta_total,
            DeltaChannel::Inc => &self.delta_inc,
            DeltaChannel::Azi => &self.delta_azi,
        }
    }

    pub fn len(&self) -> usize {
        self.delta_total.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delta_total.is_empty()
    }
}

/// Aggregate statistics for one delta channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    /// Largest magnitude seen on the channel
    pub max: f64,
    /// MD of the first grid point reaching `max`
    pub max_md: f64,
    /// Mean of the signed values
    pub avg: f64,
    /// Population standard deviation of the signed values
    pub std: f64,
}

/// Deviation at a fixed fraction of the grid index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviationSnapshot {
    /// Position label: 0, 25, 50, 75 or 100 (%)
    pub percent: u8,
    pub index: usize,
    pub md: f64,
    pub delta_horizontal: f64,
    pub delta_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub point_count: usize,
    pub delta_x: ChannelStats,
    pub delta_y: ChannelStats,
    pub delta_z: ChannelStats,
    pub delta_horizontal: ChannelStats,
    pub delta_total: ChannelStats,
    pub delta_inc: ChannelStats,
    pub delta_azi: ChannelStats,
    pub snapshots: Vec<DeviationSnapshot>,
}

impl Statistics {
    pub fn channel(&self, channel: DeltaChannel) -> &ChannelStats {
        match channel {
            DeltaChannel::X => &self.delta_x,
            DeltaChannel::Y => &self.delta_y,
            DeltaChannel::Z => &self.delta_z,
            DeltaChannel::Horizontal => &self.delta_horizontal,
            DeltaChannel::Total => &self.delta_total,
            DeltaChannel::Inc => &self.delta_inc,
            DeltaChannel::Azi => &self.delta_azi,
        }
    }
}

/// Immutable result of comparing one primary survey against one reference.
///
/// Acts as sequence 0 (the baseline) for the adjustment history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSession {
    pub id: String,
    pub primary_survey_id: String,
    pub reference_survey_id: String,
    pub resolution: u32,
    pub created_at: DateTime<Utc>,
    pub md_grid: Vec<f64>,
    pub primary: ResampledPath,
    pub reference: ResampledPath,
    pub deltas: DeltaSeries,
    pub statistics: Statistics,
}

impl ComparisonSession {
    pub fn len(&self) -> usize {
        self.md_grid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.md_grid.is_empty()
    }

    /// First and last grid depth.
    pub fn md_span(&self) -> Option<(f64, f64)> {
        Some((*self.md_grid.first()?, *self.md_grid.last()?))
    }
}

/// Listing entry for a stored session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub primary_survey_id: String,
    pub reference_survey_id: String,
    pub resolution: u32,
    pub created_at: DateTime<Utc>,
    pub point_count: usize,
    pub max_delta_total: f64,
}

impl From<&ComparisonSession> for SessionSummary {
    fn from(session: &ComparisonSession) -> Self {
        Self {
            id: session.id.clone(),
            primary_survey_id: session.primary_survey_id.clone(),
            reference_survey_id: session.reference_survey_id.clone(),
            resolution: session.resolution,
            created_at: session.created_at,
            point_count: session.len(),
            max_delta_total: session.statistics.delta_total.max,
        }
    }
}
