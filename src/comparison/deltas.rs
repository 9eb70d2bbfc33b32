//! Delta calculator: per-station deviation and aggregate statistics
//!
//! Sign convention is primary minus reference on every channel. Statistics
//! are magnitude-based for `max` and signed for `avg`/`std`.

use chrono::Utc;
use statrs::statistics::Statistics as _;
use tracing::debug;
use uuid::Uuid;

use super::angles::signed_azimuth_delta;
use crate::error::CompareError;
use crate::types::{
    AlignedGrid, ChannelStats, ComparisonSession, DeltaChannel, DeltaSeries, DeviationSnapshot,
    Statistics,
};

/// Grid fractions at which deviation snapshots are taken (percent).
pub const SNAPSHOT_PERCENTS: [u8; 5] = [0, 25, 50, 75, 100];

/// Turn an aligned grid into a comparison session with a fresh id.
pub fn compute(aligned: AlignedGrid) -> Result<ComparisonSession, CompareError> {
    let n = aligned.md_grid.len();
    if n == 0 {
        return Err(CompareError::EmptyGrid);
    }
    if !aligned.primary.has_len(n) || !aligned.reference.has_len(n) {
        return Err(CompareError::EmptyGrid);
    }

    let deltas = delta_series(&aligned);
    let statistics = statistics(&aligned.md_grid, &deltas)?;

    let session = ComparisonSession {
        id: Uuid::new_v4().to_string(),
        primary_survey_id: aligned.primary_survey_id,
        reference_survey_id: aligned.reference_survey_id,
        resolution: aligned.resolution,
        created_at: Utc::now(),
        md_grid: aligned.md_grid,
        primary: aligned.primary,
        reference: aligned.reference,
        deltas,
        statistics,
    };

    debug!(
        session = %session.id,
        points = n,
        max_total = session.statistics.delta_total.max,
        "Deltas computed"
    );

    Ok(session)
}

fn delta_series(aligned: &AlignedGrid) -> DeltaSeries {
    let p = &aligned.primary;
    let r = &aligned.reference;
    let n = aligned.md_grid.len();

    let mut deltas = DeltaSeries {
        delta_x: Vec::with_capacity(n),
        delta_y: Vec::with_capacity(n),
        delta_z: Vec::with_capacity(n),
        delta_horizontal: Vec::with_capacity(n),
        delta_total: Vec::with_capacity(n),
        delta_inc: Vec::with_capacity(n),
        delta_azi: Vec::with_capacity(n),
    };

    for i in 0..n {
        let dx = p.east[i] - r.east[i];
        let dy = p.north[i] - r.north[i];
        let dz = p.tvd[i] - r.tvd[i];
        let horizontal = dx.hypot(dy);

        deltas.delta_x.push(dx);
        deltas.delta_y.push(dy);
        deltas.delta_z.push(dz);
        deltas.delta_horizontal.push(horizontal);
        deltas.delta_total.push(horizontal.hypot(dz));
        deltas.delta_inc.push(p.inc[i] - r.inc[i]);
        deltas.delta_azi.push(signed_azimuth_delta(p.azi[i], r.azi[i]));
    }

    deltas
}

/// Statistics over every channel plus quartile snapshots.
pub fn statistics(md_grid: &[f64], deltas: &DeltaSeries) -> Result<Statistics, CompareError> {
    let n = md_grid.len();
    if n == 0 || deltas.len() != n {
        return Err(CompareError::EmptyGrid);
    }

    let stats = |channel: DeltaChannel| channel_stats(md_grid, deltas.channel(channel));

    let snapshots = SNAPSHOT_PERCENTS
        .iter()
        .map(|&percent| {
            let index = snapshot_index(n, percent);
            DeviationSnapshot {
                percent,
                index,
                md: md_grid[index],
                delta_horizontal: deltas.delta_horizontal[index],
                delta_total: deltas.delta_total[index],
            }
        })
        .collect();

    Ok(Statistics {
        point_count: n,
        delta_x: stats(DeltaChannel::X),
        delta_y: stats(DeltaChannel::Y),
        delta_z: stats(DeltaChannel::Z),
        delta_horizontal: stats(DeltaChannel::Horizontal),
        delta_total: stats(DeltaChannel::Total),
        delta_inc: stats(DeltaChannel::Inc),
        delta_azi: stats(DeltaChannel::Azi),
        snapshots,
    })
}

/// Max magnitude (first occurrence wins), mean and population std.
fn channel_stats(md_grid: &[f64], values: &[f64]) -> ChannelStats {
    let mut max = 0.0_f64;
    let mut max_md = md_grid[0];
    for (i, v) in values.iter().enumerate() {
        let magnitude = v.abs();
        if magnitude > max {
            max = magnitude;
            max_md = md_grid[i];
        }
    }

    let std = if values.len() > 1 {
        values.iter().population_std_dev()
    } else {
        0.0
    };

    ChannelStats {
        max,
        max_md,
        avg: values.iter().mean(),
        std,
    }
}

/// Grid index for a percent position: `round(p/100 * (n - 1))`, halves away from zero.
pub fn snapshot_index(n: usize, percent: u8) -> usize {
    #[allow(clippy::cast_precision_loss)]
    let last = (n - 1) as f64;
    let idx = (f64::from(percent) / 100.0 * last).round();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let idx = idx as usize;
    idx.min(n - 1)
}
