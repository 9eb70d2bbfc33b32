//! Resampler: aligns two surveys onto one common measured-depth grid
//!
//! The grid spans the MD overlap of both surveys at a fixed step, with a
//! shorter final step so the last point lands exactly on the overlap end.
//! Each survey is interpolated independently between its two bracketing
//! stations.

use tracing::debug;

use super::angles::{lerp, lerp_azimuth, normalize_azimuth};
use crate::config::defaults::{GRID_SNAP_ULPS, MAX_RESOLUTION_M, MIN_RESOLUTION_M};
use crate::error::CompareError;
use crate::types::{AlignedGrid, ResampledPath, Station, Survey};

/// Resample `primary` and `reference` onto a shared grid at `resolution` metres.
pub fn align(
    primary: &Survey,
    reference: &Survey,
    resolution: u32,
) -> Result<AlignedGrid, CompareError> {
    validate_resolution(resolution)?;
    primary.validate()?;
    reference.validate()?;

    let (overlap_start, overlap_end) = overlap(&primary.stations, &reference.stations)?;
    let md_grid = build_grid(overlap_start, overlap_end, resolution);

    let (primary_path, reference_path) = rayon::join(
        || resample(&primary.stations, &md_grid),
        || resample(&reference.stations, &md_grid),
    );

    debug!(
        primary = %primary.id,
        reference = %reference.id,
        resolution,
        overlap_start,
        overlap_end,
        points = md_grid.len(),
        "Surveys aligned"
    );

    Ok(AlignedGrid {
        primary_survey_id: primary.id.clone(),
        reference_survey_id: reference.id.clone(),
        resolution,
        md_grid,
        primary: primary_path,
        reference: reference_path,
    })
}

pub fn validate_resolution(resolution: u32) -> Result<(), CompareError> {
    if (MIN_RESOLUTION_M..=MAX_RESOLUTION_M).contains(&resolution) {
        Ok(())
    } else {
        Err(CompareError::InvalidResolution {
            resolution,
            min: MIN_RESOLUTION_M,
            max: MAX_RESOLUTION_M,
        })
    }
}

/// MD interval covered by both station lists.
fn overlap(primary: &[Station], reference: &[Station]) -> Result<(f64, f64), CompareError> {
    let (Some(p_first), Some(p_last), Some(r_first), Some(r_last)) = (
        primary.first(),
        primary.last(),
        reference.first(),
        reference.last(),
    ) else {
        return Err(CompareError::EmptyGrid);
    };

    let overlap_start = p_first.md.max(r_first.md);
    let overlap_end = p_last.md.min(r_last.md);

    if overlap_end <= overlap_start {
        return Err(CompareError::NoOverlap {
            overlap_start,
            overlap_end,
        });
    }

    Ok((overlap_start, overlap_end))
}

/// `start, start + step, ...` followed by `end`.
///
/// Point count is `ceil((end - start) / step) + 1`. Steps are computed as
/// `start + i * step` so rounding error does not accumulate along the grid.
pub fn build_grid(start: f64, end: f64, resolution: u32) -> Vec<f64> {
    let step = f64::from(resolution);
    let ratio = (end - start) / step;
    // Only round down when the excess over a whole step count is float noise;
    // anything larger gets its own, shorter, final step.
    let whole = ratio.floor();
    let steps = if ratio - whole <= ratio.abs() * GRID_SNAP_ULPS * f64::EPSILON {
        whole
    } else {
        ratio.ceil()
    };
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let steps = steps.max(1.0) as usize;

    let mut grid: Vec<f64> = (0..steps)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let offset = i as f64 * step;
            start + offset
        })
        .collect();
    grid.push(end);
    grid
}

/// Interpolate every station channel at each grid depth.
///
/// The grid must be ascending and inside the station MD range; a single
/// forward-moving cursor finds the bracketing pair.
fn resample(stations: &[Station], md_grid: &[f64]) -> ResampledPath {
    let mut path = ResampledPath::with_capacity(md_grid.len());
    let mut upper = 1usize;

    for &md in md_grid {
        while upper < stations.len() - 1 && stations[upper].md < md {
            upper += 1;
        }

        let sample = if stations.len() == 1 {
            stations[0]
        } else {
            let lo = &stations[upper - 1];
            let hi = &stations[upper];
            interpolate(lo, hi, md)
        };

        path.inc.push(sample.inc);
        path.azi.push(sample.azi);
        path.north.push(sample.north);
        path.east.push(sample.east);
        path.tvd.push(sample.tvd);
    }

    path
}

fn interpolate(lo: &Station, hi: &Station, md: f64) -> Station {
    let span = hi.md - lo.md;
    let t = ((md - lo.md) / span).clamp(0.0, 1.0);

    // Exact endpoints return the station values untouched
    if t <= 0.0 {
        return Station {
            azi: normalize_azimuth(lo.azi),
            ..*lo
        };
    }
    if t >= 1.0 {
        return Station {
            azi: normalize_azimuth(hi.azi),
            ..*hi
        };
    }

    Station {
        md,
        inc: lerp(lo.inc, hi.inc, t),
        azi: lerp_azimuth(lo.azi, hi.azi, t),
        north: lerp(lo.north, hi.north, t),
        east: lerp(lo.east, hi.east, t),
        tvd: lerp(lo.tvd, hi.tvd, t),
    }
}
