//! Angular helpers shared by resampling, deltas and angle recalculation
//!
//! Azimuths wrap at 360°. All differences take the shortest way round.

/// Vectors shorter than this (m) carry no usable direction.
const MIN_SEGMENT_LENGTH_M: f64 = 1e-9;

/// Normalise an azimuth into [0, 360).
pub fn normalize_azimuth(azi: f64) -> f64 {
    let wrapped = azi.rem_euclid(360.0);
    // rem_euclid can return exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Signed shortest angular difference `to - from`, in (-180, 180].
pub fn signed_azimuth_delta(to: f64, from: f64) -> f64 {
    let d = (to - from).rem_euclid(360.0);
    if d > 180.0 {
        d - 360.0
    } else {
        d
    }
}

/// Interpolate between two azimuths along the shorter arc.
///
/// `t` is the fraction from `from` (0.0) to `to` (1.0).
pub fn lerp_azimuth(from: f64, to: f64, t: f64) -> f64 {
    normalize_azimuth(from + t * signed_azimuth_delta(to, from))
}

/// Plain linear interpolation.
pub fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + t * (to - from)
}

/// Inclination and azimuth of the straight segment between two stations.
///
/// Inclination comes from the vertical component (0° = straight down),
/// azimuth from the horizontal components measured clockwise from north.
/// Returns `None` for a degenerate segment. A vertical segment yields
/// `Some((inc, None))` because azimuth is undefined there.
pub fn segment_direction(d_north: f64, d_east: f64, d_tvd: f64) -> Option<(f64, Option<f64>)> {
    let horizontal = d_north.hypot(d_east);
    let length = horizontal.hypot(d_tvd);
    if length < MIN_SEGMENT_LENGTH_M {
        return None;
    }

    let inc = horizontal.atan2(d_tvd).to_degrees();
    let azi = if horizontal < MIN_SEGMENT_LENGTH_M {
        None
    } else {
        Some(normalize_azimuth(d_east.atan2(d_north).to_degrees()))
    };

    Some((inc, azi))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_normalize_azimuth() {
        assert!(close(normalize_azimuth(370.0), 10.0));
        assert!(close(normalize_azimuth(-10.0), 350.0));
        assert!(close(normalize_azimuth(360.0), 0.0));
        assert!(normalize_azimuth(-1e-18) < 360.0);
    }

    #[test]
    fn test_signed_delta_takes_short_way() {
        // Reference 355°, primary 5° → +10°, not -350°
        assert!(close(signed_azimuth_delta(5.0, 355.0), 10.0));
        assert!(close(signed_azimuth_delta(355.0, 5.0), -10.0));
        assert!(close(signed_azimuth_delta(90.0, 45.0), 45.0));
    }

    #[test]
    fn test_signed_delta_half_turn_is_positive() {
        assert!(close(signed_azimuth_delta(180.0, 0.0), 180.0));
        assert!(close(signed_azimuth_delta(0.0, 180.0), 180.0));
    }

    #[test]
    fn test_lerp_azimuth_crosses_north() {
        let mid = lerp_azimuth(350.0, 10.0, 0.5);
        assert!(close(mid, 0.0) || close(mid, 360.0), "got {mid}");

        let quarter = lerp_azimuth(350.0, 10.0, 0.25);
        assert!(close(quarter, 355.0));

        for i in 0..=10u32 {
            let a = lerp_azimuth(350.0, 10.0, f64::from(i) / 10.0);
            let off = signed_azimuth_delta(a, 350.0);
            assert!((0.0..=20.0 + 1e-9).contains(&off), "step {i}: {a}");
        }
    }

    #[test]
    fn test_segment_direction() {
        let (inc, azi) = segment_direction(0.0, 0.0, 10.0).unwrap();
        assert!(close(inc, 0.0));
        assert!(azi.is_none());

        let (inc, azi) = segment_direction(0.0, 10.0, 0.0).unwrap();
        assert!(close(inc, 90.0));
        assert!(close(azi.unwrap(), 90.0));

        let (inc, azi) = segment_direction(-1.0, -1.0, 2.0_f64.sqrt()).unwrap();
        assert!(close(inc, 45.0));
        assert!(close(azi.unwrap(), 225.0));

        assert!(segment_direction(0.0, 0.0, 0.0).is_none());
    }
}
