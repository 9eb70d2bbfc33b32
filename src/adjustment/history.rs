//! Adjustment history: an arena of immutable records plus a cursor
//!
//! Sequences are the arena index + 1, so undo/redo are cursor arithmetic and
//! a record's arrays are never mutated after creation. The only exception is
//! the recalculated-angle annex, which is derived from the record's own path
//! and therefore idempotent.
//!
//! Invariants:
//! - `records[i].sequence == i + 1`
//! - `cursor <= records.len()` (0 = session baseline)

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::comparison::angles::segment_direction;
use crate::error::CompareError;
use crate::types::{
    AdjustmentRecord, AdjustmentState, AdjustmentSummary, ComparisonSession, HistoryOverview,
    HistoryPosition, OffsetRequest,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentHistory {
    session_id: String,
    records: Vec<AdjustmentRecord>,
    cursor: u64,
}

/// Borrowed north/east/tvd arrays of a path.
struct PathRef<'a> {
    north: &'a [f64],
    east: &'a [f64],
    tvd: &'a [f64],
}

impl AdjustmentHistory {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            records: Vec::new(),
            cursor: 0,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn records(&self) -> &[AdjustmentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Highest sequence in the log (0 when empty).
    pub fn tip(&self) -> u64 {
        self.records.len() as u64
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.tip()
    }

    /// Record at the cursor, `None` at baseline.
    pub fn current(&self) -> Option<&AdjustmentRecord> {
        self.cursor
            .checked_sub(1)
            .and_then(|i| self.records.get(usize::try_from(i).ok()?))
    }

    fn current_mut(&mut self) -> Option<&mut AdjustmentRecord> {
        let idx = usize::try_from(self.cursor.checked_sub(1)?).ok()?;
        self.records.get_mut(idx)
    }

    fn position(&self) -> HistoryPosition {
        match self.current() {
            Some(record) => HistoryPosition::Adjusted {
                record: Box::new(record.clone()),
            },
            None => HistoryPosition::Baseline,
        }
    }

    fn effective_path<'a>(&'a self, session: &'a ComparisonSession) -> PathRef<'a> {
        match self.current() {
            Some(record) => PathRef {
                north: &record.north_adjusted,
                east: &record.east_adjusted,
                tvd: &record.tvd_adjusted,
            },
            None => PathRef {
                north: &session.primary.north,
                east: &session.primary.east,
                tvd: &session.primary.tvd,
            },
        }
    }

    /// Shift the effective path by the requested offsets inside the MD range.
    ///
    /// Any records after the cursor are discarded first: a new edit cannot
    /// coexist with an undone future.
    pub fn apply(
        &mut self,
        session: &ComparisonSession,
        request: &OffsetRequest,
        max_abs_offset_m: Option<f64>,
    ) -> Result<&AdjustmentRecord, CompareError> {
        validate_offsets(request, max_abs_offset_m)?;
        let in_range = range_mask(session, request.md_start, request.md_end)?;
        let points_affected = in_range.iter().filter(|&&inside| inside).count();

        let base = self.effective_path(session);
        let shift = |values: &[f64], offset: f64| -> Vec<f64> {
            values
                .iter()
                .zip(&in_range)
                .map(|(&v, &inside)| if inside { v + offset } else { v })
                .collect()
        };
        let north_adjusted = shift(base.north, request.y_offset);
        let east_adjusted = shift(base.east, request.x_offset);
        let tvd_adjusted = shift(base.tvd, request.z_offset);

        let discarded = self.tip() - self.cursor;
        self.records.truncate(usize::try_from(self.cursor).unwrap_or(usize::MAX));

        let sequence = self.tip() + 1;
        self.records.push(AdjustmentRecord {
            sequence,
            md_start: request.md_start,
            md_end: request.md_end,
            x_offset: request.x_offset,
            y_offset: request.y_offset,
            z_offset: request.z_offset,
            points_affected,
            north_adjusted,
            east_adjusted,
            tvd_adjusted,
            inc_recalculated: None,
            azi_recalculated: None,
            created_at: Utc::now(),
        });
        self.cursor = sequence;

        debug!(
            session = %self.session_id,
            sequence,
            points_affected,
            discarded,
            "Adjustment appended"
        );

        Ok(&self.records[self.records.len() - 1])
    }

    pub fn undo(&mut self) -> Result<HistoryPosition, CompareError> {
        if self.cursor == 0 {
            return Err(CompareError::NothingToUndo);
        }
        self.cursor -= 1;
        Ok(self.position())
    }

    pub fn redo(&mut self) -> Result<&AdjustmentRecord, CompareError> {
        if self.cursor >= self.tip() {
            return Err(CompareError::NothingToRedo);
        }
        self.cursor += 1;
        self.current().ok_or(CompareError::NothingToRedo)
    }

    /// Drop the whole log. Unlike repeated undo, nothing can be redone.
    pub fn reset(&mut self) -> HistoryPosition {
        self.records.clear();
        self.cursor = 0;
        HistoryPosition::Baseline
    }

    /// Derive inclination/azimuth from the current adjusted path and attach
    /// them to the current record.
    pub fn recalculate_angles(
        &mut self,
        session: &ComparisonSession,
    ) -> Result<&AdjustmentRecord, CompareError> {
        let first_inc = session.primary.inc.first().copied().unwrap_or(0.0);
        let first_azi = session.primary.azi.first().copied().unwrap_or(0.0);

        let record = self.current_mut().ok_or(CompareError::NoAdjustment)?;
        let (inc, azi) = derive_angles(
            &record.north_adjusted,
            &record.east_adjusted,
            &record.tvd_adjusted,
            first_inc,
            first_azi,
        );
        record.inc_recalculated = Some(inc);
        record.azi_recalculated = Some(azi);

        Ok(&*record)
    }

    /// Read model for the effective path.
    pub fn state(&self, session: &ComparisonSession) -> AdjustmentState {
        let path = self.effective_path(session);
        let current = self.current();
        AdjustmentState {
            session_id: session.id.clone(),
            sequence: self.cursor,
            has_adjustment: self.cursor != 0,
            md_grid: session.md_grid.clone(),
            north: path.north.to_vec(),
            east: path.east.to_vec(),
            tvd: path.tvd.to_vec(),
            inc_recalculated: current.and_then(|r| r.inc_recalculated.clone()),
            azi_recalculated: current.and_then(|r| r.azi_recalculated.clone()),
        }
    }

    pub fn overview(&self) -> HistoryOverview {
        HistoryOverview {
            session_id: self.session_id.clone(),
            cursor: self.cursor,
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
            records: self.records.iter().map(AdjustmentSummary::from).collect(),
        }
    }

    /// Verify a history loaded from storage still matches its session.
    pub fn check_consistency(&self, session: &ComparisonSession) -> Result<(), CompareError> {
        let corrupt = |reason: String| {
            CompareError::Storage(format!(
                "adjustment history for session {} is inconsistent: {reason}",
                session.id
            ))
        };

        if self.session_id != session.id {
            return Err(corrupt(format!("belongs to session {}", self.session_id)));
        }
        if self.cursor > self.tip() {
            return Err(corrupt(format!("cursor {} beyond tip {}", self.cursor, self.tip())));
        }
        let n = session.len();
        for (i, record) in self.records.iter().enumerate() {
            if record.sequence != i as u64 + 1 {
                return Err(corrupt(format!(
                    "sequence {} at position {}",
                    record.sequence,
                    i + 1
                )));
            }
            if record.north_adjusted.len() != n
                || record.east_adjusted.len() != n
                || record.tvd_adjusted.len() != n
            {
                return Err(corrupt(format!("record {} length mismatch", record.sequence)));
            }
        }
        Ok(())
    }
}

fn validate_offsets(
    request: &OffsetRequest,
    max_abs_offset_m: Option<f64>,
) -> Result<(), CompareError> {
    for (axis, value) in [
        ("x_offset", request.x_offset),
        ("y_offset", request.y_offset),
        ("z_offset", request.z_offset),
    ] {
        if !value.is_finite() {
            return Err(CompareError::InvalidOffset(format!("{axis} is not a finite number")));
        }
        if let Some(limit) = max_abs_offset_m.filter(|&limit| value.abs() > limit) {
            return Err(CompareError::InvalidOffset(format!(
                "{axis} {value} exceeds the {limit} m limit"
            )));
        }
    }
    Ok(())
}

/// Which grid points fall inside `[md_start, md_end]` (inclusive).
fn range_mask(
    session: &ComparisonSession,
    md_start: f64,
    md_end: f64,
) -> Result<Vec<bool>, CompareError> {
    if !md_start.is_finite() || !md_end.is_finite() {
        return Err(CompareError::invalid_range(md_start, md_end, "bounds must be finite"));
    }
    if md_start >= md_end {
        return Err(CompareError::invalid_range(
            md_start,
            md_end,
            "md_start must be below md_end",
        ));
    }
    let (grid_start, grid_end) = session.md_span().ok_or(CompareError::EmptyGrid)?;
    if md_end < grid_start || md_start > grid_end {
        return Err(CompareError::invalid_range(
            md_start,
            md_end,
            format!("outside the session grid [{grid_start}, {grid_end}]"),
        ));
    }

    let mask: Vec<bool> = session
        .md_grid
        .iter()
        .map(|&md| md_start <= md && md <= md_end)
        .collect();
    if !mask.contains(&true) {
        return Err(CompareError::invalid_range(
            md_start,
            md_end,
            "range contains no grid points",
        ));
    }
    Ok(mask)
}

/// Inverse of the positional solver over consecutive stations.
///
/// Point 0 keeps the supplied angles. A zero-length segment repeats the
/// previous angles; a vertical segment keeps the previous azimuth.
pub fn derive_angles(
    north: &[f64],
    east: &[f64],
    tvd: &[f64],
    first_inc: f64,
    first_azi: f64,
) -> (Vec<f64>, Vec<f64>) {
    let n = north.len().min(east.len()).min(tvd.len());
    let mut inc = Vec::with_capacity(n);
    let mut azi = Vec::with_capacity(n);
    if n == 0 {
        return (inc, azi);
    }

    inc.push(first_inc);
    azi.push(first_azi);

    for i in 1..n {
        let prev_inc = inc[i - 1];
        let prev_azi = azi[i - 1];
        match segment_direction(north[i] - north[i - 1], east[i] - east[i - 1], tvd[i] - tvd[i - 1]) {
            Some((segment_inc, segment_azi)) => {
                inc.push(segment_inc);
                azi.push(segment_azi.unwrap_or(prev_azi));
            }
            None => {
                inc.push(prev_inc);
                azi.push(prev_azi);
            }
        }
    }

    (inc, azi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparison::deltas::statistics;
    use crate::types::{DeltaSeries, ResampledPath};

    const LIMIT: Option<f64> = Some(500.0);

    /// Straight hole heading east at 45° inclination, one point per 5 m.
    fn make_session(n: usize) -> ComparisonSession {
        let md_grid: Vec<f64> = (0..n).map(|i| 1000.0 + i as f64 * 5.0).collect();
        let step = 5.0 / 2.0_f64.sqrt();
        let primary = ResampledPath {
            inc: vec![45.0; n],
            azi: vec![90.0; n],
            north: vec![0.0; n],
            east: (0..n).map(|i| i as f64 * step).collect(),
            tvd: (0..n).map(|i| 700.0 + i as f64 * step).collect(),
        };
        let zeros = vec![0.0; n];
        let deltas = DeltaSeries {
            delta_x: zeros.clone(),
            delta_y: zeros.clone(),
            delta_z: zeros.clone(),
            delta_horizontal: zeros.clone(),
            delta_total: zeros.clone(),
            delta_inc: zeros.clone(),
            delta_azi: zeros,
        };
        let stats = statistics(&md_grid, &deltas).unwrap();
        ComparisonSession {
            id: "S-1".into(),
            primary_survey_id: "P".into(),
            reference_survey_id: "R".into(),
            resolution: 5,
            created_at: Utc::now(),
            md_grid,
            primary: primary.clone(),
            reference: primary,
            deltas,
            statistics: stats,
        }
    }

    fn offset(md_start: f64, md_end: f64, x: f64) -> OffsetRequest {
        OffsetRequest { md_start, md_end, x_offset: x, y_offset: 0.0, z_offset: 0.0 }
    }

    #[test]
    fn test_apply_shifts_only_inside_range() {
        let session = make_session(101);
        let mut history = AdjustmentHistory::new("S-1");

        let record = history.apply(&session, &offset(1100.0, 1200.0, 1.0), LIMIT).unwrap();
        assert_eq!(record.sequence, 1);
        assert_eq!(record.points_affected, 21);

        for (i, md) in session.md_grid.iter().enumerate() {
            let diff = record.east_adjusted[i] - session.primary.east[i];
            if (1100.0..=1200.0).contains(md) {
                assert!((diff - 1.0).abs() < 1e-12, "md {md}");
            } else {
                assert_eq!(diff, 0.0, "md {md}");
            }
        }
        assert_eq!(record.north_adjusted, session.primary.north);
        assert_eq!(record.tvd_adjusted, session.primary.tvd);
        assert_eq!(history.cursor(), 1);
    }

    #[test]
    fn test_apply_stacks_on_current_path() {
        let session = make_session(11);
        let mut history = AdjustmentHistory::new("S-1");
        history.apply(&session, &offset(1000.0, 1050.0, 1.0), LIMIT).unwrap();
        let second = history.apply(&session, &offset(1020.0, 1030.0, 2.0), LIMIT).unwrap();

        // md 1025 sits in both ranges
        assert!((second.east_adjusted[5] - session.primary.east[5] - 3.0).abs() < 1e-12);
        assert!((second.east_adjusted[0] - session.primary.east[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_ranges() {
        let session = make_session(11);
        let mut history = AdjustmentHistory::new("S-1");

        for (start, end) in [(1030.0, 1020.0), (1020.0, 1020.0), (2000.0, 2100.0), (0.0, 999.0), (1001.0, 1004.0)] {
            assert!(
                matches!(
                    history.apply(&session, &offset(start, end, 1.0), LIMIT),
                    Err(CompareError::InvalidRange { .. })
                ),
                "range [{start}, {end}]"
            );
        }
        assert!(matches!(
            history.apply(&session, &offset(f64::NAN, 1020.0, 1.0), LIMIT),
            Err(CompareError::InvalidRange { .. })
        ));
        assert!(history.is_empty());
    }

    #[test]
    fn test_range_partially_outside_grid_is_accepted() {
        let session = make_session(11);
        let mut history = AdjustmentHistory::new("S-1");
        let record = history.apply(&session, &offset(900.0, 1010.0, 1.0), LIMIT).unwrap();
        assert_eq!(record.points_affected, 3);
    }

    #[test]
    fn test_offset_bounds() {
        let session = make_session(11);
        let mut history = AdjustmentHistory::new("S-1");
        assert!(matches!(
            history.apply(&session, &offset(1000.0, 1050.0, 501.0), LIMIT),
            Err(CompareError::InvalidOffset(_))
        ));
        assert!(matches!(
            history.apply(&session, &offset(1000.0, 1050.0, f64::INFINITY), LIMIT),
            Err(CompareError::InvalidOffset(_))
        ));
        assert!(history.apply(&session, &offset(1000.0, 1050.0, -500.0), LIMIT).is_ok());

        // Unbounded: any finite offset goes through
        assert!(history.apply(&session, &offset(1000.0, 1050.0, 1e6), None).is_ok());
        assert!(matches!(
            history.apply(&session, &offset(1000.0, 1050.0, f64::NAN), None),
            Err(CompareError::InvalidOffset(_))
        ));
    }

    #[test]
    fn test_undo_redo_cursor() {
        let session = make_session(11);
        let mut history = AdjustmentHistory::new("S-1");

        assert_eq!(history.undo(), Err(CompareError::NothingToUndo));
        assert!(matches!(history.redo(), Err(CompareError::NothingToRedo)));

        history.apply(&session, &offset(1000.0, 1050.0, 1.0), LIMIT).unwrap();
        history.apply(&session, &offset(1000.0, 1050.0, 2.0), LIMIT).unwrap();

        assert_eq!(history.undo().unwrap().sequence(), 1);
        assert_eq!(history.undo().unwrap(), HistoryPosition::Baseline);
        assert_eq!(history.cursor(), 0);
        assert_eq!(history.len(), 2);

        assert_eq!(history.redo().unwrap().sequence, 1);
        assert_eq!(history.redo().unwrap().sequence, 2);
        assert!(matches!(history.redo(), Err(CompareError::NothingToRedo)));
    }

    #[test]
    fn test_apply_after_undo_discards_future() {
        let session = make_session(11);
        let mut history = AdjustmentHistory::new("S-1");
        history.apply(&session, &offset(1000.0, 1050.0, 1.0), LIMIT).unwrap();
        history.apply(&session, &offset(1000.0, 1050.0, 2.0), LIMIT).unwrap();
        history.undo().unwrap();
        let record = history.apply(&session, &offset(1000.0, 1050.0, 5.0), LIMIT).unwrap();

        assert_eq!(record.sequence, 2);
        assert_eq!(record.x_offset, 5.0);
        assert_eq!(history.len(), 2);
        assert_eq!(history.cursor(), 2);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_reset_is_not_recoverable() {
        let session = make_session(11);
        let mut history = AdjustmentHistory::new("S-1");
        for x in [1.0, 2.0, 3.0] {
            history.apply(&session, &offset(1000.0, 1050.0, x), LIMIT).unwrap();
        }
        assert_eq!(history.reset(), HistoryPosition::Baseline);
        assert!(history.is_empty());
        assert!(!history.state(&session).has_adjustment);
        assert!(matches!(history.redo(), Err(CompareError::NothingToRedo)));
    }

    #[test]
    fn test_recalculate_requires_adjustment() {
        let session = make_session(11);
        let mut history = AdjustmentHistory::new("S-1");
        assert!(matches!(
            history.recalculate_angles(&session),
            Err(CompareError::NoAdjustment)
        ));
    }

    #[test]
    fn test_recalculate_unshifted_path_matches_original_angles() {
        let session = make_session(11);
        let mut history = AdjustmentHistory::new("S-1");
        // Shift the whole grid: segment vectors are unchanged
        history.apply(&session, &offset(1000.0, 1050.0, 3.0), LIMIT).unwrap();
        let record = history.recalculate_angles(&session).unwrap();

        let inc = record.inc_recalculated.as_ref().unwrap();
        let azi = record.azi_recalculated.as_ref().unwrap();
        for i in 0..11 {
            assert!((inc[i] - 45.0).abs() < 1e-9, "inc[{i}] = {}", inc[i]);
            assert!((azi[i] - 90.0).abs() < 1e-9, "azi[{i}] = {}", azi[i]);
        }
    }

    #[test]
    fn test_recalculate_is_idempotent_and_cleared_by_apply() {
        let session = make_session(21);
        let mut history = AdjustmentHistory::new("S-1");
        history.apply(&session, &offset(1030.0, 1060.0, 2.0), LIMIT).unwrap();

        let first = history.recalculate_angles(&session).unwrap().clone();
        let second = history.recalculate_angles(&session).unwrap().clone();
        assert_eq!(first.inc_recalculated, second.inc_recalculated);
        assert_eq!(first.azi_recalculated, second.azi_recalculated);

        // The step at md 1030 bends the path further east
        let azi = first.azi_recalculated.unwrap();
        assert!((azi[6] - 90.0).abs() < 1e-9);
        let inc = first.inc_recalculated.unwrap();
        assert!(inc[6] > 45.0);

        let next = history.apply(&session, &offset(1000.0, 1010.0, 1.0), LIMIT).unwrap();
        assert!(next.inc_recalculated.is_none());
        assert!(history.state(&session).inc_recalculated.is_none());
    }

    #[test]
    fn test_state_projection() {
        let session = make_session(11);
        let mut history = AdjustmentHistory::new("S-1");

        let baseline = history.state(&session);
        assert_eq!(baseline.sequence, 0);
        assert!(!baseline.has_adjustment);
        assert_eq!(baseline.east, session.primary.east);

        history.apply(&session, &offset(1000.0, 1050.0, 1.0), LIMIT).unwrap();
        let adjusted = history.state(&session);
        assert_eq!(adjusted.sequence, 1);
        assert!(adjusted.has_adjustment);
        assert_eq!(adjusted.east, history.current().unwrap().east_adjusted);
    }

    #[test]
    fn test_consistency_check() {
        let session = make_session(11);
        let mut history = AdjustmentHistory::new("S-1");
        history.apply(&session, &offset(1000.0, 1050.0, 1.0), LIMIT).unwrap();
        assert!(history.check_consistency(&session).is_ok());

        let other = make_session(12);
        assert!(matches!(
            history.check_consistency(&other),
            Err(CompareError::Storage(_))
        ));

        let mut foreign = history.clone();
        foreign.session_id = "S-2".into();
        let msg = foreign.check_consistency(&session).unwrap_err().to_string();
        assert!(msg.contains("for session S-1"), "{msg}");
        assert!(msg.contains("belongs to session S-2"), "{msg}");
    }

    #[test]
    fn test_derive_angles_handles_degenerate_segments() {
        let north = [0.0, 0.0, 0.0, 0.0];
        let east = [0.0, 0.0, 0.0, 5.0];
        let tvd = [0.0, 10.0, 10.0, 10.0];
        let (inc, azi) = derive_angles(&north, &east, &tvd, 3.0, 120.0);
        // vertical: inc 0, azimuth carried
        assert!(inc[1].abs() < 1e-12);
        assert_eq!(azi[1], 120.0);
        // zero length: everything carried
        assert_eq!(inc[2], inc[1]);
        assert_eq!(azi[2], 120.0);
        // horizontal east
        assert!((inc[3] - 90.0).abs() < 1e-12);
        assert!((azi[3] - 90.0).abs() < 1e-12);
        assert_eq!((inc[0], azi[0]), (3.0, 120.0));
    }
}
