//! AdjustmentEngine: serialized history commands per comparison session
//!
//! Each command loads the session and its history, runs one state-machine
//! step, and writes the history back, all under that session's mutex.
//! Commands on different sessions never contend. A caller may also pass the
//! cursor it last observed; a mismatch fails with `ConcurrentModification`
//! instead of silently editing a state the caller has not seen.

use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use tracing::{debug, info};

use super::history::AdjustmentHistory;
use crate::config::AdjustmentConfig;
use crate::error::CompareError;
use crate::storage::ComparisonStore;
use crate::types::{
    AdjustmentRecord, AdjustmentState, ComparisonSession, HistoryOverview, HistoryPosition,
    OffsetRequest,
};

pub struct AdjustmentEngine {
    store: Arc<dyn ComparisonStore>,
    locks: DashMap<String, Arc<Mutex<()>>>,
    max_abs_offset_m: Option<f64>,
}

impl AdjustmentEngine {
    pub fn new(store: Arc<dyn ComparisonStore>, config: &AdjustmentConfig) -> Self {
        Self {
            store,
            locks: DashMap::new(),
            max_abs_offset_m: config.max_abs_offset_m,
        }
    }

    pub fn apply(
        &self,
        session_id: &str,
        request: &OffsetRequest,
        expected_cursor: Option<u64>,
    ) -> Result<AdjustmentRecord, CompareError> {
        let limit = self.max_abs_offset_m;
        let record = self.mutate(session_id, expected_cursor, |history, session| {
            history.apply(session, request, limit).cloned()
        })?;

        info!(
            session = %session_id,
            sequence = record.sequence,
            md_start = record.md_start,
            md_end = record.md_end,
            x = record.x_offset,
            y = record.y_offset,
            z = record.z_offset,
            points = record.points_affected,
            "Offset applied"
        );
        Ok(record)
    }

    pub fn undo(
        &self,
        session_id: &str,
        expected_cursor: Option<u64>,
    ) -> Result<HistoryPosition, CompareError> {
        let position = self.mutate(session_id, expected_cursor, |history, _| history.undo())?;
        info!(session = %session_id, cursor = position.sequence(), "Adjustment undone");
        Ok(position)
    }

    pub fn redo(
        &self,
        session_id: &str,
        expected_cursor: Option<u64>,
    ) -> Result<AdjustmentRecord, CompareError> {
        let record = self.mutate(session_id, expected_cursor, |history, _| {
            history.redo().cloned()
        })?;
        info!(session = %session_id, cursor = record.sequence, "Adjustment redone");
        Ok(record)
    }

    pub fn reset(
        &self,
        session_id: &str,
        expected_cursor: Option<u64>,
    ) -> Result<HistoryPosition, CompareError> {
        let position = self.mutate(session_id, expected_cursor, |history, _| {
            let discarded = history.len();
            let position = history.reset();
            debug!(discarded, "Adjustment log cleared");
            Ok(position)
        })?;
        info!(session = %session_id, "Adjustments reset to baseline");
        Ok(position)
    }

    pub fn recalculate_angles(
        &self,
        session_id: &str,
        expected_cursor: Option<u64>,
    ) -> Result<AdjustmentRecord, CompareError> {
        let record = self.mutate(session_id, expected_cursor, |history, session| {
            history.recalculate_angles(session).cloned()
        })?;
        info!(session = %session_id, sequence = record.sequence, "Angles recalculated");
        Ok(record)
    }

    /// Effective path of the session (baseline when nothing is applied).
    pub fn current(&self, session_id: &str) -> Result<AdjustmentState, CompareError> {
        let session = self.load_session(session_id)?;
        let history = self.load_history(&session)?;
        Ok(history.state(&session))
    }

    pub fn history(&self, session_id: &str) -> Result<HistoryOverview, CompareError> {
        let session = self.load_session(session_id)?;
        let history = self.load_history(&session)?;
        Ok(history.overview())
    }

    /// Run one command against a session's history under its lock.
    ///
    /// The history is only written back when the command succeeds.
    fn mutate<T>(
        &self,
        session_id: &str,
        expected_cursor: Option<u64>,
        command: impl FnOnce(&mut AdjustmentHistory, &ComparisonSession) -> Result<T, CompareError>,
    ) -> Result<T, CompareError> {
        // Sessions never change after creation; only ids that exist get a lock.
        let session = self.load_session(session_id)?;

        let lock = self.session_lock(session_id);
        let _guard = lock
            .lock()
            .map_err(|e| CompareError::Storage(format!("session lock poisoned: {e}")))?;

        let mut history = self.load_history(&session)?;

        if let Some(expected) = expected_cursor {
            if expected != history.cursor() {
                return Err(CompareError::ConcurrentModification {
                    session_id: session_id.to_string(),
                    expected,
                    actual: history.cursor(),
                });
            }
        }

        let output = command(&mut history, &session)?;
        self.store.put_history(&history)?;
        Ok(output)
    }

    fn session_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(session_id.to_string())
            .or_default()
            .value()
            .clone()
    }

    fn load_session(&self, session_id: &str) -> Result<ComparisonSession, CompareError> {
        self.store
            .get_session(session_id)?
            .ok_or_else(|| CompareError::not_found("session", session_id))
    }

    fn load_history(&self, session: &ComparisonSession) -> Result<AdjustmentHistory, CompareError> {
        match self.store.get_history(&session.id)? {
            Some(history) => {
                history.check_consistency(session)?;
                Ok(history)
            }
            None => Ok(AdjustmentHistory::new(session.id.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparison;
    use crate::storage::InMemoryStore;
    use crate::types::{Station, Survey, SurveyRole};

    fn vertical(id: &str, role: SurveyRole, east: f64) -> Survey {
        let stations = (0..=20u32)
            .map(|i| {
                let md = 1000.0 + f64::from(i) * 25.0;
                Station { md, inc: 0.0, azi: 0.0, north: 0.0, east, tvd: md - 50.0 }
            })
            .collect();
        Survey::new(id, role, stations)
    }

    fn setup() -> (AdjustmentEngine, String) {
        let store: Arc<dyn ComparisonStore> = Arc::new(InMemoryStore::new());
        let session = comparison::compare(
            &vertical("P", SurveyRole::Primary, 0.5),
            &vertical("R", SurveyRole::Reference, 0.0),
            5,
        )
        .unwrap();
        store.put_session(&session).unwrap();
        (AdjustmentEngine::new(store, &AdjustmentConfig::default()), session.id)
    }

    fn shift(x: f64) -> OffsetRequest {
        OffsetRequest { md_start: 1100.0, md_end: 1200.0, x_offset: x, y_offset: 0.0, z_offset: 0.0 }
    }

    #[test]
    fn test_unknown_session_is_not_found() {
        let (engine, _) = setup();
        assert!(matches!(
            engine.apply("missing", &shift(1.0), None),
            Err(CompareError::NotFound { kind: "session", .. })
        ));
        assert!(matches!(engine.current("missing"), Err(CompareError::NotFound { .. })));
    }

    #[test]
    fn test_unknown_sessions_leave_no_locks() {
        let (engine, id) = setup();
        for i in 0..100u32 {
            let bogus = format!("bogus-{i}");
            assert!(matches!(engine.undo(&bogus, None), Err(CompareError::NotFound { .. })));
            assert!(engine.reset(&bogus, Some(0)).is_err());
        }
        assert_eq!(engine.locks.len(), 0);

        engine.apply(&id, &shift(1.0), None).unwrap();
        assert_eq!(engine.locks.len(), 1);
    }

    #[test]
    fn test_commands_persist_between_calls() {
        let (engine, id) = setup();
        let record = engine.apply(&id, &shift(1.0), None).unwrap();
        assert_eq!(record.points_affected, 21);

        let state = engine.current(&id).unwrap();
        assert_eq!(state.sequence, 1);
        assert!(state.has_adjustment);

        engine.undo(&id, None).unwrap();
        assert_eq!(engine.current(&id).unwrap().sequence, 0);
        assert_eq!(engine.redo(&id, None).unwrap().sequence, 1);
    }

    #[test]
    fn test_expected_cursor_mismatch() {
        let (engine, id) = setup();
        engine.apply(&id, &shift(1.0), Some(0)).unwrap();

        let err = engine.apply(&id, &shift(2.0), Some(0)).unwrap_err();
        assert_eq!(
            err,
            CompareError::ConcurrentModification { session_id: id.clone(), expected: 0, actual: 1 }
        );
        assert!(err.is_retryable());
        // The rejected command left no trace
        assert_eq!(engine.history(&id).unwrap().records.len(), 1);

        assert!(engine.apply(&id, &shift(2.0), Some(1)).is_ok());
    }

    #[test]
    fn test_failed_command_does_not_persist() {
        let (engine, id) = setup();
        engine.apply(&id, &shift(1.0), None).unwrap();
        assert!(engine.redo(&id, None).is_err());
        assert_eq!(engine.current(&id).unwrap().sequence, 1);
    }

    #[test]
    fn test_recalculate_and_reset() {
        let (engine, id) = setup();
        assert_eq!(engine.recalculate_angles(&id, None).unwrap_err(), CompareError::NoAdjustment);

        engine.apply(&id, &shift(1.0), None).unwrap();
        let record = engine.recalculate_angles(&id, None).unwrap();
        assert!(record.has_recalculated_angles());
        assert!(engine.current(&id).unwrap().azi_recalculated.is_some());

        assert_eq!(engine.reset(&id, None).unwrap(), HistoryPosition::Baseline);
        let overview = engine.history(&id).unwrap();
        assert!(overview.records.is_empty());
        assert!(!overview.can_redo);
    }

    #[test]
    fn test_parallel_applies_on_one_session_stay_contiguous() {
        let (engine, id) = setup();
        let engine = Arc::new(engine);

        std::thread::scope(|scope| {
            for i in 0..8u32 {
                let engine = Arc::clone(&engine);
                let id = id.clone();
                scope.spawn(move || {
                    engine.apply(&id, &shift(f64::from(i)), None).unwrap();
                });
            }
        });

        let overview = engine.history(&id).unwrap();
        let sequences: Vec<u64> = overview.records.iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, (1..=8).collect::<Vec<u64>>());
        assert_eq!(overview.cursor, 8);
    }
}
