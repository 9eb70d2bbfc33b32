//! ComparisonService: the command surface shared by the HTTP API and the CLI
//!
//! Owns the store and the adjustment engine. Surveys are validated on
//! registration and again when a comparison is built from them, since the
//! stored copy may predate a tightening of the rules.

use std::sync::Arc;

use tracing::{info, warn};

use crate::adjustment::AdjustmentEngine;
use crate::comparison;
use crate::config::CompareConfig;
use crate::error::CompareError;
use crate::storage::ComparisonStore;
use crate::types::{
    AdjustmentRecord, AdjustmentState, ComparisonSession, HistoryOverview, HistoryPosition,
    OffsetRequest, SessionSummary, Survey, SurveyRole, SurveySummary,
};

pub struct ComparisonService {
    store: Arc<dyn ComparisonStore>,
    engine: AdjustmentEngine,
    default_resolution: u32,
}

impl ComparisonService {
    pub fn new(store: Arc<dyn ComparisonStore>, config: &CompareConfig) -> Self {
        Self {
            engine: AdjustmentEngine::new(Arc::clone(&store), &config.adjustment),
            store,
            default_resolution: config.comparison.default_resolution,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    pub fn default_resolution(&self) -> u32 {
        self.default_resolution
    }

    // ========================================================================
    // Surveys
    // ========================================================================

    /// Validate and store a survey. A blank id is replaced with a fresh one.
    pub fn register_survey(&self, mut survey: Survey) -> Result<SurveySummary, CompareError> {
        if survey.id.trim().is_empty() {
            survey.id = uuid::Uuid::new_v4().to_string();
        }
        survey.validate()?;
        if !self.store.insert_survey(&survey)? {
            return Err(CompareError::SurveyExists(survey.id));
        }

        let summary = SurveySummary::from(&survey);
        info!(
            survey = %summary.id,
            role = %summary.role,
            stations = summary.station_count,
            "Survey registered"
        );
        Ok(summary)
    }

    pub fn get_survey(&self, id: &str) -> Result<Survey, CompareError> {
        self.store
            .get_survey(id)?
            .ok_or_else(|| CompareError::not_found("survey", id))
    }

    pub fn list_surveys(&self) -> Result<Vec<SurveySummary>, CompareError> {
        Ok(self.store.list_surveys()?)
    }

    // ========================================================================
    // Comparisons
    // ========================================================================

    /// Compare two stored surveys and persist the resulting session.
    ///
    /// `resolution` falls back to `[comparison] default_resolution`.
    pub fn create_comparison(
        &self,
        primary_id: &str,
        reference_id: &str,
        resolution: Option<u32>,
    ) -> Result<ComparisonSession, CompareError> {
        let primary = self.get_survey(primary_id)?;
        let reference = self.get_survey(reference_id)?;

        if primary.role != SurveyRole::Primary || reference.role != SurveyRole::Reference {
            warn!(
                primary = %primary.id,
                primary_role = %primary.role,
                reference = %reference.id,
                reference_role = %reference.role,
                "Survey roles do not match their comparison slots"
            );
        }

        let resolution = resolution.unwrap_or(self.default_resolution);
        let session = comparison::compare(&primary, &reference, resolution)?;
        self.store.put_session(&session)?;

        info!(
            session = %session.id,
            primary = %session.primary_survey_id,
            reference = %session.reference_survey_id,
            resolution,
            points = session.len(),
            max_delta_total = session.statistics.delta_total.max,
            "Comparison created"
        );
        Ok(session)
    }

    pub fn get_session(&self, id: &str) -> Result<ComparisonSession, CompareError> {
        self.store
            .get_session(id)?
            .ok_or_else(|| CompareError::not_found("session", id))
    }

    pub fn list_sessions(&self, limit: usize) -> Result<Vec<SessionSummary>, CompareError> {
        Ok(self.store.list_sessions(limit)?)
    }

    // ========================================================================
    // Adjustments
    // ========================================================================

    pub fn apply_offset(
        &self,
        session_id: &str,
        request: &OffsetRequest,
        expected_cursor: Option<u64>,
    ) -> Result<AdjustmentRecord, CompareError> {
        self.engine.apply(session_id, request, expected_cursor)
    }

    pub fn undo(
        &self,
        session_id: &str,
        expected_cursor: Option<u64>,
    ) -> Result<HistoryPosition, CompareError> {
        self.engine.undo(session_id, expected_cursor)
    }

    pub fn redo(
        &self,
        session_id: &str,
        expected_cursor: Option<u64>,
    ) -> Result<AdjustmentRecord, CompareError> {
        self.engine.redo(session_id, expected_cursor)
    }

    pub fn reset(
        &self,
        session_id: &str,
        expected_cursor: Option<u64>,
    ) -> Result<HistoryPosition, CompareError> {
        self.engine.reset(session_id, expected_cursor)
    }

    pub fn recalculate(
        &self,
        session_id: &str,
        expected_cursor: Option<u64>,
    ) -> Result<AdjustmentRecord, CompareError> {
        self.engine.recalculate_angles(session_id, expected_cursor)
    }

    pub fn current_adjustment(&self, session_id: &str) -> Result<AdjustmentState, CompareError> {
        self.engine.current(session_id)
    }

    pub fn adjustment_history(&self, session_id: &str) -> Result<HistoryOverview, CompareError> {
        self.engine.history(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;
    use crate::types::Station;

    fn survey(id: &str, role: SurveyRole, md_start: f64, east: f64) -> Survey {
        let stations = (0..=10u32)
            .map(|i| {
                let md = md_start + f64::from(i) * 50.0;
                Station { md, inc: 0.0, azi: 0.0, north: 0.0, east, tvd: md }
            })
            .collect();
        Survey::new(id, role, stations)
    }

    fn service() -> ComparisonService {
        ComparisonService::new(Arc::new(InMemoryStore::new()), &CompareConfig::default())
    }

    #[test]
    fn test_register_rejects_invalid_survey() {
        let svc = service();
        let mut bad = survey("BAD", SurveyRole::Primary, 0.0, 0.0);
        bad.stations.swap(1, 2);
        assert!(matches!(
            svc.register_survey(bad),
            Err(CompareError::InvalidSurvey { .. })
        ));
        assert!(svc.list_surveys().unwrap().is_empty());
    }

    #[test]
    fn test_register_assigns_missing_id() {
        let svc = service();
        let summary = svc.register_survey(survey("", SurveyRole::Primary, 0.0, 0.0)).unwrap();
        assert!(!summary.id.is_empty());
        assert_eq!(svc.get_survey(&summary.id).unwrap().stations.len(), 11);
    }

    #[test]
    fn test_register_keeps_first_survey_for_an_id() {
        let svc = service();
        svc.register_survey(survey("P", SurveyRole::Primary, 0.0, 1.0)).unwrap();
        svc.register_survey(survey("R", SurveyRole::Reference, 0.0, 0.0)).unwrap();
        let session = svc.create_comparison("P", "R", None).unwrap();

        assert_eq!(
            svc.register_survey(survey("P", SurveyRole::Primary, 0.0, 7.0)).unwrap_err(),
            CompareError::SurveyExists("P".into())
        );
        assert!(svc.get_survey("P").unwrap().stations.iter().all(|s| s.east == 1.0));
        assert_eq!(svc.get_session(&session.id).unwrap().primary.east, session.primary.east);
    }

    #[test]
    fn test_create_comparison_uses_default_resolution() {
        let svc = service();
        svc.register_survey(survey("P", SurveyRole::Primary, 0.0, 2.0)).unwrap();
        svc.register_survey(survey("R", SurveyRole::Reference, 100.0, 0.0)).unwrap();

        let session = svc.create_comparison("P", "R", None).unwrap();
        assert_eq!(session.resolution, 5);
        // Overlap is [100, 500]
        assert_eq!(session.len(), 81);
        assert!(session.deltas.delta_x.iter().all(|d| (d - 2.0).abs() < 1e-12));

        let listed = svc.list_sessions(10).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, session.id);
        assert_eq!(svc.get_session(&session.id).unwrap().md_grid, session.md_grid);
    }

    #[test]
    fn test_create_comparison_errors() {
        let svc = service();
        svc.register_survey(survey("P", SurveyRole::Primary, 0.0, 0.0)).unwrap();
        svc.register_survey(survey("FAR", SurveyRole::Reference, 5000.0, 0.0)).unwrap();

        assert!(matches!(
            svc.create_comparison("P", "nope", None),
            Err(CompareError::NotFound { kind: "survey", .. })
        ));
        assert!(matches!(
            svc.create_comparison("P", "FAR", None),
            Err(CompareError::NoOverlap { .. })
        ));
        assert!(matches!(
            svc.create_comparison("P", "P", Some(0)),
            Err(CompareError::InvalidResolution { .. })
        ));
        assert!(svc.list_sessions(10).unwrap().is_empty());
    }

    #[test]
    fn test_adjustment_commands_round_trip() {
        let svc = service();
        svc.register_survey(survey("P", SurveyRole::Primary, 0.0, 0.0)).unwrap();
        svc.register_survey(survey("R", SurveyRole::Reference, 0.0, 0.0)).unwrap();
        let session = svc.create_comparison("P", "R", Some(10)).unwrap();

        let request = OffsetRequest {
            md_start: 100.0,
            md_end: 200.0,
            x_offset: 0.0,
            y_offset: -1.5,
            z_offset: 0.0,
        };
        let record = svc.apply_offset(&session.id, &request, Some(0)).unwrap();
        assert_eq!(record.points_affected, 11);

        let state = svc.current_adjustment(&session.id).unwrap();
        assert_eq!(state.north[15], -1.5);
        assert_eq!(state.north[0], 0.0);

        assert_eq!(svc.undo(&session.id, Some(1)).unwrap(), HistoryPosition::Baseline);
        assert!(svc.redo(&session.id, None).is_ok());
        assert!(svc.recalculate(&session.id, None).unwrap().has_recalculated_angles());
        assert_eq!(svc.adjustment_history(&session.id).unwrap().records.len(), 1);
        svc.reset(&session.id, None).unwrap();
        assert!(!svc.current_adjustment(&session.id).unwrap().has_adjustment);
    }
}
