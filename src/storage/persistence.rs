//! ComparisonStore trait: pluggable storage backend
//!
//! The engine treats storage as a key-value map from id to entity:
//! - `InMemoryStore`: process-local maps for tests and ephemeral runs
//! - `SledStore`: persistent sled database (see `sled_store`)

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::adjustment::AdjustmentHistory;
use crate::types::{ComparisonSession, SessionSummary, Survey, SurveySummary};

/// Storage for surveys, comparison sessions and adjustment histories.
///
/// Implementations must be thread-safe (Send + Sync) for shared access
/// across async tasks. Per-session write ordering is the caller's job.
pub trait ComparisonStore: Send + Sync {
    /// Store a survey under its id unless the id is taken. Returns `false`
    /// and leaves the stored survey untouched when it already exists.
    fn insert_survey(&self, survey: &Survey) -> Result<bool, PersistenceError>;

    fn get_survey(&self, id: &str) -> Result<Option<Survey>, PersistenceError>;

    fn list_surveys(&self) -> Result<Vec<SurveySummary>, PersistenceError>;

    fn put_session(&self, session: &ComparisonSession) -> Result<(), PersistenceError>;

    fn get_session(&self, id: &str) -> Result<Option<ComparisonSession>, PersistenceError>;

    /// Session summaries, newest first.
    fn list_sessions(&self, limit: usize) -> Result<Vec<SessionSummary>, PersistenceError>;

    fn put_history(&self, history: &AdjustmentHistory) -> Result<(), PersistenceError>;

    fn get_history(&self, session_id: &str) -> Result<Option<AdjustmentHistory>, PersistenceError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// Persistence errors
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::Serialization(err.to_string())
    }
}

impl From<sled::Error> for PersistenceError {
    fn from(err: sled::Error) -> Self {
        PersistenceError::Storage(err.to_string())
    }
}

/// Sorts summaries newest first and truncates to `limit`.
pub(crate) fn newest_first(mut sessions: Vec<SessionSummary>, limit: usize) -> Vec<SessionSummary> {
    sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
    sessions.truncate(limit);
    sessions
}

/// In-memory persistence for testing and ephemeral deployments
///
/// Thread-safe via `RwLock`. Not durable; data is lost on restart.
#[derive(Default)]
pub struct InMemoryStore {
    surveys: RwLock<HashMap<String, Survey>>,
    sessions: RwLock<HashMap<String, ComparisonSession>>,
    histories: RwLock<HashMap<String, AdjustmentHistory>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> PersistenceError {
    PersistenceError::Storage(e.to_string())
}

impl ComparisonStore for InMemoryStore {
    fn insert_survey(&self, survey: &Survey) -> Result<bool, PersistenceError> {
        let mut surveys = self.surveys.write().map_err(poisoned)?;
        match surveys.entry(survey.id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(survey.clone());
                Ok(true)
            }
        }
    }

    fn get_survey(&self, id: &str) -> Result<Option<Survey>, PersistenceError> {
        Ok(self.surveys.read().map_err(poisoned)?.get(id).cloned())
    }

    fn list_surveys(&self) -> Result<Vec<SurveySummary>, PersistenceError> {
        let store = self.surveys.read().map_err(poisoned)?;
        let mut surveys: Vec<SurveySummary> = store.values().map(SurveySummary::from).collect();
        surveys.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(surveys)
    }

    fn put_session(&self, session: &ComparisonSession) -> Result<(), PersistenceError> {
        self.sessions
            .write()
            .map_err(poisoned)?
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    fn get_session(&self, id: &str) -> Result<Option<ComparisonSession>, PersistenceError> {
        Ok(self.sessions.read().map_err(poisoned)?.get(id).cloned())
    }

    fn list_sessions(&self, limit: usize) -> Result<Vec<SessionSummary>, PersistenceError> {
        let store = self.sessions.read().map_err(poisoned)?;
        let summaries = store.values().map(SessionSummary::from).collect();
        Ok(newest_first(summaries, limit))
    }

    fn put_history(&self, history: &AdjustmentHistory) -> Result<(), PersistenceError> {
        self.histories
            .write()
            .map_err(poisoned)?
            .insert(history.session_id().to_string(), history.clone());
        Ok(())
    }

    fn get_history(&self, session_id: &str) -> Result<Option<AdjustmentHistory>, PersistenceError> {
        Ok(self.histories.read().map_err(poisoned)?.get(session_id).cloned())
    }

    fn backend_name(&self) -> &'static str {
        "InMemory"
    }
}
