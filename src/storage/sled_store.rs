//! Sled-backed comparison storage
//!
//! Separate trees for surveys, sessions and adjustment histories. Keys are
//! the entity ids, values are JSON.

use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use super::persistence::{newest_first, ComparisonStore, PersistenceError};
use crate::adjustment::AdjustmentHistory;
use crate::types::{ComparisonSession, SessionSummary, Survey, SurveySummary};

const SURVEYS_TREE: &str = "surveys";
const SESSIONS_TREE: &str = "sessions";
const HISTORIES_TREE: &str = "histories";

#[derive(Clone)]
pub struct SledStore {
    db: Arc<sled::Db>,
    surveys: sled::Tree,
    sessions: sled::Tree,
    histories: sled::Tree,
}

impl SledStore {
    /// Open or create the store at the specified path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let path_ref = path.as_ref();
        let db = sled::open(path_ref)?;
        let store = Self {
            surveys: db.open_tree(SURVEYS_TREE)?,
            sessions: db.open_tree(SESSIONS_TREE)?,
            histories: db.open_tree(HISTORIES_TREE)?,
            db: Arc::new(db),
        };

        tracing::info!(
            path = %path_ref.display(),
            surveys = store.surveys.len(),
            sessions = store.sessions.len(),
            "Comparison storage opened"
        );

        Ok(store)
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<(), PersistenceError> {
        self.db.flush()?;
        Ok(())
    }

    fn put<T: Serialize>(tree: &sled::Tree, key: &str, value: &T) -> Result<(), PersistenceError> {
        let bytes = serde_json::to_vec(value)?;
        tree.insert(key.as_bytes(), bytes)?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(tree: &sled::Tree, key: &str) -> Result<Option<T>, PersistenceError> {
        match tree.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Decode every value in a tree, skipping entries that fail to parse.
    fn scan<T: DeserializeOwned>(tree: &sled::Tree) -> Result<Vec<T>, PersistenceError> {
        let mut out = Vec::new();
        for item in tree.iter() {
            let (key, value) = item?;
            match serde_json::from_slice::<T>(&value) {
                Ok(entity) => out.push(entity),
                Err(e) => {
                    warn!(key = %String::from_utf8_lossy(&key), error = %e, "Skipping undecodable entry");
                }
            }
        }
        Ok(out)
    }
}

impl ComparisonStore for SledStore {
    fn insert_survey(&self, survey: &Survey) -> Result<bool, PersistenceError> {
        let bytes = serde_json::to_vec(survey)?;
        let swapped = self
            .surveys
            .compare_and_swap(survey.id.as_bytes(), None as Option<&[u8]>, Some(bytes))?;
        Ok(swapped.is_ok())
    }

    fn get_survey(&self, id: &str) -> Result<Option<Survey>, PersistenceError> {
        Self::get(&self.surveys, id)
    }

    fn list_surveys(&self) -> Result<Vec<SurveySummary>, PersistenceError> {
        // sled iterates in key order, so the listing is already sorted by id
        let surveys: Vec<Survey> = Self::scan(&self.surveys)?;
        Ok(surveys.iter().map(SurveySummary::from).collect())
    }

    fn put_session(&self, session: &ComparisonSession) -> Result<(), PersistenceError> {
        Self::put(&self.sessions, &session.id, session)
    }

    fn get_session(&self, id: &str) -> Result<Option<ComparisonSession>, PersistenceError> {
        Self::get(&self.sessions, id)
    }

    fn list_sessions(&self, limit: usize) -> Result<Vec<SessionSummary>, PersistenceError> {
        let sessions: Vec<ComparisonSession> = Self::scan(&self.sessions)?;
        Ok(newest_first(
            sessions.iter().map(SessionSummary::from).collect(),
            limit,
        ))
    }

    fn put_history(&self, history: &AdjustmentHistory) -> Result<(), PersistenceError> {
        Self::put(&self.histories, history.session_id(), history)?;
        // History edits are user actions; make them durable immediately
        self.histories.flush()?;
        Ok(())
    }

    fn get_history(&self, session_id: &str) -> Result<Option<AdjustmentHistory>, PersistenceError> {
        Self::get(&self.histories, session_id)
    }

    fn backend_name(&self) -> &'static str {
        "Sled"
    }
}
