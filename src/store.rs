//! Profile row persistence.
//!
//! One pretty-printed JSON row per specialty, keyed by a stable identity
//! hash, plus an append-only JSONL history log of terminal transitions.
//! Writes are idempotent upserts: at most one canonical row per specialty
//! even under concurrent submissions, with no cross-request locking.
use crate::error::GenerationError;
use crate::merge::slugify;
use crate::schema::{
    BusinessProfileType, CanonicalProfile, EnabledTabs, StageResults, StrategyMode,
};
use crate::state::GenerationState;
use serde::{Deserialize, Serialize};
use sha2::Digest;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Stable identity hash for a specialty row: sha256 over the normalized slug
/// and profile type.
pub fn identity_hash(specialty_name: &str, profile_type: BusinessProfileType) -> String {
    let mut hasher = sha2::Sha256::new();
    hasher.update(slugify(specialty_name).as_bytes());
    hasher.update(b"|");
    hasher.update(profile_type.as_str().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Content lists duplicated out of the profile for fast filtering.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct RowSummary {
    #[serde(default)]
    pub pain_points: Vec<String>,
    #[serde(default)]
    pub buying_triggers: Vec<String>,
    #[serde(default)]
    pub urgency_drivers: Vec<String>,
    #[serde(default)]
    pub objection_handlers: Vec<String>,
}

impl RowSummary {
    pub fn from_profile(profile: &CanonicalProfile) -> Self {
        RowSummary {
            pain_points: profile.facts.pain_points.clone(),
            buying_triggers: profile.facts.buying_triggers.clone(),
            urgency_drivers: profile.facts.urgency_drivers.clone(),
            objection_handlers: profile.facts.objection_handlers.clone(),
        }
    }
}

/// The persisted row for one specialty.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PersistedRow {
    pub identity_hash: String,
    pub specialty_name: String,
    pub business_profile_type: BusinessProfileType,
    pub generation_status: GenerationState,
    pub generation_started_at_epoch_ms: u128,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_completed_at_epoch_ms: Option<u128>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_data: Option<CanonicalProfile>,
    #[serde(default)]
    pub summary: RowSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled_tabs: Option<EnabledTabs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// History entry appended after each terminal transition, carrying per-stage
/// attempt counts for observability.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HistoryEntry {
    pub identity_hash: String,
    pub status: GenerationState,
    pub mode: StrategyMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_attempts: Option<StageResults>,
    pub finished_at_epoch_ms: u128,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// File-backed store rooted at a directory.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    root: PathBuf,
}

impl ProfileStore {
    pub fn new(root: PathBuf) -> Self {
        ProfileStore { root }
    }

    /// Default store root under the platform data dir.
    pub fn default_root() -> Option<PathBuf> {
        dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .map(|dir| dir.join("profilegen"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn row_path(&self, identity_hash: &str) -> PathBuf {
        self.root.join("profiles").join(format!("{identity_hash}.json"))
    }

    fn history_path(&self) -> PathBuf {
        self.root.join("history.jsonl")
    }

    /// Load a row if present.
    pub fn load(&self, identity_hash: &str) -> Result<Option<PersistedRow>, GenerationError> {
        let path = self.row_path(identity_hash);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)
            .map_err(|err| GenerationError::Persistence(format!("read {}: {err}", path.display())))?;
        let row = serde_json::from_str(&text)
            .map_err(|err| GenerationError::Persistence(format!("parse {}: {err}", path.display())))?;
        Ok(Some(row))
    }

    /// Write a row, creating the store layout on first use.
    pub fn upsert(&self, row: &PersistedRow) -> Result<(), GenerationError> {
        let path = self.row_path(&row.identity_hash);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                GenerationError::Persistence(format!("create {}: {err}", parent.display()))
            })?;
        }
        let text = serde_json::to_string_pretty(row)
            .map_err(|err| GenerationError::Persistence(format!("serialize row: {err}")))?;
        fs::write(&path, text.as_bytes()).map_err(|err| {
            GenerationError::Persistence(format!("write {}: {err}", path.display()))
        })?;
        Ok(())
    }

    /// Append a terminal-transition record as JSONL.
    pub fn append_history(&self, entry: &HistoryEntry) -> Result<(), GenerationError> {
        let path = self.history_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                GenerationError::Persistence(format!("create {}: {err}", parent.display()))
            })?;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| {
                GenerationError::Persistence(format!("open {}: {err}", path.display()))
            })?;
        let line = serde_json::to_string(entry)
            .map_err(|err| GenerationError::Persistence(format!("serialize history: {err}")))?;
        file.write_all(line.as_bytes())
            .and_then(|_| file.write_all(b"\n"))
            .map_err(|err| {
                GenerationError::Persistence(format!("write {}: {err}", path.display()))
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(hash: &str) -> PersistedRow {
        PersistedRow {
            identity_hash: hash.to_string(),
            specialty_name: "Mobile Pet Grooming".into(),
            business_profile_type: BusinessProfileType::LocalServiceB2c,
            generation_status: GenerationState::Generating,
            generation_started_at_epoch_ms: 1,
            generation_completed_at_epoch_ms: None,
            profile_data: None,
            summary: RowSummary::default(),
            enabled_tabs: None,
            validation_score: None,
            last_error: None,
        }
    }

    #[test]
    fn identity_hash_is_stable_and_normalized() {
        let a = identity_hash("Mobile Pet Grooming", BusinessProfileType::LocalServiceB2c);
        let b = identity_hash("  mobile pet GROOMING ", BusinessProfileType::LocalServiceB2c);
        assert_eq!(a, b);

        let other_type = identity_hash("Mobile Pet Grooming", BusinessProfileType::RegionalRetail);
        assert_ne!(a, other_type);
    }

    #[test]
    fn upsert_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::new(dir.path().to_path_buf());
        let hash = identity_hash("Mobile Pet Grooming", BusinessProfileType::LocalServiceB2c);

        assert!(store.load(&hash).unwrap().is_none());
        store.upsert(&row(&hash)).unwrap();
        let loaded = store.load(&hash).unwrap().unwrap();
        assert_eq!(loaded.identity_hash, hash);
        assert_eq!(loaded.generation_status, GenerationState::Generating);
    }

    #[test]
    fn upsert_overwrites_in_place() {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::new(dir.path().to_path_buf());
        let hash = identity_hash("Mobile Pet Grooming", BusinessProfileType::LocalServiceB2c);

        store.upsert(&row(&hash)).unwrap();
        let mut updated = row(&hash);
        updated.generation_status = GenerationState::Complete;
        updated.validation_score = Some(85);
        store.upsert(&updated).unwrap();

        let loaded = store.load(&hash).unwrap().unwrap();
        assert_eq!(loaded.generation_status, GenerationState::Complete);
        assert_eq!(loaded.validation_score, Some(85));
    }

    #[test]
    fn history_appends_one_line_per_entry() {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::new(dir.path().to_path_buf());
        let entry = HistoryEntry {
            identity_hash: "abc".into(),
            status: GenerationState::Failed,
            mode: StrategyMode::Multipass,
            validation_score: None,
            stage_attempts: Some(StageResults::default()),
            finished_at_epoch_ms: 2,
            error: Some("Stage 1 failed after 3 attempts: timeout".into()),
        };
        store.append_history(&entry).unwrap();
        store.append_history(&entry).unwrap();

        let text = fs::read_to_string(dir.path().join("history.jsonl")).unwrap();
        assert_eq!(text.lines().count(), 2);
        let parsed: HistoryEntry = serde_json::from_str(text.lines().next().unwrap()).unwrap();
        assert_eq!(parsed.status, GenerationState::Failed);
    }
}
