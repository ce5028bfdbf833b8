//! Persisted bootstrap status report.
//!
//! One JSON document under `sites/` records, per stage: state, start/end
//! timestamps, and the error that stopped it. It is rewritten atomically at
//! every transition so a failed bootstrap can be diagnosed after the fact
//! without re-running.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::io::atomic_write;
use crate::paths;
use crate::sequencer::Stage;

// ---------------------------------------------------------------------------
// StageState / StageRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    Pending,
    Running,
    Ok,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub state: StageState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// BootstrapStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapStatus {
    pub site: String,
    pub stages: Vec<StageRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl BootstrapStatus {
    pub fn new(site: &str) -> Self {
        let stages = Stage::sequence()
            .iter()
            .map(|stage| StageRecord {
                stage: *stage,
                state: StageState::Pending,
                started_at: None,
                completed_at: None,
                error: None,
            })
            .collect();
        Self {
            site: site.to_string(),
            stages,
            outcome: None,
            updated_at: Utc::now(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(paths::status_path(root))?;
        Ok(serde_json::from_str(&data)?)
    }

    fn record_mut(&mut self, stage: Stage) -> Option<&mut StageRecord> {
        self.stages.iter_mut().find(|r| r.stage == stage)
    }

    pub fn stage_started(&mut self, stage: Stage) {
        if let Some(record) = self.record_mut(stage) {
            record.state = StageState::Running;
            record.started_at = Some(Utc::now());
        }
    }

    pub fn stage_ok(&mut self, stage: Stage) {
        if let Some(record) = self.record_mut(stage) {
            record.state = StageState::Ok;
            record.completed_at = Some(Utc::now());
        }
    }

    pub fn stage_failed(&mut self, stage: Stage, error: &str) {
        if let Some(record) = self.record_mut(stage) {
            record.state = StageState::Failed;
            record.completed_at = Some(Utc::now());
            record.error = Some(error.to_string());
        }
    }
}

// ---------------------------------------------------------------------------
// StatusWriter
// ---------------------------------------------------------------------------

/// Owns the status document and persists it after every mutation.
/// Write failures are logged, never fatal: losing the report must not fail
/// a bootstrap that is otherwise succeeding.
pub struct StatusWriter {
    path: PathBuf,
    status: BootstrapStatus,
}

impl StatusWriter {
    pub fn new(root: &Path, site: &str) -> Self {
        Self {
            path: paths::status_path(root),
            status: BootstrapStatus::new(site),
        }
    }

    fn persist(&mut self) {
        self.status.updated_at = Utc::now();
        match serde_json::to_vec_pretty(&self.status) {
            Ok(data) => {
                if let Err(e) = atomic_write(&self.path, &data) {
                    tracing::warn!(path = %self.path.display(), error = %e, "could not persist status");
                }
            }
            Err(e) => tracing::warn!(error = %e, "could not serialize status"),
        }
    }

    pub fn stage_started(&mut self, stage: Stage) {
        self.status.stage_started(stage);
        self.persist();
    }

    pub fn stage_ok(&mut self, stage: Stage) {
        self.status.stage_ok(stage);
        self.persist();
    }

    pub fn stage_failed(&mut self, stage: Stage, error: &str) {
        self.status.stage_failed(stage, error);
        self.persist();
    }

    pub fn finished(&mut self, outcome: &str) {
        self.status.outcome = Some(outcome.to_string());
        self.persist();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn new_status_has_all_stages_pending() {
        let status = BootstrapStatus::new("acme");
        assert_eq!(status.stages.len(), Stage::sequence().len());
        assert!(status
            .stages
            .iter()
            .all(|r| r.state == StageState::Pending));
    }

    #[test]
    fn writer_persists_transitions() {
        let dir = TempDir::new().unwrap();
        let mut writer = StatusWriter::new(dir.path(), "acme");

        writer.stage_started(Stage::WaitingDeps);
        writer.stage_ok(Stage::WaitingDeps);
        writer.stage_started(Stage::WaitingConfig);
        writer.stage_failed(Stage::WaitingConfig, "missing keys [redis_queue]");
        writer.finished("failed");

        let loaded = BootstrapStatus::load(dir.path()).unwrap();
        assert_eq!(loaded.site, "acme");
        assert_eq!(loaded.outcome.as_deref(), Some("failed"));

        let deps = loaded
            .stages
            .iter()
            .find(|r| r.stage == Stage::WaitingDeps)
            .unwrap();
        assert_eq!(deps.state, StageState::Ok);
        assert!(deps.started_at.is_some());
        assert!(deps.completed_at.is_some());

        let config = loaded
            .stages
            .iter()
            .find(|r| r.stage == Stage::WaitingConfig)
            .unwrap();
        assert_eq!(config.state, StageState::Failed);
        assert_eq!(config.error.as_deref(), Some("missing keys [redis_queue]"));
    }

    #[test]
    fn json_roundtrip() {
        let status = BootstrapStatus::new("acme");
        let json = serde_json::to_string(&status).unwrap();
        let parsed: BootstrapStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.site, "acme");
        assert_eq!(parsed.stages.len(), status.stages.len());
    }
}
