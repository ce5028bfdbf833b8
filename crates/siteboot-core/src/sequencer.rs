//! The bootstrap sequencer.
//!
//! Strictly ordered: wait for dependencies, wait for the shared config
//! barrier, provision, reconcile. A failed stage short-circuits to a
//! terminal failed outcome; nothing retries internally. Re-running the whole
//! bootstrap is the recovery path, which is why provisioning and
//! reconciliation are idempotent.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;

use crate::app_cli::PlatformCli;
use crate::config::BootstrapConfig;
use crate::error::BootstrapError;
use crate::provision::{self, FailedAddon, SiteCreation};
use crate::reconcile::{self, ServiceController};
use crate::status::StatusWriter;
use crate::{probe, shared_config};

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// The working stages between `Init` and `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    WaitingDeps,
    WaitingConfig,
    Provisioning,
    Reconciling,
}

impl Stage {
    pub fn sequence() -> &'static [Stage] {
        &[
            Stage::WaitingDeps,
            Stage::WaitingConfig,
            Stage::Provisioning,
            Stage::Reconciling,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::WaitingDeps => "waiting_deps",
            Stage::WaitingConfig => "waiting_config",
            Stage::Provisioning => "provisioning",
            Stage::Reconciling => "reconciling",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// BootstrapOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BootstrapOutcome {
    /// The site is usable. `failed_addons` is non-empty when provisioning
    /// was partial (some addons were skipped after failing to install).
    Succeeded {
        site: String,
        creation: SiteCreation,
        failed_addons: Vec<FailedAddon>,
    },
    Failed {
        stage: Stage,
        reason: String,
    },
}

impl BootstrapOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BootstrapOutcome::Succeeded { .. })
    }
}

// ---------------------------------------------------------------------------
// Sequencer
// ---------------------------------------------------------------------------

pub struct Sequencer<'a> {
    root: &'a Path,
    config: &'a BootstrapConfig,
    cli: &'a dyn PlatformCli,
    services: &'a dyn ServiceController,
}

impl<'a> Sequencer<'a> {
    pub fn new(
        root: &'a Path,
        config: &'a BootstrapConfig,
        cli: &'a dyn PlatformCli,
        services: &'a dyn ServiceController,
    ) -> Self {
        Self {
            root,
            config,
            cli,
            services,
        }
    }

    /// Drive the bootstrap to a terminal outcome, persisting the status
    /// report at every transition.
    pub fn run(&self) -> BootstrapOutcome {
        let mut status = StatusWriter::new(self.root, &self.config.site.name);

        if let Err(e) = self.stage(&mut status, Stage::WaitingDeps, |s| s.wait_deps()) {
            return self.fail(&mut status, Stage::WaitingDeps, e);
        }
        if let Err(e) = self.stage(&mut status, Stage::WaitingConfig, |s| s.wait_config()) {
            return self.fail(&mut status, Stage::WaitingConfig, e);
        }
        let report = match self.stage(&mut status, Stage::Provisioning, |s| {
            provision::provision(s.root, s.config, s.cli)
        }) {
            Ok(report) => report,
            Err(e) => return self.fail(&mut status, Stage::Provisioning, e),
        };
        if let Err(e) = self.stage(&mut status, Stage::Reconciling, |s| {
            reconcile::reconcile(s.config, s.cli, s.services)
        }) {
            return self.fail(&mut status, Stage::Reconciling, e);
        }

        if report.is_partial() {
            tracing::warn!(
                site = %self.config.site.name,
                failed = ?report.failed_addons.iter().map(|f| f.name.as_str()).collect::<Vec<_>>(),
                "bootstrap finished with skipped addons"
            );
        }
        status.finished("succeeded");
        tracing::info!(site = %self.config.site.name, "bootstrap succeeded");

        BootstrapOutcome::Succeeded {
            site: self.config.site.name.clone(),
            creation: report.creation,
            failed_addons: report.failed_addons,
        }
    }

    fn stage<T>(
        &self,
        status: &mut StatusWriter,
        stage: Stage,
        body: impl FnOnce(&Self) -> crate::error::Result<T>,
    ) -> crate::error::Result<T> {
        tracing::info!(stage = %stage, "stage started");
        status.stage_started(stage);
        let started = Instant::now();
        let result = body(self);
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => {
                tracing::info!(stage = %stage, elapsed_ms, "stage complete");
                status.stage_ok(stage);
            }
            Err(e) => {
                tracing::error!(stage = %stage, elapsed_ms, error = %e, "stage failed");
                status.stage_failed(stage, &e.to_string());
            }
        }
        result
    }

    fn fail(
        &self,
        status: &mut StatusWriter,
        stage: Stage,
        error: BootstrapError,
    ) -> BootstrapOutcome {
        status.finished("failed");
        BootstrapOutcome::Failed {
            stage,
            reason: error.to_string(),
        }
    }

    fn wait_deps(&self) -> crate::error::Result<()> {
        probe::wait_all_ready(
            &self.config.dependencies,
            self.config.timeouts.dependency(),
            self.config.timeouts.probe_interval(),
        )
    }

    fn wait_config(&self) -> crate::error::Result<()> {
        let path = self.root.join(&self.config.shared_config.path);
        shared_config::wait_for_config(
            &path,
            &self.config.shared_config.required_keys,
            self.config.timeouts.config(),
            self.config.timeouts.poll_interval(),
        )
        .map(|_| ())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Dependency;
    use crate::status::{BootstrapStatus, StageState};
    use crate::test_support::{MockCli, MockController};
    use std::net::TcpListener;
    use tempfile::TempDir;

    /// Config with fast timeouts, no dependencies, and a satisfied shared
    /// config barrier; tests remove pieces to exercise failures.
    fn ready_fixture(dir: &TempDir) -> BootstrapConfig {
        let mut cfg = BootstrapConfig::new("acme");
        cfg.site.admin_password = "admin".to_string();
        cfg.site.db_root_password = "root".to_string();
        cfg.dependencies = Vec::new();
        cfg.timeouts.dependency_secs = 1;
        cfg.timeouts.config_secs = 1;
        cfg.timeouts.probe_interval_secs = 1;
        cfg.timeouts.poll_interval_secs = 1;
        crate::io::atomic_write(
            &dir.path().join("sites/common_site_config.json"),
            br#"{"db_host":"db","redis_cache":"redis://cache","redis_queue":"redis://queue"}"#,
        )
        .unwrap();
        cfg
    }

    fn stage_state(dir: &TempDir, stage: Stage) -> StageState {
        let status = BootstrapStatus::load(dir.path()).unwrap();
        status
            .stages
            .iter()
            .find(|r| r.stage == stage)
            .unwrap()
            .state
    }

    #[test]
    fn happy_path_succeeds_and_marks_all_stages_ok() {
        let dir = TempDir::new().unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut cfg = ready_fixture(&dir);
        cfg.dependencies = vec![Dependency {
            name: "db".to_string(),
            host: "127.0.0.1".to_string(),
            port: listener.local_addr().unwrap().port(),
        }];
        let cli = MockCli::default();
        let controller = MockController::default();

        let outcome = Sequencer::new(dir.path(), &cfg, &cli, &controller).run();

        assert!(outcome.is_success());
        for stage in Stage::sequence() {
            assert_eq!(stage_state(&dir, *stage), StageState::Ok);
        }
        assert_eq!(controller.restarted(), vec!["worker", "scheduler"]);
    }

    #[test]
    fn unreachable_dependency_fails_at_waiting_deps() {
        let dir = TempDir::new().unwrap();
        let mut cfg = ready_fixture(&dir);
        let free = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = free.local_addr().unwrap().port();
        drop(free);
        cfg.dependencies = vec![Dependency {
            name: "redis-queue".to_string(),
            host: "127.0.0.1".to_string(),
            port,
        }];
        let cli = MockCli::default();

        let outcome = Sequencer::new(dir.path(), &cfg, &cli, &MockController::default()).run();

        match outcome {
            BootstrapOutcome::Failed { stage, reason } => {
                assert_eq!(stage, Stage::WaitingDeps);
                assert!(reason.contains("redis-queue"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(stage_state(&dir, Stage::WaitingDeps), StageState::Failed);
        assert_eq!(stage_state(&dir, Stage::WaitingConfig), StageState::Pending);
        assert!(cli.calls().is_empty());
    }

    #[test]
    fn missing_config_key_fails_at_waiting_config() {
        let dir = TempDir::new().unwrap();
        let cfg = ready_fixture(&dir);
        crate::io::atomic_write(
            &dir.path().join("sites/common_site_config.json"),
            br#"{"db_host":"db","redis_cache":"redis://cache"}"#,
        )
        .unwrap();
        let cli = MockCli::default();

        let outcome = Sequencer::new(dir.path(), &cfg, &cli, &MockController::default()).run();

        match outcome {
            BootstrapOutcome::Failed { stage, reason } => {
                assert_eq!(stage, Stage::WaitingConfig);
                assert!(reason.contains("redis_queue"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(cli.calls().is_empty());
    }

    #[test]
    fn provision_failure_stops_before_reconcile() {
        let dir = TempDir::new().unwrap();
        let cfg = ready_fixture(&dir);
        let cli = MockCli::default();
        cli.fail_matching("new-site", "db refused");
        let controller = MockController::default();

        let outcome = Sequencer::new(dir.path(), &cfg, &cli, &controller).run();

        match outcome {
            BootstrapOutcome::Failed { stage, .. } => assert_eq!(stage, Stage::Provisioning),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(controller.restarted().is_empty());
        assert_eq!(stage_state(&dir, Stage::Reconciling), StageState::Pending);
    }

    #[test]
    fn reconcile_failure_reported_separately_from_provisioning() {
        let dir = TempDir::new().unwrap();
        let cfg = ready_fixture(&dir);
        let cli = MockCli::default();
        cli.fail_matching("migrate", "patch error");

        let outcome = Sequencer::new(dir.path(), &cfg, &cli, &MockController::default()).run();

        match outcome {
            BootstrapOutcome::Failed { stage, reason } => {
                assert_eq!(stage, Stage::Reconciling);
                assert!(reason.contains("patch error"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(stage_state(&dir, Stage::Provisioning), StageState::Ok);
    }

    #[test]
    fn skipped_addons_still_succeed_overall() {
        let dir = TempDir::new().unwrap();
        let cfg = ready_fixture(&dir);
        std::fs::create_dir_all(dir.path().join("apps/erpnext")).unwrap();
        std::fs::create_dir_all(dir.path().join("apps/hrms")).unwrap();
        let cli = MockCli::default();
        cli.fail_matching("erpnext", "install blew up");

        let outcome = Sequencer::new(dir.path(), &cfg, &cli, &MockController::default()).run();

        match outcome {
            BootstrapOutcome::Succeeded {
                failed_addons,
                creation,
                ..
            } => {
                assert_eq!(creation, SiteCreation::Created);
                assert_eq!(failed_addons.len(), 1);
                assert_eq!(failed_addons[0].name, "erpnext");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn existing_site_rerun_still_reconciles() {
        let dir = TempDir::new().unwrap();
        let cfg = ready_fixture(&dir);
        std::fs::create_dir_all(dir.path().join("sites/acme")).unwrap();
        let cli = MockCli::default();
        let controller = MockController::default();

        let outcome = Sequencer::new(dir.path(), &cfg, &cli, &controller).run();

        match outcome {
            BootstrapOutcome::Succeeded { creation, .. } => {
                assert_eq!(creation, SiteCreation::AlreadyExists);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        // migrate still ran
        assert!(cli
            .calls()
            .iter()
            .any(|c| c.contains(&"migrate".to_string())));
        assert_eq!(controller.restarted(), vec!["worker", "scheduler"]);
    }
}
