use anyhow::Context;
use clap::Args;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use compose_runtime::{ComposeRuntime, RuntimeError};
use siteboot_core::app_cli::{CliOutput, PlatformCli, SubprocessCli};
use siteboot_core::config::{BootstrapConfig, WarnLevel};
use siteboot_core::provision::SiteCreation;
use siteboot_core::reconcile::{NoopController, ServiceController};
use siteboot_core::sequencer::{BootstrapOutcome, Sequencer};

use crate::cmd::service::RuntimeArgs;
use crate::output::print_json;

// ---------------------------------------------------------------------------
// BootstrapArgs
// ---------------------------------------------------------------------------

/// Overrides applied on top of `siteboot.yaml`. Credentials are accepted via
/// environment so they stay out of shell history and process listings.
#[derive(Args, Debug)]
pub struct BootstrapArgs {
    /// Site to provision (overrides site.name)
    #[arg(long)]
    pub site: Option<String>,

    #[arg(long, env = "SITEBOOT_ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    #[arg(long, env = "SITEBOOT_DB_PASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,

    #[arg(long, env = "SITEBOOT_DB_ROOT_PASSWORD", hide_env_values = true)]
    pub db_root_password: Option<String>,

    /// Database/schema name for the new site
    #[arg(long)]
    pub db_name: Option<String>,

    /// Seconds to wait for each dependency to accept connections
    #[arg(long)]
    pub dependency_timeout: Option<u64>,

    /// Seconds to wait for the shared config barrier
    #[arg(long)]
    pub config_timeout: Option<u64>,

    /// Skip worker restarts even when a container runtime is available
    #[arg(long)]
    pub no_restart: bool,

    #[command(flatten)]
    pub runtime: RuntimeArgs,
}

fn apply_overrides(cfg: &mut BootstrapConfig, args: &BootstrapArgs) {
    if let Some(site) = &args.site {
        cfg.site.name = site.clone();
    }
    if let Some(pw) = &args.admin_password {
        cfg.site.admin_password = pw.clone();
    }
    if let Some(pw) = &args.db_password {
        cfg.site.db_password = pw.clone();
    }
    if let Some(pw) = &args.db_root_password {
        cfg.site.db_root_password = pw.clone();
    }
    if let Some(name) = &args.db_name {
        cfg.site.db_name = name.clone();
    }
    if let Some(secs) = args.dependency_timeout {
        cfg.timeouts.dependency_secs = secs;
    }
    if let Some(secs) = args.config_timeout {
        cfg.timeouts.config_secs = secs;
    }
}

// ---------------------------------------------------------------------------
// LazyCli
// ---------------------------------------------------------------------------

/// Defers binary lookup until the provisioning stage actually needs the
/// platform CLI, so a bootstrap that dies waiting for dependencies reports
/// the dependency, not a missing binary it never got to use.
struct LazyCli {
    program: String,
    root: PathBuf,
    inner: OnceLock<siteboot_core::Result<SubprocessCli>>,
}

impl LazyCli {
    fn new(program: &str, root: &Path) -> Self {
        Self {
            program: program.to_string(),
            root: root.to_path_buf(),
            inner: OnceLock::new(),
        }
    }
}

impl PlatformCli for LazyCli {
    fn run(&self, args: &[&str]) -> siteboot_core::Result<CliOutput> {
        let cli = self
            .inner
            .get_or_init(|| SubprocessCli::new(&self.program, &self.root));
        match cli {
            Ok(cli) => cli.run(args),
            Err(siteboot_core::BootstrapError::CliMissing(program)) => {
                Err(siteboot_core::BootstrapError::CliMissing(program.clone()))
            }
            Err(e) => Err(siteboot_core::BootstrapError::CliSpawnFailed(e.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ComposeController
// ---------------------------------------------------------------------------

/// Bridges the sequencer's blocking [`ServiceController`] seam onto the
/// async compose runtime.
struct ComposeController {
    rt: tokio::runtime::Runtime,
    runtime: ComposeRuntime,
}

impl ServiceController for ComposeController {
    fn restart(&self, service: &str) -> std::result::Result<(), String> {
        self.rt
            .block_on(self.runtime.restart(service))
            .map_err(|e| e.to_string())
    }
}

fn controller(args: &BootstrapArgs, root: &Path) -> anyhow::Result<Box<dyn ServiceController>> {
    if args.no_restart {
        return Ok(Box::new(NoopController));
    }
    match ComposeRuntime::new(args.runtime.options(root)) {
        Ok(runtime) => Ok(Box::new(ComposeController {
            rt: tokio::runtime::Runtime::new().context("failed to start async runtime")?,
            runtime,
        })),
        Err(RuntimeError::NoRuntimeBinary) => {
            // Normal when bootstrapping from inside the application
            // container; workers are supervised externally there.
            tracing::warn!("no container runtime on PATH, worker restarts will be skipped");
            Ok(Box::new(NoopController))
        }
        Err(e) => Err(e.into()),
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

pub fn run(root: &Path, args: BootstrapArgs, json: bool) -> anyhow::Result<()> {
    let mut cfg = BootstrapConfig::load(root).context("failed to load siteboot.yaml")?;
    apply_overrides(&mut cfg, &args);

    let warnings = cfg.validate();
    let mut errors = Vec::new();
    for w in &warnings {
        match w.level {
            WarnLevel::Warning => tracing::warn!("{}", w.message),
            WarnLevel::Error => errors.push(w.message.clone()),
        }
    }
    if !errors.is_empty() {
        anyhow::bail!("configuration invalid:\n  {}", errors.join("\n  "));
    }

    let cli = LazyCli::new(&cfg.cli.program, root);
    let services = controller(&args, root)?;

    let outcome = Sequencer::new(root, &cfg, &cli, services.as_ref()).run();

    if json {
        print_json(&outcome)?;
    } else if let BootstrapOutcome::Succeeded {
        site,
        creation,
        failed_addons,
    } = &outcome
    {
        let how = match creation {
            SiteCreation::Created => "created",
            SiteCreation::AlreadyExists => "already existed",
        };
        println!("bootstrap succeeded: site '{site}' {how}");
        for addon in failed_addons {
            println!("  skipped addon '{}': {}", addon.name, addon.reason);
        }
    }

    match outcome {
        BootstrapOutcome::Succeeded { .. } => Ok(()),
        BootstrapOutcome::Failed { stage, reason } => {
            anyhow::bail!("bootstrap failed at {stage}: {reason}")
        }
    }
}
