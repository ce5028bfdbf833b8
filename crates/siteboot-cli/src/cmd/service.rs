use anyhow::Context;
use clap::Args;
use futures::StreamExt;
use std::path::{Path, PathBuf};

use compose_runtime::{ComposeRuntime, RuntimeOptions};

use crate::output::print_json;

// ---------------------------------------------------------------------------
// RuntimeArgs
// ---------------------------------------------------------------------------

/// Flags shared by every command that talks to the container runtime.
#[derive(Args, Debug, Default)]
pub struct RuntimeArgs {
    /// Compose project name
    #[arg(long, env = "SITEBOOT_PROJECT")]
    pub project: Option<String>,

    /// Compose file (repeatable, order preserved)
    #[arg(long = "compose-file", short = 'f')]
    pub files: Vec<PathBuf>,

    /// Container runtime binary (default: docker, fallback podman)
    #[arg(long, env = "SITEBOOT_RUNTIME")]
    pub runtime: Option<String>,
}

impl RuntimeArgs {
    pub fn options(&self, root: &Path) -> RuntimeOptions {
        RuntimeOptions {
            binary: self.runtime.clone(),
            project: self.project.clone(),
            files: self.files.clone(),
            cwd: Some(root.to_path_buf()),
            env: Vec::new(),
        }
    }
}

fn connect(args: &RuntimeArgs, root: &Path) -> anyhow::Result<ComposeRuntime> {
    ComposeRuntime::new(args.options(root)).context("container runtime unavailable")
}

fn block_on<F: std::future::Future>(fut: F) -> anyhow::Result<F::Output> {
    let rt = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    Ok(rt.block_on(fut))
}

// ---------------------------------------------------------------------------
// Lifecycle commands
// ---------------------------------------------------------------------------

pub fn start(root: &Path, args: &RuntimeArgs, service: &str) -> anyhow::Result<()> {
    let runtime = connect(args, root)?;
    block_on(runtime.start(service))??;
    println!("started {service}");
    Ok(())
}

pub fn stop(root: &Path, args: &RuntimeArgs, service: &str) -> anyhow::Result<()> {
    let runtime = connect(args, root)?;
    block_on(runtime.stop(service))??;
    println!("stopped {service}");
    Ok(())
}

pub fn restart(root: &Path, args: &RuntimeArgs, service: &str) -> anyhow::Result<()> {
    let runtime = connect(args, root)?;
    block_on(runtime.restart(service))??;
    println!("restarted {service}");
    Ok(())
}

/// Run a command inside a running service and mirror its output. The
/// subprocess exit code decides ours.
pub fn exec(root: &Path, args: &RuntimeArgs, service: &str, argv: &[String]) -> anyhow::Result<()> {
    if argv.is_empty() {
        anyhow::bail!("no command given; usage: siteboot exec <service> -- <command…>");
    }
    let runtime = connect(args, root)?;
    let argv: Vec<&str> = argv.iter().map(String::as_str).collect();
    let output = block_on(runtime.exec(service, &argv))??;

    print!("{}", output.stdout);
    eprint!("{}", output.stderr);
    if !output.success() {
        anyhow::bail!("command exited with code {}", output.exit_code);
    }
    Ok(())
}

pub fn logs(root: &Path, args: &RuntimeArgs, service: &str, follow: bool) -> anyhow::Result<()> {
    let runtime = connect(args, root)?;
    block_on(async {
        let mut stream = runtime.logs(service, follow)?;
        while let Some(line) = stream.next().await {
            println!("{}", line?);
        }
        anyhow::Ok(())
    })??;
    Ok(())
}

pub fn health(root: &Path, args: &RuntimeArgs, service: &str, json: bool) -> anyhow::Result<()> {
    let runtime = connect(args, root)?;
    let health = block_on(runtime.health(service))??;

    if json {
        print_json(&serde_json::json!({
            "service": service,
            "health": health.as_str(),
        }))?;
    } else {
        println!("{service}: {health}");
    }

    // Mirror the health state in the exit code for scripting.
    if health == compose_runtime::ServiceHealth::Unhealthy {
        anyhow::bail!("service '{service}' is unhealthy");
    }
    Ok(())
}
