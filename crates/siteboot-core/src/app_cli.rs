//! Subprocess invocation of the wrapped platform's own CLI.
//!
//! The platform CLI is an opaque collaborator: its exit code is the sole
//! success signal, and its stdout/stderr are log text only. Stderr flows
//! through to the parent so install logs appear in the terminal in real time;
//! stdout is captured for error context.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{BootstrapError, Result};

// ---------------------------------------------------------------------------
// CliOutput
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CliOutput {
    pub success: bool,
    pub stdout: String,
}

impl CliOutput {
    /// First 500 chars of stdout, for embedding in error reasons.
    pub fn hint(&self) -> String {
        self.stdout.chars().take(500).collect()
    }
}

// ---------------------------------------------------------------------------
// PlatformCli
// ---------------------------------------------------------------------------

/// The seam between the provisioning logic and the real platform binary.
/// Tests substitute a scripted implementation.
pub trait PlatformCli {
    fn run(&self, args: &[&str]) -> Result<CliOutput>;
}

// ---------------------------------------------------------------------------
// SubprocessCli
// ---------------------------------------------------------------------------

/// Runs the configured platform CLI binary with the project root as its
/// working directory.
#[derive(Debug)]
pub struct SubprocessCli {
    program: String,
    root: PathBuf,
}

impl SubprocessCli {
    /// Resolve `program` on PATH (absolute paths are accepted as-is).
    pub fn new(program: &str, root: &Path) -> Result<Self> {
        if which::which(program).is_err() {
            return Err(BootstrapError::CliMissing(program.to_string()));
        }
        Ok(Self {
            program: program.to_string(),
            root: root.to_path_buf(),
        })
    }
}

fn build_command(program: &str, root: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.current_dir(root);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    // stderr flows through so platform log lines appear in the terminal
    cmd.stderr(Stdio::inherit());
    cmd
}

impl PlatformCli for SubprocessCli {
    fn run(&self, args: &[&str]) -> Result<CliOutput> {
        tracing::debug!(program = %self.program, args = ?args, "running platform CLI");
        let output = build_command(&self.program, &self.root, args)
            .output()
            .map_err(|e| BootstrapError::CliSpawnFailed(e.to_string()))?;

        Ok(CliOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
