//! Runtime binary discovery and compose command construction.

use tokio::process::Command;

use crate::types::RuntimeOptions;

/// The container runtimes we know how to drive, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeBinary {
    Docker,
    Podman,
}

impl RuntimeBinary {
    pub fn name(&self) -> &'static str {
        match self {
            RuntimeBinary::Docker => "docker",
            RuntimeBinary::Podman => "podman",
        }
    }
}

/// Detect the best available container runtime binary.
/// Returns None if neither docker nor podman is on PATH.
pub fn detect_binary() -> Option<RuntimeBinary> {
    if which::which("docker").is_ok() {
        return Some(RuntimeBinary::Docker);
    }
    if which::which("podman").is_ok() {
        return Some(RuntimeBinary::Podman);
    }
    None
}

/// The common prefix of every compose invocation:
/// `compose [-p project] [-f file]… <tail…>`.
pub(crate) fn compose_args(opts: &RuntimeOptions, tail: &[&str]) -> Vec<String> {
    let mut args = vec!["compose".to_string()];
    if let Some(project) = &opts.project {
        args.push("-p".to_string());
        args.push(project.clone());
    }
    for file in &opts.files {
        args.push("-f".to_string());
        args.push(file.display().to_string());
    }
    args.extend(tail.iter().map(|a| a.to_string()));
    args
}

pub(crate) fn build_command(program: &str, opts: &RuntimeOptions, tail: &[&str]) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(compose_args(opts, tail));
    if let Some(cwd) = &opts.cwd {
        cmd.current_dir(cwd);
    }
    for (k, v) in &opts.env {
        cmd.env(k, v);
    }
    cmd
}

// ─── Tests ────────────────────────────────────────────────────────────────
