use std::process::Stdio;

use crate::command::{build_command, detect_binary};
use crate::error::{Result, RuntimeError};
use crate::logs::LogStream;
use crate::types::{ExecOutput, PsEntry, RuntimeOptions, ServiceHealth};

// ─── ComposeRuntime ───────────────────────────────────────────────────────

/// Narrow interface to the compose stack: start/stop/restart a named
/// service, execute a command inside one, stream its logs, inspect its
/// health. Everything else about the stack is the runtime binary's business.
pub struct ComposeRuntime {
    program: String,
    opts: RuntimeOptions,
}

impl ComposeRuntime {
    pub fn new(opts: RuntimeOptions) -> Result<Self> {
        let program = match &opts.binary {
            Some(binary) => binary.clone(),
            None => detect_binary()
                .ok_or(RuntimeError::NoRuntimeBinary)?
                .name()
                .to_string(),
        };
        Ok(Self { program, opts })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub async fn start(&self, service: &str) -> Result<()> {
        self.run_checked(&["up", "-d", service]).await
    }

    pub async fn stop(&self, service: &str) -> Result<()> {
        self.run_checked(&["stop", service]).await
    }

    pub async fn restart(&self, service: &str) -> Result<()> {
        self.run_checked(&["restart", service]).await
    }

    /// Execute `argv` inside a running `service` (non-tty). The command's
    /// exit code is returned to the caller, not turned into an error.
    pub async fn exec(&self, service: &str, argv: &[&str]) -> Result<ExecOutput> {
        let mut tail = vec!["exec", "-T", service];
        tail.extend_from_slice(argv);
        let output = self.capture(&tail).await?;
        Ok(ExecOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    pub async fn health(&self, service: &str) -> Result<ServiceHealth> {
        let tail = ["ps", "--all", "--format", "json", service];
        let output = self.capture(&tail).await?;
        if !output.status.success() {
            return Err(self.non_zero(&tail, &output));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_ps_health(&stdout, service)
    }

    /// Stream log lines for `service`. With `follow`, the stream only ends
    /// when dropped (which kills the subprocess) or the service goes away.
    pub fn logs(&self, service: &str, follow: bool) -> Result<LogStream> {
        let mut tail = vec!["logs", "--no-color"];
        if follow {
            tail.push("--follow");
        }
        tail.push(service);
        LogStream::spawn(build_command(&self.program, &self.opts, &tail))
    }

    async fn capture(&self, tail: &[&str]) -> Result<std::process::Output> {
        tracing::debug!(program = %self.program, args = ?tail, "running compose");
        build_command(&self.program, &self.opts, tail)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| RuntimeError::Spawn(e.to_string()))
    }

    async fn run_checked(&self, tail: &[&str]) -> Result<()> {
        let output = self.capture(tail).await?;
        if !output.status.success() {
            return Err(self.non_zero(tail, &output));
        }
        Ok(())
    }

    fn non_zero(&self, tail: &[&str], output: &std::process::Output) -> RuntimeError {
        RuntimeError::NonZeroExit {
            command: format!("{} compose {}", self.program, tail.join(" ")),
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

// ─── ps output parsing ────────────────────────────────────────────────────

/// `compose ps --format json` emits one JSON object per line on current
/// docker releases and a single JSON array on older ones; accept both.
fn parse_ps_health(stdout: &str, service: &str) -> Result<ServiceHealth> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(ServiceHealth::Unknown);
    }

    let entries: Vec<PsEntry> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).map_err(|e| RuntimeError::Parse {
            line: trimmed.chars().take(200).collect(),
            source: e,
        })?
    } else {
        let mut entries = Vec::new();
        for line in trimmed.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(line).map_err(|e| RuntimeError::Parse {
                line: line.to_string(),
                source: e,
            })?);
        }
        entries
    };

    Ok(entries
        .iter()
        .find(|e| e.service == service)
        .map(PsEntry::service_health)
        .unwrap_or(ServiceHealth::Unknown))
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_jsonl_form() {
        let stdout = concat!(
            r#"{"Name":"stack-db-1","Service":"db","State":"running","Health":"healthy"}"#,
            "\n",
            r#"{"Name":"stack-worker-1","Service":"worker","State":"running","Health":""}"#,
            "\n",
        );
        assert_eq!(parse_ps_health(stdout, "db").unwrap(), ServiceHealth::Healthy);
        assert_eq!(
            parse_ps_health(stdout, "worker").unwrap(),
            ServiceHealth::Unknown
        );
    }

    #[test]
    fn parse_array_form() {
        let stdout = r#"[{"Service":"db","State":"exited","Health":""}]"#;
        assert_eq!(
            parse_ps_health(stdout, "db").unwrap(),
            ServiceHealth::Unhealthy
        );
    }

    #[test]
    fn unlisted_service_is_unknown() {
        let stdout = r#"{"Service":"db","State":"running","Health":"healthy"}"#;
        assert_eq!(
            parse_ps_health(stdout, "redis-cache").unwrap(),
            ServiceHealth::Unknown
        );
    }

    #[test]
    fn empty_output_is_unknown() {
        assert_eq!(parse_ps_health("", "db").unwrap(), ServiceHealth::Unknown);
        assert_eq!(parse_ps_health("\n", "db").unwrap(), ServiceHealth::Unknown);
    }

    #[test]
    fn garbage_output_is_a_parse_error() {
        let err = parse_ps_health("not json", "db").unwrap_err();
        assert!(matches!(err, RuntimeError::Parse { .. }));
    }

    #[test]
    fn explicit_binary_skips_detection() {
        let runtime = ComposeRuntime::new(RuntimeOptions {
            binary: Some("podman".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(runtime.program(), "podman");
    }
}
