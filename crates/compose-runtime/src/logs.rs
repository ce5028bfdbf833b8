use std::pin::Pin;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::error::{Result, RuntimeError};

// ─── LogStream ────────────────────────────────────────────────────────────

/// An async stream of log lines from a `compose logs` subprocess.
///
/// Backed by a Tokio mpsc channel. A background task owns the child process
/// and forwards stdout lines until EOF; a non-zero exit is surfaced as a
/// final `Err` item with the captured stderr. Dropping `LogStream` closes
/// the receiver, which makes the forwarder kill the child — this is what
/// terminates a `--follow` stream.
pub struct LogStream {
    rx: mpsc::Receiver<Result<String>>,
}

impl LogStream {
    /// Spawn `cmd` and stream its stdout line by line. Crate-visible so
    /// tests can inject an arbitrary command instead of a real runtime.
    pub(crate) fn spawn(mut cmd: Command) -> Result<Self> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| RuntimeError::Spawn(e.to_string()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RuntimeError::Spawn("stdout not captured".into()))?;

        // Drain stderr in the background; it is only surfaced if the
        // process exits non-zero.
        let stderr_buf = Arc::new(Mutex::new(String::new()));
        if let Some(stderr) = child.stderr.take() {
            let buf = Arc::clone(&stderr_buf);
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if let Ok(mut b) = buf.lock() {
                        if !b.is_empty() {
                            b.push('\n');
                        }
                        b.push_str(&line);
                    }
                }
            });
        }

        let (tx, rx) = mpsc::channel(64);

        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if tx.send(Ok(line)).await.is_err() {
                            // Receiver dropped: stop following and reap.
                            let _ = child.kill().await;
                            return;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        let _ = tx.send(Err(RuntimeError::Io(e))).await;
                        break;
                    }
                }
            }

            match child.wait().await {
                Ok(status) if !status.success() => {
                    let stderr = stderr_buf
                        .lock()
                        .ok()
                        .map(|b| b.clone())
                        .unwrap_or_default();
                    let _ = tx
                        .send(Err(RuntimeError::NonZeroExit {
                            command: "compose logs".to_string(),
                            code: status.code().unwrap_or(-1),
                            stderr,
                        }))
                        .await;
                }
                Err(e) => {
                    let _ = tx.send(Err(RuntimeError::Io(e))).await;
                }
                Ok(_) => {}
            }
        });

        Ok(Self { rx })
    }
}

impl Stream for LogStream {
    type Item = Result<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
