//! `compose-runtime` — a narrow async interface to a Compose-compatible
//! container runtime.
//!
//! The bootstrap core treats the container stack as an external collaborator
//! reachable only through five operations: start, stop/restart, exec, logs,
//! health. This crate implements them by shelling out to `docker compose`
//! (or `podman compose`), streaming log lines over an mpsc-backed
//! [`futures::Stream`] and parsing `ps --format json` for health.

pub mod command;
pub mod error;
pub mod logs;
pub mod runtime;
pub mod types;

pub use command::{detect_binary, RuntimeBinary};
pub use error::{Result, RuntimeError};
pub use logs::LogStream;
pub use runtime::ComposeRuntime;
pub use types::{ExecOutput, RuntimeOptions, ServiceHealth};
