//! Waiting on the shared site-config artifact.
//!
//! An external initializer writes `common_site_config.json` incrementally:
//! first the database host, later the redis endpoints. There is no signal
//! channel between that process and this one, so the waiter polls the file
//! and treats anything short of "all required keys populated in one read" as
//! not-ready rather than an error.

use crate::error::{BootstrapError, Result};
use crate::poll::{await_condition, PollOutcome};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

pub type SharedConfig = BTreeMap<String, Value>;

// ---------------------------------------------------------------------------
// Single-read observation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Observation {
    /// Artifact not present yet.
    Absent,
    /// Artifact present but unparseable — expected transiently while the
    /// initializer is mid-write; only fatal if it persists to the deadline.
    Malformed(String),
    /// Parsed, but some required keys are missing or empty.
    Incomplete(Vec<String>),
    Ready(SharedConfig),
}

/// A required key counts as populated when its value is non-null and, for
/// strings, non-empty. The artifact mixes types (hostnames, ports, URLs), so
/// numbers and booleans count as populated.
fn key_populated(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

fn observe(path: &Path, keys: &[String]) -> Observation {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(_) => return Observation::Absent,
    };
    let parsed: SharedConfig = match serde_json::from_str(&data) {
        Ok(map) => map,
        Err(e) => return Observation::Malformed(e.to_string()),
    };
    let missing: Vec<String> = keys
        .iter()
        .filter(|k| !key_populated(parsed.get(k.as_str())))
        .cloned()
        .collect();
    if missing.is_empty() {
        Observation::Ready(parsed)
    } else {
        Observation::Incomplete(missing)
    }
}

// ---------------------------------------------------------------------------
// wait_for_config
// ---------------------------------------------------------------------------

/// Block until every key in `keys` is populated in a single read of the
/// artifact at `path`, polling every `interval`.
///
/// At `deadline`: [`BootstrapError::ConfigIncomplete`] naming the keys still
/// missing on the last read, or [`BootstrapError::ConfigMalformed`] if the
/// last read failed to parse.
pub fn wait_for_config(
    path: &Path,
    keys: &[String],
    deadline: Duration,
    interval: Duration,
) -> Result<SharedConfig> {
    let mut last = Observation::Absent;
    let outcome = await_condition(
        || match observe(path, keys) {
            Observation::Ready(config) => Some(config),
            other => {
                if other != last {
                    match &other {
                        Observation::Absent => {
                            tracing::debug!(path = %path.display(), "shared config absent")
                        }
                        Observation::Malformed(reason) => {
                            tracing::debug!(path = %path.display(), reason = %reason, "shared config unparseable")
                        }
                        Observation::Incomplete(missing) => {
                            tracing::info!(missing = ?missing, "shared config incomplete")
                        }
                        Observation::Ready(_) => unreachable!(),
                    }
                }
                last = other;
                None
            }
        },
        interval,
        deadline,
    );

    match outcome {
        PollOutcome::Ready(config) => {
            tracing::info!(keys = ?keys, "shared config ready");
            Ok(config)
        }
        PollOutcome::TimedOut { waited } => match last {
            Observation::Malformed(reason) => Err(BootstrapError::ConfigMalformed {
                path: path.display().to_string(),
                reason,
            }),
            Observation::Incomplete(missing) => Err(BootstrapError::ConfigIncomplete {
                missing,
                waited_secs: waited.as_secs(),
            }),
            // Never saw the file at all: report every key as missing.
            Observation::Absent | Observation::Ready(_) => Err(BootstrapError::ConfigIncomplete {
                missing: keys.to_vec(),
                waited_secs: waited.as_secs(),
            }),
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::atomic_write;
    use tempfile::TempDir;

    fn keys() -> Vec<String> {
        vec![
            "db_host".to_string(),
            "redis_cache".to_string(),
            "redis_queue".to_string(),
        ]
    }

    const SHORT: Duration = Duration::from_millis(200);
    const TICK: Duration = Duration::from_millis(20);

    #[test]
    fn ready_when_all_keys_populated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("common_site_config.json");
        atomic_write(
            &path,
            br#"{"db_host":"db","redis_cache":"redis://cache:6379","redis_queue":"redis://queue:6379"}"#,
        )
        .unwrap();

        let config = wait_for_config(&path, &keys(), SHORT, TICK).unwrap();
        assert_eq!(config["db_host"], "db");
    }

    #[test]
    fn two_of_three_keys_never_succeeds() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("common_site_config.json");
        atomic_write(&path, br#"{"db_host":"db","redis_cache":"redis://cache"}"#).unwrap();

        let err = wait_for_config(&path, &keys(), SHORT, TICK).unwrap_err();
        match err {
            BootstrapError::ConfigIncomplete { missing, .. } => {
                assert_eq!(missing, vec!["redis_queue".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_string_value_counts_as_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("common_site_config.json");
        atomic_write(
            &path,
            br#"{"db_host":"db","redis_cache":"","redis_queue":"redis://queue"}"#,
        )
        .unwrap();

        let err = wait_for_config(&path, &keys(), SHORT, TICK).unwrap_err();
        match err {
            BootstrapError::ConfigIncomplete { missing, .. } => {
                assert_eq!(missing, vec!["redis_cache".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn numeric_value_counts_as_populated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("common_site_config.json");
        atomic_write(
            &path,
            br#"{"db_host":"db","redis_cache":6379,"redis_queue":true}"#,
        )
        .unwrap();

        wait_for_config(&path, &keys(), SHORT, TICK).unwrap();
    }

    #[test]
    fn absent_file_times_out_with_all_keys_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("never-written.json");

        let err = wait_for_config(&path, &keys(), SHORT, TICK).unwrap_err();
        match err {
            BootstrapError::ConfigIncomplete { missing, .. } => {
                assert_eq!(missing.len(), 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_at_deadline_is_distinguished() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("common_site_config.json");
        atomic_write(&path, b"{\"db_host\": \"db\",").unwrap();

        let err = wait_for_config(&path, &keys(), SHORT, TICK).unwrap_err();
        assert!(matches!(err, BootstrapError::ConfigMalformed { .. }));
    }

    #[test]
    fn incremental_writer_converges() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("common_site_config.json");
        atomic_write(&path, br#"{"db_host":"db"}"#).unwrap();

        let writer_path = path.clone();
        let writer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(60));
            atomic_write(
                &writer_path,
                br#"{"db_host":"db","redis_cache":"redis://cache","redis_queue":"redis://queue"}"#,
            )
            .unwrap();
        });

        let config = wait_for_config(&path, &keys(), Duration::from_secs(5), TICK).unwrap();
        assert_eq!(config.len(), 3);
        writer.join().unwrap();
    }
}
