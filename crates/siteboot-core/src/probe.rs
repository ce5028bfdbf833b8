//! TCP readiness probing for bootstrap dependencies.
//!
//! A dependency is "ready" as soon as one TCP connection to `host:port`
//! succeeds. Nothing is sent on the connection; it is dropped immediately.

use crate::config::Dependency;
use crate::error::{BootstrapError, Result};
use crate::poll::{await_condition, PollOutcome};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Per-attempt connect timeout. Kept short so a black-holed address does not
/// eat most of the overall deadline in a single attempt.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

fn try_connect(dep: &Dependency) -> bool {
    let addrs = match (dep.host.as_str(), dep.port).to_socket_addrs() {
        Ok(addrs) => addrs,
        // Name resolution failing counts as "not ready yet": in a compose
        // network the DNS entry appears when the container starts.
        Err(_) => return false,
    };
    for addr in addrs {
        if TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT).is_ok() {
            return true;
        }
    }
    false
}

/// Block until `dep` accepts a TCP connection, retrying every `interval`.
///
/// Returns [`BootstrapError::DependencyUnreachable`] once `timeout` elapses
/// with no successful connection. That error is fatal to the sequencer;
/// there is no retry above this layer.
pub fn wait_ready(dep: &Dependency, timeout: Duration, interval: Duration) -> Result<()> {
    tracing::debug!(dependency = %dep.name, addr = %dep.addr(), "probing");
    match await_condition(|| try_connect(dep).then_some(()), interval, timeout) {
        PollOutcome::Ready(()) => {
            tracing::info!(dependency = %dep.name, addr = %dep.addr(), "reachable");
            Ok(())
        }
        PollOutcome::TimedOut { waited } => Err(BootstrapError::DependencyUnreachable {
            name: dep.name.clone(),
            addr: dep.addr(),
            waited_secs: waited.as_secs(),
        }),
    }
}

/// Probe all dependencies concurrently and join.
///
/// Ordering between checks is irrelevant since every one must succeed; the
/// fan-out only bounds total wait by the slowest dependency instead of the
/// sum. Returns the first failure (remaining failures are logged).
pub fn wait_all_ready(
    deps: &[Dependency],
    timeout: Duration,
    interval: Duration,
) -> Result<()> {
    let results: Vec<Result<()>> = std::thread::scope(|scope| {
        let handles: Vec<_> = deps
            .iter()
            .map(|dep| scope.spawn(move || wait_ready(dep, timeout, interval)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut first_err = None;
    for result in results {
        if let Err(e) = result {
            tracing::error!(error = %e, "dependency wait failed");
            first_err.get_or_insert(e);
        }
    }
    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn listening_dep(name: &str) -> (TcpListener, Dependency) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        (
            listener,
            Dependency {
                name: name.to_string(),
                host: "127.0.0.1".to_string(),
                port,
            },
        )
    }

    fn closed_dep(name: &str) -> Dependency {
        // Bind to get a free port, then drop the listener so connects fail.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        Dependency {
            name: name.to_string(),
            host: "127.0.0.1".to_string(),
            port,
        }
    }

    #[test]
    fn ready_when_listening() {
        let (_listener, dep) = listening_dep("db");
        wait_ready(&dep, Duration::from_secs(5), Duration::from_millis(50)).unwrap();
    }

    #[test]
    fn times_out_when_nothing_listens() {
        let dep = closed_dep("redis-queue");
        let err = wait_ready(&dep, Duration::from_millis(200), Duration::from_millis(50))
            .unwrap_err();
        match err {
            BootstrapError::DependencyUnreachable { name, .. } => {
                assert_eq!(name, "redis-queue");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn becomes_ready_while_waiting() {
        let dep = closed_dep("db");
        let port = dep.port;
        let binder = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            TcpListener::bind(("127.0.0.1", port)).unwrap()
        });
        wait_ready(&dep, Duration::from_secs(5), Duration::from_millis(20)).unwrap();
        drop(binder.join().unwrap());
    }

    #[test]
    fn fan_out_reports_the_unreachable_one() {
        let (_listener, ok_dep) = listening_dep("db");
        let bad_dep = closed_dep("redis-cache");
        let err = wait_all_ready(
            &[ok_dep, bad_dep],
            Duration::from_millis(200),
            Duration::from_millis(50),
        )
        .unwrap_err();
        match err {
            BootstrapError::DependencyUnreachable { name, .. } => {
                assert_eq!(name, "redis-cache");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_dependency_set_is_ready() {
        wait_all_ready(&[], Duration::from_millis(100), Duration::from_millis(10)).unwrap();
    }
}
