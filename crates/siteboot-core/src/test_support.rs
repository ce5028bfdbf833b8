//! Scripted collaborators shared by unit tests.

use std::sync::Mutex;

use crate::app_cli::{CliOutput, PlatformCli};
use crate::error::{BootstrapError, Result};
use crate::reconcile::ServiceController;

/// Records every invocation; individual commands can be scripted to fail
/// (non-zero exit) or error (spawn failure) by argument substring.
#[derive(Default)]
pub struct MockCli {
    calls: Mutex<Vec<Vec<String>>>,
    failures: Mutex<Vec<(String, String)>>,
    errors: Mutex<Vec<(String, String)>>,
}

impl MockCli {
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    /// Commands whose args contain `needle` exit non-zero with `reason` on stdout.
    pub fn fail_matching(&self, needle: &str, reason: &str) {
        self.failures
            .lock()
            .unwrap()
            .push((needle.to_string(), reason.to_string()));
    }

    /// Commands whose args contain `needle` fail to spawn entirely.
    pub fn error_matching(&self, needle: &str, reason: &str) {
        self.errors
            .lock()
            .unwrap()
            .push((needle.to_string(), reason.to_string()));
    }
}

impl PlatformCli for MockCli {
    fn run(&self, args: &[&str]) -> Result<CliOutput> {
        self.calls
            .lock()
            .unwrap()
            .push(args.iter().map(|a| a.to_string()).collect());

        for (needle, reason) in self.errors.lock().unwrap().iter() {
            if args.iter().any(|a| a.contains(needle.as_str())) {
                return Err(BootstrapError::CliSpawnFailed(reason.clone()));
            }
        }
        for (needle, reason) in self.failures.lock().unwrap().iter() {
            if args.iter().any(|a| a.contains(needle.as_str())) {
                return Ok(CliOutput {
                    success: false,
                    stdout: reason.clone(),
                });
            }
        }
        Ok(CliOutput {
            success: true,
            stdout: String::new(),
        })
    }
}

/// Records restarts; can be scripted to refuse one service.
#[derive(Default)]
pub struct MockController {
    restarted: Mutex<Vec<String>>,
    fail_service: Mutex<Option<String>>,
}

impl MockController {
    pub fn restarted(&self) -> Vec<String> {
        self.restarted.lock().unwrap().clone()
    }

    pub fn fail_for(&self, service: &str) {
        *self.fail_service.lock().unwrap() = Some(service.to_string());
    }
}

impl ServiceController for MockController {
    fn restart(&self, service: &str) -> std::result::Result<(), String> {
        self.restarted.lock().unwrap().push(service.to_string());
        match self.fail_service.lock().unwrap().as_deref() {
            Some(s) if s == service => Err(format!("no such service: {service}")),
            _ => Ok(()),
        }
    }
}
