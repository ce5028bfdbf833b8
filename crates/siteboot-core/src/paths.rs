use crate::error::{BootstrapError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const CONFIG_FILE: &str = "siteboot.yaml";
pub const SITES_DIR: &str = "sites";
pub const APPS_DIR: &str = "apps";

pub const SHARED_CONFIG_FILE: &str = "sites/common_site_config.json";
pub const DEFAULT_SITE_FILE: &str = "sites/currentsite.txt";
pub const STATUS_FILE: &str = "sites/.bootstrap-status.json";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn sites_dir(root: &Path) -> PathBuf {
    root.join(SITES_DIR)
}

pub fn site_dir(root: &Path, site: &str) -> PathBuf {
    root.join(SITES_DIR).join(site)
}

pub fn apps_dir(root: &Path) -> PathBuf {
    root.join(APPS_DIR)
}

pub fn shared_config_path(root: &Path) -> PathBuf {
    root.join(SHARED_CONFIG_FILE)
}

pub fn default_site_path(root: &Path) -> PathBuf {
    root.join(DEFAULT_SITE_FILE)
}

pub fn status_path(root: &Path) -> PathBuf {
    root.join(STATUS_FILE)
}

// ---------------------------------------------------------------------------
// Site name validation
// ---------------------------------------------------------------------------

static SITE_NAME_RE: OnceLock<Regex> = OnceLock::new();

fn site_name_re() -> &'static Regex {
    // Hostname-shaped: lowercase alphanumeric labels, dots and hyphens inside.
    SITE_NAME_RE
        .get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9.\-]*[a-z0-9]$|^[a-z0-9]$").unwrap())
}

pub fn validate_site_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > 253 || !site_name_re().is_match(name) {
        return Err(BootstrapError::InvalidSiteName(name.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
