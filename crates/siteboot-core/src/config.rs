use crate::error::{BootstrapError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Dependency
// ---------------------------------------------------------------------------

/// A service the bootstrap must be able to reach before provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub host: String,
    pub port: u16,
}

impl Dependency {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_dependencies() -> Vec<Dependency> {
    vec![
        Dependency {
            name: "db".to_string(),
            host: "db".to_string(),
            port: 3306,
        },
        Dependency {
            name: "redis-cache".to_string(),
            host: "redis-cache".to_string(),
            port: 6379,
        },
        Dependency {
            name: "redis-queue".to_string(),
            host: "redis-queue".to_string(),
            port: 6379,
        },
    ]
}

// ---------------------------------------------------------------------------
// SiteSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteSettings {
    pub name: String,
    #[serde(default)]
    pub admin_password: String,
    /// Database/schema name; empty means let the platform CLI derive one.
    #[serde(default)]
    pub db_name: String,
    #[serde(default)]
    pub db_password: String,
    #[serde(default)]
    pub db_root_password: String,
}

// ---------------------------------------------------------------------------
// SharedConfigSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfigSettings {
    /// Path of the shared JSON artifact, relative to the project root.
    #[serde(default = "default_shared_config_path")]
    pub path: String,
    /// Keys that must all be populated before provisioning may start.
    #[serde(default = "default_required_keys")]
    pub required_keys: Vec<String>,
}

fn default_shared_config_path() -> String {
    paths::SHARED_CONFIG_FILE.to_string()
}

fn default_required_keys() -> Vec<String> {
    vec![
        "db_host".to_string(),
        "redis_cache".to_string(),
        "redis_queue".to_string(),
    ]
}

impl Default for SharedConfigSettings {
    fn default() -> Self {
        Self {
            path: default_shared_config_path(),
            required_keys: default_required_keys(),
        }
    }
}

// ---------------------------------------------------------------------------
// Timeouts
// ---------------------------------------------------------------------------

/// Wait bounds for the two blocking phases. The upstream stack hardcodes
/// 120s for both; here they are independent fields so a deployment with a
/// slow database warm-up can raise one without touching the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeouts {
    #[serde(default = "default_wait_secs")]
    pub dependency_secs: u64,
    #[serde(default = "default_wait_secs")]
    pub config_secs: u64,
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_wait_secs() -> u64 {
    120
}

fn default_probe_interval_secs() -> u64 {
    2
}

fn default_poll_interval_secs() -> u64 {
    5
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            dependency_secs: default_wait_secs(),
            config_secs: default_wait_secs(),
            probe_interval_secs: default_probe_interval_secs(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

impl Timeouts {
    pub fn dependency(&self) -> Duration {
        Duration::from_secs(self.dependency_secs)
    }

    pub fn config(&self) -> Duration {
        Duration::from_secs(self.config_secs)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

// ---------------------------------------------------------------------------
// AddonSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddonSettings {
    /// Directory whose immediate subdirectories are the installable addons.
    #[serde(default = "default_addons_dir")]
    pub dir: String,
    /// Addon names never installed (e.g. the platform's own core package).
    #[serde(default)]
    pub exclude: Vec<String>,
}

fn default_addons_dir() -> String {
    paths::APPS_DIR.to_string()
}

impl Default for AddonSettings {
    fn default() -> Self {
        Self {
            dir: default_addons_dir(),
            exclude: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// CliSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliSettings {
    /// Name (or path) of the wrapped platform's CLI binary.
    #[serde(default = "default_cli_program")]
    pub program: String,
}

fn default_cli_program() -> String {
    "bench".to_string()
}

impl Default for CliSettings {
    fn default() -> Self {
        Self {
            program: default_cli_program(),
        }
    }
}

// ---------------------------------------------------------------------------
// BootstrapConfig (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    pub site: SiteSettings,
    #[serde(default = "default_dependencies")]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub shared_config: SharedConfigSettings,
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default)]
    pub addons: AddonSettings,
    #[serde(default)]
    pub cli: CliSettings,
    /// Services restarted after reconcile so they pick up fresh site config.
    #[serde(default = "default_workers")]
    pub workers: Vec<String>,
}

fn default_version() -> u32 {
    1
}

fn default_workers() -> Vec<String> {
    vec!["worker".to_string(), "scheduler".to_string()]
}

impl BootstrapConfig {
    pub fn new(site_name: impl Into<String>) -> Self {
        Self {
            version: 1,
            site: SiteSettings {
                name: site_name.into(),
                admin_password: String::new(),
                db_name: String::new(),
                db_password: String::new(),
                db_root_password: String::new(),
            },
            dependencies: default_dependencies(),
            shared_config: SharedConfigSettings::default(),
            timeouts: Timeouts::default(),
            addons: AddonSettings::default(),
            cli: CliSettings::default(),
            workers: default_workers(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(BootstrapError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: BootstrapConfig = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if paths::validate_site_name(&self.site.name).is_err() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("invalid site name '{}'", self.site.name),
            });
        }

        if self.site.admin_password.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "site.admin_password is empty; pass --admin-password at bootstrap"
                    .to_string(),
            });
        }

        if self.site.db_root_password.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "site.db_root_password is empty; pass --db-root-password at bootstrap"
                    .to_string(),
            });
        }

        if self.dependencies.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "no dependencies configured; bootstrap will not wait for any service"
                    .to_string(),
            });
        }

        let mut seen = std::collections::HashSet::new();
        for dep in &self.dependencies {
            if !seen.insert(dep.name.as_str()) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("duplicate dependency name '{}'", dep.name),
                });
            }
        }

        if self.timeouts.dependency_secs == 0 || self.timeouts.config_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "timeouts must be non-zero; a zero deadline fails on the first check"
                    .to_string(),
            });
        }

        if self.shared_config.required_keys.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "shared_config.required_keys is empty; the config wait is a no-op"
                    .to_string(),
            });
        }

        if self.cli.program.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "cli.program is empty".to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = BootstrapConfig::new("acme.localhost");
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let parsed: BootstrapConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.site.name, "acme.localhost");
        assert_eq!(parsed.version, 1);
        assert_eq!(parsed.timeouts.dependency_secs, 120);
        assert_eq!(parsed.timeouts.config_secs, 120);
    }

    #[test]
    fn minimal_yaml_gets_defaults() {
        let yaml = "site:\n  name: acme\n";
        let cfg: BootstrapConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.version, 1);
        assert_eq!(cfg.dependencies.len(), 3);
        assert_eq!(
            cfg.shared_config.required_keys,
            vec!["db_host", "redis_cache", "redis_queue"]
        );
        assert_eq!(cfg.cli.program, "bench");
        assert_eq!(cfg.workers, vec!["worker", "scheduler"]);
    }

    #[test]
    fn dependency_list_overrides_defaults() {
        let yaml = r#"
site:
  name: acme
dependencies:
  - name: pg
    host: 127.0.0.1
    port: 5432
"#;
        let cfg: BootstrapConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.dependencies.len(), 1);
        assert_eq!(cfg.dependencies[0].addr(), "127.0.0.1:5432");
    }

    #[test]
    fn load_missing_config_is_not_initialized() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = BootstrapConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, BootstrapError::NotInitialized));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let cfg = BootstrapConfig::new("acme");
        cfg.save(dir.path()).unwrap();
        let loaded = BootstrapConfig::load(dir.path()).unwrap();
        assert_eq!(loaded.site.name, "acme");
    }

    #[test]
    fn validate_flags_empty_credentials() {
        let cfg = BootstrapConfig::new("acme");
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("admin_password")));
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("db_root_password")));
    }

    #[test]
    fn validate_flags_zero_timeout_as_error() {
        let mut cfg = BootstrapConfig::new("acme");
        cfg.timeouts.config_secs = 0;
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("non-zero")));
    }

    #[test]
    fn validate_flags_duplicate_dependency() {
        let mut cfg = BootstrapConfig::new("acme");
        cfg.dependencies.push(cfg.dependencies[0].clone());
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("duplicate dependency")));
    }

    #[test]
    fn validate_flags_bad_site_name_as_error() {
        let cfg = BootstrapConfig::new("Not A Site");
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("invalid site name")));
    }
}
