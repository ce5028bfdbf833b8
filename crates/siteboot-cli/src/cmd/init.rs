use anyhow::Context;
use std::path::Path;

use siteboot_core::config::BootstrapConfig;
use siteboot_core::{io, paths};

/// Scaffold a project: `siteboot.yaml` plus the sites/ and apps/ trees.
/// Idempotent — an existing config is left untouched.
pub fn run(root: &Path, site: Option<&str>) -> anyhow::Result<()> {
    let config_path = paths::config_path(root);

    if config_path.exists() {
        println!("siteboot.yaml already exists, leaving it untouched");
    } else {
        let cfg = BootstrapConfig::new(site.unwrap_or("site1.localhost"));
        cfg.save(root).context("failed to write siteboot.yaml")?;
        println!("wrote {}", config_path.display());
    }

    io::ensure_dir(&paths::sites_dir(root)).context("failed to create sites/")?;
    io::ensure_dir(&paths::apps_dir(root)).context("failed to create apps/")?;

    Ok(())
}
