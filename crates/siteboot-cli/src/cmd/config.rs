use anyhow::Context;
use clap::Subcommand;
use std::path::Path;

use siteboot_core::config::{BootstrapConfig, WarnLevel};

use crate::output::{print_json, print_table};

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Check siteboot.yaml for problems
    Validate,
    /// Print the effective configuration
    Show,
}

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Validate => validate(root, json),
        ConfigSubcommand::Show => show(root, json),
    }
}

fn validate(root: &Path, json: bool) -> anyhow::Result<()> {
    let cfg = BootstrapConfig::load(root).context("failed to load siteboot.yaml")?;
    let warnings = cfg.validate();

    if json {
        print_json(&warnings)?;
    } else if warnings.is_empty() {
        println!("configuration ok");
    } else {
        let rows: Vec<Vec<String>> = warnings
            .iter()
            .map(|w| {
                vec![
                    format!("{:?}", w.level).to_lowercase(),
                    w.message.clone(),
                ]
            })
            .collect();
        print_table(&["LEVEL", "MESSAGE"], &rows);
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("configuration has errors");
    }
    Ok(())
}

fn show(root: &Path, json: bool) -> anyhow::Result<()> {
    let cfg = BootstrapConfig::load(root).context("failed to load siteboot.yaml")?;
    if json {
        print_json(&cfg)?;
    } else {
        print!("{}", serde_yaml::to_string(&cfg)?);
    }
    Ok(())
}
