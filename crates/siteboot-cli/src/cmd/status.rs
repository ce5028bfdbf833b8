use std::path::Path;

use siteboot_core::paths;
use siteboot_core::status::BootstrapStatus;

use crate::output::{print_json, print_table};

/// Render the persisted bootstrap report.
pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    if !paths::status_path(root).exists() {
        println!("no bootstrap has run yet");
        return Ok(());
    }

    let status = BootstrapStatus::load(root)?;

    if json {
        print_json(&status)?;
        return Ok(());
    }

    println!(
        "site: {}    outcome: {}",
        status.site,
        status.outcome.as_deref().unwrap_or("in progress")
    );
    println!();

    let fmt_ts = |ts: Option<chrono::DateTime<chrono::Utc>>| {
        ts.map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string())
    };

    let rows: Vec<Vec<String>> = status
        .stages
        .iter()
        .map(|r| {
            vec![
                r.stage.as_str().to_string(),
                format!("{:?}", r.state).to_lowercase(),
                fmt_ts(r.started_at),
                fmt_ts(r.completed_at),
                r.error.clone().unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();
    print_table(&["STAGE", "STATE", "STARTED", "COMPLETED", "ERROR"], &rows);

    Ok(())
}
