use anyhow::{Context, Result};
use chrono::Utc;

use super::format::{format_status, StatusReport};
use super::{load_config, open_manager, Target};

pub async fn run(target: &Target, json: bool) -> Result<()> {
    let config = load_config(target)?;
    let manager = open_manager(&config).await?;
    let settings = manager.settings();

    let summary = manager
        .status()
        .await
        .context("Failed to query sandbox status")?;
    let report = StatusReport::new(
        &settings.name,
        &settings.image,
        settings.volume_name(),
        summary.as_ref(),
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", format_status(&report, Utc::now()));
    }

    Ok(())
}
