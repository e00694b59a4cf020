//! Per-job duration report command.

use anyhow::{Context, Result, bail};

use pipetrend::config::Config;
use pipetrend::gitlab::{GitLabClient, JobDurationsQuery};
use pipetrend::report;
use pipetrend::trim::TrimSliderStore;

use super::{open_storage, require_auth, trimmed_report};

pub async fn run(
    config_path: &str,
    project: Option<String>,
    pages: Option<u32>,
    trim: Vec<(String, f64)>,
) -> Result<()> {
    let config = Config::load(config_path).await?;
    let storage = open_storage(&config);
    let auth = require_auth(&storage).await?;

    let Some(project) = project.or_else(|| config.gitlab.project.clone()) else {
        bail!("No project given. Pass --project or set gitlab.project in the config.");
    };
    let max_pages = pages.unwrap_or(config.gitlab.max_pages);

    let client =
        GitLabClient::with_timeout(&auth.domain, &auth.token, config.gitlab.request_timeout());
    let page = client
        .fetch_paginated::<JobDurationsQuery>(&project, max_pages)
        .await
        .context("fetching job durations")?;

    let Some(page) = page else {
        println!("No pages fetched for {}.", project);
        return Ok(());
    };

    let points = report::job_points(&page, &config.jobs);
    let mut store = TrimSliderStore::open("jobs", storage).await?;
    let lines = trimmed_report(&mut store, points, &trim)?;
    store.close().await;

    println!("Job durations for {}:", project);
    if lines.is_empty() {
        println!("  (no tracked jobs found)");
    }
    for line in lines {
        println!("  {}", line);
    }
    Ok(())
}
