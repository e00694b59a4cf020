//! Login command storing the GitLab credential.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use pipetrend::auth::{AuthState, AuthStore};
use pipetrend::config::Config;

use super::open_storage;

/// Prompt for any missing value, validate, and persist the credential.
pub async fn run(config_path: &str, domain: Option<String>, token: Option<String>) -> Result<()> {
    let config = Config::load(config_path).await?;
    let storage = open_storage(&config);

    let domain = match domain {
        Some(d) => d,
        None => prompt("GitLab domain (e.g. gitlab.com)").await?,
    };
    let token = match token {
        Some(t) => t,
        None => prompt("Access token").await?,
    };

    let state = AuthState { domain, token };
    let auth = AuthStore::new(storage);
    auth.save(&state).await.context("saving credentials")?;

    println!("Logged in to {}.", state.domain);
    Ok(())
}

async fn prompt(label: &str) -> Result<String> {
    eprint!("{}: ", label);
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    Ok(lines
        .next_line()
        .await?
        .unwrap_or_default()
        .trim()
        .to_string())
}
