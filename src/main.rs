mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use pipetrend::config::DEFAULT_CONFIG_FILE;

// ============================================================================
// CLI Types
// ============================================================================

/// Pipetrend - pipeline and job duration trends for GitLab projects
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store the GitLab domain and access token
    Login {
        /// Path to configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        config: String,

        /// GitLab instance domain, e.g. gitlab.com
        #[arg(long)]
        domain: Option<String>,

        /// Access token with read_api scope
        #[arg(long)]
        token: Option<String>,
    },

    /// Report pipeline durations grouped by trigger source
    Pipes {
        /// Path to configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        config: String,

        /// Project full path, e.g. group/app (overrides config file)
        #[arg(short, long)]
        project: Option<String>,

        /// Maximum pages to fetch (overrides config file)
        #[arg(long)]
        pages: Option<u32>,

        /// Trim override as SOURCE=PCT, repeatable
        #[arg(long = "trim", value_parser = parse_trim_spec)]
        trim: Vec<(String, f64)>,
    },

    /// Report job durations grouped by job name
    Jobs {
        /// Path to configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        config: String,

        /// Project full path, e.g. group/app (overrides config file)
        #[arg(short, long)]
        project: Option<String>,

        /// Maximum pages to fetch (overrides config file)
        #[arg(long)]
        pages: Option<u32>,

        /// Trim override as JOB=PCT, repeatable
        #[arg(long = "trim", value_parser = parse_trim_spec)]
        trim: Vec<(String, f64)>,
    },
}

/// Parse a `SOURCE=PCT` trim override.
fn parse_trim_spec(spec: &str) -> Result<(String, f64), String> {
    let Some((source, pct)) = spec.split_once('=') else {
        return Err(format!("expected SOURCE=PCT, got '{spec}'"));
    };
    let value: f64 = pct
        .parse()
        .map_err(|_| format!("invalid percentage '{pct}'"))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("percentage must be non-negative, got '{pct}'"));
    }
    Ok((source.to_string(), value))
}

// ============================================================================
// Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> std::process::ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Login {
            config,
            domain,
            token,
        } => commands::login::run(&config, domain, token).await,
        Commands::Pipes {
            config,
            project,
            pages,
            trim,
        } => commands::pipes::run(&config, project, pages, trim).await,
        Commands::Jobs {
            config,
            project,
            pages,
            trim,
        } => commands::jobs::run(&config, project, pages, trim).await,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trim_spec() {
        assert_eq!(
            parse_trim_spec("push=12.5").unwrap(),
            ("push".to_string(), 12.5)
        );
        assert!(parse_trim_spec("push").is_err());
        assert!(parse_trim_spec("push=lots").is_err());
        assert!(parse_trim_spec("push=-3").is_err());
    }
}
