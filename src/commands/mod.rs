//! CLI command implementations.

use std::sync::Arc;

use anyhow::{Context, Result, bail};

use pipetrend::auth::{AuthState, AuthStore};
use pipetrend::config::Config;
use pipetrend::report::{DurationPoint, format_duration, group_by_label, summarize};
use pipetrend::store::{FileSettingsStore, SettingsStore};
use pipetrend::trim::{MAX_TRIM_PERCENTAGE, TrimEvent, TrimSliderStore};

pub mod jobs;
pub mod login;
pub mod pipes;

/// Open the settings store under the configured storage directory.
fn open_storage(config: &Config) -> Arc<dyn SettingsStore> {
    Arc::new(FileSettingsStore::new(config.storage_path()))
}

/// Load the stored credential or fail with a login hint.
async fn require_auth(storage: &Arc<dyn SettingsStore>) -> Result<AuthState> {
    let auth = AuthStore::new(Arc::clone(storage));
    match auth.load().await.context("loading stored credentials")? {
        Some(state) => Ok(state),
        None => bail!("Not logged in. Run `pipetrend login` first."),
    }
}

/// Group points, sync the store's sliders to the discovered sources, apply
/// any `--trim` overrides, and render one summary line per group after
/// trimming.
fn trimmed_report(
    store: &mut TrimSliderStore,
    points: Vec<DurationPoint>,
    overrides: &[(String, f64)],
) -> Result<Vec<String>> {
    let groups = group_by_label(points);
    let sources: Vec<String> = groups.keys().cloned().collect();
    store.dispatch(TrimEvent::InitializeSliders { sources });

    for (source, value) in overrides {
        store.dispatch(TrimEvent::UpdateSliderValue {
            source: source.clone(),
            value: value.clamp(0.0, MAX_TRIM_PERCENTAGE),
        });
    }

    let mut lines = Vec::new();
    for (label, group) in &groups {
        let pct = store.trim_percentage(label)?;
        let kept = store.trimmed(group, label)?;
        let Some(summary) = summarize(&kept) else {
            continue;
        };

        let note = if pct > 0.0 {
            format!(" (trim {pct}%, dropped {})", group.len() - kept.len())
        } else {
            String::new()
        };
        lines.push(format!(
            "{}: {} runs, mean {}, min {}, max {}{}",
            label,
            summary.count,
            format_duration(summary.mean_secs),
            format_duration(summary.min_secs),
            format_duration(summary.max_secs),
            note,
        ));
    }
    Ok(lines)
}
