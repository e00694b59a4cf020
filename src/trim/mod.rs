//! Percentile-based outlier trimming for duration data sets.
//!
//! Charted duration series routinely contain a handful of pathological
//! outliers (stuck runners, cold caches) that flatten everything else.
//! [`apply_trimming`] drops the top N percent of durations from a data set
//! while preserving the original element order; the companion helpers manage
//! the per-source slider list that drives it.

pub mod store;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use store::{TrimEvent, TrimSliderStore};

/// Upper bound offered to slider widgets. The trim functions themselves
/// tolerate any percentage below 100.
pub const MAX_TRIM_PERCENTAGE: f64 = 50.0;

// ============================================================================
// Types
// ============================================================================

/// Capability bound for trimmable records.
pub trait Trimmable {
    /// The record's duration in seconds.
    fn duration(&self) -> f64;
}

/// One per-source trim setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrimSlider {
    pub source: String,
    pub trim_percentage: f64,
}

/// The persisted slider list for one named data set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrimSliders {
    #[serde(default)]
    pub sliders: Vec<TrimSlider>,
}

impl TrimSliders {
    /// Check the context invariants: unique sources and finite percentages
    /// within `[0, 100)`.
    pub fn validate(&self) -> Result<(), String> {
        for (i, slider) in self.sliders.iter().enumerate() {
            if self.sliders[..i].iter().any(|s| s.source == slider.source) {
                return Err(format!("duplicate source {:?}", slider.source));
            }
            let pct = slider.trim_percentage;
            if !pct.is_finite() || !(0.0..100.0).contains(&pct) {
                return Err(format!(
                    "trim percentage out of range for {:?}: {pct}",
                    slider.source
                ));
            }
        }
        Ok(())
    }
}

/// Errors from trim-slider lookups.
///
/// `Display` and `Error` are hand-written: thiserror's derive would treat the
/// `source` field as the error's cause, which a `String` cannot be.
#[derive(Debug)]
pub enum TrimError {
    /// Percentage requested for a source that was never initialized.
    SliderNotFound { source: String },
}

impl fmt::Display for TrimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrimError::SliderNotFound { source } => {
                write!(f, "trim percentage not found for source: {source}")
            }
        }
    }
}

impl std::error::Error for TrimError {}

// ============================================================================
// Trimming
// ============================================================================

/// Drop the highest-duration `trim_percentage` percent of `data`.
///
/// A zero percentage (or empty input) returns the data unchanged. Otherwise
/// the threshold is the highest duration surviving the cut, computed on a
/// sorted copy; every original-order element at or below it is kept, so ties
/// at the threshold all survive. `trim_count` is clamped so at least one
/// element always remains.
pub fn apply_trimming<T>(data: &[T], trim_percentage: f64) -> Vec<T>
where
    T: Trimmable + Clone,
{
    if trim_percentage == 0.0 || data.is_empty() {
        return data.to_vec();
    }

    let total = data.len();
    let mut sorted: Vec<&T> = data.iter().collect();
    sorted.sort_by(|a, b| a.duration().total_cmp(&b.duration()));

    let trim_count = ((total as f64 * trim_percentage / 100.0).floor() as usize).min(total - 1);
    let max_threshold = sorted[total - 1 - trim_count].duration();

    data.iter()
        .filter(|record| record.duration() <= max_threshold)
        .cloned()
        .collect()
}

// ============================================================================
// Slider helpers
// ============================================================================

/// Build the slider list for a new set of sources.
///
/// One slider per source in input order, defaulting to zero; a source that
/// already had a slider in `existing` keeps its percentage. Sources absent
/// from the new list are dropped, and duplicates collapse to their first
/// occurrence.
pub fn initialize_sliders(existing: &[TrimSlider], sources: &[String]) -> Vec<TrimSlider> {
    let mut sliders: Vec<TrimSlider> = Vec::with_capacity(sources.len());
    for source in sources {
        if sliders.iter().any(|s| &s.source == source) {
            continue;
        }
        let trim_percentage = existing
            .iter()
            .find(|s| &s.source == source)
            .map(|s| s.trim_percentage)
            .unwrap_or(0.0);
        sliders.push(TrimSlider {
            source: source.clone(),
            trim_percentage,
        });
    }
    sliders
}

/// Replace one slider's percentage, returning the new list.
///
/// An unknown source leaves the list unchanged.
pub fn update_slider_value(sliders: &[TrimSlider], source: &str, value: f64) -> Vec<TrimSlider> {
    sliders
        .iter()
        .map(|slider| {
            if slider.source == source {
                TrimSlider {
                    source: slider.source.clone(),
                    trim_percentage: value,
                }
            } else {
                slider.clone()
            }
        })
        .collect()
}

/// Look up the stored percentage for `source`.
///
/// Callers must initialize before querying; an unknown source is a contract
/// violation, not a recoverable condition.
pub fn trim_percentage(sliders: &[TrimSlider], source: &str) -> Result<f64, TrimError> {
    sliders
        .iter()
        .find(|s| s.source == source)
        .map(|s| s.trim_percentage)
        .ok_or_else(|| TrimError::SliderNotFound {
            source: source.to_string(),
        })
}

// ============================================================================
// Tests
// ============================================================================
