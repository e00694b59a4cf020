//! Flattening fetched pipeline data into chartable duration series.
//!
//! Fetched pages keep GitLab's nested connection shape; this module turns
//! them into flat [`DurationPoint`] lists, groups them per label, and
//! produces the text summaries the CLI prints.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::gitlab::queries::{PipelineJobsNode, PipelineNode, PipelinePage};
use crate::trim::Trimmable;

/// Label substituted for pipelines with no recorded trigger source.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// One plotted duration sample.
#[derive(Debug, Clone, PartialEq)]
pub struct DurationPoint {
    pub label: String,
    pub duration_secs: f64,
    pub date: DateTime<Utc>,
    pub link: Option<String>,
}

impl Trimmable for DurationPoint {
    fn duration(&self) -> f64 {
        self.duration_secs
    }
}

/// Which jobs to chart and how to relabel them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobRules {
    /// Job names to keep. Empty keeps every job.
    #[serde(default)]
    pub tracked: Vec<String>,
    /// Renames applied after the tracked filter, folding related jobs into
    /// one series.
    #[serde(default)]
    pub merge: BTreeMap<String, String>,
}

impl JobRules {
    /// The series label for a job name, or `None` when the job is filtered
    /// out.
    pub fn label_for(&self, name: &str) -> Option<String> {
        if !self.tracked.is_empty() && !self.tracked.iter().any(|t| t == name) {
            return None;
        }
        Some(
            self.merge
                .get(name)
                .cloned()
                .unwrap_or_else(|| name.to_string()),
        )
    }
}

// ============================================================================
// Flattening
// ============================================================================

/// Nodes of a fetched page, or an empty slice when the service returned no
/// project or connection.
pub fn page_nodes<N>(page: &PipelinePage<N>) -> &[N] {
    page.project
        .as_ref()
        .and_then(|p| p.pipelines.as_ref())
        .and_then(|c| c.nodes.as_deref())
        .unwrap_or_default()
}

/// Flatten a pipeline page into points labeled by trigger source.
///
/// Pipelines with no duration are skipped; an absent source becomes
/// [`UNKNOWN_SOURCE`]. Fetch order is preserved.
pub fn pipeline_points(page: &PipelinePage<PipelineNode>) -> Vec<DurationPoint> {
    page_nodes(page)
        .iter()
        .filter_map(|node| {
            let duration_secs = node.duration?;
            Some(DurationPoint {
                label: node
                    .source
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_SOURCE.to_string()),
                duration_secs,
                date: node.created_at,
                link: node.path.clone(),
            })
        })
        .collect()
}

/// Flatten a job-durations page into per-job points, applying `rules`.
///
/// Each point carries its pipeline's creation date so merged series stay in
/// run order. Jobs without a name or duration are skipped.
pub fn job_points(page: &PipelinePage<PipelineJobsNode>, rules: &JobRules) -> Vec<DurationPoint> {
    let mut points = Vec::new();
    for pipeline in page_nodes(page) {
        let Some(jobs) = pipeline.jobs.as_ref().and_then(|j| j.nodes.as_deref()) else {
            continue;
        };
        for job in jobs {
            let Some(duration_secs) = job.duration else {
                continue;
            };
            let Some(name) = job.name.as_deref() else {
                continue;
            };
            let Some(label) = rules.label_for(name) else {
                continue;
            };
            points.push(DurationPoint {
                label,
                duration_secs,
                date: pipeline.created_at,
                link: job.web_path.clone(),
            });
        }
    }
    points
}

// ============================================================================
// Grouping and summaries
// ============================================================================

/// Group points by label, each group sorted ascending by date.
pub fn group_by_label(points: Vec<DurationPoint>) -> BTreeMap<String, Vec<DurationPoint>> {
    let mut groups: BTreeMap<String, Vec<DurationPoint>> = BTreeMap::new();
    for point in points {
        groups.entry(point.label.clone()).or_default().push(point);
    }
    for group in groups.values_mut() {
        group.sort_by_key(|p| p.date);
    }
    groups
}

/// Aggregate stats for one label's points.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSummary {
    pub count: usize,
    pub total_secs: f64,
    pub mean_secs: f64,
    pub min_secs: f64,
    pub max_secs: f64,
}

/// Summarize a group of points. Returns `None` for an empty group.
pub fn summarize(points: &[DurationPoint]) -> Option<GroupSummary> {
    if points.is_empty() {
        return None;
    }

    let mut total = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for point in points {
        total += point.duration_secs;
        min = min.min(point.duration_secs);
        max = max.max(point.duration_secs);
    }

    Some(GroupSummary {
        count: points.len(),
        total_secs: total,
        mean_secs: total / points.len() as f64,
        min_secs: min,
        max_secs: max,
    })
}

/// Render seconds as a compact `3m 42s` string.
pub fn format_duration(secs: f64) -> String {
    let total = secs.round() as i64;
    let minutes = total / 60;
    let seconds = total % 60;
    if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
