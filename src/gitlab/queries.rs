//! Typed GraphQL documents and their wire shapes.
//!
//! Both dashboard queries page through a project's successful pipelines and
//! share the `{project {pipelines {pageInfo nodes}}}` shape; they differ only
//! in the node selection. Documents are plain strings paired with variable
//! and result types through [`GraphqlQuery`].

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::paginate::Paged;

// ============================================================================
// Query descriptors
// ============================================================================

/// A typed GraphQL document: the query text plus its variable and result
/// shapes.
pub trait GraphqlQuery {
    /// Operation name, used in logs.
    const NAME: &'static str;
    /// The document sent to the service.
    const DOCUMENT: &'static str;
    type Variables: Serialize + Send + Sync;
    type Data: DeserializeOwned;
}

/// Variables shared by both pipeline queries.
///
/// `cursor` is omitted from the serialized variables when absent, matching
/// a first-page request.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineVariables {
    pub app: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// Per-pipeline durations grouped by trigger source.
pub struct PipesQuery;

impl GraphqlQuery for PipesQuery {
    const NAME: &'static str = "Pipes";
    const DOCUMENT: &'static str = "\
query Pipes($app: ID!, $cursor: String) {
  project(fullPath: $app) {
    name
    pipelines(status: SUCCESS, first: 100, after: $cursor) {
      pageInfo {
        hasNextPage
        endCursor
      }
      nodes {
        source
        path
        duration
        createdAt
        finishedAt
      }
    }
  }
}";
    type Variables = PipelineVariables;
    type Data = PipelinePage<PipelineNode>;
}

/// Per-job durations for each pipeline.
pub struct JobDurationsQuery;

impl GraphqlQuery for JobDurationsQuery {
    const NAME: &'static str = "JobDurations";
    const DOCUMENT: &'static str = "\
query JobDurations($app: ID!, $cursor: String) {
  project(fullPath: $app) {
    name
    pipelines(status: SUCCESS, first: 100, after: $cursor) {
      pageInfo {
        hasNextPage
        endCursor
      }
      nodes {
        duration
        createdAt
        finishedAt
        jobs(statuses: [SUCCESS]) {
          nodes {
            name
            webPath
            duration
          }
        }
      }
    }
  }
}";
    type Variables = PipelineVariables;
    type Data = PipelinePage<PipelineJobsNode>;
}

// ============================================================================
// Response envelope
// ============================================================================

/// The standard GraphQL response envelope.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct GraphqlResponse<T> {
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Option<Vec<GraphqlErrorEntry>>,
}

/// One service-reported error.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphqlErrorEntry {
    pub message: String,
}

// ============================================================================
// Result shapes
// ============================================================================

/// Cursor info for one fetched page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub end_cursor: Option<String>,
}

/// Root payload of both queries.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "N: Deserialize<'de>"))]
pub struct PipelinePage<N> {
    #[serde(default)]
    pub project: Option<ProjectPipelines<N>>,
}

/// The selected project and its pipeline connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "N: Deserialize<'de>"))]
pub struct ProjectPipelines<N> {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub pipelines: Option<PipelineConnection<N>>,
}

/// One page worth of pipeline nodes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "N: Deserialize<'de>"))]
pub struct PipelineConnection<N> {
    #[serde(default)]
    pub page_info: PageInfo,
    #[serde(default)]
    pub nodes: Option<Vec<N>>,
}

/// Pipeline record selected by [`PipesQuery`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineNode {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Pipeline record selected by [`JobDurationsQuery`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineJobsNode {
    #[serde(default)]
    pub duration: Option<f64>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub jobs: Option<JobConnection>,
}

/// The nested job connection of one pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct JobConnection {
    #[serde(default)]
    pub nodes: Option<Vec<JobNode>>,
}

/// One job record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobNode {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub web_path: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
}

impl<N> Paged for PipelinePage<N> {
    fn page_info(&self) -> Option<&PageInfo> {
        Some(&self.project.as_ref()?.pipelines.as_ref()?.page_info)
    }

    fn merge(&mut self, next: Self) {
        let Some(next_connection) = next.project.and_then(|p| p.pipelines) else {
            return;
        };
        let Some(connection) = self.project.as_mut().and_then(|p| p.pipelines.as_mut()) else {
            return;
        };
        connection
            .nodes
            .get_or_insert_with(Vec::new)
            .extend(next_connection.nodes.unwrap_or_default());
        connection.page_info = next_connection.page_info;
    }
}

// ============================================================================
// Tests
// ============================================================================
