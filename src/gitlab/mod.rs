//! GitLab GraphQL client.
//!
//! Provides `GitLabClient` for executing the dashboard's typed queries
//! against a GitLab instance's `/api/graphql` endpoint, plus the
//! cursor-pagination aggregator that stitches multi-page results together.

pub mod error;
pub mod paginate;
pub mod queries;

pub use error::FetchError;
pub use paginate::{DEFAULT_MAX_PAGES, Paged, fetch_paginated};
pub use queries::{GraphqlQuery, JobDurationsQuery, PipelineVariables, PipesQuery};

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, error};

use queries::GraphqlResponse;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Request body for a GraphQL POST.
#[derive(serde::Serialize)]
struct GraphqlRequest<'a, V> {
    query: &'a str,
    variables: &'a V,
}

/// HTTP client for a GitLab GraphQL endpoint.
#[derive(Debug, Clone)]
pub struct GitLabClient {
    endpoint: String,
    token: String,
    timeout: Duration,
    http: Client,
}

impl GitLabClient {
    /// Create a client for the given instance domain.
    ///
    /// Example: `GitLabClient::new("gitlab.com", token)`
    #[must_use]
    pub fn new(domain: &str, token: &str) -> Self {
        Self::with_timeout(domain, token, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a client with a non-default request timeout.
    #[must_use]
    pub fn with_timeout(domain: &str, token: &str, timeout: Duration) -> Self {
        let domain = domain.trim().trim_end_matches('/');
        Self {
            endpoint: format!("https://{}/api/graphql", domain),
            token: token.to_string(),
            timeout,
            http: Client::new(),
        }
    }

    /// Execute a single query and unwrap the response envelope.
    ///
    /// Every entry in the envelope's `errors` list is logged; the first one
    /// becomes the returned error.
    pub async fn execute<Q: GraphqlQuery>(
        &self,
        variables: &Q::Variables,
    ) -> Result<Q::Data, FetchError> {
        debug!(query = Q::NAME, "Sending GraphQL request");
        let body = GraphqlRequest {
            query: Q::DOCUMENT,
            variables,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .timeout(self.timeout)
            .header("Content-Type", "application/json")
            .header("Accept", "application/graphql-response+json")
            .header("Authorization", format!("Bearer {}", self.token))
            .json(&body)
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(FetchError::Unauthorized);
        }
        if !response.status().is_success() {
            return Err(FetchError::status(response.status().as_u16()));
        }

        let envelope: GraphqlResponse<Q::Data> = response.json().await?;

        if let Some(errors) = &envelope.errors
            && !errors.is_empty()
        {
            for entry in errors {
                error!(query = Q::NAME, message = %entry.message, "GraphQL error");
            }
            return Err(FetchError::graphql(errors[0].message.clone()));
        }

        envelope.data.ok_or(FetchError::MissingData)
    }

    /// Fetch up to `max_pages` pages of a pipeline query for `app` and merge
    /// them into one result. See [`paginate::fetch_paginated`] for the loop
    /// semantics.
    pub async fn fetch_paginated<Q>(
        &self,
        app: &str,
        max_pages: u32,
    ) -> Result<Option<Q::Data>, FetchError>
    where
        Q: GraphqlQuery<Variables = PipelineVariables>,
        Q::Data: Paged,
    {
        let client = self.clone();
        let app = app.to_string();

        paginate::fetch_paginated(None, max_pages, move |cursor| {
            let client = client.clone();
            let variables = PipelineVariables {
                app: app.clone(),
                cursor,
            };
            async move { client.execute::<Q>(&variables).await }
        })
        .await
    }
}
