//! Integration tests walking the fetch-trim-report pipeline with canned
//! service pages and real file-backed settings storage.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use pipetrend::gitlab::queries::{PipelineJobsNode, PipelineNode, PipelinePage};
use pipetrend::gitlab::{FetchError, fetch_paginated};
use pipetrend::report::{JobRules, group_by_label, job_points, pipeline_points};
use pipetrend::store::{FileSettingsStore, SettingsStore};
use pipetrend::trim::{TrimEvent, TrimSliderStore};

// ============================================================================
// Helpers
// ============================================================================

fn page_json(end_cursor: Option<&str>, nodes: &[String]) -> String {
    let (has_next, end) = match end_cursor {
        Some(c) => ("true", format!("\"{}\"", c)),
        None => ("false", "null".to_string()),
    };
    format!(
        r#"{{"project": {{"name": "app", "pipelines": {{
            "pageInfo": {{"hasNextPage": {has_next}, "endCursor": {end}}},
            "nodes": [{}]
        }}}}}}"#,
        nodes.join(",")
    )
}

fn pipeline_json(source: &str, duration: f64, day: u32) -> String {
    format!(
        r#"{{"source": "{source}", "path": "/app/-/pipelines/{day}", "duration": {duration},
            "createdAt": "2024-05-{day:02}T12:00:00Z",
            "finishedAt": "2024-05-{day:02}T12:10:00Z"}}"#
    )
}

/// Drive the aggregator over pre-rendered page payloads.
async fn fetch_canned(pages: Vec<String>) -> PipelinePage<PipelineNode> {
    let served = Arc::new(Mutex::new(pages.into_iter()));
    fetch_paginated(None, 4, move |_cursor| {
        let served = Arc::clone(&served);
        async move {
            let raw = served.lock().unwrap().next().unwrap();
            Ok::<_, FetchError>(serde_json::from_str::<PipelinePage<PipelineNode>>(&raw).unwrap())
        }
    })
    .await
    .unwrap()
    .unwrap()
}

fn file_storage(dir: &TempDir) -> Arc<dyn SettingsStore> {
    Arc::new(FileSettingsStore::new(dir.path().to_path_buf()))
}

// ============================================================================
// Pipeline Flow Tests
// ============================================================================

#[tokio::test]
async fn multi_page_fetch_trims_and_persists() {
    let merged = fetch_canned(vec![
        page_json(
            Some("c1"),
            &[pipeline_json("push", 10.0, 1), pipeline_json("push", 12.0, 2)],
        ),
        page_json(
            None,
            &[
                pipeline_json("push", 400.0, 3),
                pipeline_json("schedule", 30.0, 4),
            ],
        ),
    ])
    .await;

    let points = pipeline_points(&merged);
    assert_eq!(points.len(), 4);

    let dir = TempDir::new().unwrap();
    let storage = file_storage(&dir);

    let mut store = TrimSliderStore::open("pipes", Arc::clone(&storage))
        .await
        .unwrap();
    let groups = group_by_label(points);
    store.dispatch(TrimEvent::InitializeSliders {
        sources: groups.keys().cloned().collect(),
    });
    store.dispatch(TrimEvent::UpdateSliderValue {
        source: "push".to_string(),
        value: 34.0,
    });

    // 3 push points; 34% trims one, dropping the 400s outlier
    let push_kept = store.trimmed(&groups["push"], "push").unwrap();
    assert_eq!(push_kept.len(), 2);
    assert!(push_kept.iter().all(|p| p.duration_secs <= 12.0));

    let schedule_kept = store.trimmed(&groups["schedule"], "schedule").unwrap();
    assert_eq!(schedule_kept.len(), 1);

    store.close().await;

    // Percentages survive a reopen through real storage
    let reopened = TrimSliderStore::open("pipes", storage).await.unwrap();
    assert_eq!(reopened.trim_percentage("push").unwrap(), 34.0);
    assert_eq!(reopened.trim_percentage("schedule").unwrap(), 0.0);
    reopened.close().await;
}

#[tokio::test]
async fn reinitialize_with_new_sources_keeps_surviving_percentages() {
    let dir = TempDir::new().unwrap();
    let storage = file_storage(&dir);

    let mut store = TrimSliderStore::open("pipes", Arc::clone(&storage))
        .await
        .unwrap();
    store.dispatch(TrimEvent::InitializeSliders {
        sources: vec!["push".to_string(), "web".to_string()],
    });
    store.dispatch(TrimEvent::UpdateSliderValue {
        source: "push".to_string(),
        value: 20.0,
    });
    store.close().await;

    // A later fetch discovers a different source mix
    let mut store = TrimSliderStore::open("pipes", Arc::clone(&storage))
        .await
        .unwrap();
    store.dispatch(TrimEvent::InitializeSliders {
        sources: vec!["push".to_string(), "schedule".to_string()],
    });

    assert_eq!(store.trim_percentage("push").unwrap(), 20.0);
    assert_eq!(store.trim_percentage("schedule").unwrap(), 0.0);
    assert!(store.trim_percentage("web").is_err());
    store.close().await;
}

#[tokio::test]
async fn stores_for_different_data_sets_stay_isolated() {
    let dir = TempDir::new().unwrap();
    let storage = file_storage(&dir);

    let mut pipes = TrimSliderStore::open("pipes", Arc::clone(&storage))
        .await
        .unwrap();
    pipes.dispatch(TrimEvent::InitializeSliders {
        sources: vec!["push".to_string()],
    });
    pipes.dispatch(TrimEvent::UpdateSliderValue {
        source: "push".to_string(),
        value: 15.0,
    });
    pipes.close().await;

    let jobs = TrimSliderStore::open("jobs", Arc::clone(&storage))
        .await
        .unwrap();
    assert!(jobs.sliders().is_empty());
    jobs.close().await;

    let pipes = TrimSliderStore::open("pipes", storage).await.unwrap();
    assert_eq!(pipes.trim_percentage("push").unwrap(), 15.0);
    pipes.close().await;
}

// ============================================================================
// Job Flow Tests
// ============================================================================

#[tokio::test]
async fn job_pages_flatten_with_rules() {
    let raw = r#"{"project": {"name": "app", "pipelines": {
        "pageInfo": {"hasNextPage": false, "endCursor": null},
        "nodes": [
            {"duration": 300.0, "createdAt": "2024-05-01T12:00:00Z",
             "finishedAt": "2024-05-01T12:10:00Z",
             "jobs": {"nodes": [
                 {"name": "build", "webPath": "/app/-/jobs/1", "duration": 120.0},
                 {"name": "lint", "webPath": "/app/-/jobs/2", "duration": 15.0}
             ]}},
            {"duration": 280.0, "createdAt": "2024-05-02T12:00:00Z",
             "finishedAt": "2024-05-02T12:10:00Z",
             "jobs": {"nodes": [
                 {"name": "deploy-prod", "webPath": "/app/-/jobs/3", "duration": 95.0}
             ]}}
        ]
    }}}"#;
    let page: PipelinePage<PipelineJobsNode> = serde_json::from_str(raw).unwrap();

    let rules = JobRules {
        tracked: vec!["build".to_string(), "deploy-prod".to_string()],
        merge: BTreeMap::from([("deploy-prod".to_string(), "build".to_string())]),
    };
    let points = job_points(&page, &rules);
    let groups = group_by_label(points);

    // lint is untracked; deploy-prod folds into the build series
    assert_eq!(groups.keys().collect::<Vec<_>>(), vec!["build"]);
    assert_eq!(groups["build"].len(), 2);
    assert_eq!(groups["build"][0].duration_secs, 120.0);
    assert_eq!(groups["build"][1].duration_secs, 95.0);
}
