//! Per-name persisted trim-slider state machine.
//!
//! Each named data set (e.g. `"pipes"`, `"jobs"`) owns one store instance
//! and one settings key. Events mutate the in-memory context immediately;
//! a persistence subscriber registered at construction hands the serialized
//! context to a writer task, so durability is asynchronous and best-effort.

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::store::SettingsStore;
use crate::store::error::StorageResult;

use super::{
    TrimError, TrimSlider, TrimSliders, Trimmable, apply_trimming, initialize_sliders,
    trim_percentage, update_slider_value,
};

// ============================================================================
// Events & subscriptions
// ============================================================================

/// Events accepted by [`TrimSliderStore`].
#[derive(Debug, Clone)]
pub enum TrimEvent {
    /// Recompute the slider list for a new set of sources, retaining
    /// percentages for sources that are still present.
    InitializeSliders { sources: Vec<String> },
    /// Set one slider's percentage; an unknown source is a no-op.
    UpdateSliderValue { source: String, value: f64 },
}

/// Handle returned by [`TrimSliderStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn Fn(&TrimSliders) + Send>;

// ============================================================================
// TrimSliderStore
// ============================================================================

/// A per-name trim-slider state machine persisted to settings storage.
pub struct TrimSliderStore {
    name: String,
    context: TrimSliders,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_id: u64,
    persistence: Option<(SubscriptionId, JoinHandle<()>)>,
}

impl TrimSliderStore {
    /// Open the store named `name`, loading its persisted context.
    ///
    /// A missing, malformed, or invalid stored context falls back to an
    /// empty slider list; the failure is logged, not raised. Storage I/O
    /// failures propagate.
    pub async fn open(
        name: impl Into<String>,
        storage: Arc<dyn SettingsStore>,
    ) -> StorageResult<Self> {
        let name = name.into();
        let context = match storage.get(&name).await? {
            None => TrimSliders::default(),
            Some(raw) => Self::parse_context(&name, &raw),
        };

        let mut store = Self {
            name: name.clone(),
            context,
            subscribers: Vec::new(),
            next_id: 0,
            persistence: None,
        };

        // Persistence subscriber: serialize on every transition, hand the
        // payload to a writer task so dispatch stays synchronous.
        let (tx, writer) = spawn_writer(name, storage);
        let id = store.subscribe(move |context| match serde_json::to_string(context) {
            Ok(payload) => {
                let _ = tx.send(payload);
            }
            Err(e) => warn!(error = %e, "Failed to serialize trim sliders"),
        });
        store.persistence = Some((id, writer));

        Ok(store)
    }

    fn parse_context(name: &str, raw: &str) -> TrimSliders {
        let context = match serde_json::from_str::<TrimSliders>(raw) {
            Ok(context) => context,
            Err(e) => {
                warn!(name, error = %e, "Failed to parse stored trim sliders, starting empty");
                return TrimSliders::default();
            }
        };
        match context.validate() {
            Ok(()) => context,
            Err(reason) => {
                warn!(name, %reason, "Stored trim sliders failed validation, starting empty");
                TrimSliders::default()
            }
        }
    }

    /// The data-set name this store persists under.
    pub fn name(&self) -> &str {
        &self.name
    }

    // ========================================================================
    // Event dispatch
    // ========================================================================

    /// Apply one event.
    ///
    /// The in-memory update is immediate and visible to the next read;
    /// subscribers are notified synchronously afterwards.
    pub fn dispatch(&mut self, event: TrimEvent) {
        match event {
            TrimEvent::InitializeSliders { sources } => {
                self.context.sliders = initialize_sliders(&self.context.sliders, &sources);
            }
            TrimEvent::UpdateSliderValue { source, value } => {
                self.context.sliders = update_slider_value(&self.context.sliders, &source, value);
            }
        }

        debug!(
            name = %self.name,
            sliders = self.context.sliders.len(),
            "Trim sliders updated"
        );
        for (_, subscriber) in &self.subscribers {
            subscriber(&self.context);
        }
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Register a callback invoked after every state transition.
    pub fn subscribe(&mut self, subscriber: impl Fn(&TrimSliders) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    /// Remove a previously registered callback.
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscribers.retain(|(sid, _)| *sid != id);
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// The current slider list.
    pub fn sliders(&self) -> &[TrimSlider] {
        &self.context.sliders
    }

    /// The stored percentage for `source`.
    pub fn trim_percentage(&self, source: &str) -> Result<f64, TrimError> {
        trim_percentage(&self.context.sliders, source)
    }

    /// Trim `data` by the stored percentage for `source`.
    pub fn trimmed<T>(&self, data: &[T], source: &str) -> Result<Vec<T>, TrimError>
    where
        T: Trimmable + Clone,
    {
        Ok(apply_trimming(data, self.trim_percentage(source)?))
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Deregister all subscribers and wait for queued write-backs to land.
    ///
    /// Dropping the store without calling this keeps persistence
    /// best-effort: queued writes still drain on the runtime, but nothing
    /// awaits them.
    pub async fn close(mut self) {
        let Some((id, writer)) = self.persistence.take() else {
            return;
        };
        self.unsubscribe(id);
        self.subscribers.clear();
        if let Err(e) = writer.await {
            warn!(name = %self.name, error = %e, "Trim slider writer task failed");
        }
    }
}

/// Spawn the write-back task for one store.
///
/// The task drains payloads in order until every sender is gone, so the last
/// write always wins. Failed writes are logged and skipped.
fn spawn_writer(
    name: String,
    storage: Arc<dyn SettingsStore>,
) -> (UnboundedSender<String>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if let Err(e) = storage.put(&name, &payload).await {
                warn!(name = %name, error = %e, "Failed to persist trim sliders");
            }
        }
    });
    (tx, writer)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tempfile::TempDir;

    use super::*;
    use crate::store::FileSettingsStore;

    fn create_storage(tmp: &TempDir) -> Arc<dyn SettingsStore> {
        Arc::new(FileSettingsStore::new(tmp.path().join("settings")))
    }

    fn init(sources: &[&str]) -> TrimEvent {
        TrimEvent::InitializeSliders {
            sources: sources.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn update(source: &str, value: f64) -> TrimEvent {
        TrimEvent::UpdateSliderValue {
            source: source.to_string(),
            value,
        }
    }

    #[tokio::test]
    async fn test_open_without_stored_state_starts_empty() {
        let tmp = TempDir::new().unwrap();
        let store = TrimSliderStore::open("pipes", create_storage(&tmp))
            .await
            .unwrap();

        assert_eq!(store.name(), "pipes");
        assert!(store.sliders().is_empty());
        store.close().await;
    }

    #[tokio::test]
    async fn test_events_persist_across_reopen() {
        let tmp = TempDir::new().unwrap();
        let storage = create_storage(&tmp);

        let mut store = TrimSliderStore::open("pipes", Arc::clone(&storage))
            .await
            .unwrap();
        store.dispatch(init(&["push", "schedule"]));
        store.dispatch(update("push", 25.0));
        store.close().await;

        let reopened = TrimSliderStore::open("pipes", storage).await.unwrap();
        assert_eq!(reopened.trim_percentage("push").unwrap(), 25.0);
        assert_eq!(reopened.trim_percentage("schedule").unwrap(), 0.0);
        reopened.close().await;
    }

    #[tokio::test]
    async fn test_reinitialize_retains_surviving_sources() {
        let tmp = TempDir::new().unwrap();
        let storage = create_storage(&tmp);

        let mut store = TrimSliderStore::open("jobs", Arc::clone(&storage))
            .await
            .unwrap();
        store.dispatch(init(&["a", "b"]));
        store.dispatch(update("b", 20.0));
        store.close().await;

        // A later session discovers a different source set
        let mut reopened = TrimSliderStore::open("jobs", storage).await.unwrap();
        reopened.dispatch(init(&["b", "c"]));

        let sliders = reopened.sliders();
        assert_eq!(sliders.len(), 2);
        assert_eq!(sliders[0].source, "b");
        assert_eq!(sliders[0].trim_percentage, 20.0);
        assert_eq!(sliders[1].source, "c");
        assert_eq!(sliders[1].trim_percentage, 0.0);
        reopened.close().await;
    }

    #[tokio::test]
    async fn test_malformed_stored_state_falls_back_to_empty() {
        let tmp = TempDir::new().unwrap();
        let storage = create_storage(&tmp);
        storage.put("pipes", "{not json").await.unwrap();

        let mut store = TrimSliderStore::open("pipes", Arc::clone(&storage))
            .await
            .unwrap();
        assert!(store.sliders().is_empty());

        // The store stays usable and repairs the stored value
        store.dispatch(init(&["push"]));
        store.close().await;

        let reopened = TrimSliderStore::open("pipes", storage).await.unwrap();
        assert_eq!(reopened.sliders().len(), 1);
        reopened.close().await;
    }

    #[tokio::test]
    async fn test_invalid_stored_state_falls_back_to_empty() {
        let tmp = TempDir::new().unwrap();
        let storage = create_storage(&tmp);
        // Parses, but violates the unique-source invariant
        storage
            .put(
                "pipes",
                r#"{"sliders":[{"source":"a","trim_percentage":5.0},{"source":"a","trim_percentage":9.0}]}"#,
            )
            .await
            .unwrap();

        let store = TrimSliderStore::open("pipes", storage).await.unwrap();
        assert!(store.sliders().is_empty());
        store.close().await;
    }

    #[tokio::test]
    async fn test_named_stores_are_isolated() {
        let tmp = TempDir::new().unwrap();
        let storage = create_storage(&tmp);

        let mut pipes = TrimSliderStore::open("pipes", Arc::clone(&storage))
            .await
            .unwrap();
        let mut jobs = TrimSliderStore::open("jobs", Arc::clone(&storage))
            .await
            .unwrap();

        pipes.dispatch(init(&["push"]));
        pipes.dispatch(update("push", 30.0));
        jobs.dispatch(init(&["checks"]));

        pipes.close().await;
        jobs.close().await;

        let pipes = TrimSliderStore::open("pipes", Arc::clone(&storage))
            .await
            .unwrap();
        let jobs = TrimSliderStore::open("jobs", storage).await.unwrap();

        assert_eq!(pipes.trim_percentage("push").unwrap(), 30.0);
        assert!(pipes.trim_percentage("checks").is_err());
        assert_eq!(jobs.trim_percentage("checks").unwrap(), 0.0);
        assert!(jobs.trim_percentage("push").is_err());

        pipes.close().await;
        jobs.close().await;
    }

    #[tokio::test]
    async fn test_subscribers_see_every_transition() {
        let tmp = TempDir::new().unwrap();
        let mut store = TrimSliderStore::open("pipes", create_storage(&tmp))
            .await
            .unwrap();

        let seen: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = store.subscribe(move |context| {
            sink.lock().unwrap().push(context.sliders.len());
        });

        store.dispatch(init(&["a", "b"]));
        store.dispatch(update("a", 10.0));
        assert_eq!(*seen.lock().unwrap(), vec![2, 2]);

        store.unsubscribe(id);
        store.dispatch(init(&["a"]));
        assert_eq!(*seen.lock().unwrap(), vec![2, 2]);

        store.close().await;
    }

    #[tokio::test]
    async fn test_update_unknown_source_is_noop() {
        let tmp = TempDir::new().unwrap();
        let mut store = TrimSliderStore::open("pipes", create_storage(&tmp))
            .await
            .unwrap();

        store.dispatch(init(&["push"]));
        store.dispatch(update("missing", 40.0));

        assert_eq!(store.sliders().len(), 1);
        assert_eq!(store.trim_percentage("push").unwrap(), 0.0);
        store.close().await;
    }

    #[tokio::test]
    async fn test_trimmed_uses_stored_percentage() {
        #[derive(Debug, Clone)]
        struct Run {
            duration: f64,
        }
        impl Trimmable for Run {
            fn duration(&self) -> f64 {
                self.duration
            }
        }

        let tmp = TempDir::new().unwrap();
        let mut store = TrimSliderStore::open("pipes", create_storage(&tmp))
            .await
            .unwrap();
        store.dispatch(init(&["push"]));
        store.dispatch(update("push", 25.0));

        let data = vec![
            Run { duration: 10.0 },
            Run { duration: 20.0 },
            Run { duration: 30.0 },
            Run { duration: 40.0 },
        ];

        let trimmed = store.trimmed(&data, "push").unwrap();
        assert_eq!(trimmed.len(), 3);

        let err = store.trimmed(&data, "never-initialized").unwrap_err();
        assert!(matches!(err, TrimError::SliderNotFound { .. }));
        store.close().await;
    }
}
