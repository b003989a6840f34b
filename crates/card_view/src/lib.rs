use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use api_client::RecordFetcher;
use shared::{
    domain::{EndpointName, RawRecord},
    error::{FetchError, FetchErrorKind},
};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{error, info, warn};

pub mod html;
pub mod model;
pub mod page;

pub use html::FALLBACK_FRAGMENT;
pub use model::CardModel;
pub use page::{ContainerError, ContainerHost, InMemoryPage};

/// Receives `(kind, message)` pairs for failed loads. Implemented by the
/// surrounding application; the pipeline only calls into it.
pub trait ObservabilitySink: Send + Sync {
    fn failure(&self, kind: FetchErrorKind, message: &str);
}

/// Null sink used when no observability collaborator is wired in.
pub struct MissingObservabilitySink;

impl ObservabilitySink for MissingObservabilitySink {
    fn failure(&self, _kind: FetchErrorKind, _message: &str) {}
}

/// Progress of one load. Every `load` call runs its own fresh machine:
/// `Idle -> Loading -> { Rendered, Failed, Cancelled }`; prior outcomes are
/// never carried over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Idle,
    Loading,
    Rendered,
    Failed,
    Cancelled,
}

/// Terminal result of one load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Every record was rendered into the container, in response order.
    Rendered { cards: usize },
    /// The fetch failed; the container shows exactly the fallback fragment.
    Failed { kind: FetchErrorKind },
    /// The target container does not exist in the page; nothing was written.
    MissingContainer,
    /// Cancellation was observed before commit; the container was left
    /// untouched.
    Cancelled,
}

/// Handle to an in-flight load started with [`CardRenderer::load`].
pub struct LoadHandle {
    phase: watch::Receiver<LoadPhase>,
    cancelled: Arc<AtomicBool>,
    task: JoinHandle<LoadOutcome>,
}

impl LoadHandle {
    pub fn phase(&self) -> LoadPhase {
        *self.phase.borrow()
    }

    /// Subscribe to phase transitions.
    pub fn phase_changes(&self) -> watch::Receiver<LoadPhase> {
        self.phase.clone()
    }

    /// Ask the load to stand down. Once the flag is observed the pending
    /// container mutation is discarded silently; content already committed
    /// stays as it is.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Wait for the load to finish.
    pub async fn join(self) -> LoadOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!("load task did not complete: {err}");
                LoadOutcome::Cancelled
            }
        }
    }
}

/// The fetch-and-render pipeline: fetch a named collection, project each
/// record into a card, and commit the rendered fragments into a page
/// container in one atomic replace.
pub struct CardRenderer {
    fetcher: Arc<dyn RecordFetcher>,
    page: Arc<dyn ContainerHost>,
    sink: Arc<dyn ObservabilitySink>,
}

impl CardRenderer {
    pub fn new(fetcher: Arc<dyn RecordFetcher>, page: Arc<dyn ContainerHost>) -> Arc<Self> {
        Self::with_sink(fetcher, page, Arc::new(MissingObservabilitySink))
    }

    pub fn with_sink(
        fetcher: Arc<dyn RecordFetcher>,
        page: Arc<dyn ContainerHost>,
        sink: Arc<dyn ObservabilitySink>,
    ) -> Arc<Self> {
        Arc::new(Self {
            fetcher,
            page,
            sink,
        })
    }

    /// Fire-and-forget load of `endpoint` into `container_id`. Completion,
    /// outcome and cancellation are reachable through the returned handle;
    /// dropping the handle lets the load run to completion on its own.
    pub fn load(self: &Arc<Self>, endpoint: &str, container_id: &str) -> LoadHandle {
        let (phase_tx, phase_rx) = watch::channel(LoadPhase::Idle);
        let cancelled = Arc::new(AtomicBool::new(false));

        let renderer = Arc::clone(self);
        let endpoint = endpoint.to_string();
        let container_id = container_id.to_string();
        let cancel_flag = Arc::clone(&cancelled);
        let task = tokio::spawn(async move {
            renderer
                .run_load(&endpoint, &container_id, &phase_tx, &cancel_flag)
                .await
        });

        LoadHandle {
            phase: phase_rx,
            cancelled,
            task,
        }
    }

    /// Awaitable variant of [`CardRenderer::load`] without a cancellation
    /// path.
    pub async fn load_once(&self, endpoint: &str, container_id: &str) -> LoadOutcome {
        let (phase_tx, _phase_rx) = watch::channel(LoadPhase::Idle);
        let never_cancelled = AtomicBool::new(false);
        self.run_load(endpoint, container_id, &phase_tx, &never_cancelled)
            .await
    }

    async fn run_load(
        &self,
        endpoint: &str,
        container_id: &str,
        phase: &watch::Sender<LoadPhase>,
        cancelled: &AtomicBool,
    ) -> LoadOutcome {
        let _ = phase.send(LoadPhase::Loading);

        // The container is owned by the page; if it is gone there is
        // nowhere to render either cards or the fallback message.
        if !self.page.contains(container_id).await {
            warn!(container_id, "target container missing, aborting load");
            let _ = phase.send(LoadPhase::Failed);
            return LoadOutcome::MissingContainer;
        }

        let endpoint = match EndpointName::new(endpoint) {
            Ok(name) => name,
            Err(err) => return self.fail(&err, container_id, phase, cancelled).await,
        };

        match self.fetcher.fetch_records(endpoint.as_str()).await {
            Ok(records) => {
                let buffer = render_records(&endpoint, &records);
                match self.commit(container_id, buffer, phase, cancelled).await {
                    Committed::Applied => {
                        info!(
                            endpoint = %endpoint,
                            container_id,
                            cards = records.len(),
                            "render complete"
                        );
                        let _ = phase.send(LoadPhase::Rendered);
                        LoadOutcome::Rendered {
                            cards: records.len(),
                        }
                    }
                    Committed::Cancelled => LoadOutcome::Cancelled,
                    Committed::ContainerGone => LoadOutcome::MissingContainer,
                }
            }
            Err(err) => self.fail(&err, container_id, phase, cancelled).await,
        }
    }

    async fn fail(
        &self,
        err: &FetchError,
        container_id: &str,
        phase: &watch::Sender<LoadPhase>,
        cancelled: &AtomicBool,
    ) -> LoadOutcome {
        let kind = err.kind();
        error!(container_id, ?kind, "load failed: {err}");
        self.sink.failure(kind, &err.to_string());

        match self
            .commit(container_id, FALLBACK_FRAGMENT.to_string(), phase, cancelled)
            .await
        {
            Committed::Applied => {
                let _ = phase.send(LoadPhase::Failed);
                LoadOutcome::Failed { kind }
            }
            Committed::Cancelled => LoadOutcome::Cancelled,
            Committed::ContainerGone => LoadOutcome::MissingContainer,
        }
    }

    /// Single commit point for both the success and the failure path. The
    /// buffer is fully built before this runs, so the container only ever
    /// holds all rendered fragments or exactly one fallback fragment. The
    /// cancellation flag is checked here, immediately before the write: a
    /// cancelled load discards its buffer and leaves the container alone.
    async fn commit(
        &self,
        container_id: &str,
        buffer: String,
        phase: &watch::Sender<LoadPhase>,
        cancelled: &AtomicBool,
    ) -> Committed {
        if cancelled.load(Ordering::SeqCst) {
            info!(container_id, "load cancelled, discarding pending render");
            let _ = phase.send(LoadPhase::Cancelled);
            return Committed::Cancelled;
        }

        match self.page.replace_content(container_id, buffer).await {
            Ok(()) => Committed::Applied,
            Err(err) => {
                warn!(container_id, "container vanished before commit: {err}");
                let _ = phase.send(LoadPhase::Failed);
                Committed::ContainerGone
            }
        }
    }
}

enum Committed {
    Applied,
    Cancelled,
    ContainerGone,
}

fn render_records(endpoint: &EndpointName, records: &[RawRecord]) -> String {
    let mut buffer = String::new();
    for record in records {
        let card = CardModel::from_record(endpoint, record);
        buffer.push_str(&html::card_fragment(&card));
    }
    buffer
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
