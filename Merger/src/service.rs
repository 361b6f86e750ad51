//! Request/response surface for hosts: a synchronous entry point and a tokio service that runs
//! each request on its own blocking worker.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::config::MergeConfig;
use crate::error::MergeError;
use crate::orchestrator::MergeOrchestrator;
use crate::progress::ProgressCallback;
use crate::source::{default_opener, SourceOpener};

pub use crate::progress::{ProgressEvent, PROGRESS_EVENT};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequest {
    pub video_paths: Vec<String>,
    pub output_path: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeResponse {
    pub path: String,
}

/// Runs one merge to completion on the calling thread.
pub fn merge_videos(
    request: &MergeRequest,
    opener: &dyn SourceOpener,
    config: &MergeConfig,
    progress: ProgressCallback,
    cancel: Option<CancellationToken>,
) -> Result<MergeResponse, MergeError> {
    let mut orchestrator = MergeOrchestrator::new(opener, config, progress, cancel);
    let result = orchestrator.run(&request.video_paths, &request.output_path)?;
    Ok(MergeResponse {
        path: result.output_path.to_string_lossy().into_owned(),
    })
}

pub struct MergeService {
    opener: Arc<dyn SourceOpener>,
    config: MergeConfig,
}

impl MergeService {
    pub fn new(config: MergeConfig) -> Self {
        Self::with_opener(config, Arc::new(default_opener()))
    }

    pub fn with_opener(config: MergeConfig, opener: Arc<dyn SourceOpener>) -> Self {
        Self { opener, config }
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Starts `request` on a blocking worker. Must be called from within a tokio runtime.
    pub fn spawn(&self, request: MergeRequest) -> MergeHandle {
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let cancel = CancellationToken::new();

        let opener = self.opener.clone();
        let config = self.config.clone();
        let token = cancel.clone();
        tokio::task::spawn_blocking(move || {
            let progress: ProgressCallback = Arc::new(move |event: ProgressEvent| {
                // The handle may already be gone; the merge still runs to its end.
                let _ = progress_tx.send(event);
            });
            let outcome = run_worker(&request, opener.as_ref(), &config, progress, token);
            if outcome_tx.send(outcome).is_err() {
                debug!("Merge handle dropped before the outcome was delivered");
            }
        });

        MergeHandle {
            progress: progress_rx,
            outcome: outcome_rx,
            cancel,
        }
    }
}

#[instrument(skip_all, fields(inputs = request.video_paths.len()))]
fn run_worker(
    request: &MergeRequest,
    opener: &dyn SourceOpener,
    config: &MergeConfig,
    progress: ProgressCallback,
    cancel: CancellationToken,
) -> Result<MergeResponse, MergeError> {
    merge_videos(request, opener, config, progress, Some(cancel))
}

/// Caller side of a spawned merge.
pub struct MergeHandle {
    progress: mpsc::UnboundedReceiver<ProgressEvent>,
    outcome: oneshot::Receiver<Result<MergeResponse, MergeError>>,
    cancel: CancellationToken,
}

impl MergeHandle {
    /// Progress events in emission order. The channel closes when the worker finishes.
    pub fn progress(&mut self) -> &mut mpsc::UnboundedReceiver<ProgressEvent> {
        &mut self.progress
    }

    /// Asks the worker to stop at the next sample or file boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// The single terminal outcome of the run.
    pub async fn outcome(self) -> Result<MergeResponse, MergeError> {
        match self.outcome.await {
            Ok(outcome) => outcome,
            Err(_) => Err(MergeError::output_write("merge worker stopped without a result")),
        }
    }
}
