use std::sync::Arc;

use chrono::Utc;
use converter_core::{CompletionUpdate, Effect, Msg, ProgressStatus, ProgressUpdate, SnapshotEntry};
use converter_engine::{
    CompleteEvent, ConverterApi, FileContent, ProgressEvent, RemoteStatus, RetrieveOutcome,
    Subscription, UploadFile,
};
use converter_logging::{conv_debug, conv_info};
use tokio::sync::mpsc;

/// What the session receives from the runner.
#[derive(Debug)]
pub enum Inbound {
    /// Result of one effect; every effect yields exactly one.
    EffectFinished(Msg),
    /// Poller event forwarded from the channel.
    HostEvent(Msg),
}

/// Executes core effects against the host channel and feeds results back.
pub struct EffectRunner {
    api: Arc<dyn ConverterApi>,
    tx: mpsc::UnboundedSender<Inbound>,
    _subscriptions: [Subscription; 2],
}

impl EffectRunner {
    pub fn new(api: Arc<dyn ConverterApi>, tx: mpsc::UnboundedSender<Inbound>) -> Self {
        let progress_tx = tx.clone();
        let progress = api.on_progress(Box::new(move |event: &ProgressEvent| {
            let _ = progress_tx.send(Inbound::HostEvent(Msg::JobProgress(progress_update(event))));
        }));
        let complete_tx = tx.clone();
        let complete = api.on_complete(Box::new(move |event: &CompleteEvent| {
            let _ = complete_tx.send(Inbound::HostEvent(Msg::JobComplete(completion_update(
                event,
            ))));
        }));
        Self {
            api,
            tx,
            _subscriptions: [progress, complete],
        }
    }

    /// Spawns one task per effect. Returns how many were started.
    pub fn enqueue(&self, effects: Vec<Effect>) -> usize {
        let count = effects.len();
        for effect in effects {
            let api = Arc::clone(&self.api);
            let tx = self.tx.clone();
            tokio::spawn(async move {
                let msg = run_effect(api.as_ref(), effect).await;
                let _ = tx.send(Inbound::EffectFinished(msg));
            });
        }
        count
    }
}

async fn run_effect(api: &dyn ConverterApi, effect: Effect) -> Msg {
    match effect {
        Effect::RefreshSnapshot => match api.list_jobs().await {
            Ok(entries) => {
                conv_debug!("Snapshot holds {} job(s)", entries.len());
                Msg::SnapshotLoaded(
                    entries
                        .into_iter()
                        .map(|entry| SnapshotEntry {
                            output_name: entry.output_name,
                            input_name: entry.input_name,
                            timestamp: entry.timestamp,
                        })
                        .collect(),
                )
            }
            Err(err) => Msg::SnapshotFailed {
                message: err.to_string(),
            },
        },
        Effect::SubmitFile {
            client_id,
            input_name,
            location,
        } => {
            conv_info!("SubmitFile client_id={} input={}", client_id, input_name);
            let file = UploadFile {
                name: input_name,
                content: FileContent::Path(location),
            };
            match api.submit_job(file).await {
                Ok(receipt) => Msg::SubmitAccepted {
                    client_id,
                    job_id: receipt.job_id,
                    output_name: Some(receipt.output_name),
                },
                Err(err) => Msg::SubmitFailed {
                    client_id,
                    message: err.to_string(),
                },
            }
        }
        Effect::RetrieveArtifact {
            client_id,
            output_name,
        } => match api.retrieve_artifact(&output_name).await {
            Ok(RetrieveOutcome::Saved { saved_path }) => Msg::ArtifactSaved {
                client_id,
                path: saved_path,
            },
            Ok(RetrieveOutcome::Canceled { .. }) => Msg::ArtifactCanceled { client_id },
            Err(err) => Msg::ArtifactFailed {
                client_id,
                message: err.to_string(),
            },
        },
    }
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn map_status(status: RemoteStatus) -> ProgressStatus {
    match status {
        RemoteStatus::Queued => ProgressStatus::Queued,
        RemoteStatus::Converting | RemoteStatus::Unknown => ProgressStatus::Converting,
        RemoteStatus::Converted => ProgressStatus::Converted,
        RemoteStatus::Failed => ProgressStatus::Failed,
    }
}

fn non_empty(value: &str) -> Option<String> {
    Some(value.to_string()).filter(|value| !value.trim().is_empty())
}

fn progress_update(event: &ProgressEvent) -> ProgressUpdate {
    ProgressUpdate {
        job_id: non_empty(&event.job_id),
        output_name: non_empty(&event.output_name),
        input_name: non_empty(&event.input_name),
        status: map_status(event.status),
        progress: Some(event.progress),
        observed_at: now_millis(),
    }
}

fn completion_update(event: &CompleteEvent) -> CompletionUpdate {
    CompletionUpdate {
        job_id: non_empty(&event.job_id),
        output_name: non_empty(&event.output_name),
        input_name: non_empty(&event.input_name),
        status: map_status(event.status),
        observed_at: now_millis(),
    }
}
