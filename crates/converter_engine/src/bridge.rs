//! The narrow channel between the host and the presentation side.
//!
//! Requests go through [`ConverterApi`]; poller output fans out on two event
//! streams. Everything that crosses is JSON-serializable.

use std::path::PathBuf;
use std::sync::Arc;

use converter_logging::ipc_trace;
use serde::{Deserialize, Serialize};

use crate::{
    CompleteEvent, ConversionService, EventBus, EventSink, HostEvent, PollerRegistry,
    PollerSettings, ProgressEvent, RetrieveOutcome, Retriever, SaveDialog, ServiceError,
    SnapshotEntry, StatusPoller, SubmitReceipt, Submitter, Subscription, UploadFile,
};

/// Operations the presentation side may invoke on the host.
#[async_trait::async_trait]
pub trait ConverterApi: Send + Sync {
    /// Completed jobs known to the service.
    async fn list_jobs(&self) -> Result<Vec<SnapshotEntry>, ServiceError>;
    async fn submit_job(&self, file: UploadFile) -> Result<SubmitReceipt, ServiceError>;
    async fn retrieve_artifact(&self, output_name: &str) -> Result<RetrieveOutcome, ServiceError>;
    fn on_progress(&self, listener: Box<dyn Fn(&ProgressEvent) + Send + Sync>) -> Subscription;
    fn on_complete(&self, listener: Box<dyn Fn(&CompleteEvent) + Send + Sync>) -> Subscription;
}

/// Event as it crosses the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "payload", rename_all = "kebab-case")]
pub enum ChannelMessage {
    ConvertProgress(ProgressEvent),
    ConvertComplete(CompleteEvent),
}

impl From<HostEvent> for ChannelMessage {
    fn from(event: HostEvent) -> Self {
        match event {
            HostEvent::Progress(progress) => ChannelMessage::ConvertProgress(progress),
            HostEvent::Complete(complete) => ChannelMessage::ConvertComplete(complete),
        }
    }
}

impl ChannelMessage {
    pub fn channel(&self) -> &'static str {
        match self {
            ChannelMessage::ConvertProgress(_) => "convert-progress",
            ChannelMessage::ConvertComplete(_) => "convert-complete",
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| format!("<unserializable: {err}>"))
    }
}

#[derive(Debug, Clone)]
pub struct BridgeSettings {
    pub poller: PollerSettings,
    pub download_dir: PathBuf,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            poller: PollerSettings::default(),
            download_dir: PathBuf::from("downloads"),
        }
    }
}

#[derive(Default)]
struct ChannelEvents {
    progress: EventBus<ProgressEvent>,
    complete: EventBus<CompleteEvent>,
}

impl EventSink for ChannelEvents {
    fn emit(&self, event: HostEvent) {
        let message = ChannelMessage::from(event.clone());
        ipc_trace!("host -> presentation (event)", message.channel(), message.to_json());
        match event {
            HostEvent::Progress(progress) => {
                self.progress.publish(&progress);
            }
            HostEvent::Complete(complete) => {
                self.complete.publish(&complete);
            }
        }
    }
}

/// Host implementation of [`ConverterApi`].
pub struct HostBridge {
    service: Arc<dyn ConversionService>,
    submitter: Submitter,
    retriever: Retriever,
    events: Arc<ChannelEvents>,
    registry: Arc<PollerRegistry>,
}

impl HostBridge {
    pub fn new(
        service: Arc<dyn ConversionService>,
        dialog: Arc<dyn SaveDialog>,
        settings: BridgeSettings,
    ) -> Self {
        let events = Arc::new(ChannelEvents::default());
        let registry = Arc::new(PollerRegistry::new());
        let poller = StatusPoller::new(
            Arc::clone(&service),
            events.clone(),
            settings.poller,
            Arc::clone(&registry),
        );
        Self {
            submitter: Submitter::new(Arc::clone(&service), poller),
            retriever: Retriever::new(Arc::clone(&service), dialog, settings.download_dir),
            service,
            events,
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<PollerRegistry> {
        &self.registry
    }

    /// Cancels every outstanding poller. Call once the process is shutting down.
    pub fn shutdown(&self) -> usize {
        self.registry.cancel_all()
    }
}

#[async_trait::async_trait]
impl ConverterApi for HostBridge {
    async fn list_jobs(&self) -> Result<Vec<SnapshotEntry>, ServiceError> {
        ipc_trace!("presentation -> host (invoke)", "list-jobs", ());
        let result = self.service.list().await;
        trace_result("list-jobs", &result);
        result
    }

    async fn submit_job(&self, file: UploadFile) -> Result<SubmitReceipt, ServiceError> {
        ipc_trace!("presentation -> host (invoke)", "submit-job", file.name);
        let result = self.submitter.submit(file).await;
        trace_result("submit-job", &result);
        result
    }

    async fn retrieve_artifact(&self, output_name: &str) -> Result<RetrieveOutcome, ServiceError> {
        ipc_trace!("presentation -> host (invoke)", "retrieve-artifact", output_name);
        let result = self.retriever.retrieve(output_name).await;
        trace_result("retrieve-artifact", &result);
        result
    }

    fn on_progress(&self, listener: Box<dyn Fn(&ProgressEvent) + Send + Sync>) -> Subscription {
        self.events.progress.subscribe(listener)
    }

    fn on_complete(&self, listener: Box<dyn Fn(&CompleteEvent) + Send + Sync>) -> Subscription {
        self.events.complete.subscribe(listener)
    }
}

fn trace_result<T: Serialize>(channel: &str, result: &Result<T, ServiceError>) {
    match result {
        Ok(value) => ipc_trace!(
            "host -> presentation (result)",
            channel,
            serde_json::to_string(value).unwrap_or_default()
        ),
        Err(err) => ipc_trace!("host -> presentation (error)", channel, err.to_string()),
    }
}
