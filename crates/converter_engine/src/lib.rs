//! Converter engine: the host side of the job pipeline.
//!
//! Uploads files, polls conversion status, fans events out to subscribers, and
//! saves finished artifacts.
mod bridge;
mod bus;
mod error;
mod naming;
mod persist;
mod poller;
mod retrieve;
mod service;
mod submit;
mod types;

pub use bridge::{BridgeSettings, ChannelMessage, ConverterApi, HostBridge};
pub use bus::{EventBus, Listener, Subscription};
pub use error::ServiceError;
pub use naming::{artifact_name, guess_content_type, sanitize_artifact_name, ARTIFACT_EXTENSION};
pub use persist::{write_atomically, PersistError};
pub use poller::{run_poller, EventSink, PollOutcome, PollerRegistry, PollerSettings, StatusPoller};
pub use retrieve::{Retriever, SaveDialog};
pub use service::{
    ConversionService, Endpoints, PreparedUpload, ReqwestService, ServiceSettings, StatusReport,
    SubmitResponse,
};
pub use submit::Submitter;
pub use types::{
    CompleteEvent, FileContent, HostEvent, JobId, PollTarget, ProgressEvent, RemoteStatus,
    RetrieveOutcome, SnapshotEntry, SubmitReceipt, UploadFile,
};
