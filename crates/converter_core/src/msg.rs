use std::path::PathBuf;

use crate::{ClientId, JobState, Timestamp};

/// One previously completed job as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub output_name: String,
    pub input_name: String,
    pub timestamp: Timestamp,
}

/// Remote conversion status carried by poller events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStatus {
    Queued,
    Converting,
    Converted,
    Failed,
}

impl ProgressStatus {
    pub(crate) fn job_state(self) -> JobState {
        match self {
            ProgressStatus::Queued | ProgressStatus::Converting => JobState::Converting,
            ProgressStatus::Converted => JobState::Done,
            ProgressStatus::Failed => JobState::Failed,
        }
    }
}

/// Live progress for one job. Any correlation key may be missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub job_id: Option<String>,
    pub output_name: Option<String>,
    pub input_name: Option<String>,
    pub status: ProgressStatus,
    pub progress: Option<u8>,
    /// When the presentation side received the event.
    pub observed_at: Timestamp,
}

/// Terminal notification for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionUpdate {
    pub job_id: Option<String>,
    pub output_name: Option<String>,
    pub input_name: Option<String>,
    pub status: ProgressStatus,
    pub observed_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Ask for a fresh server snapshot (session start, manual refresh).
    RefreshRequested,
    /// Server snapshot arrived.
    SnapshotLoaded(Vec<SnapshotEntry>),
    /// Server snapshot could not be fetched.
    SnapshotFailed { message: String },
    /// User picked a file to convert.
    FileSelected {
        input_name: String,
        location: PathBuf,
        selected_at: Timestamp,
    },
    /// Host accepted the upload.
    SubmitAccepted {
        client_id: ClientId,
        job_id: String,
        output_name: Option<String>,
    },
    /// Host rejected the upload.
    SubmitFailed { client_id: ClientId, message: String },
    /// Poller progress event.
    JobProgress(ProgressUpdate),
    /// Poller terminal event.
    JobComplete(CompletionUpdate),
    /// User asked to save a finished artifact.
    DownloadRequested { client_id: ClientId },
    /// Artifact was written to disk.
    ArtifactSaved { client_id: ClientId, path: PathBuf },
    /// User dismissed the save dialog.
    ArtifactCanceled { client_id: ClientId },
    /// Retrieval failed.
    ArtifactFailed { client_id: ClientId, message: String },
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
