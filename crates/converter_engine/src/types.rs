use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Opaque job identifier assigned by the conversion service.
pub type JobId = String;

/// Conversion status as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteStatus {
    Queued,
    Converting,
    Converted,
    Failed,
    Unknown,
}

impl RemoteStatus {
    /// Reads a status string from the service; anything unrecognized is `Unknown`.
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "queued" | "pending" => RemoteStatus::Queued,
            "converting" | "processing" => RemoteStatus::Converting,
            "converted" | "done" => RemoteStatus::Converted,
            "failed" | "error" => RemoteStatus::Failed,
            _ => RemoteStatus::Unknown,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RemoteStatus::Converted | RemoteStatus::Failed)
    }
}

impl fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RemoteStatus::Queued => "queued",
            RemoteStatus::Converting => "converting",
            RemoteStatus::Converted => "converted",
            RemoteStatus::Failed => "failed",
            RemoteStatus::Unknown => "unknown",
        };
        f.write_str(text)
    }
}

/// Identity of one polled job, echoed on every event it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTarget {
    pub job_id: JobId,
    pub input_name: String,
    pub output_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub job_id: JobId,
    pub output_name: String,
    pub input_name: String,
    pub status: RemoteStatus,
    pub progress: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteEvent {
    pub job_id: JobId,
    pub output_name: String,
    pub input_name: String,
    pub status: RemoteStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Progress(ProgressEvent),
    Complete(CompleteEvent),
}

/// A previously completed job listed by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry {
    pub output_name: String,
    pub input_name: String,
    /// Unix milliseconds.
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    pub job_id: JobId,
    pub output_name: String,
}

/// File handed over for upload: raw bytes or a path the host can read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFile {
    pub name: String,
    pub content: FileContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileContent {
    Bytes(Vec<u8>),
    Path(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RetrieveOutcome {
    Saved {
        #[serde(rename = "savedPath")]
        saved_path: PathBuf,
    },
    Canceled {
        canceled: bool,
    },
}

impl RetrieveOutcome {
    pub fn canceled() -> Self {
        RetrieveOutcome::Canceled { canceled: true }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, RetrieveOutcome::Canceled { .. })
    }
}
