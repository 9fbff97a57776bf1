use crate::{ClientId, Job, JobState, Timestamp};

/// Message shown above the job list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub jobs: Vec<JobRowView>,
    pub job_count: usize,
    pub active_count: usize,
    pub notice: Option<Notice>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRowView {
    pub client_id: ClientId,
    pub job_id: Option<String>,
    pub output_name: String,
    pub input_name: Option<String>,
    pub state: JobState,
    pub progress: u8,
    pub timestamp: Timestamp,
    pub error: Option<String>,
    pub downloadable: bool,
}

impl JobRowView {
    pub(crate) fn from_job(job: &Job) -> Self {
        Self {
            client_id: job.client_id,
            job_id: job.job_id.clone(),
            output_name: job.output_name.clone(),
            input_name: job.input_name.clone(),
            state: job.state,
            progress: job.progress,
            timestamp: job.timestamp,
            error: job.error.clone(),
            downloadable: job.state == JobState::Done,
        }
    }
}
