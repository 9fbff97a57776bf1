pub type ClientId = u64;

/// Unix time in milliseconds.
pub type Timestamp = i64;

/// Extension of every artifact the service produces.
pub const OUTPUT_EXTENSION: &str = "sdp";

const RECOGNIZED_INPUTS: &[&str] = &["xls", "xlsx", "csv", "txt"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobState {
    #[default]
    Submitting,
    Converting,
    Done,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Done | JobState::Failed)
    }

    fn rank(self) -> u8 {
        match self {
            JobState::Submitting => 0,
            JobState::Converting => 1,
            JobState::Done | JobState::Failed => 2,
        }
    }
}

/// One tracked conversion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub client_id: ClientId,
    pub job_id: Option<String>,
    pub input_name: Option<String>,
    pub output_name: String,
    pub state: JobState,
    pub progress: u8,
    pub timestamp: Timestamp,
    pub error: Option<String>,
}

impl Job {
    pub(crate) fn new(client_id: ClientId, output_name: String, timestamp: Timestamp) -> Self {
        Self {
            client_id,
            job_id: None,
            input_name: None,
            output_name,
            state: JobState::Submitting,
            progress: 0,
            timestamp,
            error: None,
        }
    }

    /// Moves the job forward. Returns false when the job is terminal or `next`
    /// would move it backwards; nothing changes in that case.
    pub(crate) fn advance(&mut self, next: JobState, progress: Option<u8>) -> bool {
        if self.state.is_terminal() || next.rank() < self.state.rank() {
            return false;
        }
        let reported = progress.map(|p| p.min(100));
        self.state = next;
        self.progress = match next {
            JobState::Done => 100,
            JobState::Failed => reported.unwrap_or(self.progress),
            JobState::Submitting | JobState::Converting => {
                reported.map_or(self.progress, |p| p.max(self.progress))
            }
        };
        true
    }

    pub(crate) fn fail(&mut self, message: impl Into<String>) -> bool {
        if !self.advance(JobState::Failed, Some(0)) {
            return false;
        }
        self.error = Some(message.into());
        true
    }
}

/// Local guess of the artifact name: a recognized input extension is replaced
/// by `.sdp`, any other name just gains the suffix.
pub fn guess_output_name(input_name: &str) -> String {
    let stem = match input_name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && RECOGNIZED_INPUTS
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext)) =>
        {
            stem
        }
        _ => input_name,
    };
    format!("{stem}.{OUTPUT_EXTENSION}")
}
