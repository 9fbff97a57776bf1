use std::collections::BTreeMap;

use converter_logging::{conv_debug, conv_warn};

use crate::matcher::{resolve, Correlation};
use crate::msg::{CompletionUpdate, ProgressUpdate, SnapshotEntry};
use crate::view_model::{AppViewModel, JobRowView, Notice};
use crate::{guess_output_name, ClientId, Job, JobState, Timestamp};

/// What a progress or completion event did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressOutcome {
    /// An existing job moved forward.
    Updated(ClientId),
    /// The matched job was terminal, bound to another job id, or the event
    /// pointed backwards.
    Ignored(ClientId),
    /// No job matched; a new row was created from the event.
    Synthesized(ClientId),
    /// The event carried no usable correlation key.
    Dropped,
}

/// Presentation-side job store.
///
/// Rows are keyed by client id. Output names are unique across rows: whenever
/// a row takes a name another row holds, the other row is superseded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    jobs: BTreeMap<ClientId, Job>,
    last_client_id: ClientId,
    notice: Option<Notice>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        let jobs: Vec<JobRowView> = self
            .jobs_sorted()
            .into_iter()
            .map(JobRowView::from_job)
            .collect();
        AppViewModel {
            job_count: jobs.len(),
            active_count: jobs.iter().filter(|job| !job.state.is_terminal()).count(),
            jobs,
            notice: self.notice.clone(),
        }
    }

    /// Returns whether the state changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn job(&self, client_id: ClientId) -> Option<&Job> {
        self.jobs.get(&client_id)
    }

    pub fn find_by_output_name(&self, output_name: &str) -> Option<&Job> {
        self.jobs.values().find(|job| job.output_name == output_name)
    }

    /// Jobs ordered most recent first; equal timestamps keep newer client ids first.
    pub fn jobs_sorted(&self) -> Vec<&Job> {
        let mut jobs: Vec<&Job> = self.jobs.values().collect();
        jobs.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| b.client_id.cmp(&a.client_id))
        });
        jobs
    }

    pub fn has_active_jobs(&self) -> bool {
        self.jobs.values().any(|job| !job.state.is_terminal())
    }

    pub(crate) fn set_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
        self.dirty = true;
    }

    /// Inserts a `Submitting` row for a freshly picked file and returns its
    /// client id and guessed artifact name.
    pub(crate) fn insert_optimistic(
        &mut self,
        input_name: &str,
        selected_at: Timestamp,
    ) -> (ClientId, String) {
        let client_id = self.allocate_client_id();
        let output_name = guess_output_name(input_name);
        let mut job = Job::new(client_id, output_name.clone(), selected_at);
        job.input_name = Some(input_name.to_owned());
        self.jobs.insert(client_id, job);
        self.release_output_name(client_id, &output_name);
        self.dirty = true;
        (client_id, output_name)
    }

    /// Merges a server snapshot. Matching names take the server's fields.
    pub(crate) fn merge_snapshot(&mut self, entries: Vec<SnapshotEntry>) {
        for entry in entries {
            if entry.output_name.trim().is_empty() {
                conv_warn!("Skipping snapshot entry without output name: {:?}", entry);
                continue;
            }
            let existing = self
                .find_by_output_name(&entry.output_name)
                .map(|job| job.client_id);
            match existing.and_then(|id| self.jobs.get_mut(&id)) {
                Some(job) => {
                    job.input_name = Some(entry.input_name);
                    job.timestamp = entry.timestamp;
                    if !job.state.is_terminal() {
                        job.advance(JobState::Done, Some(100));
                    }
                }
                None => {
                    let client_id = self.allocate_client_id();
                    let mut job = Job::new(client_id, entry.output_name, entry.timestamp);
                    job.input_name = Some(entry.input_name);
                    job.advance(JobState::Done, Some(100));
                    self.jobs.insert(client_id, job);
                }
            }
        }
        self.dirty = true;
    }

    pub(crate) fn apply_submit_accepted(
        &mut self,
        client_id: ClientId,
        job_id: String,
        output_name: Option<String>,
    ) {
        if !self.jobs.contains_key(&client_id) {
            conv_warn!("Submit result for unknown client id {}", client_id);
            return;
        }
        // Bind first so a row synthesized from an early event is folded in
        // before the name check.
        self.bind_job_id(client_id, &job_id);
        if let Some(name) = output_name.filter(|name| !name.trim().is_empty()) {
            self.rename(client_id, &name);
        }
        if let Some(job) = self.jobs.get_mut(&client_id) {
            job.advance(JobState::Converting, None);
        }
        self.dirty = true;
    }

    pub(crate) fn apply_submit_failed(&mut self, client_id: ClientId, message: &str) {
        match self.jobs.get_mut(&client_id) {
            Some(job) => {
                job.fail(message);
            }
            None => conv_warn!("Submit failure for unknown client id {}", client_id),
        }
        self.set_notice(Notice::Error(message.to_owned()));
    }

    pub(crate) fn apply_progress(&mut self, update: ProgressUpdate) -> ProgressOutcome {
        let key = Correlation::new(
            update.job_id.as_deref(),
            update.output_name.as_deref(),
            update.input_name.as_deref(),
        );
        if key.is_empty() {
            conv_warn!("Dropping progress event without correlation keys: {:?}", update);
            return ProgressOutcome::Dropped;
        }

        let matched = resolve(self.jobs.values(), &key)
            .map(|(kind, job)| (kind, job.client_id, job.job_id.clone()));
        let outcome = match matched {
            Some((kind, client_id, Some(bound)))
                if key.job_id.is_some_and(|event_id| event_id != bound.as_str()) =>
            {
                // A row bound to another job never takes this event's state or names.
                conv_debug!(
                    "Ignoring event for job id {:?}: client id {} matched by {:?} is bound to {}",
                    key.job_id,
                    client_id,
                    kind,
                    bound
                );
                ProgressOutcome::Ignored(client_id)
            }
            Some((kind, client_id, _)) => {
                conv_debug!("Progress event matched client id {} by {:?}", client_id, kind);
                self.reconcile_keys(client_id, &key);
                let advanced = self
                    .jobs
                    .get_mut(&client_id)
                    .is_some_and(|job| job.advance(update.status.job_state(), update.progress));
                if advanced {
                    ProgressOutcome::Updated(client_id)
                } else {
                    ProgressOutcome::Ignored(client_id)
                }
            }
            None => self.synthesize(&key, &update),
        };
        self.dirty = true;
        outcome
    }

    pub(crate) fn apply_complete(&mut self, update: CompletionUpdate) -> ProgressOutcome {
        self.apply_progress(ProgressUpdate {
            job_id: update.job_id,
            output_name: update.output_name,
            input_name: update.input_name,
            status: update.status,
            progress: None,
            observed_at: update.observed_at,
        })
    }

    /// Returns the artifact name when the row can be downloaded.
    pub(crate) fn downloadable_name(&mut self, client_id: ClientId) -> Option<String> {
        match self.jobs.get(&client_id) {
            Some(job) if job.state == JobState::Done => Some(job.output_name.clone()),
            Some(job) => {
                let text = format!("{} is not finished converting yet.", job.output_name);
                self.set_notice(Notice::Error(text));
                None
            }
            None => {
                conv_warn!("Download requested for unknown client id {}", client_id);
                None
            }
        }
    }

    fn synthesize(&mut self, key: &Correlation<'_>, update: &ProgressUpdate) -> ProgressOutcome {
        let output_name = key
            .output_name
            .map(str::to_owned)
            .or_else(|| key.input_name.map(guess_output_name))
            .or_else(|| key.job_id.map(str::to_owned));
        let Some(output_name) = output_name else {
            return ProgressOutcome::Dropped;
        };

        let client_id = self.allocate_client_id();
        let mut job = Job::new(client_id, output_name.clone(), update.observed_at);
        job.job_id = key.job_id.map(str::to_owned);
        job.input_name = key.input_name.map(str::to_owned);
        job.advance(JobState::Converting, None);
        job.advance(update.status.job_state(), update.progress);
        conv_debug!(
            "Synthesized client id {} for unmatched event {:?}",
            client_id,
            update
        );
        self.jobs.insert(client_id, job);
        self.release_output_name(client_id, &output_name);
        ProgressOutcome::Synthesized(client_id)
    }

    fn reconcile_keys(&mut self, client_id: ClientId, key: &Correlation<'_>) {
        if let Some(job_id) = key.job_id {
            self.bind_job_id(client_id, job_id);
        }
        if let Some(name) = key.output_name {
            self.rename(client_id, name);
        }
    }

    /// Adopts a server-reported name on a live row.
    fn rename(&mut self, client_id: ClientId, name: &str) {
        let renamed = match self.jobs.get_mut(&client_id) {
            Some(job) if !job.state.is_terminal() && job.output_name != name => {
                conv_debug!("Renaming {} to {}", job.output_name, name);
                job.output_name = name.to_owned();
                true
            }
            _ => false,
        };
        if renamed {
            self.release_output_name(client_id, name);
        }
    }

    /// Gives `client_id` the server id if it has none. A different row that
    /// already carries the id describes the same job and is folded in.
    fn bind_job_id(&mut self, client_id: ClientId, job_id: &str) {
        match self.jobs.get_mut(&client_id) {
            Some(job) if job.job_id.is_none() => job.job_id = Some(job_id.to_owned()),
            Some(job) if job.job_id.as_deref() == Some(job_id) => {}
            _ => return,
        }
        let duplicate = self
            .jobs
            .values()
            .find(|job| job.client_id != client_id && job.job_id.as_deref() == Some(job_id))
            .map(|job| job.client_id);
        if let Some(other) = duplicate {
            self.absorb(client_id, other);
        }
    }

    fn absorb(&mut self, keep: ClientId, other: ClientId) {
        let Some(gone) = self.jobs.remove(&other) else {
            return;
        };
        conv_debug!("Folding client id {} into {}", other, keep);
        if let Some(job) = self.jobs.get_mut(&keep) {
            if job.input_name.is_none() {
                job.input_name = gone.input_name;
            }
            if job.advance(gone.state, Some(gone.progress)) && gone.error.is_some() {
                job.error = gone.error;
            }
        }
    }

    fn release_output_name(&mut self, owner: ClientId, output_name: &str) {
        self.jobs.retain(|client_id, job| {
            let superseded = *client_id != owner && job.output_name == output_name;
            if superseded {
                conv_debug!(
                    "Client id {} supersedes {} for {}",
                    owner,
                    client_id,
                    output_name
                );
            }
            !superseded
        });
    }

    fn allocate_client_id(&mut self) -> ClientId {
        self.last_client_id += 1;
        self.last_client_id
    }
}
