//! Identity resolution for incoming events.
//!
//! A job may be addressed by its server id, its artifact name, or the name of
//! the file the user picked. Matchers run in priority order and the first one
//! that finds a job wins. Each matcher yields at most one job: the most recent
//! candidate.

use crate::Job;

/// Correlation keys carried by an event. Empty strings count as missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Correlation<'a> {
    pub job_id: Option<&'a str>,
    pub output_name: Option<&'a str>,
    pub input_name: Option<&'a str>,
}

impl<'a> Correlation<'a> {
    pub fn new(
        job_id: Option<&'a str>,
        output_name: Option<&'a str>,
        input_name: Option<&'a str>,
    ) -> Self {
        Self {
            job_id: non_empty(job_id),
            output_name: non_empty(output_name),
            input_name: non_empty(input_name),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.job_id.is_none() && self.output_name.is_none() && self.input_name.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKey {
    JobId,
    OutputName,
    InputName,
}

pub type Matcher = fn(&Job, &Correlation<'_>) -> bool;

/// Matchers in precedence order.
pub const MATCHERS: [(MatchKey, Matcher); 3] = [
    (MatchKey::JobId, by_job_id),
    (MatchKey::OutputName, by_output_name),
    (MatchKey::InputName, by_input_name),
];

/// Finds the job an event refers to, together with the key that matched.
pub fn resolve<'j, I>(jobs: I, key: &Correlation<'_>) -> Option<(MatchKey, &'j Job)>
where
    I: IntoIterator<Item = &'j Job>,
    I::IntoIter: Clone,
{
    let jobs = jobs.into_iter();
    MATCHERS.iter().find_map(|(kind, matcher)| {
        jobs.clone()
            .filter(|job| matcher(job, key))
            .max_by_key(|job| (job.timestamp, job.client_id))
            .map(|job| (*kind, job))
    })
}

fn by_job_id(job: &Job, key: &Correlation<'_>) -> bool {
    matches!((job.job_id.as_deref(), key.job_id), (Some(ours), Some(theirs)) if ours == theirs)
}

fn by_output_name(job: &Job, key: &Correlation<'_>) -> bool {
    key.output_name.is_some_and(|name| job.output_name == name)
}

// Two jobs may share an original file name; never steal a row that is already
// bound to a different server id.
fn by_input_name(job: &Job, key: &Correlation<'_>) -> bool {
    let same_input = matches!(
        (job.input_name.as_deref(), key.input_name),
        (Some(ours), Some(theirs)) if ours == theirs
    );
    let unbound = match (job.job_id.as_deref(), key.job_id) {
        (Some(ours), Some(theirs)) => ours == theirs,
        _ => true,
    };
    same_input && unbound
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
