//! Converter core: the presentation-side job store as a pure state machine.
mod effect;
mod job;
mod matcher;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use job::{guess_output_name, ClientId, Job, JobState, Timestamp, OUTPUT_EXTENSION};
pub use matcher::{resolve, Correlation, MatchKey, MATCHERS};
pub use msg::{CompletionUpdate, Msg, ProgressStatus, ProgressUpdate, SnapshotEntry};
pub use state::{AppState, ProgressOutcome};
pub use update::update;
pub use view_model::{AppViewModel, JobRowView, Notice};
