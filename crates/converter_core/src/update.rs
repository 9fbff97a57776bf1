use converter_logging::{conv_debug, conv_warn};

use crate::view_model::Notice;
use crate::{AppState, Effect, Msg, ProgressStatus};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::RefreshRequested => vec![Effect::RefreshSnapshot],
        Msg::SnapshotLoaded(entries) => {
            state.merge_snapshot(entries);
            Vec::new()
        }
        Msg::SnapshotFailed { message } => {
            conv_warn!("Snapshot refresh failed: {}", message);
            state.set_notice(Notice::Error(message));
            Vec::new()
        }
        Msg::FileSelected {
            input_name,
            location,
            selected_at,
        } => {
            let input_name = input_name.trim();
            if input_name.is_empty() {
                return (state, Vec::new());
            }
            let (client_id, _guess) = state.insert_optimistic(input_name, selected_at);
            vec![Effect::SubmitFile {
                client_id,
                input_name: input_name.to_owned(),
                location,
            }]
        }
        Msg::SubmitAccepted {
            client_id,
            job_id,
            output_name,
        } => {
            state.apply_submit_accepted(client_id, job_id, output_name);
            Vec::new()
        }
        Msg::SubmitFailed { client_id, message } => {
            state.apply_submit_failed(client_id, &message);
            Vec::new()
        }
        Msg::JobProgress(progress) => {
            let outcome = state.apply_progress(progress);
            conv_debug!("Progress event: {:?}", outcome);
            Vec::new()
        }
        Msg::JobComplete(complete) => {
            // The event alone is not the full record; re-sync names and timestamps.
            let converted = complete.status == ProgressStatus::Converted;
            let outcome = state.apply_complete(complete);
            conv_debug!("Completion event: {:?}", outcome);
            if converted {
                vec![Effect::RefreshSnapshot]
            } else {
                Vec::new()
            }
        }
        Msg::DownloadRequested { client_id } => match state.downloadable_name(client_id) {
            Some(output_name) => vec![Effect::RetrieveArtifact {
                client_id,
                output_name,
            }],
            None => Vec::new(),
        },
        Msg::ArtifactSaved { client_id, path } => {
            let name = state
                .job(client_id)
                .map(|job| job.output_name.clone())
                .unwrap_or_default();
            state.set_notice(Notice::Info(format!(
                "Saved {name} to {}",
                path.display()
            )));
            Vec::new()
        }
        Msg::ArtifactCanceled { .. } => Vec::new(),
        Msg::ArtifactFailed { client_id, message } => {
            conv_warn!("Download for client id {} failed: {}", client_id, message);
            state.set_notice(Notice::Error(message));
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
