use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Once;

use converter_core::{
    update, AppState, Effect, JobState, Msg, ProgressStatus, ProgressUpdate, SnapshotEntry,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(converter_logging::initialize_for_tests);
}

fn entry(output: &str, input: &str, timestamp: i64) -> SnapshotEntry {
    SnapshotEntry {
        output_name: output.to_string(),
        input_name: input.to_string(),
        timestamp,
    }
}

fn select(state: AppState, name: &str, at: i64) -> (AppState, Vec<Effect>) {
    update(
        state,
        Msg::FileSelected {
            input_name: name.to_string(),
            location: PathBuf::from(name),
            selected_at: at,
        },
    )
}

fn assert_unique_output_names(state: &AppState) {
    let view = state.view();
    let names: HashSet<_> = view.jobs.iter().map(|job| job.output_name.clone()).collect();
    assert_eq!(names.len(), view.jobs.len(), "duplicate rows: {:?}", view.jobs);
}

#[test]
fn refresh_request_emits_snapshot_effect() {
    init_logging();
    let (_state, effects) = update(AppState::new(), Msg::RefreshRequested);
    assert_eq!(effects, vec![Effect::RefreshSnapshot]);
}

#[test]
fn snapshot_rows_are_done_and_sorted_newest_first() {
    init_logging();
    let (mut state, effects) = update(
        AppState::new(),
        Msg::SnapshotLoaded(vec![
            entry("a.sdp", "a.csv", 100),
            entry("b.sdp", "b.csv", 300),
            entry("c.sdp", "c.csv", 200),
        ]),
    );
    assert!(effects.is_empty());

    let view = state.view();
    let stamps: Vec<_> = view.jobs.iter().map(|job| job.timestamp).collect();
    assert_eq!(stamps, vec![300, 200, 100]);
    assert!(view
        .jobs
        .iter()
        .all(|job| job.state == JobState::Done && job.progress == 100 && job.downloadable));
    assert_eq!(view.active_count, 0);
    assert!(state.consume_dirty());
    assert!(!state.consume_dirty());
}

#[test]
fn snapshot_wins_over_optimistic_row_with_same_name() {
    init_logging();
    let (state, _) = select(AppState::new(), "a.csv", 50);
    let client_id = state.view().jobs[0].client_id;
    assert_eq!(state.view().jobs[0].output_name, "a.sdp");
    assert_eq!(state.view().jobs[0].state, JobState::Submitting);

    let (state, _) = update(state, Msg::SnapshotLoaded(vec![entry("a.sdp", "a.csv", 100)]));
    let view = state.view();
    assert_eq!(view.job_count, 1);
    let job = &view.jobs[0];
    assert_eq!(job.client_id, client_id);
    assert_eq!(job.output_name, "a.sdp");
    assert_eq!(job.state, JobState::Done);
    assert_eq!(job.progress, 100);
    assert_eq!(job.timestamp, 100);
}

#[test]
fn repeated_snapshots_do_not_duplicate_rows() {
    init_logging();
    let snapshot = vec![entry("a.sdp", "a.csv", 100), entry("b.sdp", "b.csv", 200)];
    let (state, _) = update(AppState::new(), Msg::SnapshotLoaded(snapshot.clone()));
    let before: Vec<_> = state.view().jobs.iter().map(|job| job.client_id).collect();

    let (state, _) = update(state, Msg::SnapshotLoaded(snapshot));
    let after: Vec<_> = state.view().jobs.iter().map(|job| job.client_id).collect();
    assert_eq!(before, after);
    assert_unique_output_names(&state);
}

#[test]
fn duplicate_names_inside_one_snapshot_collapse_last_write_wins() {
    init_logging();
    let (state, _) = update(
        AppState::new(),
        Msg::SnapshotLoaded(vec![
            entry("a.sdp", "first.csv", 100),
            entry("a.sdp", "second.csv", 400),
        ]),
    );
    let view = state.view();
    assert_eq!(view.job_count, 1);
    assert_eq!(view.jobs[0].input_name.as_deref(), Some("second.csv"));
    assert_eq!(view.jobs[0].timestamp, 400);
}

#[test]
fn snapshot_refreshes_failed_row_without_reviving_it() {
    init_logging();
    let (state, _) = select(AppState::new(), "a.csv", 50);
    let client_id = state.view().jobs[0].client_id;
    let (state, _) = update(
        state,
        Msg::SubmitFailed {
            client_id,
            message: "backend 4xx: unsupported sheet".to_string(),
        },
    );
    let (state, _) = update(state, Msg::SnapshotLoaded(vec![entry("a.sdp", "a.csv", 900)]));

    let job = state.job(client_id).unwrap();
    assert_eq!(job.state, JobState::Failed);
    assert_eq!(job.timestamp, 900);
    assert_eq!(state.view().job_count, 1);
}

#[test]
fn resubmitting_a_finished_file_supersedes_the_old_row() {
    init_logging();
    let (state, _) = update(
        AppState::new(),
        Msg::SnapshotLoaded(vec![entry("a.sdp", "a.csv", 100)]),
    );
    let old_id = state.view().jobs[0].client_id;

    let (state, effects) = select(state, "a.csv", 500);
    let view = state.view();
    assert_eq!(view.job_count, 1);
    assert_ne!(view.jobs[0].client_id, old_id);
    assert_eq!(view.jobs[0].state, JobState::Submitting);
    assert!(matches!(effects.as_slice(), [Effect::SubmitFile { .. }]));
}

#[test]
fn mixed_merges_keep_output_names_unique() {
    init_logging();
    let (state, _) = select(AppState::new(), "a.csv", 10);
    let (state, _) = select(state, "b.xlsx", 20);
    let (state, _) = update(
        state,
        Msg::JobProgress(ProgressUpdate {
            job_id: Some("u-7".to_string()),
            output_name: Some("b.sdp".to_string()),
            input_name: Some("b.xlsx".to_string()),
            status: ProgressStatus::Converting,
            progress: Some(30),
            observed_at: 25,
        }),
    );
    let (state, _) = update(
        state,
        Msg::JobProgress(ProgressUpdate {
            job_id: Some("u-8".to_string()),
            output_name: Some("a.sdp".to_string()),
            input_name: None,
            status: ProgressStatus::Converting,
            progress: Some(5),
            observed_at: 26,
        }),
    );
    let (state, _) = update(
        state,
        Msg::SnapshotLoaded(vec![entry("a.sdp", "a.csv", 30), entry("z.sdp", "z.txt", 1)]),
    );
    assert_unique_output_names(&state);
    assert_eq!(state.view().job_count, 3);
}
