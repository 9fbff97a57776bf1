use chrono::{DateTime, Local};
use converter_core::{AppViewModel, JobRowView, JobState, Notice};

fn state_label(state: JobState) -> &'static str {
    match state {
        JobState::Submitting => "submitting",
        JobState::Converting => "converting",
        JobState::Done => "done",
        JobState::Failed => "failed",
    }
}

fn format_timestamp(millis: i64) -> String {
    if millis <= 0 {
        return "-".to_string();
    }
    DateTime::from_timestamp_millis(millis)
        .map(|utc| utc.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// One status line for a job, used while jobs are running.
pub fn row_line(row: &JobRowView) -> String {
    let mut line = format!(
        "[{:>3}%] {:<10} {}",
        row.progress,
        state_label(row.state),
        row.output_name
    );
    if let Some(input) = &row.input_name {
        line.push_str(&format!(" <- {input}"));
    }
    if let Some(error) = &row.error {
        line.push_str(&format!(" ({error})"));
    }
    line
}

pub fn notice_line(notice: &Notice) -> String {
    match notice {
        Notice::Info(text) => text.clone(),
        Notice::Error(text) => format!("error: {text}"),
    }
}

/// The full job list, most recent first.
pub fn render_table(view: &AppViewModel) -> String {
    if view.jobs.is_empty() {
        return "No conversions yet.".to_string();
    }

    let name_width = view
        .jobs
        .iter()
        .map(|row| row.output_name.chars().count())
        .max()
        .unwrap_or(0)
        .max("OUTPUT".len());

    let mut out = format!(
        "{:<10} {:>8}  {:<name_width$}  {:<19}  INPUT\n",
        "STATE", "PROGRESS", "OUTPUT", "UPDATED"
    );
    for row in &view.jobs {
        let input = row.input_name.as_deref().unwrap_or("-");
        out.push_str(&format!(
            "{:<10} {:>7}%  {:<name_width$}  {:<19}  {}",
            state_label(row.state),
            row.progress,
            row.output_name,
            format_timestamp(row.timestamp),
            input
        ));
        if let Some(error) = &row.error {
            out.push_str(&format!("  ({error})"));
        }
        out.push('\n');
    }
    out.push_str(&format!(
        "{} job(s), {} active",
        view.job_count, view.active_count
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(client_id: u64, output: &str, state: JobState, progress: u8) -> JobRowView {
        JobRowView {
            client_id,
            job_id: None,
            output_name: output.to_string(),
            input_name: Some(output.replace(".sdp", ".xlsx")),
            state,
            progress,
            timestamp: 0,
            error: None,
            downloadable: state == JobState::Done,
        }
    }

    #[test]
    fn empty_list_says_so() {
        assert_eq!(render_table(&AppViewModel::default()), "No conversions yet.");
    }

    #[test]
    fn table_lists_rows_in_view_order() {
        let mut failed = row(2, "budget.sdp", JobState::Failed, 0);
        failed.error = Some("unsupported sheet".to_string());
        let view = AppViewModel {
            jobs: vec![failed, row(1, "report.sdp", JobState::Done, 100)],
            job_count: 2,
            active_count: 0,
            notice: None,
        };

        let table = render_table(&view);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("STATE"));
        assert!(lines[1].starts_with("failed"));
        assert!(lines[1].contains("budget.sdp"));
        assert!(lines[1].ends_with("(unsupported sheet)"));
        assert!(lines[2].starts_with("done"));
        assert!(lines[2].contains("100%"));
        assert!(lines[2].ends_with("report.xlsx"));
        assert_eq!(lines[3], "2 job(s), 0 active");
    }

    #[test]
    fn row_line_shows_progress_and_source() {
        let line = row_line(&row(3, "q3.sdp", JobState::Converting, 45));
        assert_eq!(line, "[ 45%] converting q3.sdp <- q3.xlsx");
    }

    #[test]
    fn notices_are_prefixed_by_severity() {
        assert_eq!(notice_line(&Notice::Info("Saved".into())), "Saved");
        assert_eq!(notice_line(&Notice::Error("boom".into())), "error: boom");
    }
}
