use std::path::Path;

/// Extension of every artifact the service produces.
pub const ARTIFACT_EXTENSION: &str = "sdp";

/// MIME type for an upload, inferred from the file extension.
pub fn guess_content_type(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("xls") => "application/vnd.ms-excel",
        Some("csv") => "text/csv",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Host-side artifact name for an upload: the file stem plus `.sdp`.
pub fn artifact_name(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or("upload");
    format!("{stem}.{ARTIFACT_EXTENSION}")
}

/// Reduces a requested artifact name to a bare, filesystem-safe file name.
///
/// Directory components are dropped, control characters removed, and
/// characters Windows forbids in file names replaced by `_`.
pub fn sanitize_artifact_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    base.chars()
        .filter(|c| !c.is_control())
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

pub(crate) fn has_artifact_extension(name: &str) -> bool {
    name.rsplit_once('.')
        .is_some_and(|(stem, ext)| !stem.is_empty() && ext.eq_ignore_ascii_case(ARTIFACT_EXTENSION))
}

fn is_forbidden(c: char) -> bool {
    matches!(c, '<' | '>' | ':' | '"' | '|' | '?' | '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_types_follow_extension() {
        assert_eq!(
            guess_content_type("book.XLSX"),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
        assert_eq!(guess_content_type("old.xls"), "application/vnd.ms-excel");
        assert_eq!(guess_content_type("rows.csv"), "text/csv");
        assert_eq!(guess_content_type("notes.txt"), "text/plain");
        assert_eq!(guess_content_type("blob"), "application/octet-stream");
        assert_eq!(guess_content_type("x.json"), "application/octet-stream");
    }

    #[test]
    fn artifact_name_replaces_any_extension() {
        assert_eq!(artifact_name("report.xlsx"), "report.sdp");
        assert_eq!(artifact_name("data.json"), "data.sdp");
        assert_eq!(artifact_name("plain"), "plain.sdp");
        assert_eq!(artifact_name(""), "upload.sdp");
    }

    #[test]
    fn sanitizing_strips_paths_and_control_chars() {
        assert_eq!(sanitize_artifact_name("../../etc/passwd.sdp"), "passwd.sdp");
        assert_eq!(sanitize_artifact_name("C:\\Users\\me\\a.sdp"), "a.sdp");
        assert_eq!(sanitize_artifact_name("bad\u{7}name?.sdp"), "badname_.sdp");
        assert!(has_artifact_extension("x.SDP"));
        assert!(!has_artifact_extension(".sdp"));
        assert!(!has_artifact_extension("x.sdp.exe"));
    }
}
