use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use converter_engine::SaveDialog;
use converter_logging::conv_warn;

/// Save prompt on the controlling terminal.
pub struct TerminalSaveDialog {
    assume_yes: bool,
    output: Option<PathBuf>,
}

impl TerminalSaveDialog {
    pub fn new(assume_yes: bool, output: Option<PathBuf>) -> Self {
        Self { assume_yes, output }
    }
}

#[async_trait::async_trait]
impl SaveDialog for TerminalSaveDialog {
    async fn choose_destination(&self, suggested: &Path) -> Option<PathBuf> {
        let default = self.output.clone().unwrap_or_else(|| suggested.to_path_buf());
        let chosen = if self.assume_yes {
            Some(default)
        } else {
            let prompt_default = default.clone();
            tokio::task::spawn_blocking(move || prompt(&prompt_default))
                .await
                .ok()
                .flatten()
        }?;

        if let Some(parent) = chosen.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(err) = tokio::fs::create_dir_all(parent).await {
                conv_warn!("Cannot create {}: {}", parent.display(), err);
            }
        }
        Some(chosen)
    }
}

fn prompt(default: &Path) -> Option<PathBuf> {
    print!("Save to {}? [Y/n/other path] ", default.display());
    let _ = io::stdout().flush();
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => interpret_answer(&line, default),
    }
}

/// Maps a prompt answer to a destination. `None` means the user declined.
fn interpret_answer(answer: &str, default: &Path) -> Option<PathBuf> {
    let answer = answer.trim();
    match answer.to_ascii_lowercase().as_str() {
        "" | "y" | "yes" => Some(default.to_path_buf()),
        "n" | "no" => None,
        _ => Some(PathBuf::from(answer)),
    }
}
