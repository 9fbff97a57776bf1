use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use converter_logging::{conv_debug, conv_info};

use crate::naming::{has_artifact_extension, sanitize_artifact_name, ARTIFACT_EXTENSION};
use crate::persist::write_atomically;
use crate::{ConversionService, RetrieveOutcome, ServiceError};

/// Chooses where a downloaded artifact goes.
#[async_trait::async_trait]
pub trait SaveDialog: Send + Sync {
    /// Returns the chosen destination, or `None` when the user cancels.
    async fn choose_destination(&self, suggested: &Path) -> Option<PathBuf>;
}

/// Downloads finished artifacts and saves them where the user chooses.
#[derive(Clone)]
pub struct Retriever {
    service: Arc<dyn ConversionService>,
    dialog: Arc<dyn SaveDialog>,
    download_dir: PathBuf,
}

impl Retriever {
    pub fn new(
        service: Arc<dyn ConversionService>,
        dialog: Arc<dyn SaveDialog>,
        download_dir: PathBuf,
    ) -> Self {
        Self {
            service,
            dialog,
            download_dir,
        }
    }

    pub async fn retrieve(&self, name: &str) -> Result<RetrieveOutcome, ServiceError> {
        let safe_name = sanitize_artifact_name(name);
        if !has_artifact_extension(&safe_name) {
            return Err(ServiceError::Validation(format!(
                "only .{ARTIFACT_EXTENSION} files can be downloaded, got {name:?}"
            )));
        }

        let payload = self.service.download(&safe_name).await?;
        conv_debug!("Downloaded {} ({} bytes)", safe_name, payload.len());

        let suggested = self.download_dir.join(&safe_name);
        let Some(destination) = self.dialog.choose_destination(&suggested).await else {
            conv_info!("Save of {} cancelled", safe_name);
            return Ok(RetrieveOutcome::canceled());
        };

        let saved_path =
            tokio::task::spawn_blocking(move || write_atomically(&destination, &payload))
                .await
                .map_err(|err| ServiceError::Io(io::Error::other(err)))?
                .map_err(|err| ServiceError::Io(err.into()))?;
        conv_info!("Saved {} to {}", safe_name, saved_path.display());
        Ok(RetrieveOutcome::Saved { saved_path })
    }
}
