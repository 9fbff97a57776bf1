use std::sync::Arc;

use converter_logging::{conv_info, conv_warn};

use crate::naming::{artifact_name, guess_content_type};
use crate::{
    ConversionService, FileContent, PollTarget, PreparedUpload, ServiceError, StatusPoller,
    SubmitReceipt, UploadFile,
};

/// Uploads files and hands accepted jobs to the status poller.
#[derive(Clone)]
pub struct Submitter {
    service: Arc<dyn ConversionService>,
    poller: StatusPoller,
}

impl Submitter {
    pub fn new(service: Arc<dyn ConversionService>, poller: StatusPoller) -> Self {
        Self { service, poller }
    }

    pub async fn submit(&self, file: UploadFile) -> Result<SubmitReceipt, ServiceError> {
        let upload = prepare_upload(file).await?;
        let input_name = upload.file_name.clone();
        conv_info!(
            "Submitting {} ({} bytes, {})",
            input_name,
            upload.bytes.len(),
            upload.content_type
        );

        let response = match self.service.submit(upload).await {
            Ok(response) => response,
            Err(err) => {
                conv_warn!("Submission of {} failed: {}", input_name, err);
                return Err(err);
            }
        };
        let output_name = response
            .output_name
            .unwrap_or_else(|| artifact_name(&input_name));

        self.poller.start(PollTarget {
            job_id: response.job_id.clone(),
            input_name,
            output_name: output_name.clone(),
        });
        Ok(SubmitReceipt {
            job_id: response.job_id,
            output_name,
        })
    }
}

async fn prepare_upload(file: UploadFile) -> Result<PreparedUpload, ServiceError> {
    let file_name = file.name.trim().to_string();
    if file_name.is_empty() {
        return Err(ServiceError::Validation("file name is empty".into()));
    }

    let bytes = match file.content {
        FileContent::Bytes(bytes) => bytes,
        FileContent::Path(path) => tokio::fs::read(&path).await.map_err(|err| {
            ServiceError::Validation(format!("cannot read {}: {err}", path.display()))
        })?,
    };
    if bytes.is_empty() {
        return Err(ServiceError::Validation(format!("{file_name} is empty")));
    }

    Ok(PreparedUpload {
        content_type: guess_content_type(&file_name).to_string(),
        file_name,
        bytes,
    })
}
