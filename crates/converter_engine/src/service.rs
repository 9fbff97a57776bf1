use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime};
use converter_logging::{conv_debug, conv_error, conv_info, conv_warn};
use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::{JobId, RemoteStatus, ServiceError, SnapshotEntry};

/// Paths of the service endpoints, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub convert: String,
    pub progress: String,
    pub list: String,
    pub download: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            convert: "/api/v1/file-encryptor/convert-to-sdp".to_string(),
            progress: "/api/v1/file-encryptor/progress".to_string(),
            list: "/api/v1/file-encryptor/list-sdp".to_string(),
            download: "/api/v1/file-encryptor/download-sdp".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub base_url: String,
    pub endpoints: Endpoints,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_artifact_bytes: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            endpoints: Endpoints::default(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            max_artifact_bytes: 512 * 1024 * 1024,
        }
    }
}

/// A validated upload ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitResponse {
    pub job_id: JobId,
    /// Artifact name, when the service already decided it.
    pub output_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub status: RemoteStatus,
    pub progress: u8,
}

/// The remote conversion service.
#[async_trait::async_trait]
pub trait ConversionService: Send + Sync {
    async fn submit(&self, upload: PreparedUpload) -> Result<SubmitResponse, ServiceError>;
    async fn status(&self, job_id: &str) -> Result<StatusReport, ServiceError>;
    async fn list(&self) -> Result<Vec<SnapshotEntry>, ServiceError>;
    async fn download(&self, name: &str) -> Result<Bytes, ServiceError>;
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct UploadData {
    #[serde(alias = "jobId", alias = "job_id")]
    upload_id: Option<Value>,
    #[serde(alias = "outputName")]
    converted_filename: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProgressData {
    status: Option<String>,
    progress: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ListItem {
    #[serde(alias = "outputName")]
    converted_filename: Option<String>,
    #[serde(alias = "inputName")]
    original_filename: Option<String>,
    timestamp: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct ReqwestService {
    settings: ServiceSettings,
    client: reqwest::Client,
}

impl ReqwestService {
    pub fn new(settings: ServiceSettings) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(ServiceError::from_reqwest)?;
        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Checks whether the service answers at all. Any HTTP status counts.
    ///
    /// Returns the first URL that answered.
    pub async fn probe(&self) -> Option<String> {
        let base = self.settings.base_url.trim_end_matches('/');
        let targets = [format!("{base}/docs"), format!("{base}/openapi.json"), base.to_string()];
        for target in targets {
            match self.client.get(&target).send().await {
                Ok(response) => {
                    conv_info!("Service reachable at {} (status {})", target, response.status());
                    return Some(target);
                }
                Err(err) => conv_warn!("Probe of {} failed: {}", target, err),
            }
        }
        conv_error!("Service not reachable at {}", base);
        None
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, ServiceError> {
        let raw = format!("{}{}", self.settings.base_url.trim_end_matches('/'), path);
        Url::parse_with_params(&raw, params)
            .map_err(|err| ServiceError::Validation(format!("invalid service url {raw}: {err}")))
    }
}

#[async_trait::async_trait]
impl ConversionService for ReqwestService {
    async fn submit(&self, upload: PreparedUpload) -> Result<SubmitResponse, ServiceError> {
        let url = self.endpoint(&self.settings.endpoints.convert, &[])?;
        let part = Part::bytes(upload.bytes)
            .file_name(upload.file_name.clone())
            .mime_str(&upload.content_type)
            .map_err(ServiceError::from_reqwest)?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(ServiceError::from_reqwest)?;
        let status = response.status();
        let body = response.bytes().await.map_err(ServiceError::from_reqwest)?;
        if status.is_client_error() {
            return Err(ServiceError::Validation(error_message(status, &body)));
        }
        if !status.is_success() {
            return Err(ServiceError::Transport(error_message(status, &body)));
        }

        let data: UploadData = parse_data(&body)?
            .ok_or_else(|| ServiceError::Protocol("upload response has no data".into()))?;
        let job_id = data
            .upload_id
            .as_ref()
            .and_then(id_from_value)
            .ok_or_else(|| ServiceError::Protocol("service did not return a job id".into()))?;
        conv_debug!("Upload of {} accepted as {}", upload.file_name, job_id);
        Ok(SubmitResponse {
            job_id,
            output_name: data.converted_filename.filter(|name| !name.is_empty()),
        })
    }

    async fn status(&self, job_id: &str) -> Result<StatusReport, ServiceError> {
        let url = self.endpoint(&self.settings.endpoints.progress, &[("upload_id", job_id)])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(ServiceError::from_reqwest)?;
        let status = response.status();
        let body = response.bytes().await.map_err(ServiceError::from_reqwest)?;
        if !status.is_success() {
            return Err(ServiceError::Transport(error_message(status, &body)));
        }

        let data: ProgressData = parse_data(&body)?
            .ok_or_else(|| ServiceError::Protocol("progress response has no data".into()))?;
        let remote = data
            .status
            .as_deref()
            .map(RemoteStatus::from_wire)
            .ok_or_else(|| ServiceError::Protocol("progress response has no status".into()))?;
        let progress = data.progress.unwrap_or(0.0).clamp(0.0, 100.0).round() as u8;
        Ok(StatusReport {
            status: remote,
            progress,
        })
    }

    async fn list(&self) -> Result<Vec<SnapshotEntry>, ServiceError> {
        let url = self.endpoint(&self.settings.endpoints.list, &[])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(ServiceError::from_reqwest)?;
        let status = response.status();
        let body = response.bytes().await.map_err(ServiceError::from_reqwest)?;
        if !status.is_success() {
            return Err(ServiceError::Transport(error_message(status, &body)));
        }

        let items: Vec<ListItem> = parse_data(&body)?.unwrap_or_default();
        let entries = items
            .into_iter()
            .filter_map(|item| {
                let Some(output_name) = item.converted_filename.filter(|n| !n.is_empty()) else {
                    conv_warn!("Ignoring listed job without output name");
                    return None;
                };
                Some(SnapshotEntry {
                    output_name,
                    input_name: item.original_filename.unwrap_or_default(),
                    timestamp: parse_timestamp(item.timestamp.as_ref()),
                })
            })
            .collect();
        Ok(entries)
    }

    async fn download(&self, name: &str) -> Result<Bytes, ServiceError> {
        let url = self.endpoint(&self.settings.endpoints.download, &[("filename", name)])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(ServiceError::from_reqwest)?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            let body = response.bytes().await.unwrap_or_default();
            let message = message_field(&body).unwrap_or_else(|| format!("file not found: {name}"));
            return Err(ServiceError::NotFound(message));
        }
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(ServiceError::Transport(error_message(status, &body)));
        }

        let max_bytes = self.settings.max_artifact_bytes;
        if let Some(len) = response.content_length() {
            if len > max_bytes {
                return Err(ServiceError::Transport(format!(
                    "artifact too large (max {max_bytes}, actual {len})"
                )));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(ServiceError::from_reqwest)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(ServiceError::Transport(format!(
                    "artifact too large (max {max_bytes}, actual at least {next_len})"
                )));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(bytes))
    }
}

fn parse_data<T: DeserializeOwned>(body: &[u8]) -> Result<Option<T>, ServiceError> {
    serde_json::from_slice::<Envelope<T>>(body)
        .map(|envelope| envelope.data)
        .map_err(|err| ServiceError::Protocol(format!("malformed response body: {err}")))
}

fn message_field(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    ["message", "detail"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_owned)
}

fn error_message(status: StatusCode, body: &[u8]) -> String {
    message_field(body).unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Unix milliseconds from a number or a date string; unknown shapes give 0.
fn parse_timestamp(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(text)) => parse_timestamp_text(text.trim()).unwrap_or(0),
        _ => 0,
    }
}

fn parse_timestamp_text(text: &str) -> Option<i64> {
    if let Ok(millis) = text.parse::<i64>() {
        return Some(millis);
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.timestamp_millis());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn timestamps_accept_numbers_and_dates() {
        assert_eq!(parse_timestamp(Some(&json!(1_700_000_000_000i64))), 1_700_000_000_000);
        assert_eq!(parse_timestamp(Some(&json!("1970-01-01T00:00:01Z"))), 1_000);
        assert_eq!(parse_timestamp(Some(&json!("1970-01-01 00:00:02"))), 2_000);
        assert_eq!(parse_timestamp(Some(&json!("1970-01-01T00:00:00.5"))), 500);
        assert_eq!(parse_timestamp(Some(&json!("yesterday"))), 0);
        assert_eq!(parse_timestamp(None), 0);
    }

    #[test]
    fn error_message_prefers_server_text() {
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, br#"{"message":"bad sheet"}"#),
            "bad sheet"
        );
        assert_eq!(
            error_message(StatusCode::UNPROCESSABLE_ENTITY, br#"{"detail":"no file"}"#),
            "no file"
        );
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, b"<html>"), "HTTP 502");
    }
}
