//! Client for the TopView video-avatar API, including its upload pre-flight.

use crate::error::{MediaError, Result};
use crate::http::{bearer_headers, build_client, insert_header, parse_base_url, read_json, REQUEST_TIMEOUT};
use crate::poll::{self, PollPolicy, TaskSource, DEFAULT_POLL_INTERVAL};
use crate::task::{StatusTable, Task, TaskState};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.topview.ai/v1/";

/// Envelope `code` of a successful call.
pub const SUCCESS_CODE: &str = "200";

pub const STATUS_TABLE: StatusTable = StatusTable::new(&[
    ("waiting", TaskState::Pending),
    ("pending", TaskState::Pending),
    ("queued", TaskState::Pending),
    ("running", TaskState::Running),
    ("processing", TaskState::Running),
    ("done", TaskState::Done),
    ("completed", TaskState::Done),
    ("success", TaskState::Done),
    ("failed", TaskState::Failed),
    ("error", TaskState::Failed),
]);

pub const POLL_POLICY: PollPolicy =
    PollPolicy::warn_and_retry(DEFAULT_POLL_INTERVAL, Duration::from_secs(600), 120);

/// How long to wait for an upload to become visible to the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadCheck {
    pub interval: Duration,
    pub attempts: u32,
}

impl Default for UploadCheck {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            attempts: 10,
        }
    }
}

/// Upload format for an image, from its extension. Unknown types upload as `jpg`.
pub fn image_format(path: &Path) -> &'static str {
    match extension(path).as_deref() {
        Some("png") => "png",
        Some("webp") => "webp",
        _ => "jpg",
    }
}

/// Upload format for an audio file, from its extension. Unknown types upload as `mp3`.
pub fn audio_format(path: &Path) -> &'static str {
    match extension(path).as_deref() {
        Some("wav") => "wav",
        Some("m4a") => "m4a",
        Some("aac") => "aac",
        _ => "mp3",
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

#[derive(Deserialize, Debug)]
struct Envelope {
    #[serde(default, deserialize_with = "lenient_code")]
    code: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: serde_json::Value,
}

// The API has been seen answering with both `"200"` and `200`.
fn lenient_code<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(code) => code,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Where to PUT a file before it can be referenced by id.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadCredential {
    pub file_id: String,
    pub upload_url: String,
    #[serde(default)]
    pub file_name: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SubmitBody<'a> {
    avatar_source_from: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    image_file_id: &'a str,
    audio_source_from: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    audio_file_id: &'a str,
    mode_type: &'static str,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SubmitResult {
    #[serde(default)]
    task_id: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct QueryResult {
    #[serde(default)]
    task_id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    error_msg: String,
    #[serde(default)]
    output_video_url: String,
}

#[derive(Clone)]
pub struct TopviewClient {
    client: reqwest::Client,
    upload_client: reqwest::Client,
    base_url: Url,
    poll_policy: PollPolicy,
    upload_check: UploadCheck,
}

impl TopviewClient {
    /// Creates a client against the public API. `uid` is sent as `Topview-Uid`
    /// when non-empty.
    pub fn new(api_key: &str, uid: Option<&str>) -> Result<Self> {
        Self::new_with_url(api_key, uid, DEFAULT_BASE_URL)
    }

    pub fn new_with_url(api_key: &str, uid: Option<&str>, base_url: &str) -> Result<Self> {
        let mut headers = bearer_headers(api_key)?;
        if let Some(uid) = uid.filter(|uid| !uid.is_empty()) {
            insert_header(&mut headers, "topview-uid", uid)?;
        }
        let upload_client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client: build_client(headers)?,
            upload_client,
            base_url: parse_base_url(base_url)?,
            poll_policy: POLL_POLICY,
            upload_check: UploadCheck::default(),
        })
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poll_policy = policy;
        self
    }

    pub fn with_upload_check(mut self, check: UploadCheck) -> Self {
        self.upload_check = check;
        self
    }

    async fn get_envelope(&self, path: &str, query: &[(&str, &str)]) -> Result<Envelope> {
        let mut url = self.base_url.join(path)?;
        url.query_pairs_mut().extend_pairs(query);
        let response = self.client.get(url).send().await?;
        read_json(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        unwrap_envelope(self.get_envelope(path, query).await?)
    }

    pub async fn upload_credential(&self, format: &str) -> Result<UploadCredential> {
        self.get("upload/credential", &[("format", format)]).await
    }

    /// PUTs raw bytes to a presigned upload URL. The URL carries its own
    /// authorization, so no API credentials are sent.
    pub async fn put_upload(&self, upload_url: &str, data: Vec<u8>, content_type: &str) -> Result<()> {
        let response = self
            .upload_client
            .put(upload_url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await?;
        match response.status().as_u16() {
            200 | 201 => Ok(()),
            _ => Err(MediaError::from_response(response).await),
        }
    }

    /// Whether the API has registered an uploaded file.
    pub async fn check_upload(&self, file_id: &str) -> Result<bool> {
        self.get("upload/check", &[("fileId", file_id)]).await
    }

    /// Runs the whole pre-flight for in-memory bytes and returns the file id.
    ///
    /// # Errors
    ///
    /// `MediaError::UploadCheckTimedOut` if the check never reports `true`, or any
    /// error from the individual steps.
    pub async fn upload_bytes(&self, data: Vec<u8>, format: &str, content_type: &str) -> Result<String> {
        let credential = self.upload_credential(format).await?;
        debug!(file_id = %credential.file_id, "got upload credential");
        self.put_upload(&credential.upload_url, data, content_type).await?;

        for attempt in 1..=self.upload_check.attempts {
            if self.check_upload(&credential.file_id).await? {
                info!(file_id = %credential.file_id, "upload confirmed");
                return Ok(credential.file_id);
            }
            debug!(attempt, "upload not visible yet");
            if attempt < self.upload_check.attempts {
                sleep(self.upload_check.interval).await;
            }
        }
        Err(MediaError::UploadCheckTimedOut {
            file_id: credential.file_id,
        })
    }

    /// Reads a local file and uploads it under the given format.
    pub async fn upload_file<P: AsRef<Path>>(&self, path: P, format: &str) -> Result<String> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await.map_err(|err| {
            MediaError::InvalidInput(format!("cannot read {}: {}", path.display(), err))
        })?;
        let content_type = mime_guess::from_path(path).first_or_octet_stream();
        info!(path = %path.display(), format, "uploading file");
        self.upload_bytes(data, format, content_type.essence_str()).await
    }

    /// Submits an avatar video task from an uploaded photo and audio track.
    pub async fn submit_video_avatar(&self, image_file_id: &str, audio_file_id: &str) -> Result<Task> {
        let url = self.base_url.join("video_avatar/task/submit")?;
        let body = SubmitBody {
            avatar_source_from: "3",
            image_file_id,
            audio_source_from: "0",
            audio_file_id,
            mode_type: "2",
        };
        let response = self.client.post(url).json(&body).send().await?;
        let result: SubmitResult = unwrap_envelope(read_json(response).await?)?;
        if result.task_id.is_empty() {
            return Err(MediaError::ApiError {
                code: "missing_task_id".to_string(),
                message: "no task ID in response".to_string(),
            });
        }
        info!(task_id = %result.task_id, "task submitted");
        Ok(Task::submitted(result.task_id))
    }

    /// Fetches the current snapshot of a task.
    ///
    /// A non-success envelope code yields a failed task carrying the vendor
    /// message; only transport, HTTP and decode problems are errors.
    pub async fn get_task(&self, task_id: &str) -> Result<Task> {
        let envelope = self
            .get_envelope("video_avatar/task/query", &[("taskId", task_id)])
            .await?;
        if envelope.code != SUCCESS_CODE {
            return Ok(Task::rejected(task_id, &envelope.code, envelope.message));
        }
        let result: QueryResult = serde_json::from_value(envelope.result)?;
        let id = if result.task_id.is_empty() {
            task_id.to_string()
        } else {
            result.task_id
        };
        Ok(Task::from_vendor(
            id,
            &STATUS_TABLE,
            &result.status,
            Some(result.output_video_url),
            Some(result.error_msg),
        ))
    }

    /// Polls until the task is done. Query errors are logged and retried.
    pub async fn wait_for_task(&self, task_id: &str) -> Result<Task> {
        poll::wait_for_task(self, task_id, &self.poll_policy).await
    }
}

#[async_trait]
impl TaskSource for TopviewClient {
    async fn fetch_task(&self, task_id: &str) -> Result<Task> {
        self.get_task(task_id).await
    }
}

fn unwrap_envelope<T: DeserializeOwned>(envelope: Envelope) -> Result<T> {
    if envelope.code != SUCCESS_CODE {
        return Err(MediaError::ApiError {
            code: envelope.code,
            message: envelope.message,
        });
    }
    Ok(serde_json::from_value(envelope.result)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_from_extension() {
        assert_eq!(image_format(Path::new("face.PNG")), "png");
        assert_eq!(image_format(Path::new("face.webp")), "webp");
        assert_eq!(image_format(Path::new("face.jpeg")), "jpg");
        assert_eq!(image_format(Path::new("face")), "jpg");
        assert_eq!(audio_format(Path::new("voice.wav")), "wav");
        assert_eq!(audio_format(Path::new("voice.m4a")), "m4a");
        assert_eq!(audio_format(Path::new("voice.ogg")), "mp3");
    }

    #[test]
    fn envelope_code_accepts_numbers() {
        let envelope: Envelope =
            serde_json::from_str(r#"{"code": 200, "message": "ok", "result": true}"#).unwrap();
        assert!(unwrap_envelope::<bool>(envelope).unwrap());
    }

    #[test]
    fn non_success_code_is_an_api_error() {
        let envelope: Envelope =
            serde_json::from_str(r#"{"code": "401", "message": "bad key"}"#).unwrap();
        assert!(matches!(
            unwrap_envelope::<bool>(envelope),
            Err(MediaError::ApiError { code, message }) if code == "401" && message == "bad key"
        ));
    }

    #[test]
    fn vendor_statuses_normalize() {
        for (status, state) in [
            ("waiting", TaskState::Pending),
            ("processing", TaskState::Running),
            ("completed", TaskState::Done),
            ("success", TaskState::Done),
            ("error", TaskState::Failed),
        ] {
            assert_eq!(STATUS_TABLE.normalize(status), state, "{}", status);
        }
    }
}
