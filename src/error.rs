use std::path::PathBuf;
use std::time::Duration;

/// Every failure the SDK can surface.
///
/// Transport, protocol, decode and vendor errors come from a single request;
/// `TaskFailed`, `Timeout`, `AttemptsExhausted` and `MissingArtifact` come from
/// the poll loop once a task has been submitted.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("{service} credentials are missing. {hint}")]
    MissingCredentials {
        service: &'static str,
        hint: String,
    },
    #[error("Network request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("Failed to parse API response: {0}")]
    ResponseParseFailed(#[from] serde_json::Error),
    #[error("API error [{code}]: {message}")]
    ApiError { code: String, message: String },
    #[error("Task {task_id} failed: {message}")]
    TaskFailed { task_id: String, message: String },
    #[error("Timeout after {}s, task {task_id} still in status: {last_status}", .waited.as_secs())]
    Timeout {
        task_id: String,
        waited: Duration,
        last_status: String,
    },
    #[error("Polling task {task_id} gave up after {attempts} attempts")]
    AttemptsExhausted { task_id: String, attempts: u32 },
    #[error("Task {task_id} succeeded but no artifact URL in response")]
    MissingArtifact { task_id: String },
    #[error("Upload check timed out for fileId: {file_id}")]
    UploadCheckTimedOut { file_id: String },
    #[error("Unknown model: {0}")]
    UnknownModel(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Failed to read config {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("URL parsing failed: {0}")]
    UrlParseFailed(#[from] url::ParseError),
    #[error("File I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl MediaError {
    /// Builds a protocol error from a non-2xx response, keeping its body for the message.
    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        MediaError::HttpStatus { status, body }
    }
}

pub type Result<T> = std::result::Result<T, MediaError>;
