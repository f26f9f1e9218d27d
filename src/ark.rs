//! Client for the Volcano Ark video-generation task API.

use crate::error::{MediaError, Result};
use crate::http::{bearer_headers, build_client, parse_base_url, read_json};
use crate::poll::{self, PollPolicy, TaskSource, DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT};
use crate::task::{StatusTable, Task, TaskState};
use crate::types::{MediaSlot, MediaSource};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://ark.cn-beijing.volces.com/api/v3/";
pub const DEFAULT_MODEL: &str = "doubao-seedance-1-5-pro-251215";

pub const STATUS_TABLE: StatusTable = StatusTable::new(&[
    ("queued", TaskState::Pending),
    ("running", TaskState::Running),
    ("succeeded", TaskState::Done),
    ("failed", TaskState::Failed),
    ("cancelled", TaskState::Failed),
]);

pub const POLL_POLICY: PollPolicy = PollPolicy::fail_fast(DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT);

/// A video generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRequest {
    pub model: String,
    pub prompt: String,
    /// Optional first-frame reference image.
    pub image: MediaSlot,
    /// Seconds, e.g. `"5"`. Empty leaves it to the server.
    pub duration: String,
    pub resolution: String,
    pub ratio: String,
    pub with_audio: bool,
}

impl VideoRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            prompt: prompt.into(),
            image: MediaSlot::default(),
            duration: "5".to_string(),
            resolution: "720p".to_string(),
            ratio: "16:9".to_string(),
            with_audio: true,
        }
    }
}

#[derive(Serialize)]
struct CreateTaskBody<'a> {
    model: &'a str,
    content: Vec<Content>,
    parameters: Parameters<'a>,
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Content {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize, Debug, PartialEq)]
struct ImageUrl {
    url: String,
}

#[derive(Serialize)]
struct Parameters<'a> {
    #[serde(skip_serializing_if = "str::is_empty")]
    duration: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    resolution: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    ratio: &'a str,
    with_audio: bool,
}

#[derive(Deserialize, Debug)]
struct ApiErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize, Debug)]
struct CreateTaskResponse {
    #[serde(default)]
    id: String,
    error: Option<ApiErrorBody>,
}

#[derive(Deserialize, Debug)]
struct TaskResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    status: String,
    content: Option<TaskContent>,
    error: Option<ApiErrorBody>,
}

#[derive(Deserialize, Debug)]
struct TaskContent {
    #[serde(default)]
    video_url: String,
}

fn content_for(request: &VideoRequest) -> Vec<Content> {
    let mut content = vec![Content::Text {
        text: request.prompt.clone(),
    }];
    if let Some(source) = request.image.source() {
        let url = match source {
            MediaSource::Url(url) => url,
            MediaSource::Inline(inline) => inline.to_data_url(),
        };
        content.push(Content::ImageUrl {
            image_url: ImageUrl { url },
        });
    }
    content
}

/// Client for the Ark content-generation task endpoints.
#[derive(Clone)]
pub struct ArkClient {
    client: reqwest::Client,
    base_url: Url,
    poll_policy: PollPolicy,
}

impl ArkClient {
    /// Creates a client against the public Ark endpoint.
    ///
    /// # Errors
    ///
    /// - `MediaError::InvalidInput` if the key cannot be sent as a header.
    /// - `MediaError::RequestFailed` if the HTTP client fails to build.
    pub fn new(api_key: &str) -> Result<Self> {
        Self::new_with_url(api_key, DEFAULT_BASE_URL)
    }

    /// Creates a client against a custom base URL, e.g. a mock server.
    pub fn new_with_url(api_key: &str, base_url: &str) -> Result<Self> {
        Ok(Self {
            client: build_client(bearer_headers(api_key)?)?,
            base_url: parse_base_url(base_url)?,
            poll_policy: POLL_POLICY,
        })
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poll_policy = policy;
        self
    }

    /// Submits a generation task and returns it in the pending state.
    pub async fn create_task(&self, request: &VideoRequest) -> Result<Task> {
        let url = self.base_url.join("contents/generations/tasks")?;
        let body = CreateTaskBody {
            model: &request.model,
            content: content_for(request),
            parameters: Parameters {
                duration: &request.duration,
                resolution: &request.resolution,
                ratio: &request.ratio,
                with_audio: request.with_audio,
            },
        };

        info!(model = %request.model, "creating task");
        let response = self.client.post(url).json(&body).send().await?;
        let created: CreateTaskResponse = read_json(response).await?;

        if let Some(error) = created.error {
            return Err(MediaError::ApiError {
                code: error.code,
                message: error.message,
            });
        }
        if created.id.is_empty() {
            return Err(MediaError::ApiError {
                code: "missing_task_id".to_string(),
                message: "no task ID in response".to_string(),
            });
        }
        info!(task_id = %created.id, "task created");
        Ok(Task::submitted(created.id))
    }

    /// Fetches the current snapshot of a task.
    ///
    /// An `error` object in the response yields a failed task rather than an error.
    pub async fn get_task(&self, task_id: &str) -> Result<Task> {
        let url = self
            .base_url
            .join(&format!("contents/generations/tasks/{}", task_id))?;
        let response = self.client.get(url).send().await?;
        let body: TaskResponse = read_json(response).await?;

        let id = if body.id.is_empty() {
            task_id.to_string()
        } else {
            body.id
        };
        if let Some(error) = body.error {
            let status = if body.status.is_empty() {
                "failed"
            } else {
                body.status.as_str()
            };
            return Ok(Task::rejected(
                id,
                status,
                format!("[{}] {}", error.code, error.message),
            ));
        }

        Ok(Task::from_vendor(
            id,
            &STATUS_TABLE,
            &body.status,
            body.content.map(|c| c.video_url),
            None,
        ))
    }

    /// Polls until the task is done and returns the finished snapshot.
    pub async fn wait_for_task(&self, task_id: &str) -> Result<Task> {
        poll::wait_for_task(self, task_id, &self.poll_policy).await
    }
}

#[async_trait]
impl TaskSource for ArkClient {
    async fn fetch_task(&self, task_id: &str) -> Result<Task> {
        self.get_task(task_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InlineMedia;

    #[test]
    fn vendor_statuses_normalize() {
        assert_eq!(STATUS_TABLE.normalize("queued"), TaskState::Pending);
        assert_eq!(STATUS_TABLE.normalize("running"), TaskState::Running);
        assert_eq!(STATUS_TABLE.normalize("succeeded"), TaskState::Done);
        assert_eq!(STATUS_TABLE.normalize("cancelled"), TaskState::Failed);
        assert_eq!(STATUS_TABLE.normalize("paused"), TaskState::Pending);
    }

    #[test]
    fn text_only_content() {
        let request = VideoRequest::new("a cat");
        assert_eq!(
            serde_json::to_value(content_for(&request)).unwrap(),
            serde_json::json!([{ "type": "text", "text": "a cat" }])
        );
    }

    #[test]
    fn inline_image_is_sent_as_data_url() {
        let mut request = VideoRequest::new("a cat");
        request.image = MediaSlot {
            url: Some("https://example.com/cat.png".into()),
            inline: Some(InlineMedia::from_bytes(b"hi", "image/png")),
        };
        assert_eq!(
            serde_json::to_value(content_for(&request)).unwrap()[1],
            serde_json::json!({
                "type": "image_url",
                "image_url": { "url": "data:image/png;base64,aGk=" }
            })
        );
    }
}
