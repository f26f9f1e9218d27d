//! Client for Jimeng video products on the Volcano Visual OpenAPI.
//!
//! Every call is a signed `POST /?Action=...&Version=2022-08-31` with a JSON
//! body. Business success is `code == 10000`; anything else on a status query
//! is reported as a failed task rather than as a transport error.

use crate::error::{MediaError, Result};
use crate::http::{build_client, parse_base_url, read_json};
use crate::poll::{self, PollPolicy, TaskSource, DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT};
use crate::task::{StatusTable, Task, TaskState};
use crate::types::{MediaSlot, MediaSource};
use crate::volc_sign::{self, AccessKeys, Signer};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{CONTENT_TYPE, HOST};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://visual.volcengineapi.com/";
pub const API_VERSION: &str = "2022-08-31";
pub const REGION: &str = "cn-north-1";
pub const SERVICE: &str = "cv";

/// Business code of a successful call.
pub const SUCCESS_CODE: i64 = 10000;

pub const STATUS_TABLE: StatusTable = StatusTable::new(&[
    ("processing", TaskState::Pending),
    ("in_queue", TaskState::Pending),
    ("generating", TaskState::Running),
    ("done", TaskState::Done),
    ("not_found", TaskState::Failed),
    ("expired", TaskState::Failed),
]);

pub const POLL_POLICY: PollPolicy = PollPolicy::fail_fast(DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT);

/// Frames sent when none are requested: five seconds of video.
pub const DEFAULT_FRAMES: u32 = 121;

/// The submit and query actions a product is served by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actions {
    pub submit: &'static str,
    pub query: &'static str,
}

pub const ASYNC_ACTIONS: Actions = Actions {
    submit: "CVSync2AsyncSubmitTask",
    query: "CVSync2AsyncGetResult",
};

pub const TASK_ACTIONS: Actions = Actions {
    submit: "CVSubmitTask",
    query: "CVGetResult",
};

/// One Jimeng product: the `req_key` selecting it and the actions serving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Product {
    pub req_key: &'static str,
    pub actions: Actions,
    /// Extra `req_json` sent with every status query.
    pub query_req_json: Option<&'static str>,
}

pub const TEXT_TO_VIDEO: Product = Product {
    req_key: "jimeng_t2v_v30_pro",
    actions: ASYNC_ACTIONS,
    query_req_json: None,
};

pub const IMAGE_TO_VIDEO: Product = Product {
    req_key: "jimeng_ti2v_v30_pro",
    actions: ASYNC_ACTIONS,
    query_req_json: None,
};

pub const ACTION_IMITATION: Product = Product {
    req_key: "jimeng_dreamactor_m20_gen_video",
    actions: ASYNC_ACTIONS,
    query_req_json: Some(
        r#"{"aigc_meta": {"content_producer": "001191440300192203821610000", "producer_id": "producer_id_test123", "content_propagator": "001191440300192203821610000", "propagate_id": "propagate_id_test123"}}"#,
    ),
};

pub const OMNIHUMAN: Product = Product {
    req_key: "jimeng_realman_avatar_picture_omni_v15",
    actions: TASK_ACTIONS,
    query_req_json: None,
};

/// Text- or image-to-video with optional first and last frames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoParams {
    pub prompt: String,
    pub first_frame: MediaSlot,
    pub end_frame: MediaSlot,
    pub aspect_ratio: String,
    pub frames: Option<u32>,
    pub seed: Option<i64>,
}

/// Transfers the motion of a template video onto a person image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionImitationParams {
    pub image: MediaSlot,
    pub video_url: String,
    /// Server default is to cut the first second.
    pub cut_first_second: Option<bool>,
}

/// Talking-avatar video from a portrait and an audio track.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OmniHumanParams {
    pub image: MediaSlot,
    pub audio_url: String,
    pub prompt: String,
    pub seed: Option<i64>,
    /// 720 or 1080; anything else is left to the server.
    pub output_resolution: Option<u32>,
    pub fast_mode: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JimengRequest {
    Video(VideoParams),
    ActionImitation(ActionImitationParams),
    OmniHuman(OmniHumanParams),
}

impl JimengRequest {
    /// The product this request is submitted to. Video requests with a first
    /// frame go to image-to-video.
    pub fn product(&self) -> Product {
        match self {
            JimengRequest::Video(params) if params.first_frame.is_empty() => TEXT_TO_VIDEO,
            JimengRequest::Video(_) => IMAGE_TO_VIDEO,
            JimengRequest::ActionImitation(_) => ACTION_IMITATION,
            JimengRequest::OmniHuman(_) => OMNIHUMAN,
        }
    }

    fn body(&self) -> SubmitBody<'_> {
        let product = self.product();
        let mut body = SubmitBody::new(product.req_key);
        match self {
            JimengRequest::Video(params) => {
                body.prompt = Some(params.prompt.as_str());
                body.push_frame(&params.first_frame);
                body.push_frame(&params.end_frame);
                body.seed = params.seed.filter(|seed| *seed != 0);
                body.aspect_ratio = Some(params.aspect_ratio.as_str()).filter(|r| !r.is_empty());
                body.frames = Some(params.frames.filter(|f| *f > 0).unwrap_or(DEFAULT_FRAMES));
            }
            JimengRequest::ActionImitation(params) => {
                body.video_url = Some(params.video_url.as_str());
                body.push_frame(&params.image);
                body.cut_result_first_second_switch = params.cut_first_second;
            }
            JimengRequest::OmniHuman(params) => {
                body.audio_url = Some(params.audio_url.as_str());
                match params.image.source() {
                    Some(MediaSource::Inline(inline)) => body.binary_data_base64.push(inline.data),
                    Some(MediaSource::Url(url)) => body.image_url = Some(url),
                    None => {}
                }
                body.prompt = Some(params.prompt.as_str()).filter(|p| !p.is_empty());
                body.seed = params.seed.filter(|seed| *seed != 0);
                body.output_resolution = params
                    .output_resolution
                    .filter(|res| matches!(res, 720 | 1080));
                body.pe_fast_mode = params.fast_mode.then_some(true);
            }
        }
        body
    }
}

#[derive(Serialize, Debug, Default)]
struct SubmitBody<'a> {
    req_key: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    binary_data_base64: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    image_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    video_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    audio_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frames: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cut_result_first_second_switch: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_resolution: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pe_fast_mode: Option<bool>,
}

impl<'a> SubmitBody<'a> {
    fn new(req_key: &'static str) -> Self {
        Self {
            req_key,
            ..Default::default()
        }
    }

    // Inline frames and URL frames travel in separate lists, in order.
    fn push_frame(&mut self, slot: &MediaSlot) {
        match slot.source() {
            Some(MediaSource::Inline(inline)) => self.binary_data_base64.push(inline.data),
            Some(MediaSource::Url(url)) => self.image_urls.push(url),
            None => {}
        }
    }
}

#[derive(Serialize, Debug)]
struct QueryBody<'a> {
    req_key: &'static str,
    task_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    req_json: Option<&'static str>,
}

#[derive(Deserialize, Debug)]
struct Envelope {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<TaskData>,
}

#[derive(Deserialize, Debug, Default)]
struct TaskData {
    #[serde(default)]
    task_id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    video_url: String,
}

/// Client for the signed Volcano Visual endpoints.
#[derive(Clone)]
pub struct JimengClient {
    client: reqwest::Client,
    base_url: Url,
    signer: Signer,
    poll_policy: PollPolicy,
}

impl JimengClient {
    pub fn new(keys: AccessKeys) -> Result<Self> {
        Self::new_with_url(keys, DEFAULT_BASE_URL)
    }

    pub fn new_with_url(keys: AccessKeys, base_url: &str) -> Result<Self> {
        Ok(Self {
            client: build_client(Default::default())?,
            base_url: parse_base_url(base_url)?,
            signer: Signer::new(keys, REGION, SERVICE),
            poll_policy: POLL_POLICY,
        })
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poll_policy = policy;
        self
    }

    async fn call<B: Serialize>(&self, action: &str, body: &B) -> Result<Envelope> {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("Action", action)
            .append_pair("Version", API_VERSION);
        let payload = serde_json::to_vec(body)?;
        let signed = self.signer.sign("POST", &url, &payload, Utc::now())?;

        debug!(action, "calling visual api");
        let response = self
            .client
            .post(url)
            .header(HOST, signed.host)
            .header(CONTENT_TYPE, volc_sign::CONTENT_TYPE)
            .header("X-Date", signed.x_date)
            .header("X-Content-Sha256", signed.x_content_sha256)
            .header("Authorization", signed.authorization)
            .body(payload)
            .send()
            .await?;
        read_json(response).await
    }

    /// Submits a generation task and returns it in the pending state.
    ///
    /// # Errors
    ///
    /// `MediaError::ApiError` when the business code is not 10000 or no task id
    /// comes back, plus the usual transport and decode errors.
    pub async fn submit(&self, request: &JimengRequest) -> Result<Task> {
        let product = request.product();
        info!(req_key = product.req_key, "submitting task");
        let envelope = self.call(product.actions.submit, &request.body()).await?;

        if envelope.code != SUCCESS_CODE {
            return Err(MediaError::ApiError {
                code: envelope.code.to_string(),
                message: envelope.message,
            });
        }
        let task_id = envelope.data.map(|d| d.task_id).unwrap_or_default();
        if task_id.is_empty() {
            return Err(MediaError::ApiError {
                code: "missing_task_id".to_string(),
                message: "no task ID in response".to_string(),
            });
        }
        info!(task_id = %task_id, "task submitted");
        Ok(Task::submitted(task_id))
    }

    /// Fetches the current snapshot of a task submitted to `product`.
    pub async fn get_task(&self, product: &Product, task_id: &str) -> Result<Task> {
        let body = QueryBody {
            req_key: product.req_key,
            task_id,
            req_json: product.query_req_json,
        };
        let envelope = self.call(product.actions.query, &body).await?;

        if envelope.code != SUCCESS_CODE {
            return Ok(Task::rejected(
                task_id,
                &envelope.code.to_string(),
                envelope.message,
            ));
        }
        let data = envelope.data.unwrap_or_default();
        let error = format!("vendor status {}: {}", data.status, envelope.message);
        Ok(Task::from_vendor(
            task_id,
            &STATUS_TABLE,
            &data.status,
            Some(data.video_url),
            Some(error),
        ))
    }

    /// Polls until the task is done and returns the finished snapshot.
    pub async fn wait_for_task(&self, product: &Product, task_id: &str) -> Result<Task> {
        let source = ProductTasks {
            client: self,
            product: *product,
        };
        poll::wait_for_task(&source, task_id, &self.poll_policy).await
    }
}

/// Binds a client to the product whose tasks it is polling.
struct ProductTasks<'a> {
    client: &'a JimengClient,
    product: Product,
}

#[async_trait]
impl TaskSource for ProductTasks<'_> {
    async fn fetch_task(&self, task_id: &str) -> Result<Task> {
        self.client.get_task(&self.product, task_id).await
    }
}
