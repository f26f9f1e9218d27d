//! Client for Gemini image generation. Unlike the video providers this call is
//! synchronous: the generated images come back inline in the response.

use crate::error::{MediaError, Result};
use crate::http::{build_client, insert_header, parse_base_url, read_json};
use crate::types::InlineMedia;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";
pub const DEFAULT_MODEL: &str = "gemini-3-pro-image-preview";

/// An image generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub model: String,
    pub prompt: String,
    pub reference_images: Vec<InlineMedia>,
    pub aspect_ratio: Option<String>,
    /// `1K`, `2K` or `4K`.
    pub image_size: Option<String>,
}

impl ImageRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            prompt: prompt.into(),
            reference_images: Vec::new(),
            aspect_ratio: Some("1:1".to_string()),
            image_size: Some("2K".to_string()),
        }
    }

    /// Drops the image settings so the model answers with text only.
    pub fn text_only(mut self) -> Self {
        self.aspect_ratio = None;
        self.image_size = None;
        self
    }
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize, Deserialize, Debug, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ImageConfig<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_size: Option<&'a str>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_modalities: [&'static str; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<ImageConfig<'a>>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateBody<'a> {
    contents: Vec<Content>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ApiErrorBody>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

#[derive(Deserialize, Debug)]
struct ApiErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// One decoded image from a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl GeneratedImage {
    /// File extension for saving: `jpg` for JPEG, `png` otherwise.
    pub fn extension(&self) -> &'static str {
        if self.mime_type.contains("jpeg") {
            "jpg"
        } else {
            "png"
        }
    }
}

/// The text and images of the first candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedContent {
    pub texts: Vec<String>,
    pub images: Vec<GeneratedImage>,
}

fn request_body(request: &ImageRequest) -> GenerateBody<'_> {
    let mut parts = vec![Part {
        text: Some(request.prompt.clone()),
        inline_data: None,
    }];
    parts.extend(request.reference_images.iter().map(|image| Part {
        text: None,
        inline_data: Some(InlineData {
            mime_type: image.mime_type.clone(),
            data: image.data.clone(),
        }),
    }));

    let aspect_ratio = request.aspect_ratio.as_deref().filter(|r| !r.is_empty());
    let image_size = request.image_size.as_deref().filter(|s| !s.is_empty());
    let image_config = (aspect_ratio.is_some() || image_size.is_some()).then_some(ImageConfig {
        aspect_ratio,
        image_size,
    });

    GenerateBody {
        contents: vec![Content { parts }],
        generation_config: GenerationConfig {
            response_modalities: ["TEXT", "IMAGE"],
            image_config,
        },
    }
}

fn split_parts(parts: Vec<Part>) -> GeneratedContent {
    let mut content = GeneratedContent::default();
    for part in parts {
        if let Some(text) = part.text.filter(|t| !t.is_empty()) {
            content.texts.push(text);
        }
        let Some(inline) = part.inline_data else {
            continue;
        };
        if !inline.mime_type.starts_with("image/") {
            continue;
        }
        match STANDARD.decode(inline.data.as_bytes()) {
            Ok(data) => content.images.push(GeneratedImage {
                mime_type: inline.mime_type,
                data,
            }),
            Err(err) => warn!(error = %err, "skipping undecodable image"),
        }
    }
    content
}

#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: Url,
}

impl GeminiClient {
    pub fn new(api_key: &str) -> Result<Self> {
        Self::new_with_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn new_with_url(api_key: &str, base_url: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        insert_header(&mut headers, "x-goog-api-key", api_key)?;
        Ok(Self {
            client: build_client(headers)?,
            base_url: parse_base_url(base_url)?,
        })
    }

    /// Generates content and returns the first candidate's text and images.
    ///
    /// # Errors
    ///
    /// `MediaError::ApiError` when the response carries an `error` object or no
    /// candidates, plus the usual transport and decode errors.
    pub async fn generate_content(&self, request: &ImageRequest) -> Result<GeneratedContent> {
        let url = self
            .base_url
            .join(&format!("models/{}:generateContent", request.model))?;
        info!(model = %request.model, "generating content");
        let response = self
            .client
            .post(url)
            .json(&request_body(request))
            .send()
            .await?;
        let body: GenerateResponse = read_json(response).await?;

        if let Some(error) = body.error {
            return Err(MediaError::ApiError {
                code: error.code.to_string(),
                message: format!("{}: {}", error.status, error.message),
            });
        }
        let Some(candidate) = body.candidates.into_iter().next() else {
            return Err(MediaError::ApiError {
                code: "no_candidates".to_string(),
                message: "no candidates in response".to_string(),
            });
        };
        Ok(split_parts(candidate.content.parts))
    }
}
