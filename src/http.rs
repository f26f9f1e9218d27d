use crate::error::{MediaError, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Per-request timeout applied to every vendor API call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Builds the shared `reqwest::Client` used for a vendor's API calls.
pub(crate) fn build_client(headers: HeaderMap) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .default_headers(headers)
        .timeout(REQUEST_TIMEOUT)
        .build()?;
    Ok(client)
}

/// Header map carrying `Authorization: Bearer <token>`.
pub(crate) fn bearer_headers(token: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", token))?);
    Ok(headers)
}

pub(crate) fn insert_header(
    headers: &mut HeaderMap,
    name: &'static str,
    value: &str,
) -> Result<()> {
    headers.insert(HeaderName::from_static(name), header_value(value)?);
    Ok(())
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| MediaError::InvalidInput("credential contains invalid header characters".into()))
}

/// Parses a base URL so that relative endpoint paths can be joined onto it.
///
/// `Url::join` drops the last path segment unless it ends in `/`, so one is added.
pub(crate) fn parse_base_url(base_url: &str) -> Result<Url> {
    if base_url.ends_with('/') {
        Ok(Url::parse(base_url)?)
    } else {
        Ok(Url::parse(&format!("{}/", base_url))?)
    }
}

/// Reads a JSON body, turning non-2xx statuses into [`MediaError::HttpStatus`]
/// and malformed bodies into [`MediaError::ResponseParseFailed`].
pub(crate) async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    if !response.status().is_success() {
        return Err(MediaError::from_response(response).await);
    }
    let body = response.text().await?;
    debug!(body = %body, "response body");
    Ok(serde_json::from_str(&body)?)
}
