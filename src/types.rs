use crate::error::{MediaError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::Path;
use tokio::fs;

/// Media embedded directly in a request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineMedia {
    /// The MIME type, e.g. `image/png`.
    pub mime_type: String,
    /// The base64-encoded bytes (standard alphabet, padded).
    pub data: String,
}

impl InlineMedia {
    pub fn from_bytes(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: STANDARD.encode(bytes),
        }
    }

    /// Reads a local file and encodes it, guessing the MIME type from its extension.
    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).await.map_err(|err| {
            MediaError::InvalidInput(format!("cannot read {}: {}", path.display(), err))
        })?;
        let mime_type = mime_guess::from_path(path).first_or_octet_stream();
        Ok(Self::from_bytes(&bytes, mime_type.essence_str()))
    }

    /// The `data:` URL form accepted by vendors that take images as URLs.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Where the bytes for one media input come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    Url(String),
    Inline(InlineMedia),
}

/// One media input of a request, such as a first frame or a portrait.
///
/// Both a URL and inline bytes may be supplied; inline bytes win. Empty
/// strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaSlot {
    pub url: Option<String>,
    pub inline: Option<InlineMedia>,
}

impl MediaSlot {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            inline: None,
        }
    }

    pub fn from_inline(inline: InlineMedia) -> Self {
        Self {
            url: None,
            inline: Some(inline),
        }
    }

    /// Builds a slot from optional CLI-style inputs, reading the file if one is given.
    pub async fn from_inputs(url: Option<String>, file: Option<&Path>) -> Result<Self> {
        let inline = match file {
            Some(path) => Some(InlineMedia::from_path(path).await?),
            None => None,
        };
        Ok(Self { url, inline })
    }

    pub fn source(&self) -> Option<MediaSource> {
        if let Some(inline) = self.inline.as_ref().filter(|m| !m.data.is_empty()) {
            return Some(MediaSource::Inline(inline.clone()));
        }
        self.url
            .as_ref()
            .filter(|url| !url.is_empty())
            .map(|url| MediaSource::Url(url.clone()))
    }

    pub fn is_empty(&self) -> bool {
        self.source().is_none()
    }
}
