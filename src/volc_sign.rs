//! HMAC-SHA256 request signing for Volcano Engine OpenAPI endpoints.

use crate::error::{MediaError, Result};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::{Digest, Sha256};
use url::Url;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "HMAC-SHA256";
const SIGNED_HEADERS: &str = "content-type;host;x-content-sha256;x-date";
pub const CONTENT_TYPE: &str = "application/json";

/// RFC 3986 unreserved characters stay as-is, everything else is escaped.
const RFC3986: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// A Volcano Engine access-key pair.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessKeys {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl std::fmt::Debug for AccessKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessKeys")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Headers to attach to a signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub host: String,
    pub x_date: String,
    pub x_content_sha256: String,
    pub authorization: String,
}

#[derive(Debug, Clone)]
pub struct Signer {
    keys: AccessKeys,
    region: String,
    service: String,
}

impl Signer {
    pub fn new(keys: AccessKeys, region: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            keys,
            region: region.into(),
            service: service.into(),
        }
    }

    /// Signs a request with a JSON body at the given instant.
    pub fn sign(
        &self,
        method: &str,
        url: &Url,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<SignedHeaders> {
        let x_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let short_date = &x_date[..8];
        let host = host_header(url);
        let payload_hash = hex::encode(Sha256::digest(body));

        let canonical_request = [
            method.to_ascii_uppercase(),
            canonical_path(url),
            canonical_query(url),
            format!(
                "content-type:{}\nhost:{}\nx-content-sha256:{}\nx-date:{}\n",
                CONTENT_TYPE, host, payload_hash, x_date
            ),
            SIGNED_HEADERS.to_string(),
            payload_hash.clone(),
        ]
        .join("\n");

        let scope = format!("{}/{}/{}/request", short_date, self.region, self.service);
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            x_date,
            scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let k_date = hmac(self.keys.secret_access_key.as_bytes(), short_date.as_bytes())?;
        let k_region = hmac(&k_date, self.region.as_bytes())?;
        let k_service = hmac(&k_region, self.service.as_bytes())?;
        let k_signing = hmac(&k_service, b"request")?;
        let signature = hex::encode(hmac(&k_signing, string_to_sign.as_bytes())?);

        Ok(SignedHeaders {
            host,
            x_date,
            x_content_sha256: payload_hash,
            authorization: format!(
                "{} Credential={}/{}, SignedHeaders={}, Signature={}",
                ALGORITHM, self.keys.access_key_id, scope, SIGNED_HEADERS, signature
            ),
        })
    }
}

fn hmac(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|err| MediaError::InvalidInput(format!("signing key rejected: {}", err)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// The host as sent on the wire: explicit non-default ports are included.
fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

fn canonical_path(url: &Url) -> String {
    match url.path() {
        "" => "/".to_string(),
        path => path.to_string(),
    }
}

fn canonical_query(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            (
                utf8_percent_encode(&k, RFC3986).to_string(),
                utf8_percent_encode(&v, RFC3986).to_string(),
            )
        })
        .collect();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}
