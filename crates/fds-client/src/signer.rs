//! Request canonicalization and HMAC-SHA1 signing
//!
//! The string to sign is
//!
//! ```text
//! METHOD
//! Content-MD5
//! Content-Type
//! Date
//! [canonicalized x-xiaomi-* headers
//! ]canonicalized resource
//! ```
//!
//! The header block is dropped entirely when no custom headers are present,
//! so the resource then directly follows the date.

use crate::{ClientError, Credential, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use http::{HeaderMap, Method};
use sha1::Sha1;
use url::Url;

type HmacSha1 = Hmac<Sha1>;

/// Headers starting with this prefix (case-insensitive) take part in signing.
pub const CUSTOM_HEADER_PREFIX: &str = "x-xiaomi-";

/// Query parameters that select a sub-resource and therefore take part in signing.
pub const SUB_RESOURCES: [&str; 7] = [
    "acl",
    "quota",
    "uploads",
    "partNumber",
    "uploadId",
    "storageAccessToken",
    "metadata",
];

/// Build the exact string the service signs for this request.
///
/// `headers` must already carry a `Date`; a missing one is an
/// [`ClientError::InvalidArgument`].
pub fn string_to_sign(url: &Url, method: &Method, headers: &HeaderMap) -> Result<String> {
    let date = header_value(headers, http::header::DATE.as_str())
        .ok_or_else(|| ClientError::InvalidArgument("Date header is required for signing".into()))?;

    let tail = [canonicalized_headers(headers), canonicalized_resource(url)]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    Ok([
        method.as_str().to_string(),
        header_value(headers, "content-md5").unwrap_or_default(),
        header_value(headers, http::header::CONTENT_TYPE.as_str()).unwrap_or_default(),
        date,
        tail,
    ]
    .join("\n"))
}

/// `name:value` lines for every `x-xiaomi-*` header, sorted by lower-cased name.
pub fn canonicalized_headers(headers: &HeaderMap) -> String {
    // HeaderName is always lower-case, so no extra folding is needed
    let mut names: Vec<&str> = headers
        .keys()
        .map(|name| name.as_str())
        .filter(|name| name.starts_with(CUSTOM_HEADER_PREFIX))
        .collect();
    names.sort_unstable();

    names
        .into_iter()
        .filter_map(|name| header_value(headers, name).map(|value| format!("{}:{}", name, value)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The URL path, followed by `?` and the sorted sub-resource parameters if there are any.
pub fn canonicalized_resource(url: &Url) -> String {
    let mut params: Vec<(&str, String)> = SUB_RESOURCES
        .iter()
        .filter_map(|key| {
            url.query_pairs()
                .find(|(k, _)| k == key)
                .map(|(_, value)| (*key, value.into_owned()))
        })
        .collect();
    params.sort_unstable_by(|a, b| a.0.cmp(b.0));

    let query = params
        .into_iter()
        .map(|(key, value)| {
            if value.is_empty() {
                key.to_string()
            } else {
                format!("{}={}", key, value)
            }
        })
        .collect::<Vec<_>>()
        .join("&");

    if query.is_empty() {
        url.path().to_string()
    } else {
        format!("{}?{}", url.path(), query)
    }
}

/// Value of a header, with repeated values joined by `,`.
fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let values: Vec<String> = headers
        .get_all(name)
        .iter()
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .collect();

    if values.is_empty() {
        None
    } else {
        Some(values.join(","))
    }
}

/// Signs canonicalized requests with the secret half of a [`Credential`].
#[derive(Clone, Debug)]
pub struct Signer {
    credential: Credential,
}

impl Signer {
    /// Create a signer owning the given credential
    pub fn new(credential: Credential) -> Self {
        Self { credential }
    }

    /// The access key id that goes into the `Authorization` header
    pub fn access_key_id(&self) -> &str {
        self.credential.access_key_id()
    }

    /// `base64(HMAC-SHA1(secret, string_to_sign(url, method, headers)))`
    pub fn sign(&self, url: &Url, method: &Method, headers: &HeaderMap) -> Result<String> {
        let canonical = string_to_sign(url, method, headers)?;
        self.sign_string(&canonical)
    }

    /// Sign an already canonicalized string
    pub fn sign_string(&self, canonical: &str) -> Result<String> {
        let mut mac = HmacSha1::new_from_slice(self.credential.secret_key())
            .map_err(|e| ClientError::Config(format!("unusable secret key: {}", e)))?;
        mac.update(canonical.as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }
}
