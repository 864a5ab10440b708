//! HTTP transport seam
//!
//! The client never talks to reqwest directly. Requests are plain values that
//! pass through a stack of [`Transport`] layers:
//!
//! ```text
//! RetryTransport -> SigningTransport -> ReqwestTransport (or any Transport)
//! ```
//!
//! Retries sit outside the signing layer so that every attempt is re-signed
//! with a fresh `Date`.

use crate::{ClientError, Config, Result};
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::warn;
use url::Url;

/// An outgoing request
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// HTTP method
    pub method: Method,
    /// Full request URL, query string included
    pub url: Url,
    /// Request headers
    pub headers: HeaderMap,
    /// Request body, empty for none
    pub body: Bytes,
}

impl HttpRequest {
    /// Create a request with no headers and an empty body
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Attach a body
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}

/// A response as returned by the transport
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// Response status
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body
    pub body: Bytes,
}

impl HttpResponse {
    /// Turn a non-2xx response into [`ClientError::Status`]
    pub fn error_for_status(self) -> Result<Self> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(ClientError::from_status(self.status, &self.body))
        }
    }

    /// Decode a JSON body
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            ClientError::protocol(self.status, format!("unexpected response body: {}", e))
        })
    }
}

/// Sends a request and returns whatever the service answered.
///
/// Implementations must not interpret the status code; a 404 is a successful
/// send.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        (**self).send(request).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        (**self).send(request).await
    }
}

/// [`Transport`] backed by a `reqwest::Client`
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a reqwest client with the configured timeout and user agent
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(ClientError::Http)?;

        Ok(Self { http })
    }

    /// Wrap an existing reqwest client
    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = self
            .http
            .request(request.method, request.url)
            .headers(request.headers)
            .body(request.body)
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Re-sends requests that failed before reaching the service.
///
/// Only [`ClientError::is_retryable`] errors are retried. Non-2xx responses
/// are returned untouched.
#[derive(Clone, Debug)]
pub struct RetryTransport<T> {
    inner: T,
    max_retries: u32,
}

impl<T: Transport> RetryTransport<T> {
    /// Wrap `inner`, allowing up to `max_retries` additional attempts
    pub fn new(inner: T, max_retries: u32) -> Self {
        Self { inner, max_retries }
    }
}

#[async_trait]
impl<T: Transport> Transport for RetryTransport<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut attempt = 0;
        loop {
            match self.inner.send(request.clone()).await {
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        method = %request.method,
                        url = %request.url,
                        attempt,
                        "Retrying request after connection failure: {}",
                        e
                    );
                }
                result => return result,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_for_status() {
        let ok = HttpResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::from_static(b"{}"),
        };
        assert!(ok.error_for_status().is_ok());

        let missing = HttpResponse {
            status: StatusCode::NOT_FOUND,
            headers: HeaderMap::new(),
            body: Bytes::from_static(b"object not found"),
        };
        let err = missing.error_for_status().unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_json_decode_failure_is_protocol_error() {
        let response = HttpResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::from_static(b"<html>"),
        };
        let err = response.json::<serde_json::Value>().unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Protocol);
    }
}
