//! Shared test helpers

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use fds_client::{ClientError, Config, FdsClient, HttpRequest, HttpResponse, Result, Transport};
use http::{HeaderMap, StatusCode};
use std::sync::{Arc, Mutex};

type Responder = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse> + Send + Sync>;

/// Transport that records every request and answers from a closure
#[derive(Clone)]
pub struct MockTransport {
    requests: Arc<Mutex<Vec<HttpRequest>>>,
    responder: Arc<Responder>,
}

impl MockTransport {
    pub fn new(responder: impl Fn(&HttpRequest) -> Result<HttpResponse> + Send + Sync + 'static) -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            responder: Arc::new(Box::new(responder)),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = (self.responder)(&request);
        self.requests.lock().unwrap().push(request);
        response
    }
}

pub fn json_response(status: StatusCode, body: serde_json::Value) -> Result<HttpResponse> {
    Ok(HttpResponse {
        status,
        headers: HeaderMap::new(),
        body: Bytes::from(body.to_string()),
    })
}

pub fn text_response(status: StatusCode, body: &'static str) -> Result<HttpResponse> {
    Ok(HttpResponse {
        status,
        headers: HeaderMap::new(),
        body: Bytes::from_static(body.as_bytes()),
    })
}

pub fn query_value(request: &HttpRequest, key: &str) -> Option<String> {
    request
        .url
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

pub fn has_query_key(request: &HttpRequest, key: &str) -> bool {
    request.url.query_pairs().any(|(k, _)| k == key)
}

/// Answers like the service for init / upload part / complete / abort
pub fn multipart_service(request: &HttpRequest) -> Result<HttpResponse> {
    let method = request.method.as_str();
    if method == "PUT" && has_query_key(request, "uploads") {
        return json_response(
            StatusCode::OK,
            serde_json::json!({
                "bucketName": "bucket",
                "objectName": "big.bin",
                "uploadId": "upload-1"
            }),
        );
    }
    if method == "PUT" && has_query_key(request, "partNumber") {
        let part: u32 = query_value(request, "partNumber").unwrap().parse().unwrap();
        return json_response(
            StatusCode::OK,
            serde_json::json!({
                "partNumber": part,
                "etag": format!("etag-{}-{}", part, request.body.len()),
                "partSize": request.body.len()
            }),
        );
    }
    if method == "PUT" && has_query_key(request, "uploadId") {
        return json_response(
            StatusCode::OK,
            serde_json::json!({"bucketName": "bucket", "objectName": "big.bin"}),
        );
    }
    if method == "DELETE" && has_query_key(request, "uploadId") {
        return text_response(StatusCode::OK, "");
    }
    text_response(StatusCode::NOT_FOUND, "unexpected request")
}

pub fn test_config() -> Config {
    Config::new("https://fds.example.com")
        .with_credentials("AKID", "test-secret")
        .with_max_retries(0)
}

pub fn mock_client(transport: &MockTransport) -> FdsClient {
    FdsClient::with_transport(test_config(), transport.clone()).unwrap()
}

pub fn is_invalid_state(result: &std::result::Result<impl std::fmt::Debug, ClientError>) -> bool {
    matches!(result, Err(ClientError::InvalidState { .. }))
}
