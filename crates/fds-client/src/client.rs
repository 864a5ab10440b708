//! Main client implementation

use crate::{
    handle::{Bucket, FdsObject},
    interceptor::{SigningInterceptor, SigningTransport},
    signer::Signer,
    transport::{HttpRequest, HttpResponse, ReqwestTransport, RetryTransport, Transport},
    types::*,
    ClientError, Config, Result,
};
use bytes::Bytes;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use std::sync::Arc;
use tracing::{debug, instrument};
use url::Url;

/// Prefix of user metadata headers; a subset of the signed custom headers
pub const USER_METADATA_PREFIX: &str = "x-xiaomi-meta-";

/// One query parameter; flags have no value and render as a bare key.
pub(crate) type QueryParam<'a> = (&'a str, Option<String>);

/// FDS storage client
///
/// Every request passes through the signing interceptor. Cloning is cheap and
/// clones share the transport.
#[derive(Clone)]
pub struct FdsClient {
    config: Config,
    base_url: Url,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for FdsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FdsClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FdsClient {
    /// Create a new client with the given configuration
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(&config)?;
        Self::with_transport(config, transport)
    }

    /// Create a client from `FDS_BASE_URL`, `FDS_APP_KEY` and `FDS_APP_SECRET`
    pub fn from_env() -> Result<Self> {
        Self::new(Config::from_env()?)
    }

    /// Create a client that sends through a custom transport.
    ///
    /// The transport is still wrapped with signing and retries.
    pub fn with_transport<T: Transport + 'static>(config: Config, transport: T) -> Result<Self> {
        config.validate()?;
        let base_url = config.base_url()?;
        let interceptor = SigningInterceptor::new(Signer::new(config.credential()?));
        let stack = RetryTransport::new(
            SigningTransport::new(interceptor, transport),
            config.max_retries,
        );

        Ok(Self {
            config,
            base_url,
            transport: Arc::new(stack),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle on a bucket
    pub fn bucket(&self, name: impl Into<String>) -> Bucket<'_> {
        Bucket::new(self, name)
    }

    /// Handle on an object
    pub fn object(&self, bucket: impl Into<String>, key: impl Into<String>) -> FdsObject<'_> {
        FdsObject::new(self, bucket, key)
    }

    // ==================== Service Operations ====================

    /// Look up service endpoints, optionally narrowed to a region and service
    #[instrument(skip(self))]
    pub async fn get_endpoint(
        &self,
        region: Option<&str>,
        service: Option<&str>,
    ) -> Result<EndpointResult> {
        let mut query: Vec<QueryParam> = vec![("endpoint", None)];
        if let Some(region) = region {
            query.push(("region", Some(region.to_string())));
        }
        if let Some(service) = service {
            query.push(("service", Some(service.to_string())));
        }

        self.execute(Method::GET, "/", &query, HeaderMap::new(), Bytes::new())
            .await?
            .json()
    }

    // ==================== Bucket Operations ====================

    /// List buckets, optionally only those the caller was authorized on
    #[instrument(skip(self))]
    pub async fn list_buckets(&self, authorized_only: bool) -> Result<ListBucketsResult> {
        let query: Vec<QueryParam> = if authorized_only {
            vec![("authorizedBuckets", None)]
        } else {
            Vec::new()
        };

        self.execute(Method::GET, "/", &query, HeaderMap::new(), Bytes::new())
            .await?
            .json()
    }

    /// Create a bucket with an optional list of canned ACLs
    #[instrument(skip(self))]
    pub async fn put_bucket(&self, bucket: &str, acl: &[&str]) -> Result<()> {
        let mut headers = HeaderMap::new();
        if !acl.is_empty() {
            headers.insert(
                HeaderName::from_static("x-xiaomi-meta-acl"),
                header_value(&acl.join(", "))?,
            );
        }

        self.execute(Method::PUT, &bucket_path(bucket), &[], headers, Bytes::new())
            .await?;
        Ok(())
    }

    /// Delete a bucket
    #[instrument(skip(self))]
    pub async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        self.execute(Method::DELETE, &bucket_path(bucket), &[], HeaderMap::new(), Bytes::new())
            .await?;
        Ok(())
    }

    /// Check if a bucket exists
    #[instrument(skip(self))]
    pub async fn head_bucket(&self, bucket: &str) -> Result<bool> {
        self.exists(&bucket_path(bucket)).await
    }

    /// Fetch bucket metadata
    #[instrument(skip(self))]
    pub async fn get_bucket_meta(&self, bucket: &str) -> Result<BucketInfo> {
        self.execute(Method::GET, &bucket_path(bucket), &[], HeaderMap::new(), Bytes::new())
            .await?
            .json()
    }

    /// Fetch a bucket's access control policy
    #[instrument(skip(self))]
    pub async fn get_bucket_acl(&self, bucket: &str) -> Result<AccessControlPolicy> {
        self.execute(Method::GET, &bucket_path(bucket), &[("acl", None)], HeaderMap::new(), Bytes::new())
            .await?
            .json()
    }

    /// Replace (or, with `action`, amend) a bucket's access control policy
    #[instrument(skip(self, policy))]
    pub async fn put_bucket_acl(
        &self,
        bucket: &str,
        policy: &AccessControlPolicy,
        action: Option<&str>,
    ) -> Result<()> {
        self.put_acl(&bucket_path(bucket), policy, action).await
    }

    // ==================== Object Operations ====================

    /// List objects in a bucket
    #[instrument(skip(self))]
    pub async fn list_objects(
        &self,
        bucket: &str,
        options: Option<ListObjectsOptions>,
    ) -> Result<ListObjectsResult> {
        let opts = options.unwrap_or_default();
        let mut query: Vec<QueryParam> = vec![("prefix", Some(opts.prefix.unwrap_or_default()))];

        if let Some(delimiter) = opts.delimiter {
            query.push(("delimiter", Some(delimiter)));
        }
        if let Some(max_keys) = opts.max_keys {
            query.push(("maxKeys", Some(max_keys.to_string())));
        }
        if let Some(marker) = opts.marker {
            query.push(("marker", Some(marker)));
        }

        self.execute(Method::GET, &bucket_path(bucket), &query, HeaderMap::new(), Bytes::new())
            .await?
            .json()
    }

    /// Get an object, or a byte range of it (`range` is a `Range` header value)
    #[instrument(skip(self))]
    pub async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        range: Option<&str>,
    ) -> Result<GetObjectResult> {
        let mut headers = HeaderMap::new();
        if let Some(range) = range {
            headers.insert(header::RANGE, header_value(range)?);
        }

        let response = self
            .execute(Method::GET, &object_path(bucket, key), &[], headers, Bytes::new())
            .await?;

        Ok(GetObjectResult {
            metadata: metadata_from_headers(&response.headers),
            data: response.body,
        })
    }

    /// Fetch an object's access control policy
    #[instrument(skip(self))]
    pub async fn get_object_acl(&self, bucket: &str, key: &str) -> Result<AccessControlPolicy> {
        self.execute(
            Method::GET,
            &object_path(bucket, key),
            &[("acl", None)],
            HeaderMap::new(),
            Bytes::new(),
        )
        .await?
        .json()
    }

    /// Put an object
    #[instrument(skip(self, data, metadata))]
    pub async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: impl Into<Bytes>,
        metadata: Option<&ObjectMetadata>,
    ) -> Result<PutObjectResult> {
        let headers = metadata.map(metadata_headers).transpose()?.unwrap_or_default();

        self.execute(Method::PUT, &object_path(bucket, key), &[], headers, data.into())
            .await?
            .json()
    }

    /// Post an object and let the service pick its name
    #[instrument(skip(self, data, metadata))]
    pub async fn post_object(
        &self,
        bucket: &str,
        data: impl Into<Bytes>,
        metadata: Option<&ObjectMetadata>,
    ) -> Result<PutObjectResult> {
        let headers = metadata.map(metadata_headers).transpose()?.unwrap_or_default();

        self.execute(Method::POST, &bucket_path(bucket), &[], headers, data.into())
            .await?
            .json()
    }

    /// Replace (or, with `action`, amend) an object's access control policy
    #[instrument(skip(self, policy))]
    pub async fn put_object_acl(
        &self,
        bucket: &str,
        key: &str,
        policy: &AccessControlPolicy,
        action: Option<&str>,
    ) -> Result<()> {
        self.put_acl(&object_path(bucket, key), policy, action).await
    }

    /// Remove the given grants from an object's access control policy
    #[instrument(skip(self, policy))]
    pub async fn delete_object_acl(
        &self,
        bucket: &str,
        key: &str,
        policy: &AccessControlPolicy,
    ) -> Result<()> {
        self.put_acl(&object_path(bucket, key), policy, Some("delete")).await
    }

    /// Check if an object exists
    #[instrument(skip(self))]
    pub async fn head_object(&self, bucket: &str, key: &str) -> Result<bool> {
        self.exists(&object_path(bucket, key)).await
    }

    /// Fetch object metadata without the content
    #[instrument(skip(self))]
    pub async fn get_object_meta(&self, bucket: &str, key: &str) -> Result<ObjectMetadata> {
        let response = self
            .execute(Method::HEAD, &object_path(bucket, key), &[], HeaderMap::new(), Bytes::new())
            .await?;
        Ok(metadata_from_headers(&response.headers))
    }

    /// Delete an object
    #[instrument(skip(self))]
    pub async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.execute(Method::DELETE, &object_path(bucket, key), &[], HeaderMap::new(), Bytes::new())
            .await?;
        Ok(())
    }

    /// Delete several objects; returns the service's report of failures
    #[instrument(skip(self, keys))]
    pub async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<serde_json::Value> {
        let body = serde_json::to_vec(keys)
            .map_err(|e| ClientError::InvalidArgument(format!("cannot encode keys: {}", e)))?;

        let response = self
            .execute(
                Method::PUT,
                &bucket_path(bucket),
                &[("deleteObjects", None)],
                json_headers(),
                Bytes::from(body),
            )
            .await?;

        if response.body.is_empty() {
            Ok(serde_json::Value::Array(Vec::new()))
        } else {
            response.json()
        }
    }

    /// Restore a deleted object
    #[instrument(skip(self))]
    pub async fn restore_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.object_action(bucket, key, ("restore", None)).await
    }

    /// Rename an object within its bucket
    #[instrument(skip(self))]
    pub async fn rename_object(&self, bucket: &str, key: &str, rename_to: &str) -> Result<()> {
        self.object_action(bucket, key, ("renameTo", Some(rename_to.to_string())))
            .await
    }

    /// Ask the CDN to prefetch an object
    #[instrument(skip(self))]
    pub async fn prefetch_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.object_action(bucket, key, ("prefetch", None)).await
    }

    /// Ask the CDN to refresh an object
    #[instrument(skip(self))]
    pub async fn refresh_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.object_action(bucket, key, ("refresh", None)).await
    }

    // ==================== Helper Methods ====================

    async fn object_action(&self, bucket: &str, key: &str, param: QueryParam<'_>) -> Result<()> {
        self.execute(Method::PUT, &object_path(bucket, key), &[param], HeaderMap::new(), Bytes::new())
            .await?;
        Ok(())
    }

    async fn put_acl(
        &self,
        path: &str,
        policy: &AccessControlPolicy,
        action: Option<&str>,
    ) -> Result<()> {
        let mut query: Vec<QueryParam> = vec![("acl", None)];
        if let Some(action) = action {
            query.push(("action", Some(action.to_string())));
        }
        let body = serde_json::to_vec(policy)
            .map_err(|e| ClientError::InvalidArgument(format!("cannot encode ACL: {}", e)))?;

        self.execute(Method::PUT, path, &query, json_headers(), Bytes::from(body))
            .await?;
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let response = self
            .request(Method::HEAD, path, &[], HeaderMap::new(), Bytes::new())
            .await?;

        match response.status {
            StatusCode::NOT_FOUND => Ok(false),
            _ => response.error_for_status().map(|_| true),
        }
    }

    /// Build the full URL for `path` below the endpoint
    pub(crate) fn url(&self, path: &str, query: &[QueryParam<'_>]) -> Url {
        let mut url = self.base_url.clone();
        let full_path = format!("{}{}", self.base_url.path().trim_end_matches('/'), path);
        url.set_path(&full_path);
        url.set_query(None);

        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                match value {
                    Some(value) => pairs.append_pair(key, value),
                    None => pairs.append_key_only(key),
                };
            }
        }
        url
    }

    /// Send a signed request and return the raw response, whatever its status
    pub(crate) async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[QueryParam<'_>],
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<HttpResponse> {
        let url = self.url(path, query);
        debug!("Sending {} request to {}", method, url);

        let mut request = HttpRequest::new(method, url).with_body(body);
        request.headers = headers;
        self.transport.send(request).await
    }

    /// Send a signed request and fail on non-2xx responses
    pub(crate) async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[QueryParam<'_>],
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<HttpResponse> {
        self.request(method, path, query, headers, body)
            .await?
            .error_for_status()
    }
}

pub(crate) fn bucket_path(bucket: &str) -> String {
    format!("/{}", bucket)
}

pub(crate) fn object_path(bucket: &str, key: &str) -> String {
    format!("/{}/{}", bucket, key.trim_start_matches('/'))
}

pub(crate) fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| ClientError::InvalidArgument(format!("invalid header value {:?}", value)))
}

/// Headers carrying `metadata` on a write
pub(crate) fn metadata_headers(metadata: &ObjectMetadata) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let standard = [
        (header::CONTENT_TYPE, &metadata.content_type),
        (HeaderName::from_static("content-md5"), &metadata.content_md5),
        (header::CACHE_CONTROL, &metadata.cache_control),
        (header::CONTENT_ENCODING, &metadata.content_encoding),
    ];
    for (name, value) in standard {
        if let Some(value) = value {
            headers.insert(name, header_value(value)?);
        }
    }

    for (key, value) in &metadata.user_metadata {
        let name = format!("{}{}", USER_METADATA_PREFIX, key.to_ascii_lowercase());
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ClientError::InvalidArgument(format!("invalid metadata key {:?}", key)))?;
        headers.insert(name, header_value(value)?);
    }
    Ok(headers)
}

/// Metadata reported in response headers
pub(crate) fn metadata_from_headers(headers: &HeaderMap) -> ObjectMetadata {
    let get = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    };

    let user_metadata = headers
        .iter()
        .filter_map(|(name, value)| {
            let key = name.as_str().strip_prefix(USER_METADATA_PREFIX)?;
            Some((key.to_string(), value.to_str().ok()?.to_string()))
        })
        .collect();

    ObjectMetadata {
        content_type: get(header::CONTENT_TYPE.as_str()),
        content_md5: get("content-md5"),
        content_length: get(header::CONTENT_LENGTH.as_str()).and_then(|s| s.parse().ok()),
        cache_control: get(header::CACHE_CONTROL.as_str()),
        content_encoding: get(header::CONTENT_ENCODING.as_str()),
        user_metadata,
    }
}
