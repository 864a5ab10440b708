//! Multipart upload support for large files
//!
//! A [`MultipartUploadSession`] is plain caller-owned data. The client methods
//! in this module check that each call is legal for the session's state
//! before anything is sent, and update the state from the outcome:
//!
//! ```text
//! Uninitiated --init--> Active --complete--> Completed
//!                         |  \--complete (parts refused)--> Rejected --abort--> Aborted
//!                         \--abort--> Aborted
//! ```

use crate::{
    client::{json_headers, metadata_headers, object_path, QueryParam},
    transport::HttpResponse,
    types::{
        InitMultipartUploadResult, ObjectMetadata, PutObjectResult, UploadPartResult,
        UploadPartResultList,
    },
    ClientError, FdsClient, Result,
};
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use http::{header, HeaderMap, Method, StatusCode};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Lifecycle state of a multipart upload
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadState {
    /// No upload id yet
    Uninitiated,
    /// Upload id assigned; parts may be uploaded
    Active,
    /// The service refused to complete the upload; it can only be aborted
    Rejected,
    /// Object assembled
    Completed,
    /// Upload cancelled
    Aborted,
}

impl UploadState {
    /// State name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitiated => "Uninitiated",
            Self::Active => "Active",
            Self::Rejected => "Rejected",
            Self::Completed => "Completed",
            Self::Aborted => "Aborted",
        }
    }

    /// Whether no further operation is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }
}

impl std::fmt::Display for UploadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A multipart upload of one object
#[derive(Clone, Debug)]
pub struct MultipartUploadSession {
    bucket: String,
    key: String,
    upload_id: Option<String>,
    parts: BTreeMap<u32, UploadPartResult>,
    state: UploadState,
}

impl MultipartUploadSession {
    /// A session that has not been initiated yet
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            upload_id: None,
            parts: BTreeMap::new(),
            state: UploadState::Uninitiated,
        }
    }

    /// Bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Object key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Service-issued upload id, once initiated
    pub fn upload_id(&self) -> Option<&str> {
        self.upload_id.as_deref()
    }

    /// Current state
    pub fn state(&self) -> UploadState {
        self.state
    }

    /// Recorded parts in ascending part number order
    pub fn parts(&self) -> impl Iterator<Item = &UploadPartResult> {
        self.parts.values()
    }

    /// The record for one part number
    pub fn part(&self, part_number: u32) -> Option<&UploadPartResult> {
        self.parts.get(&part_number)
    }

    /// Get the number of recorded parts
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Sum of recorded part sizes
    pub fn total_size(&self) -> u64 {
        self.parts.values().map(|p| p.part_size).sum()
    }

    /// Record a part returned by [`FdsClient::send_part`].
    ///
    /// A later record for the same part number replaces the earlier one.
    pub fn record_part(&mut self, part: UploadPartResult) -> Result<()> {
        self.ensure("record part", &[UploadState::Active])?;
        if part.part_number == 0 {
            return Err(ClientError::InvalidArgument("part numbers start at 1".to_string()));
        }
        self.parts.insert(part.part_number, part);
        Ok(())
    }

    fn ensure(&self, operation: &'static str, allowed: &[UploadState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(self.invalid_state(operation))
        }
    }

    fn invalid_state(&self, operation: &'static str) -> ClientError {
        ClientError::InvalidState {
            upload_id: self.upload_id.clone(),
            state: self.state.as_str(),
            operation,
        }
    }

    fn active_upload_id(&self, operation: &'static str) -> Result<&str> {
        self.ensure(operation, &[UploadState::Active])?;
        self.upload_id
            .as_deref()
            .ok_or_else(|| self.invalid_state(operation))
    }

    fn path(&self) -> String {
        object_path(&self.bucket, &self.key)
    }
}

impl FdsClient {
    /// Start a multipart upload and return the active session
    pub async fn init_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<MultipartUploadSession> {
        let mut session = MultipartUploadSession::new(bucket, key);
        self.init_multipart(&mut session).await?;
        Ok(session)
    }

    /// Obtain an upload id for an uninitiated session.
    ///
    /// On failure the session stays uninitiated and the call may be repeated.
    pub async fn init_multipart(&self, session: &mut MultipartUploadSession) -> Result<()> {
        session.ensure("init", &[UploadState::Uninitiated])?;

        let response = self
            .execute(
                Method::PUT,
                &session.path(),
                &[("uploads", None)],
                HeaderMap::new(),
                Bytes::new(),
            )
            .await?;
        let result: InitMultipartUploadResult = response.json()?;

        if result.upload_id.is_empty() {
            return Err(ClientError::protocol(response.status, "missing uploadId"));
        }

        session.upload_id = Some(result.upload_id);
        session.state = UploadState::Active;
        Ok(())
    }

    /// Upload one part without recording it.
    ///
    /// Takes a shared borrow so several parts of one session can be in flight
    /// at once; pass each result to [`MultipartUploadSession::record_part`].
    pub async fn send_part(
        &self,
        session: &MultipartUploadSession,
        part_number: u32,
        data: Bytes,
    ) -> Result<UploadPartResult> {
        if part_number == 0 {
            return Err(ClientError::InvalidArgument("part numbers start at 1".to_string()));
        }
        let upload_id = session.active_upload_id("upload part")?;
        let size = data.len() as u64;

        let query: [QueryParam; 2] = [
            ("uploadId", Some(upload_id.to_string())),
            ("partNumber", Some(part_number.to_string())),
        ];
        let response = self
            .execute(Method::PUT, &session.path(), &query, HeaderMap::new(), data)
            .await?;
        let mut part: UploadPartResult = response.json()?;

        match part.part_number {
            0 => part.part_number = part_number,
            n if n != part_number => {
                return Err(ClientError::protocol(
                    response.status,
                    format!("uploaded part {} but service recorded part {}", part_number, n),
                ))
            }
            _ => {}
        }
        if part.part_size == 0 {
            part.part_size = size;
        }
        Ok(part)
    }

    /// Upload one part and record it in the session.
    ///
    /// Re-uploading a part number replaces the earlier part. On failure the
    /// session keeps its previous parts and stays active.
    pub async fn upload_part(
        &self,
        session: &mut MultipartUploadSession,
        part_number: u32,
        data: impl Into<Bytes>,
    ) -> Result<UploadPartResult> {
        let part = self.send_part(session, part_number, data.into()).await?;
        session.record_part(part.clone())?;
        Ok(part)
    }

    /// Ask the service to assemble the recorded parts.
    ///
    /// If the service refuses the part list (400, or another 4xx naming the
    /// parts) the session becomes [`UploadState::Rejected`] and must be
    /// aborted. Any other failure, including 401/403/408/429, leaves it active
    /// so the call can be retried.
    pub async fn complete_multipart_upload(
        &self,
        session: &mut MultipartUploadSession,
        metadata: Option<&ObjectMetadata>,
    ) -> Result<PutObjectResult> {
        let upload_id = session.active_upload_id("complete")?.to_string();

        let mut headers = metadata.map(metadata_headers).transpose()?.unwrap_or_default();
        if !headers.contains_key(header::CONTENT_TYPE) {
            headers.extend(json_headers());
        }
        let body = UploadPartResultList {
            upload_part_result_list: session.parts.values().cloned().collect(),
        };
        let body = serde_json::to_vec(&body)
            .map_err(|e| ClientError::InvalidArgument(format!("cannot encode part list: {}", e)))?;

        let response = self
            .request(
                Method::PUT,
                &session.path(),
                &[("uploadId", Some(upload_id))],
                headers,
                Bytes::from(body),
            )
            .await?;

        if completion_refused(&response) {
            session.state = UploadState::Rejected;
            return Err(ClientError::protocol(
                response.status,
                String::from_utf8_lossy(&response.body).into_owned(),
            ));
        }
        let response = response.error_for_status()?;

        // the object exists now, even if the answer is malformed
        session.state = UploadState::Completed;
        response.json()
    }

    /// Cancel the upload and release its parts on the service.
    ///
    /// Aborting an uninitiated session does nothing. Aborting a completed or
    /// already aborted session is an error.
    pub async fn abort_multipart_upload(&self, session: &mut MultipartUploadSession) -> Result<()> {
        if session.state == UploadState::Uninitiated {
            return Ok(());
        }
        session.ensure("abort", &[UploadState::Active, UploadState::Rejected])?;
        let upload_id = session
            .upload_id
            .clone()
            .ok_or_else(|| session.invalid_state("abort"))?;

        self.execute(
            Method::DELETE,
            &session.path(),
            &[("uploadId", Some(upload_id))],
            HeaderMap::new(),
            Bytes::new(),
        )
        .await?;

        session.state = UploadState::Aborted;
        Ok(())
    }
}

/// Whether a `complete` answer says the part list itself is unacceptable
fn completion_refused(response: &HttpResponse) -> bool {
    match response.status {
        StatusCode::BAD_REQUEST => true,
        StatusCode::UNAUTHORIZED
        | StatusCode::FORBIDDEN
        | StatusCode::REQUEST_TIMEOUT
        | StatusCode::TOO_MANY_REQUESTS => false,
        status if status.is_client_error() => String::from_utf8_lossy(&response.body)
            .to_ascii_lowercase()
            .contains("part"),
        _ => false,
    }
}

/// Progress callback type
pub type ProgressCallback = Box<dyn Fn(UploadProgress) + Send + Sync>;

/// Upload progress information
#[derive(Clone, Debug)]
pub struct UploadProgress {
    /// Bytes uploaded so far
    pub bytes_uploaded: u64,
    /// Total bytes to upload
    pub total_bytes: u64,
    /// Part that just finished
    pub current_part: u32,
    /// Parts finished so far
    pub parts_done: u32,
    /// Total number of parts
    pub total_parts: u32,
}

impl UploadProgress {
    /// Get percentage complete
    pub fn percentage(&self) -> f64 {
        if self.total_bytes == 0 {
            return 100.0;
        }
        (self.bytes_uploaded as f64 / self.total_bytes as f64) * 100.0
    }
}

/// Upload a buffer using multipart upload.
///
/// Parts of `multipart_chunk_size` bytes are uploaded up to
/// `multipart_concurrency` at a time. If any part fails the upload is
/// aborted and the part's error is returned.
pub async fn upload_large_file(
    client: &FdsClient,
    bucket: &str,
    key: &str,
    data: Bytes,
    metadata: Option<&ObjectMetadata>,
    progress: Option<ProgressCallback>,
) -> Result<PutObjectResult> {
    let chunk_size = client.config().multipart_chunk_size.max(1) as usize;
    let concurrency = client.config().multipart_concurrency.max(1);
    let total_bytes = data.len() as u64;
    let total_parts = data.len().div_ceil(chunk_size).max(1);

    let mut session = client.init_multipart_upload(bucket, key).await?;
    debug!(
        upload_id = session.upload_id().unwrap_or_default(),
        total_parts, "Started multipart upload of {}/{}", bucket, key
    );

    let chunks = (0..total_parts).map(|i| {
        let start = i * chunk_size;
        let end = (start + chunk_size).min(data.len());
        (i as u32 + 1, data.slice(start..end))
    });

    let mut uploaded = Vec::with_capacity(total_parts);
    let mut failure = None;
    {
        let shared = &session;
        let mut parts = stream::iter(chunks)
            .map(move |(part_number, chunk)| client.send_part(shared, part_number, chunk))
            .buffer_unordered(concurrency);

        let mut bytes_uploaded = 0u64;
        while let Some(result) = parts.next().await {
            match result {
                Ok(part) => {
                    bytes_uploaded += part.part_size;
                    debug!(part = part.part_number, "Uploaded part");
                    if let Some(ref cb) = progress {
                        cb(UploadProgress {
                            bytes_uploaded,
                            total_bytes,
                            current_part: part.part_number,
                            parts_done: uploaded.len() as u32 + 1,
                            total_parts: total_parts as u32,
                        });
                    }
                    uploaded.push(part);
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
    }

    if let Some(e) = failure {
        if let Err(abort_err) = client.abort_multipart_upload(&mut session).await {
            warn!("Failed to abort multipart upload of {}/{}: {}", bucket, key, abort_err);
        }
        return Err(e);
    }

    for part in uploaded {
        session.record_part(part)?;
    }
    client.complete_multipart_upload(&mut session, metadata).await
}

/// Upload a file from disk, switching to multipart above `multipart_threshold`.
///
/// The content type is guessed from the file extension.
pub async fn put_file(
    client: &FdsClient,
    bucket: &str,
    key: &str,
    path: impl AsRef<Path>,
    progress: Option<ProgressCallback>,
) -> Result<PutObjectResult> {
    let path = path.as_ref();
    let data = Bytes::from(tokio::fs::read(path).await?);
    let metadata = mime_guess::from_path(path)
        .first()
        .map(|mime| ObjectMetadata::new().with_content_type(mime.essence_str()));

    if data.len() as u64 >= client.config().multipart_threshold {
        upload_large_file(client, bucket, key, data, metadata.as_ref(), progress).await
    } else {
        client.put_object(bucket, key, data, metadata.as_ref()).await
    }
}
