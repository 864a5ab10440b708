//! JSON types exchanged with the service

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Owner of a bucket or object
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    /// Owner id
    pub id: String,
    /// Display name, when the service reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// A bucket as listed by the service
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketInfo {
    /// Bucket name
    pub name: String,
    /// Creation time (milliseconds since the epoch)
    #[serde(default)]
    pub creation_time: i64,
    /// Number of objects
    #[serde(default)]
    pub num_objects: u64,
    /// Owning organization
    #[serde(default)]
    pub org_id: Option<String>,
    /// Bytes used
    #[serde(default)]
    pub used_space: u64,
}

/// Result of listing buckets
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListBucketsResult {
    /// Account owner
    pub owner: Owner,
    /// Buckets visible to the caller
    #[serde(default)]
    pub buckets: Vec<BucketInfo>,
}

/// An object summary inside a listing
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSummary {
    /// Object name
    pub name: String,
    /// Owner
    #[serde(default)]
    pub owner: Owner,
    /// Size in bytes
    #[serde(default)]
    pub size: u64,
    /// Upload time (milliseconds since the epoch)
    #[serde(default)]
    pub upload_time: i64,
}

/// Result of listing objects
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListObjectsResult {
    /// Bucket name
    pub name: String,
    /// Prefix used for filtering
    #[serde(default)]
    pub prefix: String,
    /// Delimiter for grouping
    #[serde(default)]
    pub delimiter: String,
    /// Listing start marker
    #[serde(default)]
    pub marker: String,
    /// Marker to pass for the next page
    #[serde(default)]
    pub next_marker: Option<String>,
    /// Page size
    #[serde(default)]
    pub max_keys: u32,
    /// Whether there are more results
    #[serde(default)]
    pub truncated: bool,
    /// Objects matching the query
    #[serde(default)]
    pub objects: Vec<ObjectSummary>,
    /// Common prefixes (folders)
    #[serde(default)]
    pub common_prefixes: Vec<String>,
}

/// Options for listing objects
#[derive(Clone, Debug, Default)]
pub struct ListObjectsOptions {
    /// Filter by prefix
    pub prefix: Option<String>,
    /// Delimiter for grouping
    pub delimiter: Option<String>,
    /// Maximum keys to return
    pub max_keys: Option<u32>,
    /// Start listing after this marker
    pub marker: Option<String>,
}

impl ListObjectsOptions {
    /// Options filtering by prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            ..Default::default()
        }
    }
}

/// Kind of grantee in an ACL entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GrantType {
    /// A single user
    User,
    /// A predefined group
    Group,
}

/// One entry of an access control list
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    /// Who the grant applies to
    pub grantee: Owner,
    /// Permission name, e.g. `READ` or `FULL_CONTROL`
    pub permission: String,
    /// Grantee kind
    #[serde(rename = "type")]
    pub grant_type: GrantType,
}

/// Access control policy of a bucket or object
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessControlPolicy {
    /// Resource owner
    #[serde(default)]
    pub owner: Owner,
    /// Grants
    #[serde(default)]
    pub access_control_list: Vec<Grant>,
}

/// Result of writing an object
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutObjectResult {
    /// Bucket name
    pub bucket_name: String,
    /// Object name as stored
    pub object_name: String,
    /// Access key that wrote it
    #[serde(default)]
    pub access_key_id: Option<String>,
    /// Pre-signed access signature, if issued
    #[serde(default)]
    pub signature: Option<String>,
    /// Expiry of the pre-signed signature
    #[serde(default)]
    pub expires: Option<i64>,
}

/// Object metadata, sent as headers on writes and read back from `HEAD`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// Content type
    pub content_type: Option<String>,
    /// Content MD5 (hex)
    pub content_md5: Option<String>,
    /// Content length
    pub content_length: Option<u64>,
    /// Cache control
    pub cache_control: Option<String>,
    /// Content encoding
    pub content_encoding: Option<String>,
    /// User-defined metadata (without the `x-xiaomi-meta-` prefix)
    pub user_metadata: BTreeMap<String, String>,
}

impl ObjectMetadata {
    /// Create new empty metadata
    pub fn new() -> Self {
        Self::default()
    }

    /// Set content type
    pub fn with_content_type(mut self, ct: impl Into<String>) -> Self {
        self.content_type = Some(ct.into());
        self
    }

    /// Add user metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.user_metadata.insert(key.into(), value.into());
        self
    }
}

/// Get object result
#[derive(Clone, Debug)]
pub struct GetObjectResult {
    /// Object data (or the requested range of it)
    pub data: bytes::Bytes,
    /// Metadata reported in the response headers
    pub metadata: ObjectMetadata,
}

/// Service endpoint lookup result
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointResult {
    /// Region to endpoint mapping
    #[serde(flatten)]
    pub endpoints: BTreeMap<String, serde_json::Value>,
}

/// Response of `init` for a multipart upload
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitMultipartUploadResult {
    /// Bucket name
    #[serde(default)]
    pub bucket_name: String,
    /// Object name
    #[serde(default)]
    pub object_name: String,
    /// Service-issued upload id
    #[serde(default)]
    pub upload_id: String,
}

/// Record of one uploaded part
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadPartResult {
    /// Part number (1-based)
    #[serde(default)]
    pub part_number: u32,
    /// ETag issued for the part
    pub etag: String,
    /// Part size in bytes
    #[serde(default)]
    pub part_size: u64,
}

/// Body of a `complete` call
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadPartResultList {
    /// Parts in ascending part number order
    pub upload_part_result_list: Vec<UploadPartResult>,
}
