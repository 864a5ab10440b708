//! Bucket and object handles
//!
//! Thin values that remember a bucket name (and object key) and forward to
//! [`FdsClient`].

use crate::{
    multipart::MultipartUploadSession,
    types::{
        AccessControlPolicy, BucketInfo, GetObjectResult, ListObjectsOptions, ListObjectsResult,
        ObjectMetadata, PutObjectResult,
    },
    FdsClient, Result,
};
use bytes::Bytes;

/// A bucket on the service
#[derive(Clone, Debug)]
pub struct Bucket<'a> {
    client: &'a FdsClient,
    name: String,
}

impl<'a> Bucket<'a> {
    pub(crate) fn new(client: &'a FdsClient, name: impl Into<String>) -> Self {
        Self {
            client,
            name: name.into(),
        }
    }

    /// Bucket name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle on an object in this bucket
    pub fn object(&self, key: impl Into<String>) -> FdsObject<'a> {
        FdsObject::new(self.client, self.name.clone(), key)
    }

    /// Create the bucket
    pub async fn create(&self, acl: &[&str]) -> Result<()> {
        self.client.put_bucket(&self.name, acl).await
    }

    /// Delete the bucket
    pub async fn delete(&self) -> Result<()> {
        self.client.delete_bucket(&self.name).await
    }

    /// Whether the bucket exists
    pub async fn exists(&self) -> Result<bool> {
        self.client.head_bucket(&self.name).await
    }

    /// Bucket metadata
    pub async fn meta(&self) -> Result<BucketInfo> {
        self.client.get_bucket_meta(&self.name).await
    }

    /// Access control policy
    pub async fn acl(&self) -> Result<AccessControlPolicy> {
        self.client.get_bucket_acl(&self.name).await
    }

    /// Replace or amend the access control policy
    pub async fn put_acl(&self, policy: &AccessControlPolicy, action: Option<&str>) -> Result<()> {
        self.client.put_bucket_acl(&self.name, policy, action).await
    }

    /// List objects
    pub async fn list_objects(&self, options: Option<ListObjectsOptions>) -> Result<ListObjectsResult> {
        self.client.list_objects(&self.name, options).await
    }

    /// Post an object under a service-chosen name
    pub async fn post_object(
        &self,
        data: impl Into<Bytes>,
        metadata: Option<&ObjectMetadata>,
    ) -> Result<PutObjectResult> {
        self.client.post_object(&self.name, data, metadata).await
    }

    /// Delete several objects
    pub async fn delete_objects(&self, keys: &[String]) -> Result<serde_json::Value> {
        self.client.delete_objects(&self.name, keys).await
    }
}

/// An object on the service
#[derive(Clone, Debug)]
pub struct FdsObject<'a> {
    client: &'a FdsClient,
    bucket: String,
    key: String,
}

impl<'a> FdsObject<'a> {
    pub(crate) fn new(client: &'a FdsClient, bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            key: key.into(),
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

    /// Download the object, or a range of it
    pub async fn get(&self, range: Option<&str>) -> Result<GetObjectResult> {
        self.client.get_object(&self.bucket, &self.key, range).await
    }

    /// Upload the object
    pub async fn put(
        &self,
        data: impl Into<Bytes>,
        metadata: Option<&ObjectMetadata>,
    ) -> Result<PutObjectResult> {
        self.client.put_object(&self.bucket, &self.key, data, metadata).await
    }

    /// Access control policy
    pub async fn acl(&self) -> Result<AccessControlPolicy> {
        self.client.get_object_acl(&self.bucket, &self.key).await
    }

    /// Replace or amend the access control policy
    pub async fn put_acl(&self, policy: &AccessControlPolicy, action: Option<&str>) -> Result<()> {
        self.client
            .put_object_acl(&self.bucket, &self.key, policy, action)
            .await
    }

    /// Remove grants from the access control policy
    pub async fn delete_acl(&self, policy: &AccessControlPolicy) -> Result<()> {
        self.client
            .delete_object_acl(&self.bucket, &self.key, policy)
            .await
    }

    /// Whether the object exists
    pub async fn exists(&self) -> Result<bool> {
        self.client.head_object(&self.bucket, &self.key).await
    }

    /// Object metadata
    pub async fn meta(&self) -> Result<ObjectMetadata> {
        self.client.get_object_meta(&self.bucket, &self.key).await
    }

    /// Delete the object
    pub async fn delete(&self) -> Result<()> {
        self.client.delete_object(&self.bucket, &self.key).await
    }

    /// Restore a deleted object
    pub async fn restore(&self) -> Result<()> {
        self.client.restore_object(&self.bucket, &self.key).await
    }

    /// Rename within the bucket
    pub async fn rename(&self, rename_to: &str) -> Result<()> {
        self.client
            .rename_object(&self.bucket, &self.key, rename_to)
            .await
    }

    /// Prefetch into the CDN
    pub async fn prefetch(&self) -> Result<()> {
        self.client.prefetch_object(&self.bucket, &self.key).await
    }

    /// Refresh the CDN copy
    pub async fn refresh(&self) -> Result<()> {
        self.client.refresh_object(&self.bucket, &self.key).await
    }

    /// Start a multipart upload of this object
    pub async fn init_multipart_upload(&self) -> Result<MultipartUploadSession> {
        self.client
            .init_multipart_upload(&self.bucket, &self.key)
            .await
    }
}
