//! HTTP-level tests of the resource client against a mock FDS server
//!
//! Run with: cargo test --package fds-client --test client_tests

use fds_client::{
    signer, AccessControlPolicy, ClientError, Config, Credential, FdsClient, ListObjectsOptions,
    ObjectMetadata, Signer,
};
use serde_json::json;
use wiremock::matchers::{body_json, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn client_for(server: &MockServer) -> FdsClient {
    FdsClient::new(
        Config::new(server.uri())
            .with_credentials("AKID", "test-secret")
            .with_max_retries(0),
    )
    .unwrap()
}

/// Recompute the signature from what the server actually received
fn assert_signed(request: &Request) {
    let signer = Signer::new(Credential::new("AKID", "test-secret").unwrap());
    let expected = format!(
        "Galaxy-V2 AKID:{}",
        signer
            .sign(&request.url, &request.method, &request.headers)
            .unwrap()
    );
    let actual = request.headers["authorization"].to_str().unwrap();
    assert_eq!(actual, expected, "signature mismatch for {}", request.url);
}

#[tokio::test]
async fn test_list_buckets_is_signed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("authorizedBuckets", ""))
        .and(header_exists("date"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "owner": {"id": "333"},
            "buckets": [{"creationTime": 0, "name": "xxx", "numObjects": 0, "orgId": "3334444", "usedSpace": 0}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client_for(&server).list_buckets(true).await.unwrap();

    assert_eq!(result.owner.id, "333");
    assert_eq!(result.buckets[0].name, "xxx");
    let requests = server.received_requests().await.unwrap();
    assert_signed(&requests[0]);
}

#[tokio::test]
async fn test_repeated_requests_are_identical_apart_from_date() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/photos"))
        .and(query_param("acl", ""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "owner": {"id": "1"},
            "accessControlList": []
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.get_bucket_acl("photos").await.unwrap();
    client.bucket("photos").acl().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].url, requests[1].url);
    assert_eq!(requests[0].method, requests[1].method);
    for request in &requests {
        assert_signed(request);
    }
}

#[tokio::test]
async fn test_put_bucket_sends_acl_header() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/new-bucket"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .put_bucket("new-bucket", &["PUBLIC_READ", "PUBLIC_WRITE"])
        .await
        .unwrap();

    let request = &server.received_requests().await.unwrap()[0];
    assert_eq!(request.headers["x-xiaomi-meta-acl"], "PUBLIC_READ, PUBLIC_WRITE");
    assert_signed(request);
    let canonical = signer::string_to_sign(&request.url, &request.method, &request.headers).unwrap();
    assert!(canonical.ends_with("\nx-xiaomi-meta-acl:PUBLIC_READ, PUBLIC_WRITE\n/new-bucket"));
}

#[tokio::test]
async fn test_head_bucket_maps_404_to_false() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/present"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/absent"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/forbidden"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.head_bucket("present").await.unwrap());
    assert!(!client.head_bucket("absent").await.unwrap());
    assert!(client.head_bucket("forbidden").await.unwrap_err().is_access_denied());
}

#[tokio::test]
async fn test_list_objects_sends_prefix() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bn"))
        .and(query_param("prefix", "logs/"))
        .and(query_param("maxKeys", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "bn",
            "prefix": "logs/",
            "maxKeys": 10,
            "truncated": false,
            "objects": [{"name": "logs/a", "owner": {"id": "2"}, "size": 3, "uploadTime": 1488248369818i64}],
            "commonPrefixes": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let options = ListObjectsOptions {
        max_keys: Some(10),
        ..ListObjectsOptions::with_prefix("logs/")
    };
    let result = client_for(&server).list_objects("bn", Some(options)).await.unwrap();

    assert_eq!(result.objects.len(), 1);
    assert_eq!(result.objects[0].name, "logs/a");
}

#[tokio::test]
async fn test_put_and_get_object_with_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/bucket/notes.txt"))
        .and(header_exists("x-xiaomi-meta-author"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bucketName": "bucket",
            "objectName": "notes.txt",
            "accessKeyId": "AKID"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bucket/notes.txt"))
        .and(header_exists("range"))
        .respond_with(
            ResponseTemplate::new(206)
                .insert_header("content-type", "text/plain")
                .insert_header("x-xiaomi-meta-author", "ana")
                .set_body_string("hello"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let object = client.object("bucket", "notes.txt");
    let metadata = ObjectMetadata::new()
        .with_content_type("text/plain")
        .with_metadata("author", "ana");

    let put = object.put("hello world", Some(&metadata)).await.unwrap();
    assert_eq!(put.object_name, "notes.txt");

    let got = object.get(Some("bytes=0-4")).await.unwrap();
    assert_eq!(got.data, "hello");
    assert_eq!(got.metadata.content_type.as_deref(), Some("text/plain"));
    assert_eq!(got.metadata.user_metadata["author"], "ana");

    for request in server.received_requests().await.unwrap() {
        assert_signed(&request);
    }
}

#[tokio::test]
async fn test_delete_object_acl_uses_acl_delete_action() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/bucket/key"))
        .and(query_param("acl", ""))
        .and(query_param("action", "delete"))
        .and(body_json(json!({"owner": {"id": "o"}, "accessControlList": []})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let policy = AccessControlPolicy {
        owner: fds_client::Owner {
            id: "o".to_string(),
            display_name: None,
        },
        access_control_list: Vec::new(),
    };
    client_for(&server)
        .object("bucket", "key")
        .delete_acl(&policy)
        .await
        .unwrap();

    // action is not a sub-resource and stays out of the signature
    let request = &server.received_requests().await.unwrap()[0];
    let canonical = signer::string_to_sign(&request.url, &request.method, &request.headers).unwrap();
    assert!(canonical.ends_with("\n/bucket/key?acl"));
}

#[tokio::test]
async fn test_object_actions_use_flag_parameters() {
    let server = MockServer::start().await;
    for flag in ["restore", "prefetch", "refresh"] {
        Mock::given(method("PUT"))
            .and(path("/bucket/key"))
            .and(query_param(flag, ""))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("PUT"))
        .and(path("/bucket/key"))
        .and(query_param("renameTo", "new-key"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let object = client_for(&server);
    let object = object.object("bucket", "key");
    object.restore().await.unwrap();
    object.prefetch().await.unwrap();
    object.refresh().await.unwrap();
    object.rename("new-key").await.unwrap();
}

#[tokio::test]
async fn test_error_status_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/bucket/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("object not found"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .delete_object("bucket", "missing")
        .await
        .unwrap_err();

    match err {
        ClientError::Status { status, body } => {
            assert_eq!(status.as_u16(), 404);
            assert_eq!(body, "object not found");
        }
        other => panic!("Expected Status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_multipart_upload_against_server() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/bucket/video.mp4"))
        .and(query_param("uploads", ""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bucketName": "bucket", "objectName": "video.mp4", "uploadId": "u-42"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/bucket/video.mp4"))
        .and(query_param("uploadId", "u-42"))
        .and(query_param("partNumber", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "partNumber": 1, "etag": "e1", "partSize": 5
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/bucket/video.mp4"))
        .and(query_param("uploadId", "u-42"))
        .and(body_json(json!({
            "uploadPartResultList": [{"partNumber": 1, "etag": "e1", "partSize": 5}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bucketName": "bucket", "objectName": "video.mp4"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut session = client.object("bucket", "video.mp4").init_multipart_upload().await.unwrap();
    client.upload_part(&mut session, 1, "12345").await.unwrap();
    let result = client.complete_multipart_upload(&mut session, None).await.unwrap();

    assert_eq!(result.object_name, "video.mp4");
    for request in server.received_requests().await.unwrap() {
        assert_signed(&request);
    }
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    // nothing listens on port 1
    let client = FdsClient::new(
        Config::new("http://127.0.0.1:1")
            .with_credentials("AKID", "test-secret")
            .with_max_retries(2),
    )
    .unwrap();

    let err = client.list_buckets(false).await.unwrap_err();

    assert_eq!(err.kind(), fds_client::ErrorKind::Transport);
    assert!(err.is_retryable());
}
