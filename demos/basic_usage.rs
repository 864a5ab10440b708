//! Basic usage of the FDS client
//!
//! This demo:
//! - Creates a bucket
//! - Uploads objects with metadata
//! - Lists and downloads objects
//! - Cleans up
//!
//! Credentials come from FDS_BASE_URL, FDS_APP_KEY and FDS_APP_SECRET.
//!
//! Run with: cargo run --example basic_usage

use fds_client::{FdsClient, ListObjectsOptions, ObjectMetadata};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let client = FdsClient::from_env()?;
    let bucket = client.bucket("fds-rs-demo");

    // ==================== Bucket Operations ====================

    println!("Creating bucket '{}'...", bucket.name());
    if bucket.exists().await? {
        println!("   already exists");
    } else {
        bucket.create(&[]).await?;
        println!("   created");
    }

    println!("\nBuckets:");
    for info in client.list_buckets(false).await?.buckets {
        println!("   - {} ({} objects)", info.name, info.num_objects);
    }

    // ==================== Object Operations ====================

    println!("\nUploading 'hello.txt'...");
    let metadata = ObjectMetadata::new()
        .with_content_type("text/plain")
        .with_metadata("demo", "basic_usage");
    bucket
        .object("hello.txt")
        .put("Hello, FDS!", Some(&metadata))
        .await?;

    let config = serde_json::json!({"app": "fds-demo", "version": "1.0.0"});
    for i in 1..=3 {
        bucket
            .object(format!("data/file{}.json", i))
            .put(serde_json::to_vec_pretty(&config)?, None)
            .await?;
    }
    println!("   uploaded 4 objects");

    println!("\nObjects under 'data/':");
    let listing = bucket
        .list_objects(Some(ListObjectsOptions::with_prefix("data/")))
        .await?;
    for object in &listing.objects {
        println!("   - {} ({} bytes)", object.name, object.size);
    }

    println!("\nDownloading 'hello.txt'...");
    let object = bucket.object("hello.txt").get(None).await?;
    println!("   content: {}", String::from_utf8_lossy(&object.data));
    println!("   metadata: {:?}", object.metadata.user_metadata);

    // ==================== Cleanup ====================

    println!("\nCleaning up...");
    bucket.object("hello.txt").delete().await?;
    for object in listing.objects {
        bucket.object(object.name).delete().await?;
    }
    bucket.delete().await?;
    println!("   done");

    Ok(())
}
