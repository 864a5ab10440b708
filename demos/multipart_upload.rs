//! Multipart upload, both driven by hand and through the large-file helper
//!
//! Run with: cargo run --example multipart_upload

use bytes::Bytes;
use fds_client::{upload_large_file, FdsClient, ProgressCallback, UploadProgress};

const BUCKET: &str = "fds-rs-demo";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let client = FdsClient::from_env()?;
    if !client.head_bucket(BUCKET).await? {
        client.put_bucket(BUCKET, &[]).await?;
    }

    // ==================== Explicit session ====================

    let mut session = client
        .object(BUCKET, "manual.bin")
        .init_multipart_upload()
        .await?;
    println!("Started upload {}", session.upload_id().unwrap_or_default());

    let chunk = Bytes::from(vec![b'x'; 5 * 1024 * 1024]);
    for part_number in 1..=3 {
        if let Err(e) = client
            .upload_part(&mut session, part_number, chunk.clone())
            .await
        {
            println!("Part {} failed: {}, aborting", part_number, e);
            client.abort_multipart_upload(&mut session).await?;
            return Err(e.into());
        }
        println!("   uploaded part {}", part_number);
    }

    let result = client.complete_multipart_upload(&mut session, None).await?;
    println!(
        "Completed {}/{} ({} bytes, state {})",
        result.bucket_name,
        result.object_name,
        session.total_size(),
        session.state()
    );

    // ==================== Large-file helper ====================

    let data = Bytes::from(vec![b'y'; 20 * 1024 * 1024]);
    let progress: ProgressCallback = Box::new(|p: UploadProgress| {
        println!(
            "   part {} done, {}/{} parts ({:.1}%)",
            p.current_part,
            p.parts_done,
            p.total_parts,
            p.percentage()
        );
    });
    let result = upload_large_file(&client, BUCKET, "helper.bin", data, None, Some(progress)).await?;
    println!("Uploaded {}", result.object_name);

    client.delete_object(BUCKET, "manual.bin").await?;
    client.delete_object(BUCKET, "helper.bin").await?;
    Ok(())
}
