//! # FDS Client SDK
//!
//! A client SDK for the FDS object storage service.
//!
//! ## Features
//!
//! - **Request signing**: every request carries a `Galaxy-V2` HMAC-SHA1
//!   signature over a canonical form of the request
//! - **Multipart upload**: explicit session state machine, parallel part uploads
//! - **Pluggable transport**: reqwest by default, any [`Transport`] for tests or
//!   custom stacks
//!
//! ## Example
//!
//! ```rust,ignore
//! use fds_client::{Config, FdsClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = FdsClient::new(
//!         Config::new("https://cnbj0.fds.api.xiaomi.com")
//!             .with_credentials("your-access-key", "your-secret-key"),
//!     )?;
//!
//!     // Create a bucket
//!     client.put_bucket("my-bucket", &[]).await?;
//!
//!     // Upload a file
//!     client.put_object("my-bucket", "hello.txt", "Hello, World!", None).await?;
//!
//!     // Download a file
//!     let object = client.get_object("my-bucket", "hello.txt", None).await?;
//!     println!("Content: {}", String::from_utf8_lossy(&object.data));
//!
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod credential;
mod error;
mod handle;
pub mod interceptor;
pub mod multipart;
pub mod signer;
pub mod transport;
mod types;

pub use client::{FdsClient, USER_METADATA_PREFIX};
pub use config::{Config, ENV_APP_KEY, ENV_APP_SECRET, ENV_BASE_URL};
pub use credential::Credential;
pub use error::{ClientError, ErrorKind, Result};
pub use handle::{Bucket, FdsObject};
pub use interceptor::{SigningInterceptor, AUTH_SCHEME};
pub use multipart::{
    put_file, upload_large_file, MultipartUploadSession, ProgressCallback, UploadProgress,
    UploadState,
};
pub use signer::Signer;
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
pub use types::*;
