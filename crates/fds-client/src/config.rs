//! Client configuration

use crate::{ClientError, Credential, Result};
use std::time::Duration;
use url::Url;

/// Environment variable holding the service base URL
pub const ENV_BASE_URL: &str = "FDS_BASE_URL";
/// Environment variable holding the access key id
pub const ENV_APP_KEY: &str = "FDS_APP_KEY";
/// Environment variable holding the secret key
pub const ENV_APP_SECRET: &str = "FDS_APP_SECRET";

/// Client configuration
#[derive(Clone)]
pub struct Config {
    /// Service endpoint URL
    pub endpoint: String,
    /// Access key id
    pub access_key_id: String,
    /// Secret key
    pub secret_key: String,
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Maximum retry attempts for requests that never reached the service
    pub max_retries: u32,
    /// Multipart upload threshold (bytes)
    pub multipart_threshold: u64,
    /// Multipart chunk size (bytes)
    pub multipart_chunk_size: u64,
    /// Parts uploaded concurrently by the large-file helper
    pub multipart_concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9000".to_string(),
            access_key_id: String::new(),
            secret_key: String::new(),
            timeout: Duration::from_secs(30),
            user_agent: format!("fds-client/{}", env!("CARGO_PKG_VERSION")),
            max_retries: 3,
            multipart_threshold: 100 * 1024 * 1024, // 100 MB
            multipart_chunk_size: 8 * 1024 * 1024,  // 8 MB
            multipart_concurrency: 4,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .field("max_retries", &self.max_retries)
            .field("multipart_threshold", &self.multipart_threshold)
            .field("multipart_chunk_size", &self.multipart_chunk_size)
            .field("multipart_concurrency", &self.multipart_concurrency)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Create a new config with the given endpoint
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Read endpoint and credentials from `FDS_BASE_URL`, `FDS_APP_KEY` and `FDS_APP_SECRET`
    pub fn from_env() -> Result<Self> {
        let var = |name: &str| {
            std::env::var(name)
                .map_err(|_| ClientError::Config(format!("environment variable {} is not set", name)))
        };

        Ok(Self::new(var(ENV_BASE_URL)?).with_credentials(var(ENV_APP_KEY)?, var(ENV_APP_SECRET)?))
    }

    /// Set the access key pair
    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.access_key_id = access_key_id.into();
        self.secret_key = secret_key.into();
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry budget for connection failures
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the multipart chunk size
    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.multipart_chunk_size = chunk_size;
        self
    }

    /// Parse the endpoint into a base URL
    pub fn base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.endpoint)
            .map_err(|e| ClientError::Config(format!("invalid endpoint {:?}: {}", self.endpoint, e)))?;

        match url.scheme() {
            "http" | "https" if url.has_host() => Ok(url),
            _ => Err(ClientError::Config(format!(
                "endpoint must be an absolute http(s) URL, got {:?}",
                self.endpoint
            ))),
        }
    }

    /// Build the credential from the configured key pair
    pub fn credential(&self) -> Result<Credential> {
        Credential::new(self.access_key_id.clone(), self.secret_key.clone())
    }

    /// Check every setting that would otherwise fail on first use
    pub fn validate(&self) -> Result<()> {
        self.base_url()?;
        self.credential()?;

        if self.multipart_chunk_size == 0 {
            return Err(ClientError::Config("multipart chunk size must be positive".to_string()));
        }
        if self.multipart_concurrency == 0 {
            return Err(ClientError::Config("multipart concurrency must be positive".to_string()));
        }
        Ok(())
    }
}
