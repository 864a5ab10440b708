//! Access key pair used to sign requests

use crate::{ClientError, Result};
use std::fmt;

/// An access key id and its secret.
///
/// Fixed for the lifetime of a client. The secret never appears in `Debug`
/// output and the type is not serializable.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    access_key_id: String,
    secret_key: String,
}

impl Credential {
    /// Create a credential, rejecting empty fields
    pub fn new(access_key_id: impl Into<String>, secret_key: impl Into<String>) -> Result<Self> {
        let access_key_id = access_key_id.into();
        let secret_key = secret_key.into();

        if access_key_id.is_empty() {
            return Err(ClientError::Config("access key id is empty".to_string()));
        }
        if secret_key.is_empty() {
            return Err(ClientError::Config("secret key is empty".to_string()));
        }

        Ok(Self {
            access_key_id,
            secret_key,
        })
    }

    /// The public half of the key pair
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub(crate) fn secret_key(&self) -> &[u8] {
        self.secret_key.as_bytes()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &self.access_key_id)
            .field("secret_key", &"***")
            .finish()
    }
}
