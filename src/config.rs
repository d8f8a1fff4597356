//! Configuration options for the Cinetheque client

use std::sync::Arc;
use std::time::Duration;

use crate::auth::TokenStorage;

/// Configuration options for the Cinetheque client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Whether to automatically refresh the token on a 401 response
    pub auto_refresh_token: bool,

    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// Where tokens are persisted; in-memory storage when unset
    pub token_storage: Option<Arc<dyn TokenStorage>>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            auto_refresh_token: true,
            request_timeout: Some(Duration::from_secs(30)),
            token_storage: None,
        }
    }
}

impl ClientOptions {
    /// Set whether to automatically refresh the token
    pub fn with_auto_refresh_token(mut self, value: bool) -> Self {
        self.auto_refresh_token = value;
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the token storage backend
    pub fn with_token_storage(mut self, value: Arc<dyn TokenStorage>) -> Self {
        self.token_storage = Some(value);
        self
    }
}
