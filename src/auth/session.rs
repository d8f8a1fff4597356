//! Session state and wire types for authentication

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Token pair returned by the login and refresh endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The access token
    pub token: String,

    /// The refresh token
    pub refresh_token: String,
}

/// Decoded payload of an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// The user ID
    pub id: i64,

    /// The user's email address
    pub email: Option<String>,

    /// Security roles granted to the user
    #[serde(default)]
    pub roles: Vec<String>,

    /// Expiry timestamp in unix seconds
    pub exp: i64,
}

/// A user resource from the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// The user ID
    pub id: i64,

    /// The user's email address
    pub email: String,

    /// Security roles granted to the user
    #[serde(default)]
    pub roles: Vec<String>,

    /// IRIs of the user's favorite movies
    #[serde(default)]
    pub movies: Vec<String>,
}

/// In-memory session state, guarded by the store's lock
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub claims: Option<Claims>,
    pub user: Option<User>,
    pub last_error: Option<String>,
    pub field_errors: HashMap<String, String>,
}
