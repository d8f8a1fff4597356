//! Authentication session store for the Cinetheque API

mod session;
mod storage;
pub mod token;

use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::error::Error;

pub use session::{Claims, TokenResponse, User};
pub use storage::{
    FileTokenStorage, MemoryTokenStorage, TokenStorage, REFRESH_TOKEN_KEY, TOKEN_KEY,
};

use session::SessionState;

/// Error message recorded when the server cannot be reached
const SERVER_UNREACHABLE: &str = "Impossible de contacter le serveur.";

/// Error message recorded when the server rejects the credentials
const INVALID_CREDENTIALS: &str = "Identifiants incorrects";

/// Client-side session store for the Cinetheque API.
///
/// Owns the token pair, the decoded claims and the current user, and keeps
/// the configured [`TokenStorage`] in lockstep with every mutation. Renewal
/// calls go straight to the HTTP client, so they can never re-enter the 401
/// handling of [`crate::api::ApiClient`].
pub struct Auth {
    /// The base URL of the Cinetheque API
    url: String,

    /// HTTP client used for requests
    client: Client,

    /// Durable storage for the token pair
    storage: Arc<dyn TokenStorage>,

    /// The current session state
    state: RwLock<SessionState>,

    /// Guard ensuring a single renewal is in flight
    refreshing: AtomicBool,
}

impl Auth {
    /// Create a new session store
    pub(crate) fn new(url: &str, client: Client, storage: Arc<dyn TokenStorage>) -> Self {
        Self {
            url: url.to_string(),
            client,
            storage,
            state: RwLock::new(SessionState::default()),
            refreshing: AtomicBool::new(false),
        }
    }

    fn get_api_url(&self, path: &str) -> String {
        format!("{}/api{}", self.url, path)
    }

    /// Restore the session from storage.
    ///
    /// Loads the persisted refresh token, then the access token if one is
    /// present. A stored token that no longer decodes tears the whole
    /// session down, storage included. A stored token past its expiry is
    /// renewed in the background when a tokio runtime is available; the
    /// restored claims stay in place until that renewal lands.
    pub fn hydrate(self: Arc<Self>) {
        let stored_refresh = self.storage.get(REFRESH_TOKEN_KEY);
        let stored_token = self.storage.get(TOKEN_KEY);

        {
            let mut state = self.state.write().unwrap();
            state.refresh_token = stored_refresh;
        }

        let access_token = match stored_token {
            Some(token) => token,
            None => return,
        };

        let claims = match token::decode_claims(&access_token) {
            Some(claims) => claims,
            None => {
                warn!("Stored access token no longer decodes, clearing session");
                self.logout();
                return;
            }
        };

        let expired = token::is_expired(&access_token);

        {
            let mut state = self.state.write().unwrap();
            state.access_token = Some(access_token);
            state.claims = Some(claims);
        }

        if expired {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    debug!("Stored access token is expired, renewing in the background");
                    let auth = Arc::clone(&self);
                    handle.spawn(async move {
                        auth.refresh().await;
                    });
                }
                Err(_) => {
                    debug!("Stored access token is expired and no runtime is available")
                }
            }
        }
    }

    /// Log in with email and password.
    ///
    /// On success both tokens are stored and written through to storage,
    /// the claims are decoded and the user profile is fetched. Expected
    /// failures are recorded in [`Auth::last_error`] rather than returned:
    /// the fixed unreachable-server message when no response arrives, the
    /// fixed bad-credentials message for any rejection.
    pub async fn login(&self, email: &str, password: &str) -> bool {
        self.clear_errors();

        let url = self.get_api_url("/login_check");
        let body = json!({ "email": email, "password": password });

        let response = match self.client.post(&url).json(&body).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!("Login request failed: {}", err);
                self.record_error(SERVER_UNREACHABLE);
                return false;
            }
        };

        if !response.status().is_success() {
            self.record_error(INVALID_CREDENTIALS);
            return false;
        }

        let tokens: TokenResponse = match response.json().await {
            Ok(tokens) => tokens,
            Err(err) => {
                warn!("Login response was not a token pair: {}", err);
                self.record_error(INVALID_CREDENTIALS);
                return false;
            }
        };

        let claims = match token::decode_claims(&tokens.token) {
            Some(claims) => claims,
            None => {
                // A token that does not decode must never become session state
                warn!("Login returned an undecodable access token");
                self.logout();
                self.record_error(INVALID_CREDENTIALS);
                return false;
            }
        };

        let user_id = claims.id;
        self.store_tokens(&tokens.token, &tokens.refresh_token, claims);

        if self.fetch_user(user_id).await.is_err() {
            warn!("Logged in but could not fetch user {}", user_id);
        }

        true
    }

    /// Register a new account.
    ///
    /// Never touches token state. Constraint violations are exposed through
    /// [`Auth::field_errors`] keyed by field, any general server message
    /// through [`Auth::last_error`].
    pub async fn register(&self, email: &str, password: &str) -> bool {
        self.clear_errors();

        let url = self.get_api_url("/register");
        let body = json!({ "email": email, "password": password });

        let response = match self.client.post(&url).json(&body).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!("Register request failed: {}", err);
                self.record_error(SERVER_UNREACHABLE);
                return false;
            }
        };

        if response.status().is_success() {
            return true;
        }

        let details: ViolationResponse = response.json().await.unwrap_or_default();

        let mut state = self.state.write().unwrap();
        for violation in details.violations {
            state.field_errors.insert(violation.property_path, violation.message);
        }
        if let Some(message) = details.message {
            state.last_error = Some(message);
        }

        false
    }

    /// Exchange the refresh token for a new token pair.
    ///
    /// Returns false without side effects when no refresh token is held or
    /// another renewal is already in flight. A failed renewal logs the
    /// session out before returning false.
    pub async fn refresh(&self) -> bool {
        let refresh_token = {
            let state = self.state.read().unwrap();
            match state.refresh_token {
                Some(ref token) => token.clone(),
                None => return false,
            }
        };

        if self
            .refreshing
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            debug!("A renewal is already in flight");
            return false;
        }

        // Released on every exit path, including cancellation
        let _guard = RefreshGuard(&self.refreshing);

        let url = self.get_api_url("/token/refresh");
        let body = json!({ "refresh_token": refresh_token });

        let response = match self.client.post(&url).json(&body).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!("Token renewal request failed: {}", err);
                self.logout();
                return false;
            }
        };

        if !response.status().is_success() {
            warn!("Token renewal rejected with status {}", response.status());
            self.logout();
            return false;
        }

        let tokens: TokenResponse = match response.json().await {
            Ok(tokens) => tokens,
            Err(err) => {
                warn!("Token renewal response was not a token pair: {}", err);
                self.logout();
                return false;
            }
        };

        let claims = match token::decode_claims(&tokens.token) {
            Some(claims) => claims,
            None => {
                warn!("Token renewal returned an undecodable access token");
                self.logout();
                return false;
            }
        };

        self.store_tokens(&tokens.token, &tokens.refresh_token, claims);
        debug!("Access token renewed");
        true
    }

    /// Log out, clearing storage and every in-memory session field.
    ///
    /// Idempotent.
    pub fn logout(&self) {
        self.storage.remove(TOKEN_KEY);
        self.storage.remove(REFRESH_TOKEN_KEY);

        let mut state = self.state.write().unwrap();
        *state = SessionState::default();
    }

    /// Fetch a user resource and store it as the current user.
    ///
    /// On failure the current user is cleared and the error recorded.
    pub async fn fetch_user(&self, id: i64) -> Result<User, Error> {
        match self.request_user(id).await {
            Ok(user) => {
                let mut state = self.state.write().unwrap();
                state.user = Some(user.clone());
                Ok(user)
            }
            Err(err) => {
                let mut state = self.state.write().unwrap();
                state.user = None;
                state.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    async fn request_user(&self, id: i64) -> Result<User, Error> {
        let url = self.get_api_url(&format!("/users/{}", id));

        let token = {
            let state = self.state.read().unwrap();
            match state.access_token {
                Some(ref token) => token.clone(),
                None => return Err(Error::auth("Not logged in")),
            }
        };

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::auth(format!(
                "Failed to fetch user {}: status {}",
                id,
                response.status()
            )));
        }

        Ok(response.json::<User>().await?)
    }

    /// Install a session from an existing token pair.
    ///
    /// The access token must decode; otherwise nothing changes and false is
    /// returned.
    pub fn set_session(&self, access_token: &str, refresh_token: &str) -> bool {
        match token::decode_claims(access_token) {
            Some(claims) => {
                self.store_tokens(access_token, refresh_token, claims);
                true
            }
            None => false,
        }
    }

    /// Whether an access token is currently held; expiry is not checked
    pub fn is_logged_in(&self) -> bool {
        let state = self.state.read().unwrap();
        state.access_token.is_some()
    }

    /// Whether the decoded claims carry the admin role
    pub fn is_admin(&self) -> bool {
        let state = self.state.read().unwrap();
        match state.claims {
            Some(ref claims) => claims.roles.iter().any(|role| role == "ROLE_ADMIN"),
            None => false,
        }
    }

    /// Whether a token is past its expiry claim; undecodable counts as expired
    pub fn is_token_expired(&self, token: &str) -> bool {
        token::is_expired(token)
    }

    /// The current access token
    pub fn access_token(&self) -> Option<String> {
        let state = self.state.read().unwrap();
        state.access_token.clone()
    }

    /// The current refresh token
    pub fn refresh_token(&self) -> Option<String> {
        let state = self.state.read().unwrap();
        state.refresh_token.clone()
    }

    /// The decoded claims of the current access token
    pub fn claims(&self) -> Option<Claims> {
        let state = self.state.read().unwrap();
        state.claims.clone()
    }

    /// The current user, if one has been fetched
    pub fn current_user(&self) -> Option<User> {
        let state = self.state.read().unwrap();
        state.user.clone()
    }

    /// The message recorded by the last failed operation
    pub fn last_error(&self) -> Option<String> {
        let state = self.state.read().unwrap();
        state.last_error.clone()
    }

    /// Per-field validation messages from the last register attempt
    pub fn field_errors(&self) -> HashMap<String, String> {
        let state = self.state.read().unwrap();
        state.field_errors.clone()
    }

    pub(crate) fn set_current_user(&self, user: User) {
        let mut state = self.state.write().unwrap();
        state.user = Some(user);
    }

    fn store_tokens(&self, access_token: &str, refresh_token: &str, claims: Claims) {
        {
            let mut state = self.state.write().unwrap();
            state.access_token = Some(access_token.to_string());
            state.refresh_token = Some(refresh_token.to_string());
            state.claims = Some(claims);
        }

        self.storage.set(TOKEN_KEY, access_token);
        self.storage.set(REFRESH_TOKEN_KEY, refresh_token);
    }

    fn clear_errors(&self) {
        let mut state = self.state.write().unwrap();
        state.last_error = None;
        state.field_errors.clear();
    }

    fn record_error(&self, message: &str) {
        let mut state = self.state.write().unwrap();
        state.last_error = Some(message.to_string());
    }
}

/// Releases the renewal flag when the refresh call leaves scope
struct RefreshGuard<'a>(&'a AtomicBool);

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Error payload returned by the register endpoint
#[derive(Debug, Default, Deserialize)]
struct ViolationResponse {
    /// General error message
    message: Option<String>,

    /// Per-field constraint violations
    #[serde(default)]
    violations: Vec<Violation>,
}

/// A single constraint violation
#[derive(Debug, Deserialize)]
struct Violation {
    /// Path of the offending field
    #[serde(rename = "propertyPath")]
    property_path: String,

    /// Human-readable message
    message: String,
}
