//! Authenticated request pipeline for the Cinetheque API

use log::debug;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use url::Url;

use crate::auth::Auth;
use crate::config::ClientOptions;
use crate::error::Error;

/// Content type of API Platform documents
pub const LD_JSON: &str = "application/ld+json";

/// Content type the API requires for partial updates
pub const MERGE_PATCH_JSON: &str = "application/merge-patch+json";

/// A collection response from the API.
///
/// Depending on the requested format the server returns either a JSON-LD
/// document with the items under `member` or a plain JSON array. Both parse
/// into the same type.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Collection<T> {
    /// JSON-LD document carrying the items under `member`
    Document {
        /// The items of the collection
        member: Vec<T>,
    },

    /// Plain JSON array of items
    Items(Vec<T>),
}

impl<T> Collection<T> {
    /// Unwrap the items regardless of the response shape
    pub fn into_items(self) -> Vec<T> {
        match self {
            Collection::Document { member } => member,
            Collection::Items(items) => items,
        }
    }
}

/// HTTP client for the Cinetheque API.
///
/// Every request sent through this client carries the current access token.
/// When a response comes back 401 and renewal is enabled, the client renews
/// the token through [`Auth`] and replays the request once. Concurrent 401s
/// share a single renewal: the first request drives it, the others park on
/// the gate and are released with the outcome.
pub struct ApiClient {
    /// The base URL of the Cinetheque API
    url: String,

    /// HTTP client used for requests
    client: Client,

    /// Session store consulted for tokens and renewal
    auth: Arc<Auth>,

    /// Client behaviour options
    options: ClientOptions,

    /// Gate serializing token renewal across concurrent requests
    gate: Mutex<RefreshGate>,
}

impl ApiClient {
    /// Create a new API client
    pub(crate) fn new(url: &str, client: Client, auth: Arc<Auth>, options: ClientOptions) -> Self {
        Self {
            url: url.to_string(),
            client,
            auth,
            options,
            gate: Mutex::new(RefreshGate {
                refreshing: false,
                waiters: Vec::new(),
            }),
        }
    }

    /// Get the full URL for an API path
    fn get_url(&self, path: &str) -> String {
        format!("{}/api{}", self.url, path)
    }

    /// Create a request with an arbitrary method
    pub fn request(&self, method: Method, path: &str) -> ApiRequest {
        ApiRequest::new(self, method, path)
    }

    /// Create a GET request
    pub fn get(&self, path: &str) -> ApiRequest {
        self.request(Method::GET, path)
    }

    /// Create a POST request
    pub fn post(&self, path: &str) -> ApiRequest {
        self.request(Method::POST, path)
    }

    /// Create a PUT request
    pub fn put(&self, path: &str) -> ApiRequest {
        self.request(Method::PUT, path)
    }

    /// Create a PATCH request
    pub fn patch(&self, path: &str) -> ApiRequest {
        self.request(Method::PATCH, path)
    }

    /// Create a DELETE request
    pub fn delete(&self, path: &str) -> ApiRequest {
        self.request(Method::DELETE, path)
    }

    /// Renew the token for a request that came back 401, or park the
    /// request behind a renewal that is already running.
    async fn handle_unauthorized(
        &self,
        request: ApiRequest<'_>,
        original: reqwest::Response,
    ) -> Result<reqwest::Response, Error> {
        let waiter = {
            let mut gate = self.gate.lock().unwrap();
            if gate.refreshing {
                let (sender, receiver) = oneshot::channel();
                gate.waiters.push(sender);
                Some(receiver)
            } else {
                gate.refreshing = true;
                None
            }
        };

        match waiter {
            Some(receiver) => {
                debug!("Renewal in flight, queueing request to {}", request.path);
                match receiver.await {
                    Ok(Ok(token)) => request.dispatch(Some(&token)).await,
                    Ok(Err(err)) => Err(err),
                    Err(_) => Err(Error::renewal("renewal window closed unexpectedly")),
                }
            }
            None => {
                // Settles the gate on every exit path, including panics
                let window = RenewalWindow::new(self);

                debug!("Got a 401, renewing the access token");
                let token = if self.auth.refresh().await {
                    self.auth.access_token()
                } else {
                    None
                };

                match token {
                    Some(token) => {
                        window.resolve(&token);
                        request.dispatch(Some(&token)).await
                    }
                    // Without a usable token the queue is rejected and the
                    // caller keeps its original 401
                    None => {
                        window.reject();
                        self.auth.logout();
                        Ok(original)
                    }
                }
            }
        }
    }
}

/// A request to the Cinetheque API.
///
/// Built through [`ApiClient::get`] and friends. The access token header is
/// attached at send time, so a replay after renewal picks up the new token.
pub struct ApiRequest<'a> {
    api: &'a ApiClient,
    method: Method,
    path: String,
    query_params: Option<HashMap<String, String>>,
    body: Option<Vec<u8>>,
    content_type: String,
    skip_auth_refresh: bool,
}

impl<'a> ApiRequest<'a> {
    fn new(api: &'a ApiClient, method: Method, path: &str) -> Self {
        let content_type = if method == Method::PATCH {
            MERGE_PATCH_JSON
        } else {
            LD_JSON
        };

        Self {
            api,
            method,
            path: path.to_string(),
            query_params: None,
            body: None,
            content_type: content_type.to_string(),
            skip_auth_refresh: false,
        }
    }

    /// Add a JSON body to the request
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, Error> {
        let json = serde_json::to_vec(body)?;
        self.body = Some(json);
        Ok(self)
    }

    /// Add query parameters to the request
    pub fn query(mut self, params: HashMap<String, String>) -> Self {
        self.query_params = Some(params);
        self
    }

    /// Override the Content-Type header
    pub fn content_type(mut self, content_type: &str) -> Self {
        self.content_type = content_type.to_string();
        self
    }

    /// Opt this request out of token renewal; a 401 is returned as-is
    pub fn skip_auth_refresh(mut self) -> Self {
        self.skip_auth_refresh = true;
        self
    }

    /// Send the request, renewing the access token once on a 401
    pub async fn send(self) -> Result<reqwest::Response, Error> {
        let token = self.api.auth.access_token();
        let response = self.dispatch(token.as_deref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        if self.skip_auth_refresh || !self.api.options.auto_refresh_token {
            return Ok(response);
        }

        let api = self.api;
        api.handle_unauthorized(self, response).await
    }

    /// Send the request and parse the response as JSON
    pub async fn execute<T: DeserializeOwned>(self) -> Result<T, Error> {
        let response = self.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(api_error(status, response).await);
        }

        let result = response.json::<T>().await?;
        Ok(result)
    }

    /// Send the request, expecting no response body
    pub async fn execute_empty(self) -> Result<(), Error> {
        let response = self.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(api_error(status, response).await);
        }

        Ok(())
    }

    /// Build and send one attempt, without any 401 handling
    async fn dispatch(&self, token: Option<&str>) -> Result<reqwest::Response, Error> {
        let mut url = Url::parse(&self.api.get_url(&self.path))?;

        if let Some(params) = &self.query_params {
            let mut query_pairs = url.query_pairs_mut();
            for (key, value) in params {
                query_pairs.append_pair(key, value);
            }
        }

        let mut request = self
            .api
            .client
            .request(self.method.clone(), url.as_str())
            .header("Content-Type", self.content_type.as_str());

        if let Some(token) = token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        if let Some(body) = &self.body {
            request = request.body(body.clone());
        }

        Ok(request.send().await?)
    }
}

/// Shared state of the renewal gate
struct RefreshGate {
    /// Whether a renewal is currently in flight
    refreshing: bool,

    /// Requests parked until the renewal settles
    waiters: Vec<oneshot::Sender<Result<String, Error>>>,
}

/// Settles the renewal gate exactly once.
///
/// Resolving hands the new token to every parked request, rejecting fails
/// them all. Dropping the window without settling counts as a rejection, so
/// a cancelled renewal can never strand the queue.
struct RenewalWindow<'a> {
    gate: &'a Mutex<RefreshGate>,
    settled: bool,
}

impl<'a> RenewalWindow<'a> {
    fn new(api: &'a ApiClient) -> Self {
        Self {
            gate: &api.gate,
            settled: false,
        }
    }

    fn resolve(mut self, token: &str) {
        self.close(Some(token));
    }

    fn reject(mut self) {
        self.close(None);
    }

    fn close(&mut self, token: Option<&str>) {
        self.settled = true;

        let waiters = {
            let mut gate = self.gate.lock().unwrap();
            gate.refreshing = false;
            std::mem::take(&mut gate.waiters)
        };

        if waiters.is_empty() {
            return;
        }

        debug!("Renewal settled, releasing {} queued request(s)", waiters.len());
        for waiter in waiters {
            let outcome = match token {
                Some(token) => Ok(token.to_string()),
                None => Err(Error::renewal("token renewal failed")),
            };
            // A parked request that was cancelled is gone, nothing to send
            let _ = waiter.send(outcome);
        }
    }
}

impl Drop for RenewalWindow<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.close(None);
        }
    }
}

/// Build an API error from a failed response, keeping the server message
/// when the body carries one
async fn api_error(status: StatusCode, response: reqwest::Response) -> Error {
    let message = response.json::<Value>().await.ok().and_then(|body| {
        body.get("message")
            .or_else(|| body.get("detail"))
            .or_else(|| body.get("hydra:description"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });

    Error::Api {
        status,
        message: message.unwrap_or_else(|| format!("request failed with status {}", status)),
    }
}
