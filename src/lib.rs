//! Cinetheque Rust Client Library
//!
//! A Rust client library for the Cinetheque movie and series catalog API,
//! covering authentication with automatic token renewal, catalog browsing
//! and editing, and favorite management.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod genres;
pub mod movies;
pub mod users;

use reqwest::Client;
use std::sync::Arc;

use crate::api::ApiClient;
use crate::auth::{Auth, MemoryTokenStorage, TokenStorage};
use crate::config::ClientOptions;
use crate::genres::GenresClient;
use crate::movies::MoviesClient;
use crate::users::UsersClient;

/// The main entry point for the Cinetheque client
pub struct Cinetheque {
    /// The base URL of the Cinetheque API
    pub url: String,
    /// HTTP client used for requests
    pub http_client: Client,
    /// Session store handling login, renewal and persistence
    pub auth: Arc<Auth>,
    /// Request pipeline attaching tokens and renewing them on 401
    pub api: Arc<ApiClient>,
    /// Client options
    pub options: ClientOptions,
}

impl Cinetheque {
    /// Create a new Cinetheque client
    ///
    /// # Arguments
    ///
    /// * `api_url` - The base URL of the Cinetheque API, with or without a
    ///   trailing slash
    ///
    /// # Example
    ///
    /// ```
    /// use cinetheque_client::Cinetheque;
    ///
    /// let client = Cinetheque::new("http://localhost:8000");
    /// ```
    pub fn new(api_url: &str) -> Self {
        Self::new_with_options(api_url, ClientOptions::default())
    }

    /// Create a new Cinetheque client with custom options
    ///
    /// # Arguments
    ///
    /// * `api_url` - The base URL of the Cinetheque API
    /// * `options` - Custom client options
    ///
    /// # Example
    ///
    /// ```
    /// use cinetheque_client::{Cinetheque, config::ClientOptions};
    ///
    /// let options = ClientOptions::default().with_auto_refresh_token(false);
    /// let client = Cinetheque::new_with_options("http://localhost:8000", options);
    /// ```
    pub fn new_with_options(api_url: &str, options: ClientOptions) -> Self {
        let url = api_url.trim_end_matches('/').to_string();

        let mut builder = Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build().expect("failed to build HTTP client");

        let storage: Arc<dyn TokenStorage> = match options.token_storage {
            Some(ref storage) => Arc::clone(storage),
            None => Arc::new(MemoryTokenStorage::new()),
        };

        let auth = Arc::new(Auth::new(&url, http_client.clone(), storage));
        Arc::clone(&auth).hydrate();

        let api = Arc::new(ApiClient::new(
            &url,
            http_client.clone(),
            Arc::clone(&auth),
            options.clone(),
        ));

        Self {
            url,
            http_client,
            auth,
            api,
            options,
        }
    }

    /// Get a reference to the session store for login, logout and renewal
    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    /// Get a reference to the authenticated request pipeline
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Get a client for the movie catalog endpoints
    ///
    /// # Example
    ///
    /// ```
    /// use cinetheque_client::Cinetheque;
    ///
    /// let client = Cinetheque::new("http://localhost:8000");
    /// let movies = client.movies();
    /// ```
    pub fn movies(&self) -> MoviesClient {
        MoviesClient::new(Arc::clone(&self.api))
    }

    /// Get a client for the genre endpoints
    ///
    /// # Example
    ///
    /// ```
    /// use cinetheque_client::Cinetheque;
    ///
    /// let client = Cinetheque::new("http://localhost:8000");
    /// let genres = client.genres();
    /// ```
    pub fn genres(&self) -> GenresClient {
        GenresClient::new(Arc::clone(&self.api))
    }

    /// Get a client for the user endpoints and favorite management
    ///
    /// # Example
    ///
    /// ```
    /// use cinetheque_client::Cinetheque;
    ///
    /// let client = Cinetheque::new("http://localhost:8000");
    /// let users = client.users();
    /// ```
    pub fn users(&self) -> UsersClient {
        UsersClient::new(Arc::clone(&self.api), Arc::clone(&self.auth))
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::config::ClientOptions;
    pub use crate::error::Error;
    pub use crate::Cinetheque;
}
