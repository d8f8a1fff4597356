//! User resources and favorite management

use serde::Serialize;
use std::sync::Arc;

use crate::api::{ApiClient, Collection};
use crate::auth::{Auth, User};
use crate::error::Error;

/// Partial update payload for a user
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserPatch {
    /// New email address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Replacement list of favorite movie IRIs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movies: Option<Vec<String>>,
}

/// Client for the user endpoints
pub struct UsersClient {
    api: Arc<ApiClient>,
    auth: Arc<Auth>,
}

impl UsersClient {
    /// Create a new users client
    pub(crate) fn new(api: Arc<ApiClient>, auth: Arc<Auth>) -> Self {
        Self { api, auth }
    }

    /// List all users
    pub async fn list(&self) -> Result<Vec<User>, Error> {
        let collection: Collection<User> = self.api.get("/users").execute().await?;
        Ok(collection.into_items())
    }

    /// Fetch a single user
    pub async fn get(&self, id: i64) -> Result<User, Error> {
        let user: User = self.api.get(&format!("/users/{}", id)).execute().await?;
        self.sync_session_user(&user);
        Ok(user)
    }

    /// Update a user.
    ///
    /// Sent as a merge patch, so fields absent from the payload keep their
    /// current value.
    pub async fn update(&self, id: i64, patch: &UserPatch) -> Result<User, Error> {
        let user: User = self
            .api
            .patch(&format!("/users/{}", id))
            .json(patch)?
            .execute()
            .await?;
        self.sync_session_user(&user);
        Ok(user)
    }

    /// Delete a user
    pub async fn delete(&self, id: i64) -> Result<(), Error> {
        self.api
            .delete(&format!("/users/{}", id))
            .execute_empty()
            .await
    }

    /// Whether a movie is among the current user's favorites
    pub fn is_favorite(&self, movie_id: i64) -> bool {
        let iri = movie_iri(movie_id);

        match self.auth.current_user() {
            Some(user) => user.movies.iter().any(|movie| movie == &iri),
            None => false,
        }
    }

    /// Toggle a movie in the current user's favorites.
    ///
    /// Returns the favorites as confirmed by the server. Fails when no user
    /// profile is loaded.
    pub async fn toggle_favorite(&self, movie_id: i64) -> Result<Vec<String>, Error> {
        let user = match self.auth.current_user() {
            Some(user) => user,
            None => return Err(Error::auth("Utilisateur non connecté")),
        };

        let iri = movie_iri(movie_id);
        let mut movies = user.movies.clone();
        match movies.iter().position(|movie| movie == &iri) {
            Some(index) => {
                movies.remove(index);
            }
            None => movies.push(iri),
        }

        let patch = UserPatch {
            email: None,
            movies: Some(movies),
        };
        let updated = self.update(user.id, &patch).await?;

        Ok(updated.movies)
    }

    /// Keep the session's user in step when it is the one we touched
    fn sync_session_user(&self, user: &User) {
        let current = match self.auth.current_user() {
            Some(current) => current,
            None => return,
        };

        if current.id == user.id {
            self.auth.set_current_user(user.clone());
        }
    }
}

/// Get the IRI of a movie resource
fn movie_iri(movie_id: i64) -> String {
    format!("/api/movies/{}", movie_id)
}
