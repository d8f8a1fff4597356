//! Genre resources

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::api::{ApiClient, Collection};
use crate::error::Error;

/// A genre in the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genre {
    /// The genre ID
    pub id: i64,

    /// The genre name
    pub name: String,
}

/// Client for the genre endpoints
pub struct GenresClient {
    api: Arc<ApiClient>,
}

impl GenresClient {
    /// Create a new genres client
    pub(crate) fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// List all genres
    pub async fn list(&self) -> Result<Vec<Genre>, Error> {
        let collection: Collection<Genre> = self.api.get("/genres").execute().await?;
        Ok(collection.into_items())
    }

    /// Fetch a single genre
    pub async fn get(&self, id: i64) -> Result<Genre, Error> {
        self.api.get(&format!("/genres/{}", id)).execute().await
    }

    /// Create a genre
    pub async fn create(&self, name: &str) -> Result<Genre, Error> {
        self.api
            .post("/genres")
            .json(&json!({ "name": name }))?
            .execute()
            .await
    }

    /// Rename a genre
    pub async fn update(&self, id: i64, name: &str) -> Result<Genre, Error> {
        self.api
            .patch(&format!("/genres/{}", id))
            .json(&json!({ "name": name }))?
            .execute()
            .await
    }

    /// Delete a genre
    pub async fn delete(&self, id: i64) -> Result<(), Error> {
        self.api
            .delete(&format!("/genres/{}", id))
            .execute_empty()
            .await
    }
}
