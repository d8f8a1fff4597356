//! Movie and series catalog resources

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::{ApiClient, Collection};
use crate::error::Error;
use crate::genres::Genre;

/// Whether a catalog entry is a movie or a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaType {
    /// A feature film
    #[serde(rename = "movie")]
    Movie,

    /// A series
    #[serde(rename = "series")]
    Series,
}

impl MediaType {
    /// Get the wire value for this media type
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Series => "series",
        }
    }
}

/// A movie or series in the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    /// The entry ID
    pub id: i64,

    /// The title
    pub title: String,

    /// The synopsis
    #[serde(default)]
    pub description: Option<String>,

    /// The running time in minutes
    pub duration: i64,

    /// The release date
    #[serde(rename = "releaseDate", default)]
    pub release_date: Option<DateTime<Utc>>,

    /// The poster image URL
    #[serde(rename = "posterUrl", default)]
    pub poster_url: Option<String>,

    /// The trailer URL
    #[serde(default)]
    pub trailer: Option<String>,

    /// Whether this entry is a movie or a series
    #[serde(rename = "type")]
    pub media_type: MediaType,

    /// The genres attached to this entry
    #[serde(default)]
    pub genres: Vec<Genre>,
}

/// Payload for creating or updating a catalog entry
#[derive(Debug, Clone, Serialize)]
pub struct MovieInput {
    /// The title
    pub title: String,

    /// The running time in minutes
    pub duration: i64,

    /// Whether this entry is a movie or a series
    #[serde(rename = "type")]
    pub media_type: MediaType,

    /// The synopsis
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// The release date
    #[serde(rename = "releaseDate", skip_serializing_if = "Option::is_none")]
    pub release_date: Option<DateTime<Utc>>,

    /// The poster image URL
    #[serde(rename = "posterUrl", skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,

    /// The trailer URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trailer: Option<String>,

    /// IRIs of the genres to attach
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
}

impl MovieInput {
    /// Create a payload with the required fields
    pub fn new(title: &str, duration: i64, media_type: MediaType) -> Self {
        Self {
            title: title.to_string(),
            duration,
            media_type,
            description: None,
            release_date: None,
            poster_url: None,
            trailer: None,
            genres: Vec::new(),
        }
    }

    /// Set the synopsis
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Set the release date
    pub fn with_release_date(mut self, release_date: DateTime<Utc>) -> Self {
        self.release_date = Some(release_date);
        self
    }

    /// Set the poster image URL
    pub fn with_poster_url(mut self, poster_url: &str) -> Self {
        self.poster_url = Some(poster_url.to_string());
        self
    }

    /// Set the trailer URL
    pub fn with_trailer(mut self, trailer: &str) -> Self {
        self.trailer = Some(trailer.to_string());
        self
    }

    /// Attach a genre by IRI
    pub fn with_genre(mut self, genre_iri: &str) -> Self {
        self.genres.push(genre_iri.to_string());
        self
    }
}

/// Criteria for narrowing a catalog listing.
///
/// Title and media type are also sent to the server as query parameters;
/// genre narrowing happens client side.
#[derive(Debug, Clone, Default)]
pub struct MovieFilter {
    /// Keep entries whose title contains this text, case-insensitively
    pub title: Option<String>,

    /// Keep entries of this media type
    pub media_type: Option<MediaType>,

    /// Keep entries carrying all of these genre names
    pub genres: Vec<String>,
}

impl MovieFilter {
    /// Create an empty filter that matches everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep entries whose title contains the given text
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    /// Keep entries of the given media type
    pub fn with_media_type(mut self, media_type: MediaType) -> Self {
        self.media_type = Some(media_type);
        self
    }

    /// Keep entries carrying the given genre
    pub fn with_genre(mut self, genre: &str) -> Self {
        self.genres.push(genre.to_string());
        self
    }

    /// Get the query parameters understood by the server
    pub fn to_query(&self) -> HashMap<String, String> {
        let mut params = HashMap::new();

        if let Some(ref title) = self.title {
            params.insert("title".to_string(), title.clone());
        }

        if let Some(media_type) = self.media_type {
            params.insert("type".to_string(), media_type.as_str().to_string());
        }

        params
    }

    /// Whether an entry satisfies every criterion of this filter
    pub fn matches(&self, movie: &Movie) -> bool {
        if let Some(ref title) = self.title {
            if !movie.title.to_lowercase().contains(&title.to_lowercase()) {
                return false;
            }
        }

        if let Some(media_type) = self.media_type {
            if movie.media_type != media_type {
                return false;
            }
        }

        self.genres
            .iter()
            .all(|wanted| movie.genres.iter().any(|genre| genre.name == *wanted))
    }
}

/// Client for the movie catalog endpoints
pub struct MoviesClient {
    api: Arc<ApiClient>,
}

impl MoviesClient {
    /// Create a new movies client
    pub(crate) fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// List catalog entries, optionally narrowed by a filter
    pub async fn list(&self, filter: Option<&MovieFilter>) -> Result<Vec<Movie>, Error> {
        let mut request = self.api.get("/movies");

        if let Some(filter) = filter {
            request = request.query(filter.to_query());
        }

        let collection: Collection<Movie> = request.execute().await?;
        let mut movies = collection.into_items();

        if let Some(filter) = filter {
            movies.retain(|movie| filter.matches(movie));
        }

        Ok(movies)
    }

    /// Fetch a single entry
    pub async fn get(&self, id: i64) -> Result<Movie, Error> {
        self.api.get(&format!("/movies/{}", id)).execute().await
    }

    /// Create an entry
    pub async fn create(&self, input: &MovieInput) -> Result<Movie, Error> {
        self.api.post("/movies").json(input)?.execute().await
    }

    /// Update an entry.
    ///
    /// Sent as a merge patch, so fields absent from the payload keep their
    /// current value.
    pub async fn update(&self, id: i64, input: &MovieInput) -> Result<Movie, Error> {
        self.api
            .patch(&format!("/movies/{}", id))
            .json(input)?
            .execute()
            .await
    }

    /// Delete an entry
    pub async fn delete(&self, id: i64) -> Result<(), Error> {
        self.api
            .delete(&format!("/movies/{}", id))
            .execute_empty()
            .await
    }
}
