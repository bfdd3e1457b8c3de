//! Streaming-service track search over HTTP.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default search endpoint.
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://api.spotify.com/v1/search";

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("search endpoint returned status {0}")]
    Status(u16),
}

/// A track returned by the search endpoint.
///
/// Read-only, rendered transiently, never cached across queries.
#[derive(Debug, Clone, Serialize)]
pub struct Track {
    pub name: String,
    /// First (largest) album image, when the album carries any.
    pub album_image_url: Option<String>,
    /// Open-in-app link.
    pub external_url: String,
}

// Wire shape of the search response (the subset we read).

#[derive(Deserialize)]
struct ApiResponse {
    tracks: ApiTracks,
}

#[derive(Deserialize)]
struct ApiTracks {
    #[serde(default)]
    items: Vec<ApiTrack>,
}

#[derive(Deserialize)]
struct ApiTrack {
    name: String,
    album: ApiAlbum,
    external_urls: ApiExternalUrls,
}

#[derive(Deserialize)]
struct ApiAlbum {
    #[serde(default)]
    images: Vec<ApiImage>,
}

#[derive(Deserialize)]
struct ApiImage {
    url: String,
}

#[derive(Deserialize)]
struct ApiExternalUrls {
    spotify: String,
}

impl From<ApiTrack> for Track {
    fn from(track: ApiTrack) -> Self {
        Track {
            name: track.name,
            album_image_url: track.album.images.into_iter().next().map(|i| i.url),
            external_url: track.external_urls.spotify,
        }
    }
}

/// Bearer-authenticated search client with a fixed result limit.
pub struct SearchClient {
    http: reqwest::Client,
    endpoint: String,
    token: String,
    limit: u32,
}

impl SearchClient {
    pub fn new(endpoint: String, token: String, limit: u32) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            token,
            limit,
        }
    }

    /// Issue exactly one search request for `query`.
    ///
    /// A failure is terminal for this attempt: the caller logs it and
    /// renders nothing. No retry.
    pub async fn search(&self, query: &str) -> Result<Vec<Track>, SearchError> {
        let limit = self.limit.to_string();
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("q", query), ("type", "track"), ("limit", limit.as_str())])
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }

        let body: ApiResponse = response.json().await?;
        tracing::debug!(query, results = body.tracks.items.len(), "search returned");

        Ok(body.tracks.items.into_iter().map(Track::from).collect())
    }
}
