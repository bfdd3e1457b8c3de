//! moodtune-music — Recommendation bridge.
//!
//! Maps a dominant expression to music genres, queries a streaming
//! service's track-search endpoint with a bearer credential, and lays the
//! results out as a fixed-width wrapping grid.

pub mod client;
pub mod genres;
pub mod grid;

pub use client::{SearchClient, SearchError, Track, DEFAULT_SEARCH_ENDPOINT};
