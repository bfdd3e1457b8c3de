//! Fixed-width wrapping grid for search results.

use crate::client::Track;

/// Items per grid row.
pub const TRACKS_PER_ROW: usize = 4;

/// Chunk tracks into display rows of [`TRACKS_PER_ROW`]; the last row may
/// be ragged.
pub fn layout(tracks: &[Track]) -> Vec<&[Track]> {
    tracks.chunks(TRACKS_PER_ROW).collect()
}
