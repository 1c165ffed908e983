//! Converters from domain records to embeddable documents.
//!
//! Each converter builds a rich text content blob for embedding plus a
//! flat metadata map for display and filtering.

use crate::types::Document;
use std::collections::HashMap;

/// Track information for indexing.
#[derive(Debug, Clone, Default)]
pub struct TrackData {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
    pub album: String,
    pub genres: Vec<String>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

/// Artist information for indexing.
#[derive(Debug, Clone, Default)]
pub struct ArtistData {
    pub id: String,
    pub name: String,
    pub genres: Vec<String>,
}

/// Playlist information for indexing.
#[derive(Debug, Clone, Default)]
pub struct PlaylistData {
    pub id: String,
    pub name: String,
    pub description: String,
    pub owner: String,
    pub track_count: u64,
    pub track_names: Vec<String>,
}

impl From<TrackData> for Document {
    fn from(track: TrackData) -> Self {
        let artists = track.artists.join(", ");
        let genres = track.genres.join(", ");

        let mut content = format!("{} by {}", track.name, artists);
        if !track.album.is_empty() {
            content.push_str(&format!(" from album {}", track.album));
        }
        if !genres.is_empty() {
            content.push_str(&format!(". Genres: {}", genres));
        }

        Document {
            id: format!("track:{}", track.id),
            doc_type: "track".to_string(),
            content,
            metadata: HashMap::from([
                ("id".to_string(), track.id),
                ("name".to_string(), track.name),
                ("artists".to_string(), artists),
                ("album".to_string(), track.album),
                ("genres".to_string(), genres),
            ]),
            embedding: None,
        }
    }
}

impl From<ArtistData> for Document {
    fn from(artist: ArtistData) -> Self {
        let genres = artist.genres.join(", ");

        let mut content = artist.name.clone();
        if !genres.is_empty() {
            content.push_str(&format!(". Genres: {}", genres));
        }

        Document {
            id: format!("artist:{}", artist.id),
            doc_type: "artist".to_string(),
            content,
            metadata: HashMap::from([
                ("id".to_string(), artist.id),
                ("name".to_string(), artist.name),
                ("genres".to_string(), genres),
            ]),
            embedding: None,
        }
    }
}

impl From<PlaylistData> for Document {
    fn from(playlist: PlaylistData) -> Self {
        let mut content = format!("Playlist: {}", playlist.name);
        if !playlist.description.is_empty() {
            content.push_str(&format!(". {}", playlist.description));
        }
        if !playlist.track_names.is_empty() {
            // Include the first few track names for context
            let sample: Vec<&str> = playlist
                .track_names
                .iter()
                .take(10)
                .map(String::as_str)
                .collect();
            content.push_str(&format!(". Contains tracks like: {}", sample.join(", ")));
        }

        Document {
            id: format!("playlist:{}", playlist.id),
            doc_type: "playlist".to_string(),
            content,
            metadata: HashMap::from([
                ("id".to_string(), playlist.id),
                ("name".to_string(), playlist.name),
                ("description".to_string(), playlist.description),
                ("owner".to_string(), playlist.owner),
                ("track_count".to_string(), playlist.track_count.to_string()),
            ]),
            embedding: None,
        }
    }
}
