//! High-level canned queries over an exported music library.
//!
//! Wraps the generic [`Engine`] with the questions the assistant asks most
//! often, pinned to the standard export file names.

use crate::engine::{Engine, Query, QueryResult};
use serde_json::{json, Value};

/// Standard export file names.
const SAVED_TRACKS: &str = "saved_tracks.json";
const PLAYLISTS: &str = "playlists.json";
const FOLLOWED_ARTISTS: &str = "followed_artists.json";

/// High-level music-specific queries over a query engine.
pub struct LibraryQueries {
    engine: Engine,
}

impl LibraryQueries {
    /// Create a helper over a fresh engine rooted at the given directory.
    pub fn new(data_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            engine: Engine::new(data_dir),
        }
    }

    /// Access the underlying engine for ad-hoc queries.
    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// All unique artist names across saved tracks.
    pub fn all_artists(&mut self) -> QueryResult {
        self.engine.execute(&Query {
            source: SAVED_TRACKS.to_string(),
            operation: "distinct".to_string(),
            field: Some("track.artists.name".to_string()),
            ..Default::default()
        })
    }

    /// Saved tracks by a specific artist (name match, case-insensitive).
    pub fn tracks_by_artist(&mut self, artist_name: &str) -> QueryResult {
        self.engine.execute(&Query {
            source: SAVED_TRACKS.to_string(),
            operation: "search".to_string(),
            field: Some("track.artists.name".to_string()),
            search_term: Some(artist_name.to_string()),
            ..Default::default()
        })
    }

    /// Playlists whose name matches.
    pub fn playlist_by_name(&mut self, name: &str) -> QueryResult {
        self.engine.execute(&Query {
            source: PLAYLISTS.to_string(),
            operation: "search".to_string(),
            field: Some("name".to_string()),
            search_term: Some(name.to_string()),
            ..Default::default()
        })
    }

    /// The most recently added saved tracks.
    pub fn recently_added(&mut self, limit: i64) -> QueryResult {
        self.engine.execute(&Query {
            source: SAVED_TRACKS.to_string(),
            operation: "sort".to_string(),
            sort_by: Some("added_at".to_string()),
            sort_order: Some("desc".to_string()),
            limit,
            ..Default::default()
        })
    }

    /// Counts across all library exports with a combined summary.
    pub fn library_stats(&mut self) -> QueryResult {
        let tracks = self.count_source(SAVED_TRACKS);
        let playlists = self.count_source(PLAYLISTS);
        let artists = self.count_source(FOLLOWED_ARTISTS);

        QueryResult {
            data: Some(json!({
                "saved_tracks": tracks,
                "playlists": playlists,
                "followed_artists": artists,
            })),
            summary: Some(format!(
                "Library: {} tracks, {} playlists, {} followed artists",
                tracks, playlists, artists
            )),
            ..Default::default()
        }
    }

    /// Case-insensitive search across every library export; each hit is
    /// tagged with the source it came from.
    pub fn search_all(&mut self, term: &str, limit: i64) -> QueryResult {
        let mut all_results: Vec<Value> = Vec::new();

        for source in [SAVED_TRACKS, PLAYLISTS, FOLLOWED_ARTISTS] {
            let result = self.engine.execute(&Query {
                source: source.to_string(),
                operation: "search".to_string(),
                search_term: Some(term.to_string()),
                limit,
                ..Default::default()
            });

            if let Some(Value::Array(items)) = result.data {
                for item in items {
                    all_results.push(json!({"source": source, "item": item}));
                }
            }
        }

        if limit > 0 && (limit as usize) < all_results.len() {
            all_results.truncate(limit as usize);
        }

        QueryResult {
            count: all_results.len(),
            summary: Some(format!(
                "Found {} results for '{}' across all data",
                all_results.len(),
                term
            )),
            data: Some(Value::Array(all_results)),
            ..Default::default()
        }
    }

    fn count_source(&mut self, source: &str) -> usize {
        self.engine
            .execute(&Query {
                source: source.to_string(),
                operation: "count".to_string(),
                ..Default::default()
            })
            .count
    }
}
