//! Embedding-backed vector store for semantic retrieval over a music
//! library.
//!
//! Answers "songs similar in meaning to this query" questions:
//! - Canonical [`Document`] shape plus converters from domain records
//!   (track/artist/playlist) to embeddable text + metadata
//! - An async [`embeddings::EmbeddingProvider`] trait with Ollama and
//!   mock implementations
//! - A concurrency-guarded [`VectorStore`] with on-demand embedding
//!   generation, brute-force cosine-similarity search, and full-snapshot
//!   persistence. Brute force is an intentional simplicity trade-off for
//!   personal datasets (thousands of items, not millions).

pub mod documents;
pub mod embeddings;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use documents::{ArtistData, PlaylistData, TrackData};
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use store::{cosine_similarity, VectorStore};
pub use types::{Document, SearchResult};
