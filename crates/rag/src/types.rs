//! Vector store type definitions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A searchable item in the vector store.
///
/// IDs are unique within a store; inserting an existing ID overwrites in
/// place. The content blob is used both for embedding generation and for
/// generic keyword search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique string key
    pub id: String,

    /// Category tag: track, artist, album, playlist
    #[serde(rename = "type")]
    pub doc_type: String,

    /// Text blob used for embedding and keyword search
    pub content: String,

    /// String-to-string metadata
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// Fixed-length embedding vector, absent until generated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f64>>,
}

/// A search hit with its similarity score, nominally in [-1, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub document: Document,
    pub similarity: f64,
}
