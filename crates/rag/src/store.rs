//! In-memory vector store with snapshot persistence.
//!
//! A single coarse reader/writer lock guards the whole document mapping;
//! at personal-library scale (thousands of items) brute-force scans under
//! a read lock beat the complexity of an index. Embedding-provider calls
//! always complete before the write lock is taken, so slow network calls
//! never block concurrent readers.

use crate::embeddings::EmbeddingProvider;
use crate::types::{Document, SearchResult};
use melos_core::{AppError, AppResult};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Concurrency-guarded collection of documents with on-demand embedding
/// generation and cosine-similarity search.
pub struct VectorStore {
    documents: RwLock<HashMap<String, Document>>,
    provider: Option<Arc<dyn EmbeddingProvider>>,
    store_path: Option<PathBuf>,
}

impl VectorStore {
    /// Create a new vector store.
    ///
    /// Without a provider, documents must arrive with embeddings already
    /// attached; without a store path, `save`/`load` are unavailable.
    pub fn new(
        provider: Option<Arc<dyn EmbeddingProvider>>,
        store_path: Option<PathBuf>,
    ) -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            provider,
            store_path,
        }
    }

    /// Add a document, generating its embedding if absent.
    ///
    /// Upserts by ID: inserting an existing ID overwrites in place.
    pub async fn add(&self, doc: Document) -> AppResult<()> {
        let doc = self.ensure_embedded(doc).await?;

        let mut documents = self.documents.write().await;
        documents.insert(doc.id.clone(), doc);

        Ok(())
    }

    /// Add multiple documents, all-or-nothing.
    ///
    /// Embeddings are requested sequentially for every document lacking
    /// one; the first failure aborts the batch before anything is
    /// inserted, so the store never holds half-embedded batches.
    pub async fn add_batch(&self, docs: Vec<Document>) -> AppResult<()> {
        let mut prepared = Vec::with_capacity(docs.len());
        for doc in docs {
            prepared.push(self.ensure_embedded(doc).await?);
        }

        let mut documents = self.documents.write().await;
        for doc in prepared {
            documents.insert(doc.id.clone(), doc);
        }

        Ok(())
    }

    /// Embed the document content if no embedding is attached yet.
    /// Runs before any lock is taken.
    async fn ensure_embedded(&self, mut doc: Document) -> AppResult<Document> {
        let missing = doc.embedding.as_ref().map_or(true, |e| e.is_empty());
        if missing {
            if let Some(provider) = &self.provider {
                let embedding = provider.embed(&doc.content).await.map_err(|e| {
                    AppError::Embedding(format!("failed to generate embedding: {}", e))
                })?;
                if embedding.is_empty() {
                    return Err(AppError::Embedding(format!(
                        "generated empty embedding for document {}",
                        doc.id
                    )));
                }
                doc.embedding = Some(embedding);
            }
        }
        Ok(doc)
    }

    /// Semantic search: embed the query, scan every stored document, and
    /// return the most similar ones, best first.
    ///
    /// `doc_type` of "" or "all" disables type filtering; `limit <= 0`
    /// returns every match. Documents without embeddings are skipped.
    pub async fn search(
        &self,
        query: &str,
        limit: i64,
        doc_type: &str,
    ) -> AppResult<Vec<SearchResult>> {
        let provider = self.provider.as_ref().ok_or_else(|| {
            AppError::Store("no embedding provider configured for search".to_string())
        })?;

        let query_embedding = provider
            .embed(query)
            .await
            .map_err(|e| AppError::Embedding(format!("failed to generate query embedding: {}", e)))?;

        let documents = self.documents.read().await;

        let mut results: Vec<SearchResult> = documents
            .values()
            .filter(|doc| doc_type.is_empty() || doc_type == "all" || doc.doc_type == doc_type)
            .filter_map(|doc| {
                let embedding = doc.embedding.as_ref().filter(|e| !e.is_empty())?;
                Some(SearchResult {
                    document: doc.clone(),
                    similarity: cosine_similarity(&query_embedding, embedding),
                })
            })
            .collect();

        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        if limit > 0 && (limit as usize) < results.len() {
            results.truncate(limit as usize);
        }

        tracing::debug!(
            "search for '{}' returned {} results (type filter: '{}')",
            query,
            results.len(),
            doc_type
        );

        Ok(results)
    }

    /// Number of documents in the store.
    pub async fn count(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Document counts grouped by type.
    pub async fn count_by_type(&self) -> HashMap<String, usize> {
        let documents = self.documents.read().await;

        let mut counts = HashMap::new();
        for doc in documents.values() {
            *counts.entry(doc.doc_type.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Persist the full document mapping to disk as a JSON array.
    ///
    /// Iteration order across distinct saves is not guaranteed stable.
    pub async fn save(&self) -> AppResult<()> {
        let Some(path) = &self.store_path else {
            return Err(AppError::Store("no store path configured".to_string()));
        };

        let documents = self.documents.read().await;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::Store(format!("failed to create directory: {}", e)))?;
        }

        let docs: Vec<&Document> = documents.values().collect();
        let data = serde_json::to_string_pretty(&docs)
            .map_err(|e| AppError::Store(format!("failed to serialize documents: {}", e)))?;

        std::fs::write(path, data)
            .map_err(|e| AppError::Store(format!("failed to write store: {}", e)))?;

        tracing::debug!("saved {} documents to {:?}", docs.len(), path);
        Ok(())
    }

    /// Replace the in-memory mapping wholesale from the snapshot file.
    ///
    /// A missing file is an empty store, not an error; malformed content
    /// is a hard error.
    pub async fn load(&self) -> AppResult<()> {
        let Some(path) = &self.store_path else {
            return Err(AppError::Store("no store path configured".to_string()));
        };

        let mut documents = self.documents.write().await;

        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(AppError::Store(format!("failed to read store: {}", e))),
        };

        let docs: Vec<Document> = serde_json::from_str(&data)
            .map_err(|e| AppError::Store(format!("failed to parse store: {}", e)))?;

        *documents = docs.into_iter().map(|doc| (doc.id.clone(), doc)).collect();

        tracing::debug!("loaded {} documents from {:?}", documents.len(), path);
        Ok(())
    }

    /// Remove all documents.
    pub async fn clear(&self) {
        self.documents.write().await.clear();
    }
}

/// Cosine similarity between two vectors.
///
/// Defined as 0 (not NaN, not an error) for mismatched lengths, empty
/// vectors, or zero norms.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot_product = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        dot_product += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use melos_core::AppError;

    /// Provider returning the same vector for any input.
    #[derive(Debug)]
    struct FixedProvider(Vec<f64>);

    #[async_trait::async_trait]
    impl EmbeddingProvider for FixedProvider {
        fn provider_name(&self) -> &str {
            "fixed"
        }

        fn model_name(&self) -> &str {
            "fixed-v1"
        }

        fn dimensions(&self) -> usize {
            self.0.len()
        }

        async fn embed(&self, _text: &str) -> AppResult<Vec<f64>> {
            Ok(self.0.clone())
        }
    }

    /// Provider failing on any content containing "boom".
    #[derive(Debug)]
    struct FailingProvider;

    #[async_trait::async_trait]
    impl EmbeddingProvider for FailingProvider {
        fn provider_name(&self) -> &str {
            "failing"
        }

        fn model_name(&self) -> &str {
            "failing-v1"
        }

        fn dimensions(&self) -> usize {
            3
        }

        async fn embed(&self, text: &str) -> AppResult<Vec<f64>> {
            if text.contains("boom") {
                Err(AppError::Embedding("provider unavailable".to_string()))
            } else {
                Ok(vec![0.1, 0.2, 0.3])
            }
        }
    }

    fn doc(id: &str, doc_type: &str, content: &str, embedding: Option<Vec<f64>>) -> Document {
        Document {
            id: id.to_string(),
            doc_type: doc_type.to_string(),
            content: content.to_string(),
            metadata: HashMap::new(),
            embedding,
        }
    }

    #[tokio::test]
    async fn test_add_with_embedding() {
        let store = VectorStore::new(None, None);

        store
            .add(doc(
                "test-1",
                "track",
                "Test Track by Test Artist",
                Some(vec![0.1, 0.2, 0.3, 0.4, 0.5]),
            ))
            .await
            .unwrap();

        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn test_add_upserts_by_id() {
        let store = VectorStore::new(None, None);

        store
            .add(doc("t1", "track", "first", Some(vec![0.1])))
            .await
            .unwrap();
        store
            .add(doc("t1", "track", "second", Some(vec![0.2])))
            .await
            .unwrap();

        assert_eq!(store.count().await, 1);
        let results = store.count_by_type().await;
        assert_eq!(results["track"], 1);
    }

    #[tokio::test]
    async fn test_add_without_provider_keeps_unembedded() {
        let store = VectorStore::new(None, None);

        store.add(doc("t1", "track", "no vector", None)).await.unwrap();
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn test_add_generates_embedding() {
        let provider = Arc::new(FixedProvider(vec![0.1, 0.2, 0.3]));
        let store = VectorStore::new(Some(provider), None);

        store
            .add(doc("t1", "track", "Rock Song by Rock Band", None))
            .await
            .unwrap();

        // a query embeds to the identical vector, so similarity is 1.0
        let results = store.search("rock", 5, "").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.id, "t1");
        assert!((results[0].similarity - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_add_batch() {
        let store = VectorStore::new(None, None);

        store
            .add_batch(vec![
                doc("track-1", "track", "Track 1", Some(vec![0.1, 0.2, 0.3])),
                doc("track-2", "track", "Track 2", Some(vec![0.4, 0.5, 0.6])),
                doc("artist-1", "artist", "Artist 1", Some(vec![0.7, 0.8, 0.9])),
            ])
            .await
            .unwrap();

        assert_eq!(store.count().await, 3);
    }

    #[tokio::test]
    async fn test_add_batch_is_all_or_nothing() {
        let store = VectorStore::new(Some(Arc::new(FailingProvider)), None);

        let result = store
            .add_batch(vec![
                doc("ok-1", "track", "fine", None),
                doc("bad", "track", "boom", None),
                doc("ok-2", "track", "also fine", None),
            ])
            .await;

        assert!(result.is_err());
        // nothing from the failed batch was inserted
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn test_count_by_type() {
        let store = VectorStore::new(None, None);

        for d in [
            doc("t1", "track", "Track 1", Some(vec![0.1])),
            doc("t2", "track", "Track 2", Some(vec![0.2])),
            doc("a1", "artist", "Artist 1", Some(vec![0.3])),
            doc("p1", "playlist", "Playlist 1", Some(vec![0.4])),
        ] {
            store.add(d).await.unwrap();
        }

        let counts = store.count_by_type().await;
        assert_eq!(counts["track"], 2);
        assert_eq!(counts["artist"], 1);
        assert_eq!(counts["playlist"], 1);
    }

    #[tokio::test]
    async fn test_search_ranks_by_similarity() {
        let provider = Arc::new(FixedProvider(vec![0.9, 0.1, 0.0]));
        let store = VectorStore::new(Some(provider), None);

        store
            .add_batch(vec![
                doc("rock", "track", "Rock Song", Some(vec![0.9, 0.1, 0.0])),
                doc("jazz", "track", "Jazz Song", Some(vec![0.0, 0.9, 0.1])),
                doc("pop", "track", "Pop Song", Some(vec![0.1, 0.0, 0.9])),
            ])
            .await
            .unwrap();

        let results = store.search("rock music", 0, "all").await.unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].document.id, "rock");
        assert!(results[0].similarity > results[1].similarity);
        assert!(results[1].similarity > results[2].similarity);
    }

    #[tokio::test]
    async fn test_search_type_filter_and_limit() {
        let provider = Arc::new(FixedProvider(vec![1.0, 0.0]));
        let store = VectorStore::new(Some(provider), None);

        store
            .add_batch(vec![
                doc("t1", "track", "a", Some(vec![1.0, 0.0])),
                doc("t2", "track", "b", Some(vec![0.9, 0.1])),
                doc("a1", "artist", "c", Some(vec![1.0, 0.0])),
            ])
            .await
            .unwrap();

        let tracks = store.search("q", 0, "track").await.unwrap();
        assert_eq!(tracks.len(), 2);
        assert!(tracks.iter().all(|r| r.document.doc_type == "track"));

        let limited = store.search("q", 1, "").await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_search_skips_unembedded_documents() {
        let provider = Arc::new(FixedProvider(vec![1.0, 0.0]));
        let store = VectorStore::new(Some(provider), None);

        store
            .add(doc("embedded", "track", "a", Some(vec![1.0, 0.0])))
            .await
            .unwrap();
        {
            // bypass embedding generation to store a bare document
            let mut documents = store.documents.write().await;
            documents.insert(
                "bare".to_string(),
                doc("bare", "track", "no vector", None),
            );
        }

        let results = store.search("q", 0, "").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.id, "embedded");
    }

    #[tokio::test]
    async fn test_search_without_provider_is_an_error() {
        let store = VectorStore::new(None, None);
        assert!(store.search("q", 5, "").await.is_err());
    }

    #[tokio::test]
    async fn test_clear() {
        let store = VectorStore::new(None, None);

        store.add(doc("t1", "track", "a", Some(vec![0.1]))).await.unwrap();
        store.add(doc("t2", "track", "b", Some(vec![0.2]))).await.unwrap();
        assert_eq!(store.count().await, 2);

        store.clear().await;
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.json");

        let store = VectorStore::new(None, Some(path.clone()));
        store
            .add_batch(vec![
                doc("track-1", "track", "Test Track", Some(vec![0.1, 0.2, 0.3])),
                doc("artist-1", "artist", "Test Artist", Some(vec![0.5, 0.4, 0.3])),
            ])
            .await
            .unwrap();

        let count_before = store.count().await;
        let by_type_before = store.count_by_type().await;

        store.save().await.unwrap();
        assert!(path.exists());

        let restored = VectorStore::new(None, Some(path));
        restored.load().await.unwrap();

        assert_eq!(restored.count().await, count_before);
        assert_eq!(restored.count_by_type().await, by_type_before);
    }

    #[tokio::test]
    async fn test_save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/vectors.json");

        let store = VectorStore::new(None, Some(path.clone()));
        store.add(doc("t1", "track", "a", Some(vec![0.1]))).await.unwrap();

        store.save().await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_save_without_path_is_an_error() {
        let store = VectorStore::new(None, None);
        assert!(store.save().await.is_err());
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::new(None, Some(dir.path().join("absent.json")));

        store.load().await.unwrap();
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn test_load_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = VectorStore::new(None, Some(path));
        assert!(store.load().await.is_err());
    }

    #[tokio::test]
    async fn test_load_replaces_mapping_wholesale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.json");

        let store = VectorStore::new(None, Some(path.clone()));
        store.add(doc("saved", "track", "a", Some(vec![0.1]))).await.unwrap();
        store.save().await.unwrap();

        let other = VectorStore::new(None, Some(path));
        other.add(doc("stale", "track", "b", Some(vec![0.2]))).await.unwrap();
        other.load().await.unwrap();

        assert_eq!(other.count().await, 1);
        let counts = other.count_by_type().await;
        assert_eq!(counts["track"], 1);
    }

    #[test]
    fn test_cosine_similarity_identities() {
        let v = vec![1.0, 2.0, 3.0];
        let neg: Vec<f64> = v.iter().map(|x| -x).collect();

        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
        assert!((cosine_similarity(&v, &neg) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_similarity_degenerate_inputs_are_zero() {
        // mismatched lengths
        assert_eq!(cosine_similarity(&[1.0, 2.0, 3.0], &[1.0, 2.0]), 0.0);
        // empty vectors
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        // zero vector
        assert_eq!(cosine_similarity(&[0.0, 0.0, 0.0], &[1.0, 2.0, 3.0]), 0.0);
        // never NaN
        assert!(!cosine_similarity(&[0.0], &[0.0]).is_nan());
    }

    #[test]
    fn test_cosine_similarity_close_vectors() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![1.0, 2.0, 3.1];
        let sim = cosine_similarity(&a, &b);
        assert!((sim - 0.9998).abs() < 0.001);
    }
}
