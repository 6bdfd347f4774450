use anyhow::Context;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use super::store::ChunkStore;
use crate::providers::Embedder;

/// Semantic search over a document collection.
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    /// Up to `k` passages most similar to `query`, best first.
    ///
    /// Errors when the index is unavailable.
    async fn search(&self, query: &str, k: usize) -> anyhow::Result<Vec<String>>;
}

/// SQLite-backed vector index.
///
/// The file is opened per search so a rebuild is picked up without
/// restarting, and a missing file surfaces as an error at query time.
pub struct SqliteVectorIndex {
    path: PathBuf,
    embedder: Arc<dyn Embedder>,
}

impl SqliteVectorIndex {
    pub fn new(path: PathBuf, embedder: Arc<dyn Embedder>) -> Self {
        Self { path, embedder }
    }
}

#[async_trait]
impl DocumentIndex for SqliteVectorIndex {
    async fn search(&self, query: &str, k: usize) -> anyhow::Result<Vec<String>> {
        let store = ChunkStore::open_existing(&self.path)?;
        if let Some(model) = store.embedding_model()? {
            if model != self.embedder.model_name() {
                tracing::warn!(
                    index_model = %model,
                    query_model = self.embedder.model_name(),
                    "Index was built with a different embedding model"
                );
            }
        }

        let query_vec = self
            .embedder
            .embed(query)
            .await
            .context("Failed to embed query")?;

        let mut scored: Vec<(f32, String)> = store
            .all_chunks()?
            .into_iter()
            .map(|chunk| (cosine_similarity(&query_vec, &chunk.embedding), chunk.content))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(k);

        tracing::debug!(k, hits = scored.len(), "Document index search");
        Ok(scored.into_iter().map(|(_, content)| content).collect())
    }
}

/// Cosine similarity; 0.0 for mismatched or zero-length vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;

    /// Embeds by keyword presence so similarity is predictable in tests.
    pub struct KeywordEmbedder {
        pub keywords: Vec<&'static str>,
    }

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        fn model_name(&self) -> &str {
            "keyword-test"
        }

        async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            let lower = text.to_lowercase();
            Ok(self
                .keywords
                .iter()
                .map(|k| if lower.contains(k) { 1.0 } else { 0.0 })
                .collect())
        }
    }

    /// Fixed passages per query, or unavailable when constructed empty.
    #[derive(Default)]
    pub struct StaticIndex {
        pub passages: HashMap<String, Vec<String>>,
        pub unavailable: bool,
    }

    #[async_trait]
    impl DocumentIndex for StaticIndex {
        async fn search(&self, query: &str, k: usize) -> anyhow::Result<Vec<String>> {
            if self.unavailable {
                anyhow::bail!("Document index unavailable: test index offline");
            }
            Ok(self
                .passages
                .get(query)
                .map(|p| p.iter().take(k).cloned().collect())
                .unwrap_or_default())
        }
    }
}
