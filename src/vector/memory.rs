use async_trait::async_trait;
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{CachedEmbedding, Document, MetadataFilter, SimilarityStore, VectorError, VectorResult};
use crate::embeddings::{cosine_similarity, Embedder};

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f32,
}

/// In-process fallback index: a linear scan over cached embeddings.
///
/// Each instance owns its entries; `build` replaces them wholesale and
/// there is no incremental insert or delete.
pub struct MemoryVectorStore {
    embedder: Arc<dyn Embedder>,
    entries: RwLock<Vec<CachedEmbedding>>,
}

impl MemoryVectorStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        MemoryVectorStore {
            embedder,
            entries: RwLock::new(Vec::new()),
        }
    }

    pub async fn build(&self, entries: Vec<CachedEmbedding>) {
        let mut current = self.entries.write().await;
        *current = entries;
        log::info!("[MemoryVectorStore] Built index with {} entries", current.len());
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Rank every entry, keep the top `limit`, then apply the filter.
    ///
    /// Filtered entries still consume ranking slots, so fewer than `limit`
    /// results may come back.
    pub async fn search_vector(
        &self,
        query: &[f32],
        filter: &MetadataFilter,
        limit: usize,
    ) -> Vec<ScoredDocument> {
        let entries = self.entries.read().await;

        let mut scored: Vec<ScoredDocument> = entries
            .iter()
            .map(|entry| ScoredDocument {
                document: entry.document(),
                score: cosine_similarity(query, &entry.embedding),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(limit);
        scored.retain(|hit| filter.matches(&hit.document.metadata));
        scored
    }
}

#[async_trait]
impl SimilarityStore for MemoryVectorStore {
    async fn upsert_all(&self, documents: &[Document]) -> VectorResult<()> {
        let texts: Vec<String> = documents.iter().map(|doc| doc.content.clone()).collect();
        let vectors = self
            .embedder
            .embed_batch(&texts)
            .await
            .map_err(|e| VectorError::Embedding(e.to_string()))?;

        let entries = documents
            .iter()
            .zip(vectors)
            .map(|(doc, embedding)| CachedEmbedding {
                content: doc.content.clone(),
                metadata: doc.metadata.clone(),
                embedding,
            })
            .collect();
        self.build(entries).await;
        Ok(())
    }

    async fn query_top_k(
        &self,
        text: &str,
        filter: &MetadataFilter,
        k: usize,
    ) -> VectorResult<Vec<Document>> {
        if self.is_empty().await {
            return Err(VectorError::NotAvailable);
        }

        let query = self
            .embedder
            .embed(text)
            .await
            .map_err(|e| VectorError::Embedding(e.to_string()))?;

        Ok(self
            .search_vector(&query, filter, k)
            .await
            .into_iter()
            .map(|hit| hit.document)
            .collect())
    }
}
