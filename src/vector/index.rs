use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use super::{
    CachedEmbedding, ChromaStore, Document, EmbeddingCache, MemoryVectorStore, MetadataFilter,
    SimilarityStore, VectorError, VectorResult,
};
use crate::embeddings::Embedder;

const MEMORY_COLLECTION: &str = "memory-store";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Chroma,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexReport {
    pub count: usize,
    pub collection: String,
    pub storage: StorageKind,
    pub built_at: Option<String>,
    pub sample_embedding: Vec<f32>,
}

/// Deal similarity index: local cache, in-memory fallback and an optional
/// managed store behind one `SimilarityStore`.
///
/// Search order: the in-memory index (rehydrated from the cache when empty),
/// then the managed store, otherwise `VectorError::NotAvailable`.
pub struct DealIndex {
    embedder: Arc<dyn Embedder>,
    memory: MemoryVectorStore,
    cache: EmbeddingCache,
    managed: Option<ChromaStore>,
}

impl DealIndex {
    pub fn new(embedder: Arc<dyn Embedder>, cache: EmbeddingCache, managed: Option<ChromaStore>) -> Self {
        DealIndex {
            memory: MemoryVectorStore::new(embedder.clone()),
            embedder,
            cache,
            managed,
        }
    }

    /// Embed every document, persist to the cache, then load into the managed
    /// store if one answers, else into memory. Full replacement.
    pub async fn build(&self, documents: &[Document]) -> VectorResult<IndexReport> {
        let texts: Vec<String> = documents.iter().map(|doc| doc.content.clone()).collect();
        let vectors = self
            .embedder
            .embed_batch(&texts)
            .await
            .map_err(|e| VectorError::Embedding(e.to_string()))?;

        log::info!(
            "[DealIndex] Generated {} embedding vectors ({} dimensions)",
            vectors.len(),
            vectors.first().map(Vec::len).unwrap_or(0)
        );

        let entries: Vec<CachedEmbedding> = documents
            .iter()
            .zip(vectors)
            .map(|(doc, embedding)| CachedEmbedding {
                content: doc.content.clone(),
                metadata: doc.metadata.clone(),
                embedding,
            })
            .collect();
        let sample_embedding: Vec<f32> = entries
            .first()
            .map(|entry| entry.embedding.iter().take(5).copied().collect())
            .unwrap_or_default();

        let built_at = match self.cache.save(&entries) {
            Ok(timestamp) => Some(timestamp),
            Err(e) => {
                log::warn!("[DealIndex] Could not write embedding cache: {}", e);
                None
            }
        };

        if let Some(chroma) = &self.managed {
            match chroma.upsert_embedded(&entries).await {
                Ok(()) => {
                    return Ok(IndexReport {
                        count: entries.len(),
                        collection: chroma.collection().to_string(),
                        storage: StorageKind::Chroma,
                        built_at,
                        sample_embedding,
                    });
                }
                Err(e) => log::warn!(
                    "[DealIndex] Chroma not available, falling back to in-memory store: {}",
                    e
                ),
            }
        }

        let count = entries.len();
        self.memory.build(entries).await;

        Ok(IndexReport {
            count,
            collection: MEMORY_COLLECTION.to_string(),
            storage: StorageKind::Memory,
            built_at,
            sample_embedding,
        })
    }

    pub async fn search(
        &self,
        text: &str,
        filter: &MetadataFilter,
        limit: usize,
    ) -> VectorResult<Vec<Document>> {
        if self.memory.is_empty().await {
            self.rehydrate().await;
        }

        if !self.memory.is_empty().await {
            let results = self.memory.query_top_k(text, filter, limit).await?;
            log::info!("[DealIndex] Found {} similar deals in memory", results.len());
            return Ok(results);
        }

        let Some(chroma) = &self.managed else {
            return Err(VectorError::NotAvailable);
        };
        match chroma.query_top_k(text, filter, limit).await {
            Ok(results) => {
                log::info!("[DealIndex] Found {} similar deals in Chroma", results.len());
                Ok(results)
            }
            Err(e) => {
                log::error!("[DealIndex] Error querying Chroma: {}", e);
                Err(VectorError::NotAvailable)
            }
        }
    }

    /// Drop the in-memory index and the local cache.
    pub async fn clear(&self) -> VectorResult<()> {
        self.memory.clear().await;
        self.cache.clear()
    }

    async fn rehydrate(&self) {
        match self.cache.load() {
            Ok(Some(cached)) if !cached.entries.is_empty() => {
                log::info!("[DealIndex] Rehydrating in-memory index from cache");
                self.memory.build(cached.entries).await;
            }
            Ok(_) => {}
            Err(e) => log::warn!("[DealIndex] Could not read embedding cache: {}", e),
        }
    }
}

#[async_trait]
impl SimilarityStore for DealIndex {
    async fn upsert_all(&self, documents: &[Document]) -> VectorResult<()> {
        self.build(documents).await.map(|_| ())
    }

    async fn query_top_k(
        &self,
        text: &str,
        filter: &MetadataFilter,
        k: usize,
    ) -> VectorResult<Vec<Document>> {
        self.search(text, filter, k).await
    }
}
