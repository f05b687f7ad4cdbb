pub mod cache;
pub mod chroma;
pub mod index;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub use cache::EmbeddingCache;
pub use chroma::ChromaStore;
pub use index::{DealIndex, IndexReport, StorageKind};
pub use memory::MemoryVectorStore;

pub type Metadata = Map<String, Value>;

#[derive(Debug, Error)]
pub enum VectorError {
    #[error("Vector database is not available. Please generate embeddings first.")]
    NotAvailable,
    #[error("embedding failed: {0}")]
    Embedding(String),
    #[error("vector store request failed: {0}")]
    Remote(String),
    #[error("embedding cache error: {0}")]
    Cache(String),
}

pub type VectorResult<T> = std::result::Result<T, VectorError>;

impl From<rusqlite::Error> for VectorError {
    fn from(e: rusqlite::Error) -> Self {
        VectorError::Cache(e.to_string())
    }
}

impl From<reqwest::Error> for VectorError {
    fn from(e: reqwest::Error) -> Self {
        VectorError::Remote(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Document {
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Document plus its embedding, as persisted in the local cache.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CachedEmbedding {
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub embedding: Vec<f32>,
}

impl CachedEmbedding {
    pub fn document(&self) -> Document {
        Document {
            content: self.content.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

/// Metadata post-filter.
///
/// `not` rejects entries whose field equals the given value; every other key
/// rejects entries whose field does not equal the given value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MetadataFilter {
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub not: Metadata,
    #[serde(flatten)]
    pub equals: Metadata,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exclude(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.not.insert(key.into(), value.into());
        self
    }

    pub fn require(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.equals.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.not.is_empty() && self.equals.is_empty()
    }

    pub fn matches(&self, metadata: &Metadata) -> bool {
        let excluded = self
            .not
            .iter()
            .any(|(key, value)| metadata.get(key) == Some(value));
        if excluded {
            return false;
        }
        self.equals
            .iter()
            .all(|(key, value)| metadata.get(key) == Some(value))
    }
}

/// Similarity-store boundary shared by the managed database and the local
/// fallback so callers need not know which one is active.
#[async_trait]
pub trait SimilarityStore: Send + Sync {
    async fn upsert_all(&self, documents: &[Document]) -> VectorResult<()>;

    async fn query_top_k(
        &self,
        text: &str,
        filter: &MetadataFilter,
        k: usize,
    ) -> VectorResult<Vec<Document>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata(value: Value) -> Metadata {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn exclusion_rejects_equal_values_only() {
        let filter = MetadataFilter::new().exclude("deal_id", "d-1");
        assert!(!filter.matches(&metadata(json!({"deal_id": "d-1"}))));
        assert!(filter.matches(&metadata(json!({"deal_id": "d-2"}))));
        assert!(filter.matches(&metadata(json!({}))));
    }

    #[test]
    fn equality_rejects_missing_and_different_values() {
        let filter = MetadataFilter::new().require("outcome", "won");
        assert!(filter.matches(&metadata(json!({"outcome": "won"}))));
        assert!(!filter.matches(&metadata(json!({"outcome": "lost"}))));
        assert!(!filter.matches(&metadata(json!({}))));
    }

    #[test]
    fn filter_deserializes_from_nested_not() {
        let filter: MetadataFilter =
            serde_json::from_value(json!({"not": {"deal_id": "d-1"}, "is_closed": true})).unwrap();
        assert_eq!(filter, MetadataFilter::new().exclude("deal_id", "d-1").require("is_closed", true));
        assert!(!filter.is_empty());
        assert!(MetadataFilter::new().is_empty());
    }
}
