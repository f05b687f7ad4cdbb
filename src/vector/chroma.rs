use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use super::{
    CachedEmbedding, Document, Metadata, MetadataFilter, SimilarityStore, VectorError,
    VectorResult,
};
use crate::embeddings::Embedder;

#[derive(Debug, Deserialize)]
struct CollectionResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    documents: Vec<Vec<Option<String>>>,
    #[serde(default)]
    metadatas: Vec<Vec<Option<Metadata>>>,
}

/// Managed vector database reached over the Chroma REST API.
pub struct ChromaStore {
    base_url: String,
    collection: String,
    client: reqwest::Client,
    embedder: Arc<dyn Embedder>,
}

impl ChromaStore {
    pub fn new(
        base_url: &str,
        collection: impl Into<String>,
        embedder: Arc<dyn Embedder>,
    ) -> VectorResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(ChromaStore {
            base_url: base_url.trim_end_matches('/').to_string(),
            collection: collection.into(),
            client,
            embedder,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    async fn collection_id(&self) -> VectorResult<String> {
        let response = self
            .client
            .post(format!("{}/api/v1/collections", self.base_url))
            .json(&json!({ "name": self.collection, "get_or_create": true }))
            .send()
            .await?;

        let response = check_status(response).await?;
        let collection: CollectionResponse = response.json().await?;
        Ok(collection.id)
    }

    /// Upsert documents whose embeddings are already computed.
    pub async fn upsert_embedded(&self, entries: &[CachedEmbedding]) -> VectorResult<()> {
        let collection_id = self.collection_id().await?;

        let ids: Vec<String> = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| document_id(&entry.metadata, i))
            .collect();
        let body = json!({
            "ids": ids,
            "embeddings": entries.iter().map(|e| &e.embedding).collect::<Vec<_>>(),
            "metadatas": entries.iter().map(|e| &e.metadata).collect::<Vec<_>>(),
            "documents": entries.iter().map(|e| &e.content).collect::<Vec<_>>(),
        });

        let response = self
            .client
            .post(format!(
                "{}/api/v1/collections/{}/upsert",
                self.base_url, collection_id
            ))
            .json(&body)
            .send()
            .await?;
        check_status(response).await?;

        log::info!(
            "[Chroma] Stored {} documents in collection {}",
            entries.len(),
            self.collection
        );
        Ok(())
    }
}

#[async_trait]
impl SimilarityStore for ChromaStore {
    async fn upsert_all(&self, documents: &[Document]) -> VectorResult<()> {
        let texts: Vec<String> = documents.iter().map(|doc| doc.content.clone()).collect();
        let vectors = self
            .embedder
            .embed_batch(&texts)
            .await
            .map_err(|e| VectorError::Embedding(e.to_string()))?;

        let entries: Vec<CachedEmbedding> = documents
            .iter()
            .zip(vectors)
            .map(|(doc, embedding)| CachedEmbedding {
                content: doc.content.clone(),
                metadata: doc.metadata.clone(),
                embedding,
            })
            .collect();
        self.upsert_embedded(&entries).await
    }

    async fn query_top_k(
        &self,
        text: &str,
        filter: &MetadataFilter,
        k: usize,
    ) -> VectorResult<Vec<Document>> {
        let query = self
            .embedder
            .embed(text)
            .await
            .map_err(|e| VectorError::Embedding(e.to_string()))?;
        let collection_id = self.collection_id().await?;

        let mut body = json!({
            "query_embeddings": [query],
            "n_results": k,
            "include": ["documents", "metadatas"],
        });
        if let Some(clause) = where_clause(filter) {
            body["where"] = clause;
        }

        let response = self
            .client
            .post(format!(
                "{}/api/v1/collections/{}/query",
                self.base_url, collection_id
            ))
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;
        let result: QueryResponse = response.json().await?;

        Ok(documents_from_query(result))
    }
}

async fn check_status(response: reqwest::Response) -> VectorResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(VectorError::Remote(format!("Chroma API error ({}): {}", status, body)))
}

fn document_id(metadata: &Metadata, index: usize) -> String {
    match metadata.get("deal_id") {
        Some(Value::String(id)) => id.clone(),
        Some(other) => other.to_string(),
        None => format!("doc-{}", index),
    }
}

/// Translate the post-filter into a native `where` clause.
fn where_clause(filter: &MetadataFilter) -> Option<Value> {
    let mut conditions: Vec<Value> = filter
        .not
        .iter()
        .map(|(key, value)| json!({ key: { "$ne": value } }))
        .collect();
    conditions.extend(
        filter
            .equals
            .iter()
            .map(|(key, value)| json!({ key: { "$eq": value } })),
    );

    match conditions.len() {
        0 => None,
        1 => conditions.pop(),
        _ => Some(json!({ "$and": conditions })),
    }
}

fn documents_from_query(result: QueryResponse) -> Vec<Document> {
    let documents = result.documents.into_iter().next().unwrap_or_default();
    let mut metadatas = result.metadatas.into_iter().next().unwrap_or_default().into_iter();

    documents
        .into_iter()
        .map(|content| Document {
            content: content.unwrap_or_default(),
            metadata: metadatas.next().flatten().unwrap_or_default(),
        })
        .collect()
}
