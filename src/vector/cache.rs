use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;

use super::{CachedEmbedding, VectorError, VectorResult};

pub const EMBEDDINGS_KEY: &str = "deal_embeddings";
pub const EMBEDDINGS_TIMESTAMP_KEY: &str = "deal_embeddings_timestamp";

#[derive(Debug, Clone)]
pub struct CachedIndex {
    pub entries: Vec<CachedEmbedding>,
    pub built_at: Option<String>,
}

/// Local key-value cache holding the last built index: one entry with the
/// serialized `{content, metadata, embedding}` records, one with the build
/// timestamp.
#[derive(Debug, Clone)]
pub struct EmbeddingCache {
    path: PathBuf,
}

impl EmbeddingCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        EmbeddingCache { path: path.into() }
    }

    fn open(&self) -> VectorResult<Connection> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| VectorError::Cache(e.to_string()))?;
        }
        let conn = Connection::open(&self.path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(conn)
    }

    /// Replace the cached index; returns the RFC 3339 build timestamp.
    pub fn save(&self, entries: &[CachedEmbedding]) -> VectorResult<String> {
        let serialized =
            serde_json::to_string(entries).map_err(|e| VectorError::Cache(e.to_string()))?;
        let timestamp = Utc::now().to_rfc3339();

        let mut conn = self.open()?;
        let tx = conn.transaction()?;
        for (key, value) in [(EMBEDDINGS_KEY, &serialized), (EMBEDDINGS_TIMESTAMP_KEY, &timestamp)] {
            tx.execute(
                "INSERT INTO kv_store (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
        }
        tx.commit()?;

        log::info!(
            "[EmbeddingCache] Saved {} embeddings ({:.2} MB) to {}",
            entries.len(),
            serialized.len() as f64 / (1024.0 * 1024.0),
            self.path.display()
        );
        Ok(timestamp)
    }

    pub fn load(&self) -> VectorResult<Option<CachedIndex>> {
        let conn = self.open()?;
        let read = |key: &str| -> VectorResult<Option<String>> {
            Ok(conn
                .query_row("SELECT value FROM kv_store WHERE key = ?1", [key], |row| row.get(0))
                .optional()?)
        };

        let Some(serialized) = read(EMBEDDINGS_KEY)? else {
            return Ok(None);
        };
        let built_at = read(EMBEDDINGS_TIMESTAMP_KEY)?;
        let entries: Vec<CachedEmbedding> =
            serde_json::from_str(&serialized).map_err(|e| VectorError::Cache(e.to_string()))?;

        log::info!(
            "[EmbeddingCache] Loaded {} embeddings (saved on {})",
            entries.len(),
            built_at.as_deref().unwrap_or("unknown")
        );
        Ok(Some(CachedIndex { entries, built_at }))
    }

    pub fn clear(&self) -> VectorResult<()> {
        let conn = self.open()?;
        conn.execute(
            "DELETE FROM kv_store WHERE key IN (?1, ?2)",
            params![EMBEDDINGS_KEY, EMBEDDINGS_TIMESTAMP_KEY],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(id: &str) -> CachedEmbedding {
        CachedEmbedding {
            content: format!("Deal {id}"),
            metadata: json!({"deal_id": id, "is_closed": false}).as_object().cloned().unwrap(),
            embedding: vec![0.25, -0.5, 1.0],
        }
    }

    #[test]
    fn missing_cache_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = EmbeddingCache::new(dir.path().join("embeddings.sqlite"));
        assert!(cache.load().unwrap().is_none());
    }

    #[test]
    fn save_overwrites_previous_build() {
        let dir = tempfile::tempdir().unwrap();
        let cache = EmbeddingCache::new(dir.path().join("nested/embeddings.sqlite"));

        cache.save(&[entry("d-1"), entry("d-2")]).unwrap();
        let timestamp = cache.save(&[entry("d-3")]).unwrap();

        let loaded = cache.load().unwrap().unwrap();
        assert_eq!(loaded.entries, vec![entry("d-3")]);
        assert_eq!(loaded.built_at.as_deref(), Some(timestamp.as_str()));
    }

    #[test]
    fn clear_removes_both_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = EmbeddingCache::new(dir.path().join("embeddings.sqlite"));
        cache.save(&[entry("d-1")]).unwrap();

        cache.clear().unwrap();
        assert!(cache.load().unwrap().is_none());
    }
}
