//! The four sales-assistant features, each a chain of specialist calls over
//! context assembled from the entity store and the deal index.

pub mod deal_coach;
pub mod objection;
pub mod persona;
pub mod win_loss;

use anyhow::{bail, Result};
use std::sync::Arc;

use crate::config::AgentSettings;
use crate::context::DealContext;
use crate::documents::deal_documents;
use crate::llm::Completer;
use crate::progress::{AgentProgress, ProgressSink};
use crate::store::EntityStore;
use crate::vector::{DealIndex, Document, IndexReport, MetadataFilter};

pub use deal_coach::CoachingReport;
pub use objection::ObjectionResult;
pub use persona::{Persona, PersonaResult, PersonaTrait};
pub use win_loss::ExplanationResult;

pub struct SalesAssistant {
    completer: Completer,
    store: Arc<dyn EntityStore>,
    index: Arc<DealIndex>,
    settings: AgentSettings,
    progress: ProgressSink,
}

impl SalesAssistant {
    pub fn new(
        completer: Completer,
        store: Arc<dyn EntityStore>,
        index: Arc<DealIndex>,
        settings: AgentSettings,
    ) -> Self {
        SalesAssistant {
            completer,
            store,
            index,
            settings,
            progress: ProgressSink::none(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    /// Embed every deal and replace the index.
    pub async fn build_index(&self) -> Result<IndexReport> {
        let records = self.store.all_deals().await?;
        if records.is_empty() {
            bail!("Failed to fetch deals or no deals found");
        }
        log::info!("Fetched {} deals for embedding", records.len());

        let report = self.index.build(&deal_documents(&records)).await?;
        log::info!(
            "Indexed {} deals into {} ({:?})",
            report.count,
            report.collection,
            report.storage
        );
        Ok(report)
    }

    pub async fn search(&self, query: &str, filter: &MetadataFilter, limit: usize) -> Result<Vec<Document>> {
        Ok(self.index.search(query, filter, limit).await?)
    }

    async fn deal_context(&self, deal_id: &str) -> Result<DealContext> {
        self.progress.send(AgentProgress::AssemblingContext);
        DealContext::assemble(
            self.store.as_ref(),
            self.index.as_ref(),
            deal_id,
            self.settings.similar_deal_limit,
        )
        .await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::AgentSettings;
    use crate::store::SnapshotStore;
    use crate::testing::{sample_snapshot, HashEmbedder, ScriptedModel};
    use crate::vector::EmbeddingCache;

    /// Assistant over the sample snapshot with a built in-memory index.
    pub async fn indexed_assistant(model: Arc<ScriptedModel>) -> (SalesAssistant, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let index = DealIndex::new(
            Arc::new(HashEmbedder::default()),
            EmbeddingCache::new(dir.path().join("embeddings.sqlite")),
            None,
        );
        let assistant = SalesAssistant::new(
            Completer::new(model, "gpt-4o", 0.7),
            Arc::new(SnapshotStore::new(sample_snapshot())),
            Arc::new(index),
            AgentSettings::default(),
        );
        assistant.build_index().await.unwrap();
        (assistant, dir)
    }
}
