use anyhow::Result;
use serde::Serialize;
use serde_json::{json, Value};

use crate::entities::{Activity, Communication, Contact, Deal, DealRecord};
use crate::store::{EntityStore, StoreError};
use crate::vector::{Document, MetadataFilter, SimilarityStore};

/// Facts about one deal, gathered fresh per request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DealContext {
    pub current_deal: DealRecord,
    pub similar_deals: Vec<Document>,
    pub contact_deals: Vec<Deal>,
}

impl DealContext {
    /// Fetch the deal, up to `similar_limit` analogues excluding itself, and
    /// the contact's other deals.
    ///
    /// A missing deal or an unavailable index fails the whole assembly; a
    /// deal without a contact simply has no contact deals.
    pub async fn assemble(
        store: &dyn EntityStore,
        index: &dyn SimilarityStore,
        deal_id: &str,
        similar_limit: usize,
    ) -> Result<Self> {
        let all_deals = store.all_deals().await?;
        let current_deal = all_deals
            .iter()
            .find(|record| record.deal.id == deal_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: "Deal",
                id: deal_id.to_string(),
            })?;

        let query = similar_deals_query(&current_deal.deal);
        let filter = MetadataFilter::new().exclude("deal_id", deal_id);
        let similar_deals = index.query_top_k(&query, &filter, similar_limit).await?;

        let contact_deals = match &current_deal.deal.contact_id {
            Some(contact_id) => all_deals
                .iter()
                .filter(|record| {
                    record.deal.contact_id.as_ref() == Some(contact_id) && record.deal.id != deal_id
                })
                .map(|record| record.deal.clone())
                .collect(),
            None => Vec::new(),
        };

        log::info!(
            "[Context] Deal {}: {} similar deals, {} contact deals",
            deal_id,
            similar_deals.len(),
            contact_deals.len()
        );

        Ok(DealContext {
            current_deal,
            similar_deals,
            contact_deals,
        })
    }

    fn deal(&self) -> &Deal {
        &self.current_deal.deal
    }

    /// Full briefing handed to every coach specialist.
    pub fn coach_payload(&self, content_chars: usize) -> String {
        let deal = self.deal();
        let info = json!({
            "currentDeal": {
                "id": deal.id,
                "name": deal.name,
                "stage": deal.stage,
                "value": deal.value,
                "company": deal.company,
                "probability": deal.probability,
                "days_in_stage": deal.days_in_stage,
                "notes": deal.notes,
                "contact": self.current_deal.contact,
            },
            "similarDeals": self
                .similar_deals
                .iter()
                .map(|doc| json!({
                    "content": truncate_with_ellipsis(&doc.content, content_chars),
                    "metadata": doc.metadata,
                }))
                .collect::<Vec<_>>(),
            "contactDeals": self
                .contact_deals
                .iter()
                .map(|other| json!({
                    "id": other.id,
                    "name": other.name,
                    "stage": other.stage,
                    "value": other.value,
                    "outcome": other.stage.outcome(),
                }))
                .collect::<Vec<_>>(),
        });
        format!("Deal Information: {}", pretty(&info))
    }

    pub fn rebuttal_context(&self) -> Value {
        let deal = self.deal();
        json!({
            "dealName": deal.name,
            "dealStage": deal.stage,
            "dealValue": deal.value,
            "company": deal.company,
            "probability": deal.probability,
            "contact": self.current_deal.contact,
        })
    }

    pub fn customer_context(&self) -> Value {
        json!({
            "company": self.deal().company,
            "contact": self.current_deal.contact,
        })
    }

    pub fn polish_context(&self) -> Value {
        let deal = self.deal();
        json!({
            "dealName": deal.name,
            "dealStage": deal.stage,
            "company": deal.company,
        })
    }

    pub fn explainer_context(&self, similar: usize) -> Value {
        let deal = self.deal();
        json!({
            "dealName": deal.name,
            "dealStage": deal.stage,
            "dealValue": deal.value,
            "company": deal.company,
            "probability": deal.probability,
            "contact": self.current_deal.contact,
            "notes": deal.notes,
            "similarDeals": self.similar_deals.iter().take(similar).collect::<Vec<_>>(),
        })
    }

    pub fn validator_context(&self) -> Value {
        let deal = self.deal();
        json!({
            "dealName": deal.name,
            "dealStage": deal.stage,
            "dealValue": deal.value,
            "company": deal.company,
            "notes": deal.notes,
        })
    }
}

pub fn similar_deals_query(deal: &Deal) -> String {
    format!("Deal in {} stage with value around {}", deal.stage, deal.value)
}

/// Facts about one contact. Relations with no rows are empty collections.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactContext {
    pub contact: Contact,
    pub communications: Vec<Communication>,
    pub deals: Vec<Deal>,
    pub activities: Vec<Activity>,
}

impl ContactContext {
    pub async fn assemble(store: &dyn EntityStore, contact_id: &str) -> Result<Self> {
        let contact = store.contact(contact_id).await?;
        let communications = store.communications_for_contact(contact_id).await?;
        let deals = store.deals_for_contact(contact_id).await?;
        let activities = store.activities_for_contact(contact_id).await?;

        log::info!(
            "[Context] Contact {}: {} communications, {} deals, {} activities",
            contact_id,
            communications.len(),
            deals.len(),
            activities.len()
        );

        Ok(ContactContext {
            contact,
            communications,
            deals,
            activities,
        })
    }

    pub fn identity(&self) -> Value {
        json!({
            "name": self.contact.full_name(),
            "position": self.contact.position,
            "company": self.contact.company,
        })
    }
}

/// First `max_chars` characters followed by `...`.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

pub fn compact(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

pub fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SnapshotStore;
    use crate::testing::{sample_snapshot, HashEmbedder};
    use crate::vector::{MemoryVectorStore, VectorError};
    use crate::documents::deal_documents;
    use std::sync::Arc;

    async fn indexed() -> (SnapshotStore, MemoryVectorStore) {
        let store = SnapshotStore::new(sample_snapshot());
        let index = MemoryVectorStore::new(Arc::new(HashEmbedder::default()));
        let records = store.all_deals().await.unwrap();
        index.upsert_all(&deal_documents(&records)).await.unwrap();
        (store, index)
    }

    #[tokio::test]
    async fn deal_context_excludes_subject_everywhere() {
        let (store, index) = indexed().await;
        let ctx = DealContext::assemble(&store, &index, "d-1", 5).await.unwrap();

        assert_eq!(ctx.current_deal.deal.id, "d-1");
        assert!(ctx
            .similar_deals
            .iter()
            .all(|doc| doc.metadata["deal_id"] != json!("d-1")));
        let contact_ids: Vec<_> = ctx.contact_deals.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(contact_ids, vec!["d-2", "d-3"]);
    }

    #[tokio::test]
    async fn deal_without_contact_has_no_contact_deals() {
        let (store, index) = indexed().await;
        let ctx = DealContext::assemble(&store, &index, "d-4", 5).await.unwrap();
        assert!(ctx.contact_deals.is_empty());
        assert!(ctx.current_deal.contact.is_none());
    }

    #[tokio::test]
    async fn missing_deal_propagates_not_found() {
        let (store, index) = indexed().await;
        let err = DealContext::assemble(&store, &index, "d-404", 5).await.unwrap_err();
        assert_eq!(err.to_string(), "Deal with ID d-404 not found");
    }

    #[tokio::test]
    async fn unbuilt_index_propagates_not_available() {
        let store = SnapshotStore::new(sample_snapshot());
        let index = MemoryVectorStore::new(Arc::new(HashEmbedder::default()));
        let err = DealContext::assemble(&store, &index, "d-1", 5).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<VectorError>(), Some(VectorError::NotAvailable)));
    }

    #[tokio::test]
    async fn coach_payload_truncates_similar_content() {
        let (store, index) = indexed().await;
        let ctx = DealContext::assemble(&store, &index, "d-1", 5).await.unwrap();
        let payload = ctx.coach_payload(20);

        assert!(payload.starts_with("Deal Information: {"));
        let info: Value = serde_json::from_str(payload.trim_start_matches("Deal Information: ")).unwrap();
        for similar in info["similarDeals"].as_array().unwrap() {
            let content = similar["content"].as_str().unwrap();
            assert!(content.ends_with("..."));
            assert_eq!(content.chars().count(), 23);
        }
        assert_eq!(info["contactDeals"][0]["outcome"], json!("won"));
        assert_eq!(info["currentDeal"]["contact"]["first_name"], json!("Dana"));
    }

    #[tokio::test]
    async fn contact_context_tolerates_empty_relations() {
        let store = SnapshotStore::new(sample_snapshot());
        let ctx = ContactContext::assemble(&store, "c-2").await.unwrap();
        assert!(ctx.communications.is_empty());
        assert!(ctx.deals.is_empty());
        assert!(ctx.activities.is_empty());
        assert_eq!(ctx.identity()["name"], json!("Lee Park"));

        let err = ContactContext::assemble(&store, "c-404").await.unwrap_err();
        assert!(err.downcast_ref::<StoreError>().is_some());
    }

    #[test]
    fn truncation_is_char_safe() {
        assert_eq!(truncate_with_ellipsis("négociation", 3), "nég...");
        assert_eq!(truncate_with_ellipsis("ab", 10), "ab...");
    }
}
