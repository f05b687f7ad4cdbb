use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::entities::{Activity, Communication, Contact, Deal, DealRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} with ID {id} not found")]
    NotFound { kind: &'static str, id: String },
    #[error("entity store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// CRUD-style read access to CRM records. Collections come back newest first.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn all_deals(&self) -> StoreResult<Vec<DealRecord>>;
    async fn contact(&self, contact_id: &str) -> StoreResult<Contact>;
    async fn communications_for_contact(&self, contact_id: &str) -> StoreResult<Vec<Communication>>;
    async fn deals_for_contact(&self, contact_id: &str) -> StoreResult<Vec<Deal>>;
    async fn activities_for_contact(&self, contact_id: &str) -> StoreResult<Vec<Activity>>;
}

/// Export of the CRM tables.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Snapshot {
    #[serde(default)]
    pub deals: Vec<Deal>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub communications: Vec<Communication>,
    #[serde(default)]
    pub activities: Vec<Activity>,
}

/// Entity store answering from an in-memory [`Snapshot`].
pub struct SnapshotStore {
    snapshot: Snapshot,
}

impl SnapshotStore {
    pub fn new(snapshot: Snapshot) -> Self {
        SnapshotStore { snapshot }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&contents)?;
        log::info!(
            "Loaded snapshot {} ({} deals, {} contacts)",
            path.display(),
            snapshot.deals.len(),
            snapshot.contacts.len()
        );
        Ok(Self::new(snapshot))
    }
}

fn newest_first<T>(items: &mut [T], created_at: impl Fn(&T) -> Option<DateTime<Utc>>) {
    items.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
}

#[async_trait]
impl EntityStore for SnapshotStore {
    async fn all_deals(&self) -> StoreResult<Vec<DealRecord>> {
        let mut deals = self.snapshot.deals.clone();
        newest_first(&mut deals, |deal| deal.created_at);

        Ok(deals
            .into_iter()
            .map(|deal| {
                let contact = deal.contact_id.as_ref().and_then(|contact_id| {
                    self.snapshot
                        .contacts
                        .iter()
                        .find(|contact| &contact.id == contact_id)
                        .cloned()
                });
                let communications = self
                    .snapshot
                    .communications
                    .iter()
                    .filter(|comm| comm.deal_id.as_deref() == Some(deal.id.as_str()))
                    .cloned()
                    .collect();
                DealRecord {
                    deal,
                    contact,
                    communications,
                }
            })
            .collect())
    }

    async fn contact(&self, contact_id: &str) -> StoreResult<Contact> {
        self.snapshot
            .contacts
            .iter()
            .find(|contact| contact.id == contact_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: "Contact",
                id: contact_id.to_string(),
            })
    }

    async fn communications_for_contact(&self, contact_id: &str) -> StoreResult<Vec<Communication>> {
        let mut comms: Vec<Communication> = self
            .snapshot
            .communications
            .iter()
            .filter(|comm| comm.contact_id.as_deref() == Some(contact_id))
            .cloned()
            .collect();
        newest_first(&mut comms, |comm| comm.created_at);
        Ok(comms)
    }

    async fn deals_for_contact(&self, contact_id: &str) -> StoreResult<Vec<Deal>> {
        let mut deals: Vec<Deal> = self
            .snapshot
            .deals
            .iter()
            .filter(|deal| deal.contact_id.as_deref() == Some(contact_id))
            .cloned()
            .collect();
        newest_first(&mut deals, |deal| deal.created_at);
        Ok(deals)
    }

    async fn activities_for_contact(&self, contact_id: &str) -> StoreResult<Vec<Activity>> {
        let mut activities: Vec<Activity> = self
            .snapshot
            .activities
            .iter()
            .filter(|activity| activity.contact_id.as_deref() == Some(contact_id))
            .cloned()
            .collect();
        newest_first(&mut activities, |activity| activity.created_at);
        Ok(activities)
    }
}
