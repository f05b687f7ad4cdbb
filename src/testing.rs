//! Test doubles shared by the unit tests.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Mutex;

use crate::embeddings::Embedder;
use crate::llm::{ChatModel, Completion, ModelRequest};
use crate::store::Snapshot;

type Responder = Box<dyn Fn(&ModelRequest) -> Result<String> + Send + Sync>;

/// Chat model answering from a closure and recording every request.
pub struct ScriptedModel {
    responder: Responder,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&ModelRequest) -> Result<String> + Send + Sync + 'static,
    {
        ScriptedModel {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_matching(&self, system_fragment: &str) -> Vec<ModelRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.system.contains(system_fragment))
            .collect()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn chat(&self, request: &ModelRequest) -> Result<Completion> {
        self.requests.lock().unwrap().push(request.clone());
        let text = (self.responder)(request)?;
        Ok(Completion {
            text,
            token_count: Some(42),
        })
    }
}

/// Deterministic bag-of-words embedder: identical text embeds identically and
/// shared words raise similarity.
pub struct HashEmbedder {
    dimensions: usize,
    fail: bool,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        HashEmbedder {
            dimensions: 64,
            fail: false,
        }
    }
}

impl HashEmbedder {
    pub fn failing() -> Self {
        HashEmbedder {
            dimensions: 64,
            fail: true,
        }
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimensions];
        for token in text
            .split(|ch: char| !ch.is_alphanumeric())
            .filter(|token| !token.is_empty())
        {
            let token = token.to_lowercase();
            let mut hash: u64 = 1469598103934665603;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            vector[(hash % self.dimensions as u64) as usize] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.fail {
            anyhow::bail!("embedding service unreachable");
        }
        Ok(self.vector_for(text))
    }
}

/// Small CRM snapshot: one contact with three deals, one orphan deal, and a
/// second contact with no history.
pub fn sample_snapshot() -> Snapshot {
    serde_json::from_str(
        r#"{
        "contacts": [
            {"id": "c-1", "first_name": "Dana", "last_name": "Reyes", "position": "VP Operations",
             "email": "dana@acme.test", "company": "Acme", "status": "active",
             "created_at": "2024-01-05T10:00:00Z"},
            {"id": "c-2", "first_name": "Lee", "last_name": "Park", "company": "Globex"}
        ],
        "deals": [
            {"id": "d-1", "name": "Acme Platform Rollout", "stage": "negotiation", "value": 120000,
             "company": "Acme", "probability": 60, "days_in_stage": 14, "contact_id": "c-1",
             "notes": "Procurement pushing for a 15% discount.", "created_at": "2024-03-01T09:00:00Z"},
            {"id": "d-2", "name": "Acme Analytics Add-on", "stage": "closed-won", "value": 30000,
             "company": "Acme", "contact_id": "c-1", "created_at": "2024-02-01T09:00:00Z"},
            {"id": "d-3", "name": "Acme Support Renewal", "stage": "closed-lost", "value": 15000,
             "company": "Acme", "contact_id": "c-1", "notes": "Lost to an incumbent on price.",
             "created_at": "2024-01-15T09:00:00Z"},
            {"id": "d-4", "name": "Initech Pilot", "stage": "prospecting", "value": 8000,
             "company": "Initech", "created_at": "2024-03-10T09:00:00Z"}
        ],
        "communications": [
            {"id": "m-1", "contact_id": "c-1", "deal_id": "d-1", "type": "email",
             "subject": "Pricing follow-up", "content": "Can you do better on price?",
             "created_at": "2024-03-05T12:00:00Z"},
            {"id": "m-2", "contact_id": "c-1", "deal_id": "d-1", "type": "call",
             "subject": "Kickoff", "created_at": "2024-03-02T12:00:00Z"}
        ],
        "activities": [
            {"id": "a-1", "contact_id": "c-1", "type": "meeting", "description": "Onsite demo",
             "created_at": "2024-02-20T15:00:00Z"}
        ]
    }"#,
    )
    .unwrap()
}
