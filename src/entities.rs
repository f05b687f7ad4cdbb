use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DealStage {
    Prospecting,
    Qualification,
    Proposal,
    Negotiation,
    ClosedWon,
    ClosedLost,
    #[serde(other)]
    Other,
}

impl DealStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            DealStage::Prospecting => "prospecting",
            DealStage::Qualification => "qualification",
            DealStage::Proposal => "proposal",
            DealStage::Negotiation => "negotiation",
            DealStage::ClosedWon => "closed-won",
            DealStage::ClosedLost => "closed-lost",
            DealStage::Other => "other",
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, DealStage::ClosedWon | DealStage::ClosedLost)
    }

    pub fn outcome(&self) -> Outcome {
        match self {
            DealStage::ClosedWon => Outcome::Won,
            DealStage::ClosedLost => Outcome::Lost,
            _ => Outcome::InProgress,
        }
    }
}

impl fmt::Display for DealStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Won,
    Lost,
    InProgress,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Won => "won",
            Outcome::Lost => "lost",
            Outcome::InProgress => "in_progress",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Deal {
    pub id: String,
    pub name: String,
    pub stage: DealStage,
    pub value: f64,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub expected_close_date: Option<String>,
    #[serde(default)]
    pub days_in_stage: Option<i64>,
    #[serde(default)]
    pub probability: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub contact_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Contact {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Contact {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Communication {
    pub id: String,
    #[serde(default)]
    pub contact_id: Option<String>,
    #[serde(default)]
    pub deal_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Activity {
    pub id: String,
    #[serde(default)]
    pub contact_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A deal joined with its contact and its communications.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DealRecord {
    #[serde(flatten)]
    pub deal: Deal,
    pub contact: Option<Contact>,
    pub communications: Vec<Communication>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_round_trips_kebab_case_and_keeps_unknown() {
        let stage: DealStage = serde_json::from_str("\"closed-won\"").unwrap();
        assert_eq!(stage, DealStage::ClosedWon);
        assert_eq!(stage.outcome(), Outcome::Won);

        let unknown: DealStage = serde_json::from_str("\"on-hold\"").unwrap();
        assert_eq!(unknown, DealStage::Other);
        assert!(!unknown.is_closed());
    }

    #[test]
    fn communication_reads_type_field() {
        let comm: Communication =
            serde_json::from_str(r#"{"id": "m", "type": "email", "subject": "Hi"}"#).unwrap();
        assert_eq!(comm.kind, "email");
        assert!(comm.created_at.is_none());
    }
}
