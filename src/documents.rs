//! Rendering of deals into the text and metadata stored in the similarity index.

use serde_json::json;

use crate::entities::{DealRecord, Outcome};
use crate::vector::{Document, Metadata};

pub fn deal_documents(records: &[DealRecord]) -> Vec<Document> {
    records
        .iter()
        .map(|record| Document {
            content: format_deal_for_embedding(record),
            metadata: deal_metadata(record),
        })
        .collect()
}

pub fn deal_metadata(record: &DealRecord) -> Metadata {
    let deal = &record.deal;
    let outcome: Outcome = deal.stage.outcome();
    let value = json!({
        "deal_id": deal.id,
        "stage": deal.stage,
        "value": deal.value,
        "company": deal.company.clone().unwrap_or_default(),
        "contact_id": deal.contact_id.clone().unwrap_or_default(),
        "is_closed": deal.stage.is_closed(),
        "outcome": outcome,
    });
    match value {
        serde_json::Value::Object(map) => map,
        _ => Metadata::new(),
    }
}

pub fn format_deal_for_embedding(record: &DealRecord) -> String {
    let deal = &record.deal;
    let or = |value: &Option<String>, default: &str| value.clone().unwrap_or_else(|| default.to_string());

    let contact_block = match &record.contact {
        Some(contact) => format!(
            "Name: {}\nPosition: {}\nEmail: {}\nPhone: {}\nCompany: {}\nStatus: {}",
            contact.full_name(),
            or(&contact.position, "Unknown"),
            or(&contact.email, "Unknown"),
            or(&contact.phone, "Unknown"),
            or(&contact.company, "Unknown"),
            or(&contact.status, "Unknown"),
        ),
        None => "No contact associated with this deal".to_string(),
    };

    let communications = if record.communications.is_empty() {
        "No communications recorded for this deal".to_string()
    } else {
        record
            .communications
            .iter()
            .map(|comm| {
                let date = comm
                    .created_at
                    .map(|at| at.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "Unknown date".to_string());
                format!(
                    "- {}: {} - {}\n  {}",
                    date,
                    comm.kind,
                    comm.subject.as_deref().unwrap_or(""),
                    comm.content.as_deref().unwrap_or("")
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    format!(
        "Deal: {name}\n\
         Stage: {stage}\n\
         Value: {value}\n\
         Company: {company}\n\
         Priority: {priority}\n\
         Expected Close: {close}\n\
         Days in Stage: {days}\n\
         Probability: {probability}%\n\n\
         Contact Information:\n{contact}\n\n\
         Notes:\n{notes}\n\n\
         Communications:\n{communications}",
        name = deal.name,
        stage = deal.stage,
        value = format_currency(deal.value),
        company = or(&deal.company, "N/A"),
        priority = or(&deal.priority, "Standard"),
        close = or(&deal.expected_close_date, "Not set"),
        days = deal
            .days_in_stage
            .map(|days| days.to_string())
            .unwrap_or_else(|| "Unknown".to_string()),
        probability = deal
            .probability
            .map(|p| p.to_string())
            .unwrap_or_else(|| "Unknown".to_string()),
        contact = contact_block,
        notes = or(&deal.notes, "No notes available for this deal"),
        communications = communications,
    )
}

/// `$1,234,567` with cents only when present.
pub fn format_currency(value: f64) -> String {
    let negative = value < 0.0;
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    match cents % 100 {
        0 => format!("{}${}", sign, grouped),
        rest => format!("{}${}.{:02}", sign, grouped, rest),
    }
}
