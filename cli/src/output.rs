//! JSON payloads printed by the CLI
//!
//! Shapes mirror the presentation envelopes: `{"ticket": ..}`,
//! `{"tickets": [..], "pagination": {..}}`, `{"message": ..}` and
//! `{"error": ..}`.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Value};
use validator::ValidationErrors;

use tixer::domain::{DomainError, Metadata, Ticket};

#[derive(Debug, Serialize)]
pub struct TicketResponse {
    pub id: String,
    pub title: String,
    pub price: f64,
}

impl From<&Ticket> for TicketResponse {
    fn from(ticket: &Ticket) -> Self {
        Self {
            id: ticket.id.to_string(),
            title: ticket.title.clone(),
            price: ticket.price,
        }
    }
}

/// Empty cursors are rendered as empty strings.
#[derive(Debug, Serialize)]
pub struct PaginationResponse {
    pub after: String,
    pub before: String,
    pub total: i64,
}

impl From<&Metadata> for PaginationResponse {
    fn from(metadata: &Metadata) -> Self {
        Self {
            after: metadata.after.map(|id| id.to_string()).unwrap_or_default(),
            before: metadata.before.map(|id| id.to_string()).unwrap_or_default(),
            total: metadata.total,
        }
    }
}

pub fn ticket(ticket: &Ticket) -> Value {
    json!({ "ticket": TicketResponse::from(ticket) })
}

pub fn tickets(tickets: &[Ticket], metadata: &Metadata) -> Value {
    let list: Vec<TicketResponse> = tickets.iter().map(TicketResponse::from).collect();
    json!({
        "tickets": list,
        "pagination": PaginationResponse::from(metadata),
    })
}

pub fn message(text: impl Into<String>) -> Value {
    json!({ "message": text.into() })
}

pub fn error(err: &DomainError) -> Value {
    match err {
        DomainError::Validation(errors) => json!({ "error": field_messages(errors) }),
        DomainError::NotFound { .. } => {
            json!({ "error": "the requested resource could not be found" })
        }
        other => json!({ "error": other.to_string() }),
    }
}

fn field_messages(errors: &ValidationErrors) -> BTreeMap<String, Vec<String>> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, list)| {
            let messages = list
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}
