//! Ticket counter aggregate
//!
//! A singleton that tracks how many tickets are currently persisted. It is
//! only ever written inside the same unit of work as a ticket insert or delete.

use std::borrow::Cow;
use std::fmt;

use validator::{ValidationError, ValidationErrors};

use super::model::TicketId;

/// Key used when no counter key is configured.
pub const DEFAULT_COUNTER_KEY: &str = "--counter--";

/// Reserved identity of the counter aggregate.
///
/// A key that parses as a [`TicketId`] is rejected, so the counter can never
/// be confused with a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterKey(String);

impl CounterKey {
    pub fn new(key: impl Into<String>) -> Result<Self, ValidationErrors> {
        let key = key.into();
        let violation = if key.trim().is_empty() {
            ("required", "must be provided")
        } else if key.parse::<TicketId>().is_ok() {
            ("reserved", "must not be a valid ticket id")
        } else {
            return Ok(Self(key));
        };

        let mut error = ValidationError::new(violation.0);
        error.message = Some(Cow::Borrowed(violation.1));
        let mut errors = ValidationErrors::new();
        errors.add("counter_key", error);
        Err(errors)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CounterKey {
    fn default() -> Self {
        Self(DEFAULT_COUNTER_KEY.to_string())
    }
}

impl fmt::Display for CounterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketCounter {
    pub key: CounterKey,
    pub total_tickets: i64,
}
