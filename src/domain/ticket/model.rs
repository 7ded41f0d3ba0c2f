//! Ticket domain entity

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidateLength, ValidateRange, ValidationError, ValidationErrors};

/// Longest accepted title, in characters.
pub const MAX_TITLE_CHARS: u64 = 50;
/// Highest accepted price (inclusive). Prices must also be strictly positive.
pub const MAX_PRICE: f64 = 100_000.0;

const TITLE_MESSAGE: &str = "must be between 1 and 50 characters";
const PRICE_MESSAGE: &str = "must be in the range (0, 100 000]";

/// Unique identifier of a ticket, generated by the caller before creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(Uuid);

impl TicketId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TicketId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for TicketId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A ticket as seen by the domain.
///
/// `date_created` and `date_updated` are assigned by the store; values set by
/// the caller are ignored on create.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct Ticket {
    pub id: TicketId,
    #[validate(length(min = 1, max = 50, message = "must be between 1 and 50 characters"))]
    pub title: String,
    #[validate(
        range(exclusive_min = 0.0, max = 100_000.0, message = "must be in the range (0, 100 000]"),
        custom(function = "finite_price")
    )]
    pub price: f64,
    pub date_created: Option<DateTime<Utc>>,
    pub date_updated: Option<DateTime<Utc>>,
}

impl Ticket {
    /// New, not yet persisted ticket with a freshly generated id.
    pub fn new(title: impl Into<String>, price: f64) -> Self {
        Self {
            id: TicketId::new(),
            title: title.into(),
            price,
            date_created: None,
            date_updated: None,
        }
    }

    pub fn validate_title(&self) -> Result<(), ValidationErrors> {
        if self.title.validate_length(Some(1), Some(MAX_TITLE_CHARS), None) {
            Ok(())
        } else {
            Err(field_error("title", "length", TITLE_MESSAGE))
        }
    }

    pub fn validate_price(&self) -> Result<(), ValidationErrors> {
        if self.price.is_finite() && self.price.validate_range(None, Some(MAX_PRICE), Some(0.0), None) {
            Ok(())
        } else {
            Err(field_error("price", "range", PRICE_MESSAGE))
        }
    }
}

/// Partial update of a ticket. `None` leaves the stored field unchanged and
/// is not validated.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct TicketUpdate {
    pub id: TicketId,
    #[validate(length(min = 1, max = 50, message = "must be between 1 and 50 characters"))]
    pub title: Option<String>,
    #[validate(
        range(exclusive_min = 0.0, max = 100_000.0, message = "must be in the range (0, 100 000]"),
        custom(function = "finite_price")
    )]
    pub price: Option<f64>,
}

impl TicketUpdate {
    pub fn new(id: TicketId) -> Self {
        Self {
            id,
            title: None,
            price: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }
}

// NaN slips through range comparisons.
fn finite_price(price: f64) -> Result<(), ValidationError> {
    if price.is_finite() {
        Ok(())
    } else {
        let mut error = ValidationError::new("range");
        error.message = Some(Cow::Borrowed(PRICE_MESSAGE));
        Err(error)
    }
}

fn field_error(field: &'static str, code: &'static str, message: &'static str) -> ValidationErrors {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    let mut errors = ValidationErrors::new();
    errors.add(field, error);
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Ticket {
        Ticket::new("Concert", 120.5)
    }

    #[test]
    fn new_ticket_has_no_timestamps() {
        let t = sample();
        assert!(t.date_created.is_none());
        assert!(t.date_updated.is_none());
        assert!(t.validate().is_ok());
    }

    #[test]
    fn new_tickets_get_distinct_ids() {
        assert_ne!(sample().id, sample().id);
    }

    #[test]
    fn empty_title_is_rejected() {
        let mut t = sample();
        t.title = String::new();
        let errors = t.validate_title().unwrap_err();
        assert!(errors.field_errors().contains_key("title"));
    }

    #[test]
    fn title_limit_counts_characters_not_bytes() {
        let mut t = sample();
        t.title = "é".repeat(50);
        assert!(t.validate_title().is_ok());

        t.title = "a".repeat(51);
        assert!(t.validate_title().is_err());
    }

    #[test]
    fn price_bounds_are_open_below_and_closed_above() {
        let mut t = sample();
        for ok in [0.01, 1.0, MAX_PRICE] {
            t.price = ok;
            assert!(t.validate_price().is_ok(), "{ok} should be accepted");
        }
        for bad in [0.0, -1.0, MAX_PRICE + 0.01, f64::NAN, f64::INFINITY] {
            t.price = bad;
            assert!(t.validate_price().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn validate_reports_every_failing_field() {
        let t = Ticket::new("", 0.0);
        let errors = t.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("price"));
    }

    #[test]
    fn update_validates_only_supplied_fields() {
        let id = TicketId::new();
        assert!(TicketUpdate::new(id).validate().is_ok());
        assert!(TicketUpdate::new(id).title("Opera").validate().is_ok());

        let errors = TicketUpdate::new(id).price(-3.0).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("price"));
        assert!(!errors.field_errors().contains_key("title"));
    }

    #[test]
    fn explicit_empty_title_in_update_is_invalid() {
        let update = TicketUpdate::new(TicketId::new()).title("");
        assert!(update.validate().is_err());
    }

    #[test]
    fn derived_rules_agree_with_field_validators() {
        for (title, price) in [
            ("", 1.0),
            ("ok", 0.0),
            ("ok", f64::NAN),
            ("ok", MAX_PRICE),
            ("x", 0.01),
        ] {
            let mut t = sample();
            t.title = title.to_string();
            t.price = price;
            let by_field = t.validate_title().is_ok() && t.validate_price().is_ok();
            assert_eq!(t.validate().is_ok(), by_field, "{title:?} / {price}");

            let update = TicketUpdate::new(t.id).title(title).price(price);
            assert_eq!(update.validate().is_ok(), by_field, "update {title:?} / {price}");
        }

        let long = TicketUpdate::new(TicketId::new()).title("a".repeat(51));
        let errors = long.validate().unwrap_err();
        assert_eq!(errors.field_errors()["title"][0].code, "length");
    }

    #[test]
    fn ticket_id_display_round_trips() {
        let id = TicketId::new();
        let parsed: TicketId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<TicketId>().is_err());
    }
}
