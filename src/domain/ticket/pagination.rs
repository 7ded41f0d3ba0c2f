//! Cursor pagination value types

use validator::Validate;

use super::model::TicketId;

pub const DEFAULT_PAGE_LIMIT: u64 = 10;
/// Upper page bound enforced by callers; the store accepts any limit.
pub const MAX_PAGE_LIMIT: u64 = 50;

/// Query for one page of tickets, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct Filter {
    /// Start strictly after this ticket.
    pub after: Option<TicketId>,
    /// End strictly before this ticket.
    pub before: Option<TicketId>,
    #[validate(range(min = 1, max = 50, message = "must be in the interval [1, 50]"))]
    pub limit: u64,
}

impl Filter {
    pub fn new(limit: u64) -> Self {
        Self {
            after: None,
            before: None,
            limit,
        }
    }

    pub fn after(mut self, id: TicketId) -> Self {
        self.after = Some(id);
        self
    }

    pub fn before(mut self, id: TicketId) -> Self {
        self.before = Some(id);
        self
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_LIMIT)
    }
}

/// Boundary cursors of the page just returned plus the current total.
///
/// `before` is the first ticket of the page and `after` the last; both are
/// `None` for an empty page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub after: Option<TicketId>,
    pub before: Option<TicketId>,
    pub total: i64,
}
