//! Ticket aggregate
//!
//! Contains the Ticket entity, the counter aggregate that tracks how many
//! tickets exist, cursor pagination types and the service contract.

pub mod counter;
pub mod model;
pub mod pagination;
pub mod repository;

pub use counter::{CounterKey, TicketCounter, DEFAULT_COUNTER_KEY};
pub use model::{Ticket, TicketId, TicketUpdate, MAX_PRICE, MAX_TITLE_CHARS};
pub use pagination::{Filter, Metadata, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
pub use repository::TicketService;
