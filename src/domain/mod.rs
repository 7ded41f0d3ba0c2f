pub mod ticket;

pub use ticket::{
    CounterKey, Filter, Metadata, Ticket, TicketCounter, TicketId, TicketService, TicketUpdate,
};

pub use crate::shared::{DomainError, ErrorKind};

pub type DomainResult<T> = Result<T, DomainError>;
