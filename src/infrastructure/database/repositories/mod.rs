//! Database repository implementations

pub mod ticket_repository;

pub use ticket_repository::SeaOrmTicketStore;
