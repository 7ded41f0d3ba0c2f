//! # Tixer tickets store
//!
//! Tickets persisted in SQLite next to a counter aggregate that always equals
//! the number of stored tickets.
//!
//! ## Architecture
//!
//! - **domain**: Ticket entity, counter aggregate, pagination types, validation
//!   and the `TicketService` contract
//! - **infrastructure**: SeaORM entities, migrations, unit of work and the
//!   SQLite-backed `TicketService`
//! - **shared**: error taxonomy, operation context, clock and retry helpers

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod shared;
pub mod telemetry;

pub use config::{default_config_path, AppConfig};

// Re-export database types for easy access
pub use infrastructure::{init_database, run_migrations, DatabaseConfig, SeaOrmTicketStore};

pub use telemetry::init_tracing;
