//! Infrastructure layer - external concerns

pub mod database;

pub use database::{init_database, run_migrations, DatabaseConfig, SeaOrmTicketStore};
