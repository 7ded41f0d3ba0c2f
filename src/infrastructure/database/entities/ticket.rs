//! Ticket entity for database

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// Ticket row. `id` holds the hyphenated uuid of the ticket.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "tickets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub title: String,
    pub price: f64,
    /// Assigned once by the store on insert
    pub date_created: DateTime<Utc>,
    /// Assigned by the store on every update, `None` until the first one
    pub date_updated: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
