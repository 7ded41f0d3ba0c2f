//! Unit of work over one database transaction
//!
//! Ticket inserts and deletes made through a [`UnitOfWork`] adjust the counter
//! aggregate inside the same transaction. The counter has no public write
//! path, so a ticket mutation and its count change commit or abort together.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr,
    EntityTrait, QueryFilter, Set, SqlErr, TransactionTrait,
};
use tracing::{debug, warn};

use super::entities::{counter, ticket};
use crate::domain::ticket::{CounterKey, TicketId};
use crate::domain::{DomainError, DomainResult};

const TICKET: &str = "Ticket";

pub struct UnitOfWork {
    txn: DatabaseTransaction,
    counter: CounterKey,
}

impl UnitOfWork {
    pub async fn begin(db: &DatabaseConnection, counter: CounterKey) -> DomainResult<Self> {
        let txn = db.begin().await?;
        Ok(Self { txn, counter })
    }

    pub async fn find_ticket(&self, id: TicketId) -> DomainResult<Option<ticket::Model>> {
        self.find_ticket_by_key(&id.to_string()).await
    }

    /// Insert a ticket that must not exist yet and count it.
    pub async fn insert_ticket(&self, model: ticket::Model) -> DomainResult<()> {
        if self.find_ticket_by_key(&model.id).await?.is_some() {
            return Err(already_exists(model.id));
        }

        let id = model.id.clone();
        let active = ticket::ActiveModel {
            id: Set(model.id),
            title: Set(model.title),
            price: Set(model.price),
            date_created: Set(model.date_created),
            date_updated: Set(model.date_updated),
        };
        ticket::Entity::insert(active)
            .exec_without_returning(&self.txn)
            .await
            .map_err(|e| match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => already_exists(id),
                _ => DomainError::from(e),
            })?;

        self.adjust_counter(1).await
    }

    /// Write the `Set` fields of `model`. The row must exist.
    pub async fn update_ticket(&self, model: ticket::ActiveModel) -> DomainResult<ticket::Model> {
        let id = match &model.id {
            ActiveValue::Set(id) | ActiveValue::Unchanged(id) => id.clone(),
            ActiveValue::NotSet => String::new(),
        };
        model.update(&self.txn).await.map_err(|e| match e {
            DbErr::RecordNotUpdated => DomainError::not_found(TICKET, id),
            other => DomainError::from(other),
        })
    }

    /// Delete an existing ticket and uncount it.
    pub async fn delete_ticket(&self, id: TicketId) -> DomainResult<()> {
        let result = ticket::Entity::delete_by_id(id.to_string())
            .exec(&self.txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(DomainError::not_found(TICKET, id));
        }

        self.adjust_counter(-1).await
    }

    /// Commit when `outcome` is `Ok`, roll back otherwise.
    pub async fn finish<T>(self, outcome: DomainResult<T>) -> DomainResult<T> {
        match outcome {
            Ok(value) => {
                self.txn.commit().await?;
                Ok(value)
            }
            Err(err) => {
                debug!(error = %err, "Rolling back unit of work");
                if let Err(rollback) = self.txn.rollback().await {
                    warn!(error = %rollback, "Rollback failed");
                }
                Err(err)
            }
        }
    }

    async fn find_ticket_by_key(&self, key: &str) -> DomainResult<Option<ticket::Model>> {
        Ok(ticket::Entity::find_by_id(key.to_owned())
            .one(&self.txn)
            .await?)
    }

    async fn adjust_counter(&self, delta: i64) -> DomainResult<()> {
        let result = counter::Entity::update_many()
            .col_expr(
                counter::Column::TotalTickets,
                Expr::col(counter::Column::TotalTickets).add(delta),
            )
            .filter(counter::Column::Name.eq(self.counter.as_str()))
            .exec(&self.txn)
            .await?;

        if result.rows_affected == 0 {
            return Err(DomainError::CounterNotFound(self.counter.to_string()));
        }
        Ok(())
    }
}

fn already_exists(id: String) -> DomainError {
    DomainError::AlreadyExists {
        entity: TICKET,
        value: id,
    }
}
