//! SeaORM implementation of TicketService
//!
//! Tickets and the counter aggregate live in the same SQLite database. Every
//! create, update and delete runs as one [`UnitOfWork`], retried with backoff
//! when SQLite reports a transient failure. Reads go straight to the pool.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::{debug, error, info};

use crate::domain::ticket::{
    CounterKey, Filter, Metadata, Ticket, TicketCounter, TicketId, TicketService, TicketUpdate,
};
use crate::domain::{DomainError, DomainResult, ErrorKind};
use crate::infrastructure::database::entities::{counter, ticket};
use crate::infrastructure::database::unit_of_work::UnitOfWork;
use crate::shared::{retry_with_backoff, Clock, OperationContext, RetryConfig, SystemClock};

const TICKET: &str = "Ticket";

// ── Conversion helpers ──────────────────────────────────────────

fn entity_to_domain(t: ticket::Model) -> DomainResult<Ticket> {
    let id = t
        .id
        .parse::<TicketId>()
        .map_err(|e| DomainError::Decode(format!("ticket id {:?}: {}", t.id, e)))?;
    Ok(Ticket {
        id,
        title: t.title,
        price: t.price,
        date_created: Some(t.date_created),
        date_updated: t.date_updated,
    })
}

/// `date_updated` for the next write: the clock reading, pushed past the
/// previous stamp when the clock has not moved on.
fn next_update_stamp(now: DateTime<Utc>, previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    match previous {
        Some(previous) if now <= previous => previous + Duration::microseconds(1),
        _ => now,
    }
}

/// Rows strictly after `anchor` in `date_created DESC, id DESC` order.
fn older_than(anchor: &ticket::Model) -> Condition {
    Condition::any()
        .add(ticket::Column::DateCreated.lt(anchor.date_created))
        .add(
            Condition::all()
                .add(ticket::Column::DateCreated.eq(anchor.date_created))
                .add(ticket::Column::Id.lt(anchor.id.clone())),
        )
}

/// Rows strictly before `anchor` in `date_created DESC, id DESC` order.
fn newer_than(anchor: &ticket::Model) -> Condition {
    Condition::any()
        .add(ticket::Column::DateCreated.gt(anchor.date_created))
        .add(
            Condition::all()
                .add(ticket::Column::DateCreated.eq(anchor.date_created))
                .add(ticket::Column::Id.gt(anchor.id.clone())),
        )
}

/// Record the outcome and latency of one store operation.
async fn instrumented<T, F>(operation: &'static str, future: F) -> DomainResult<T>
where
    F: Future<Output = DomainResult<T>>,
{
    let start = Instant::now();
    let result = future.await;
    let duration = start.elapsed().as_secs_f64();

    let outcome = match &result {
        Ok(_) => "ok",
        Err(err) => {
            match err.kind() {
                ErrorKind::Unavailable | ErrorKind::Internal | ErrorKind::CounterNotFound => {
                    error!(operation, error = %err, "Ticket store operation failed")
                }
                _ => debug!(operation, error = %err, "Ticket store operation rejected"),
            }
            err.kind().as_str()
        }
    };

    metrics::counter!("ticket_store_operations_total", "operation" => operation, "outcome" => outcome)
        .increment(1);
    metrics::histogram!("ticket_store_operation_duration_seconds", "operation" => operation)
        .record(duration);

    result
}

// ── SeaOrmTicketStore ───────────────────────────────────────────

#[derive(Clone)]
pub struct SeaOrmTicketStore {
    db: DatabaseConnection,
    counter: CounterKey,
    clock: Arc<dyn Clock>,
    retry: RetryConfig,
}

impl SeaOrmTicketStore {
    pub fn new(db: DatabaseConnection, counter: CounterKey) -> Self {
        Self {
            db,
            counter,
            clock: Arc::new(SystemClock),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Create the configured counter row if it is missing, initialised to the
    /// number of tickets already stored. An existing row is left untouched.
    pub async fn provision_counter(&self) -> DomainResult<TicketCounter> {
        let txn = self.db.begin().await?;

        let existing = counter::Entity::find_by_id(self.counter.as_str().to_owned())
            .one(&txn)
            .await?;

        let row = match existing {
            Some(row) => row,
            None => {
                let total = ticket::Entity::find().count(&txn).await? as i64;
                let row = counter::ActiveModel {
                    name: Set(self.counter.as_str().to_owned()),
                    total_tickets: Set(total),
                }
                .insert(&txn)
                .await?;
                info!(counter = %self.counter, total, "Counter provisioned");
                row
            }
        };

        txn.commit().await?;
        Ok(TicketCounter {
            key: self.counter.clone(),
            total_tickets: row.total_tickets,
        })
    }

    pub async fn read_counter(&self) -> DomainResult<TicketCounter> {
        let row = counter::Entity::find_by_id(self.counter.as_str().to_owned())
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::CounterNotFound(self.counter.to_string()))?;
        Ok(TicketCounter {
            key: self.counter.clone(),
            total_tickets: row.total_tickets,
        })
    }

    async fn begin(&self) -> DomainResult<UnitOfWork> {
        UnitOfWork::begin(&self.db, self.counter.clone()).await
    }

    async fn find_row(&self, id: TicketId) -> DomainResult<ticket::Model> {
        ticket::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::not_found(TICKET, id))
    }

    /// One create attempt. On a retry, a row that already holds the draft's
    /// title and price is taken as the commit of an earlier attempt whose
    /// reply was lost.
    async fn create_once(&self, draft: &Ticket, retried: bool) -> DomainResult<Ticket> {
        let row = ticket::Model {
            id: draft.id.to_string(),
            title: draft.title.clone(),
            price: draft.price,
            date_created: self.clock.now(),
            date_updated: None,
        };

        let uow = self.begin().await?;
        let outcome = uow.insert_ticket(row.clone()).await;
        match uow.finish(outcome).await {
            Ok(()) => entity_to_domain(row),
            Err(err @ DomainError::AlreadyExists { .. }) if retried => {
                match ticket::Entity::find_by_id(row.id).one(&self.db).await? {
                    Some(stored) if stored.title == draft.title && stored.price == draft.price => {
                        debug!(ticket_id = %draft.id, "Create already committed by an earlier attempt");
                        entity_to_domain(stored)
                    }
                    _ => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    async fn update_once(&self, update: &TicketUpdate) -> DomainResult<()> {
        let uow = self.begin().await?;
        let outcome = self.apply_update(&uow, update).await;
        uow.finish(outcome).await
    }

    async fn apply_update(&self, uow: &UnitOfWork, update: &TicketUpdate) -> DomainResult<()> {
        let existing = uow
            .find_ticket(update.id)
            .await?
            .ok_or_else(|| DomainError::not_found(TICKET, update.id))?;

        let stamp = next_update_stamp(self.clock.now(), existing.date_updated);
        let mut model: ticket::ActiveModel = existing.into();
        if let Some(title) = &update.title {
            model.title = Set(title.clone());
        }
        if let Some(price) = update.price {
            model.price = Set(price);
        }
        model.date_updated = Set(Some(stamp));

        uow.update_ticket(model).await?;
        Ok(())
    }

    async fn delete_once(&self, id: TicketId) -> DomainResult<()> {
        let uow = self.begin().await?;
        let outcome = uow.delete_ticket(id).await;
        uow.finish(outcome).await
    }

    async fn read_page(&self, filter: &Filter) -> DomainResult<(Vec<Ticket>, Metadata)> {
        let after = match filter.after {
            Some(id) => Some(self.find_row(id).await?),
            None => None,
        };
        let before = match filter.before {
            Some(id) => Some(self.find_row(id).await?),
            None => None,
        };

        let rows = if filter.limit == 0 {
            Vec::new()
        } else {
            let mut query = ticket::Entity::find();
            if let Some(anchor) = &after {
                query = query.filter(older_than(anchor));
            }
            if let Some(anchor) = &before {
                query = query.filter(newer_than(anchor));
            }

            // A lone `before` cursor keeps the newest rows of the range
            query
                .order_by_desc(ticket::Column::DateCreated)
                .order_by_desc(ticket::Column::Id)
                .limit(filter.limit)
                .all(&self.db)
                .await?
        };

        // Not read with the page: a concurrent create or delete can skew it by one
        let total = self.read_counter().await?.total_tickets;

        let tickets = rows
            .into_iter()
            .map(entity_to_domain)
            .collect::<DomainResult<Vec<_>>>()?;
        let metadata = Metadata {
            before: tickets.first().map(|t| t.id),
            after: tickets.last().map(|t| t.id),
            total,
        };
        Ok((tickets, metadata))
    }
}

#[async_trait]
impl TicketService for SeaOrmTicketStore {
    async fn create_ticket(&self, ctx: &OperationContext, ticket: Ticket) -> DomainResult<Ticket> {
        instrumented(
            "create_ticket",
            ctx.run(async {
                let mut attempt = 0;
                let stored = retry_with_backoff(
                    self.retry.clone(),
                    || {
                        attempt += 1;
                        self.create_once(&ticket, attempt > 1)
                    },
                    DomainError::is_transient,
                    "create_ticket",
                )
                .await?;
                info!(ticket_id = %stored.id, "Ticket created");
                Ok(stored)
            }),
        )
        .await
    }

    async fn read_ticket(&self, ctx: &OperationContext, id: TicketId) -> DomainResult<Ticket> {
        instrumented(
            "read_ticket",
            ctx.run(async { entity_to_domain(self.find_row(id).await?) }),
        )
        .await
    }

    async fn update_ticket(
        &self,
        ctx: &OperationContext,
        update: TicketUpdate,
    ) -> DomainResult<Ticket> {
        instrumented(
            "update_ticket",
            ctx.run(async {
                retry_with_backoff(
                    self.retry.clone(),
                    || self.update_once(&update),
                    DomainError::is_transient,
                    "update_ticket",
                )
                .await?;
                info!(ticket_id = %update.id, "Ticket updated");

                // Outside the unit of work: may observe a later concurrent write
                entity_to_domain(self.find_row(update.id).await?)
            }),
        )
        .await
    }

    async fn delete_ticket(&self, ctx: &OperationContext, id: TicketId) -> DomainResult<()> {
        instrumented(
            "delete_ticket",
            ctx.run(async {
                retry_with_backoff(
                    self.retry.clone(),
                    || self.delete_once(id),
                    DomainError::is_transient,
                    "delete_ticket",
                )
                .await?;
                info!(ticket_id = %id, "Ticket deleted");
                Ok(())
            }),
        )
        .await
    }

    async fn read_tickets(
        &self,
        ctx: &OperationContext,
        filter: Filter,
    ) -> DomainResult<(Vec<Ticket>, Metadata)> {
        instrumented(
            "read_tickets",
            ctx.run(async {
                let (tickets, metadata) = self.read_page(&filter).await?;
                debug!(
                    returned = tickets.len(),
                    total = metadata.total,
                    limit = filter.limit,
                    "Tickets listed"
                );
                Ok((tickets, metadata))
            }),
        )
        .await
    }
}
