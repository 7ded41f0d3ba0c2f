//! Ticket service contract

use async_trait::async_trait;

use super::model::{Ticket, TicketId, TicketUpdate};
use super::pagination::{Filter, Metadata};
use crate::domain::DomainResult;
use crate::shared::OperationContext;

/// Operations the presentation layer invokes on the ticket store.
///
/// Field content is expected to be validated by the caller; implementations
/// only check structural preconditions such as existence.
#[async_trait]
pub trait TicketService: Send + Sync {
    /// Persist a new ticket and count it, atomically. Returns the stored form.
    async fn create_ticket(&self, ctx: &OperationContext, ticket: Ticket) -> DomainResult<Ticket>;

    async fn read_ticket(&self, ctx: &OperationContext, id: TicketId) -> DomainResult<Ticket>;

    /// Apply the supplied fields, then re-read the ticket outside the
    /// transaction. The returned value may reflect a later concurrent write.
    async fn update_ticket(
        &self,
        ctx: &OperationContext,
        update: TicketUpdate,
    ) -> DomainResult<Ticket>;

    async fn delete_ticket(&self, ctx: &OperationContext, id: TicketId) -> DomainResult<()>;

    /// One page ordered by creation time, newest first.
    async fn read_tickets(
        &self,
        ctx: &OperationContext,
        filter: Filter,
    ) -> DomainResult<(Vec<Ticket>, Metadata)>;
}
