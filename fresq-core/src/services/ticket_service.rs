// File: fresq-core/src/services/ticket_service.rs

use std::sync::Arc;
use tracing::info;

use crate::Error;
use crate::eventbus::EventBus;
use crate::models::{NewTicket, PackConfig, Ticket, TicketConfirmation};
use crate::repositories::{PackRepository, TicketRepository};
use crate::services::tier_service::broadcast_upgrade;
use crate::utils::validate::{clamp_limit, validate_email};
use fresq_common::error::ValidationError;

/// Orders and their conversion into codes.
pub struct TicketService {
    tickets: Arc<dyn TicketRepository>,
    packs: Arc<dyn PackRepository>,
    event_bus: Arc<EventBus>,
}

impl TicketService {
    pub fn new(
        tickets: Arc<dyn TicketRepository>,
        packs: Arc<dyn PackRepository>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self { tickets, packs, event_bus }
    }

    /// Pending single-unit order.
    pub async fn create_ticket(&self, email: &str) -> Result<Ticket, Error> {
        let email = validate_email(email)?;
        self.tickets.create_ticket(&NewTicket::single(email)).await
    }

    pub async fn available_packs(&self) -> Result<Vec<PackConfig>, Error> {
        self.packs.list_active_packs().await
    }

    /// Pending order for an active pack, priced and split as the pack says.
    pub async fn create_pack_purchase(&self, email: &str, pack_key: &str) -> Result<Ticket, Error> {
        let email = validate_email(email)?;
        let key = pack_key.trim().to_lowercase();
        let pack = self
            .packs
            .get_active_pack(&key)
            .await?
            .ok_or(ValidationError::UnknownPack(key))?;
        self.tickets.create_ticket(&NewTicket::for_pack(email, &pack)).await
    }

    /// Marks the order paid and mints its codes. Works for single tickets
    /// and packs alike.
    pub async fn confirm_payment(&self, order_id: &str) -> Result<TicketConfirmation, Error> {
        let confirmation = self.tickets.confirm_payment(order_id.trim()).await?;
        info!(
            "Order {} confirmed with {} code(s); upgraded: {}",
            confirmation.ticket.order_id,
            confirmation.codes.len(),
            confirmation.tier_upgrade.is_upgraded()
        );
        broadcast_upgrade(&self.event_bus, &confirmation.tier_upgrade).await;
        Ok(confirmation)
    }

    pub async fn cancel_ticket(&self, order_id: &str) -> Result<Ticket, Error> {
        self.tickets.cancel_ticket(order_id.trim()).await
    }

    pub async fn get_ticket(&self, order_id: &str) -> Result<Option<Ticket>, Error> {
        self.tickets.get_by_order_id(order_id.trim()).await
    }

    pub async fn tickets_for_email(&self, email: &str) -> Result<Vec<Ticket>, Error> {
        let email = validate_email(email)?;
        self.tickets.list_for_email(&email).await
    }

    pub async fn recent_tickets(&self, limit: i64) -> Result<Vec<Ticket>, Error> {
        self.tickets.list_recent(clamp_limit(limit)).await
    }
}
