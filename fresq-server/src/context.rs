//! fresq-server/src/context.rs
//!
//! Everything a command needs: the pool, the event bus and the services
//! wired on top of the Postgres repositories.

use std::sync::Arc;
use tracing::info;
use fresq_core::Database;
use fresq_core::Error;
use fresq_core::eventbus::EventBus;
use fresq_core::repositories::{
    PostgresCodeRepository, PostgresGridConfigRepository, PostgresPackRepository,
    PostgresTicketRepository, PostgresTierRepository,
};
use fresq_core::services::{AdminService, CanvasService, TicketService, TierService};

use crate::Args;

pub struct ServerContext {
    pub db: Database,
    pub event_bus: Arc<EventBus>,
    pub canvas: CanvasService,
    pub tiers: TierService,
    pub tickets: TicketService,
    pub admin: AdminService,
}

impl ServerContext {
    /// Connects, applies migrations and builds the services.
    pub async fn new(args: &Args) -> Result<Self, Error> {
        let db = Database::with_max_connections(&args.database_url, args.max_connections).await?;
        db.migrate().await?;

        let pool = db.pool().clone();
        let codes = Arc::new(PostgresCodeRepository::new(pool.clone()));
        let grid = Arc::new(PostgresGridConfigRepository::new(pool.clone()));
        let tiers = Arc::new(PostgresTierRepository::new(pool.clone()));
        let tickets = Arc::new(PostgresTicketRepository::new(pool.clone()));
        let packs = Arc::new(PostgresPackRepository::new(pool));

        let event_bus = Arc::new(EventBus::with_buffer_size(args.event_buffer));

        info!("Server context ready (event buffer={})", args.event_buffer);
        Ok(Self {
            canvas: CanvasService::new(codes.clone(), grid.clone(), event_bus.clone()),
            tiers: TierService::new(tiers, event_bus.clone()),
            tickets: TicketService::new(tickets.clone(), packs.clone(), event_bus.clone()),
            admin: AdminService::new(codes, grid, tickets, packs, event_bus.clone()),
            event_bus,
            db,
        })
    }
}
