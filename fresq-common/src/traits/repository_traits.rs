use async_trait::async_trait;
use uuid::Uuid;
use crate::error::Error;
use crate::models::{
    ClaimOutcome, Code, CodeStats, GridConfig, NewTicket, PackConfig, PackStats, PackUpdate,
    PaintOutcome, PaintedCell, Palette, Ticket, TicketConfirmation, TicketStats, Tier,
    TierProgress, TierUpgrade,
};

/// Codes and the cells they hold.
///
/// `claim_cell` / `paint_cell` each run in one transaction with the code row
/// locked. `clear_cell`, `reset_cell_color` and `reset_all_cells` bump the
/// grid `state_version` in the same transaction.
#[async_trait]
pub trait CodeRepository: Send + Sync {
    async fn get_by_code(&self, code: &str) -> Result<Option<Code>, Error>;
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Code>, Error>;
    async fn list_recent(&self, limit: i64) -> Result<Vec<Code>, Error>;

    /// The code occupying `(x, y)`, if any.
    async fn find_at(&self, x: i32, y: i32) -> Result<Option<Code>, Error>;
    async fn is_cell_taken(&self, x: i32, y: i32) -> Result<bool, Error>;
    async fn painted_cells(&self) -> Result<Vec<PaintedCell>, Error>;

    async fn claim_cell(&self, code: &str, x: i32, y: i32) -> Result<ClaimOutcome, Error>;
    async fn paint_cell(&self, code: &str, color: i16) -> Result<PaintOutcome, Error>;

    /// Resets position and colour of the code at `(x, y)`. Returns the code
    /// as it was before the reset.
    async fn clear_cell(&self, x: i32, y: i32) -> Result<Option<Code>, Error>;
    /// Resets only the colour of the code at `(x, y)`. Returns the code as it
    /// was before; an unpainted code is returned untouched and the version is
    /// not bumped.
    async fn reset_cell_color(&self, x: i32, y: i32) -> Result<Option<Code>, Error>;
    /// Clears every position and colour. Returns the number of codes touched.
    async fn reset_all_cells(&self) -> Result<u64, Error>;

    /// Mints `count` ownerless codes.
    async fn create_admin_codes(&self, count: usize) -> Result<Vec<Code>, Error>;
    async fn stats(&self) -> Result<CodeStats, Error>;
}

#[async_trait]
pub trait GridConfigRepository: Send + Sync {
    async fn get_config(&self) -> Result<GridConfig, Error>;
    async fn update_palette(&self, palette: &Palette) -> Result<GridConfig, Error>;
}

#[async_trait]
pub trait TierRepository: Send + Sync {
    async fn list_tiers(&self) -> Result<Vec<Tier>, Error>;
    async fn count_paid_tickets(&self) -> Result<i64, Error>;
    async fn current_tier(&self) -> Result<Tier, Error>;
    async fn tier_progress(&self) -> Result<TierProgress, Error>;

    /// Runs the upgrade check in its own transaction, expanding the grid when
    /// a higher tier is due.
    async fn evaluate_upgrade(&self) -> Result<TierUpgrade, Error>;
}

#[async_trait]
pub trait TicketRepository: Send + Sync {
    async fn create_ticket(&self, new_ticket: &NewTicket) -> Result<Ticket, Error>;
    async fn get_by_order_id(&self, order_id: &str) -> Result<Option<Ticket>, Error>;
    async fn list_for_email(&self, email: &str) -> Result<Vec<Ticket>, Error>;
    async fn list_recent(&self, limit: i64) -> Result<Vec<Ticket>, Error>;

    /// Converts a pending ticket into codes, marks it paid and evaluates the
    /// tier upgrade, all in one transaction.
    async fn confirm_payment(&self, order_id: &str) -> Result<TicketConfirmation, Error>;
    async fn cancel_ticket(&self, order_id: &str) -> Result<Ticket, Error>;
    async fn stats(&self) -> Result<TicketStats, Error>;
}

#[async_trait]
pub trait PackRepository: Send + Sync {
    async fn list_active_packs(&self) -> Result<Vec<PackConfig>, Error>;
    async fn get_active_pack(&self, pack_key: &str) -> Result<Option<PackConfig>, Error>;

    /// Inserts a validated pack; an existing key is a `pack_exists` conflict.
    async fn create_pack(&self, pack: &PackConfig) -> Result<PackConfig, Error>;
    /// Applies `update` to the locked row, active or not.
    async fn update_pack(&self, pack_key: &str, update: &PackUpdate) -> Result<PackConfig, Error>;
    /// Returns whether a row was removed.
    async fn delete_pack(&self, pack_key: &str) -> Result<bool, Error>;
    async fn pack_stats(&self) -> Result<Vec<PackStats>, Error>;
}
