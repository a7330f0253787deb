// File: fresq-core/tests/common/mod.rs
//
// Repository doubles and fixtures shared by the service tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use mockall::mock;
use uuid::Uuid;
use fresq_core::Error;
use fresq_core::models::{
    CellState, ClaimOutcome, Code, CodeSource, CodeStats, GridConfig, NewTicket, PackConfig,
    PackStats, PackUpdate, PaintOutcome, PaintedCell, Palette, Ticket, TicketConfirmation,
    TicketStats, TicketStatus, Tier, TierProgress, TierUpgrade,
};
use fresq_core::repositories::{
    CodeRepository, GridConfigRepository, PackRepository, TicketRepository, TierRepository,
};

mock! {
    pub CodeRepo {}
    #[async_trait]
    impl CodeRepository for CodeRepo {
        async fn get_by_code(&self, code: &str) -> Result<Option<Code>, Error>;
        async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Code>, Error>;
        async fn list_recent(&self, limit: i64) -> Result<Vec<Code>, Error>;
        async fn find_at(&self, x: i32, y: i32) -> Result<Option<Code>, Error>;
        async fn is_cell_taken(&self, x: i32, y: i32) -> Result<bool, Error>;
        async fn painted_cells(&self) -> Result<Vec<PaintedCell>, Error>;
        async fn claim_cell(&self, code: &str, x: i32, y: i32) -> Result<ClaimOutcome, Error>;
        async fn paint_cell(&self, code: &str, color: i16) -> Result<PaintOutcome, Error>;
        async fn clear_cell(&self, x: i32, y: i32) -> Result<Option<Code>, Error>;
        async fn reset_cell_color(&self, x: i32, y: i32) -> Result<Option<Code>, Error>;
        async fn reset_all_cells(&self) -> Result<u64, Error>;
        async fn create_admin_codes(&self, count: usize) -> Result<Vec<Code>, Error>;
        async fn stats(&self) -> Result<CodeStats, Error>;
    }
}

mock! {
    pub GridRepo {}
    #[async_trait]
    impl GridConfigRepository for GridRepo {
        async fn get_config(&self) -> Result<GridConfig, Error>;
        async fn update_palette(&self, palette: &Palette) -> Result<GridConfig, Error>;
    }
}

mock! {
    pub TierRepo {}
    #[async_trait]
    impl TierRepository for TierRepo {
        async fn list_tiers(&self) -> Result<Vec<Tier>, Error>;
        async fn count_paid_tickets(&self) -> Result<i64, Error>;
        async fn current_tier(&self) -> Result<Tier, Error>;
        async fn tier_progress(&self) -> Result<TierProgress, Error>;
        async fn evaluate_upgrade(&self) -> Result<TierUpgrade, Error>;
    }
}

mock! {
    pub TicketRepo {}
    #[async_trait]
    impl TicketRepository for TicketRepo {
        async fn create_ticket(&self, new_ticket: &NewTicket) -> Result<Ticket, Error>;
        async fn get_by_order_id(&self, order_id: &str) -> Result<Option<Ticket>, Error>;
        async fn list_for_email(&self, email: &str) -> Result<Vec<Ticket>, Error>;
        async fn list_recent(&self, limit: i64) -> Result<Vec<Ticket>, Error>;
        async fn confirm_payment(&self, order_id: &str) -> Result<TicketConfirmation, Error>;
        async fn cancel_ticket(&self, order_id: &str) -> Result<Ticket, Error>;
        async fn stats(&self) -> Result<TicketStats, Error>;
    }
}

mock! {
    pub PackRepo {}
    #[async_trait]
    impl PackRepository for PackRepo {
        async fn list_active_packs(&self) -> Result<Vec<PackConfig>, Error>;
        async fn get_active_pack(&self, pack_key: &str) -> Result<Option<PackConfig>, Error>;
        async fn create_pack(&self, pack: &PackConfig) -> Result<PackConfig, Error>;
        async fn update_pack(&self, pack_key: &str, update: &PackUpdate) -> Result<PackConfig, Error>;
        async fn delete_pack(&self, pack_key: &str) -> Result<bool, Error>;
        async fn pack_stats(&self) -> Result<Vec<PackStats>, Error>;
    }
}

pub fn palette() -> Palette {
    Palette::new(
        [
            "#000000", "#FFFFFF", "#E53935", "#FB8C00", "#FDD835",
            "#43A047", "#1E88E5", "#8E24AA", "#6D4C41", "#9E9E9E",
        ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
    )
        .expect("seed palette is valid")
}

pub fn grid(width: i32, height: i32, state_version: i64) -> GridConfig {
    GridConfig {
        grid_width: width,
        grid_height: height,
        state_version,
        palette: palette(),
        updated_at: Utc::now(),
    }
}

pub fn tier(number: i32, min: i64, max: Option<i64>, size: i32) -> Tier {
    Tier {
        tier_id: Uuid::new_v4(),
        tier_number: number,
        min_tickets: min,
        max_tickets: max,
        grid_width: size,
        grid_height: size,
        prize_amount_cents: 0,
        is_active: true,
    }
}

pub fn code(value: &str, cell: CellState) -> Code {
    Code {
        code_id: Uuid::new_v4(),
        code: value.to_string(),
        user_id: None,
        cell,
        source: CodeSource::Purchased,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn ticket(order_id: &str, status: TicketStatus, base: i32, bonus: i32) -> Ticket {
    Ticket {
        ticket_id: Uuid::new_v4(),
        order_id: order_id.to_string(),
        email: "buyer@example.com".to_string(),
        user_id: Some(Uuid::new_v4()),
        payment_provider: "manual".to_string(),
        payment_session_id: None,
        amount_cents: 200 * i64::from(base),
        base_quantity: base,
        bonus_quantity: bonus,
        quantity: base + bonus,
        status,
        tier_id: None,
        code_id: None,
        created_at: Utc::now(),
        paid_at: None,
        refunded_at: None,
    }
}

pub fn pack(key: &str, base: i32, bonus: i32, price_cents: i64) -> PackConfig {
    PackConfig {
        pack_key: key.to_string(),
        label: key.to_string(),
        base_tickets: base,
        bonus_tickets: bonus,
        total_tickets: base + bonus,
        price_cents,
        discount_percent: 0,
        display_order: 0,
        is_active: true,
    }
}
