// File: fresq-core/src/services/admin_service.rs

use std::sync::Arc;
use serde::Serialize;
use tracing::{info, warn};

use crate::Error;
use crate::eventbus::{CanvasEvent, EventBus};
use crate::models::{
    Code, CodeStats, GridConfig, NewPackConfig, PackConfig, PackStats, PackUpdate, Palette,
    TicketStats,
};
use crate::repositories::{CodeRepository, GridConfigRepository, PackRepository, TicketRepository};
use crate::utils::validate::{clamp_limit, validate_admin_code_count, validate_coordinates};
use fresq_common::error::ValidationError;
use fresq_common::models::ticket::normalize_pack_key;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdminStats {
    pub codes: CodeStats,
    pub tickets: TicketStats,
}

/// Operator actions. Every grid mutation here bumps `state_version` in the
/// repository and is broadcast after commit.
pub struct AdminService {
    codes: Arc<dyn CodeRepository>,
    grid: Arc<dyn GridConfigRepository>,
    tickets: Arc<dyn TicketRepository>,
    packs: Arc<dyn PackRepository>,
    event_bus: Arc<EventBus>,
}

impl AdminService {
    pub fn new(
        codes: Arc<dyn CodeRepository>,
        grid: Arc<dyn GridConfigRepository>,
        tickets: Arc<dyn TicketRepository>,
        packs: Arc<dyn PackRepository>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self { codes, grid, tickets, packs, event_bus }
    }

    async fn check_cell(&self, x: i32, y: i32) -> Result<(), Error> {
        let config = self.grid.get_config().await?;
        validate_coordinates(x, y, &config)?;
        Ok(())
    }

    /// Frees the cell at `(x, y)`: position and colour are reset together.
    pub async fn clear_cell(&self, x: i32, y: i32) -> Result<Option<Code>, Error> {
        self.check_cell(x, y).await?;
        let cleared = self.codes.clear_cell(x, y).await?;
        match &cleared {
            Some(code) => {
                info!("Admin cleared ({}, {}) held by {}", x, y, code.code);
                self.event_bus.publish(CanvasEvent::CellDeleted { x, y }).await;
            }
            None => warn!("Admin clear of ({}, {}): cell is empty", x, y),
        }
        Ok(cleared)
    }

    /// Removes only the colour; the code keeps its cell. A claimed but
    /// unpainted cell is left alone and nothing is broadcast.
    pub async fn reset_cell_color(&self, x: i32, y: i32) -> Result<Option<Code>, Error> {
        self.check_cell(x, y).await?;
        let before = self.codes.reset_cell_color(x, y).await?;
        if before.as_ref().is_some_and(|c| c.cell.is_painted()) {
            self.event_bus.publish(CanvasEvent::CellDeleted { x, y }).await;
        }
        Ok(before)
    }

    pub async fn reset_grid(&self) -> Result<u64, Error> {
        let released = self.codes.reset_all_cells().await?;
        warn!("Admin reset the whole grid ({} cell(s) released)", released);
        self.event_bus.publish(CanvasEvent::FullReset).await;
        Ok(released)
    }

    pub async fn update_palette(&self, colors: Vec<String>) -> Result<GridConfig, Error> {
        let palette = Palette::new(colors)?;
        let config = self.grid.update_palette(&palette).await?;
        info!("Palette updated (state_version={})", config.state_version);
        self.event_bus
            .publish(CanvasEvent::PaletteUpdated {
                palette: config.palette.clone(),
                state_version: config.state_version,
            })
            .await;
        Ok(config)
    }

    pub async fn generate_codes(&self, count: i64) -> Result<Vec<Code>, Error> {
        let count = validate_admin_code_count(count)?;
        self.codes.create_admin_codes(count).await
    }

    pub async fn inspect_cell(&self, x: i32, y: i32) -> Result<Option<Code>, Error> {
        self.check_cell(x, y).await?;
        self.codes.find_at(x, y).await
    }

    pub async fn recent_codes(&self, limit: i64) -> Result<Vec<Code>, Error> {
        self.codes.list_recent(clamp_limit(limit)).await
    }

    pub async fn stats(&self) -> Result<AdminStats, Error> {
        Ok(AdminStats {
            codes: self.codes.stats().await?,
            tickets: self.tickets.stats().await?,
        })
    }

    pub async fn pack_stats(&self) -> Result<Vec<PackStats>, Error> {
        self.packs.pack_stats().await
    }

    pub async fn create_pack(&self, new_pack: NewPackConfig) -> Result<PackConfig, Error> {
        let pack = new_pack.into_config()?;
        self.packs.create_pack(&pack).await
    }

    /// Edits a pack. Total and discount are re-derived from the result.
    pub async fn update_pack(&self, pack_key: &str, update: PackUpdate) -> Result<PackConfig, Error> {
        let key = normalize_pack_key(pack_key)?;
        if update.is_empty() {
            return Err(ValidationError::InvalidPack("no fields to update".to_string()).into());
        }
        self.packs.update_pack(&key, &update).await
    }

    /// Pending orders keep the split they were created with.
    pub async fn delete_pack(&self, pack_key: &str) -> Result<(), Error> {
        let key = normalize_pack_key(pack_key)?;
        if !self.packs.delete_pack(&key).await? {
            return Err(Error::NotFound(format!("pack {key}")));
        }
        warn!("Pack '{}' deleted", key);
        Ok(())
    }
}
