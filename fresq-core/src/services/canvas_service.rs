// File: fresq-core/src/services/canvas_service.rs

use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::Error;
use crate::eventbus::{CanvasEvent, EventBus};
use crate::models::{CanvasSnapshot, ClaimOutcome, Code, GridConfig, PaintOutcome};
use crate::repositories::{CodeRepository, GridConfigRepository};
use crate::utils::validate::{validate_code, validate_color, validate_coordinates};

/// Player-facing operations: validate, claim, paint, read the canvas.
///
/// Input is checked before any transaction is opened. Events are published
/// only after the repository call has committed.
pub struct CanvasService {
    codes: Arc<dyn CodeRepository>,
    grid: Arc<dyn GridConfigRepository>,
    event_bus: Arc<EventBus>,
}

impl CanvasService {
    pub fn new(
        codes: Arc<dyn CodeRepository>,
        grid: Arc<dyn GridConfigRepository>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self { codes, grid, event_bus }
    }

    /// Looks up a code after normalising it. `None` when it does not exist.
    pub async fn validate_code(&self, raw_code: &str) -> Result<Option<Code>, Error> {
        let code = validate_code(raw_code)?;
        self.codes.get_by_code(&code).await
    }

    pub async fn claim_cell(&self, raw_code: &str, x: i32, y: i32) -> Result<ClaimOutcome, Error> {
        let code = validate_code(raw_code)?;
        let config = self.grid.get_config().await?;
        validate_coordinates(x, y, &config)?;

        let outcome = self.codes.claim_cell(&code, x, y).await?;
        match outcome {
            ClaimOutcome::Claimed { x, y } => {
                info!("Cell ({}, {}) claimed by {}", x, y, code);
                // can trail a concurrent tier_upgrade; see CanvasEvent
                self.event_bus.publish(CanvasEvent::CellClaimed { x, y }).await;
            }
            ClaimOutcome::AlreadyOwned { x, y } => {
                debug!("Repeated claim of ({}, {}) by {}", x, y, code);
            }
            ClaimOutcome::Rejected { error } => {
                debug!("Claim of ({}, {}) by {} rejected: {}", x, y, code, error.as_str());
            }
        }
        Ok(outcome)
    }

    pub async fn paint_cell(&self, raw_code: &str, color: i32) -> Result<PaintOutcome, Error> {
        let code = validate_code(raw_code)?;
        let color = validate_color(color)?;

        let outcome = self.codes.paint_cell(&code, color).await?;
        match outcome {
            PaintOutcome::Painted { x, y, color } => {
                self.event_bus.publish(CanvasEvent::CellPainted { x, y, color }).await;
            }
            PaintOutcome::Rejected { error } => {
                debug!("Paint by {} rejected: {}", code, error.as_str());
            }
        }
        Ok(outcome)
    }

    pub async fn snapshot(&self) -> Result<CanvasSnapshot, Error> {
        let config = self.grid.get_config().await?;
        let cells = self.codes.painted_cells().await?;
        Ok(CanvasSnapshot { config, cells })
    }

    /// Returns the config only if its version differs from `known_version`.
    pub async fn config_if_changed(&self, known_version: i64) -> Result<Option<GridConfig>, Error> {
        let config = self.grid.get_config().await?;
        Ok((config.state_version != known_version).then_some(config))
    }

    pub async fn codes_for_user(&self, user_id: Uuid) -> Result<Vec<Code>, Error> {
        self.codes.list_for_user(user_id).await
    }
}
