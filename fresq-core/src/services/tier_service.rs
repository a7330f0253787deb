// File: fresq-core/src/services/tier_service.rs

use std::sync::Arc;
use tracing::info;

use crate::Error;
use crate::eventbus::{CanvasEvent, EventBus};
use crate::models::tier::next_tier;
use crate::models::{Tier, TierProgress, TierUpgrade};
use crate::repositories::TierRepository;

/// Publishes a `tier_upgrade` event if the grid grew.
pub(crate) async fn broadcast_upgrade(event_bus: &EventBus, upgrade: &TierUpgrade) {
    if let TierUpgrade::Upgraded { old_tier, new_tier, expansion } = upgrade {
        event_bus
            .publish(CanvasEvent::TierUpgrade {
                old_tier: old_tier.clone(),
                new_tier: new_tier.clone(),
                expansion: *expansion,
            })
            .await;
    }
}

pub struct TierService {
    tiers: Arc<dyn TierRepository>,
    event_bus: Arc<EventBus>,
}

impl TierService {
    pub fn new(tiers: Arc<dyn TierRepository>, event_bus: Arc<EventBus>) -> Self {
        Self { tiers, event_bus }
    }

    pub async fn current_tier(&self) -> Result<Tier, Error> {
        self.tiers.current_tier().await
    }

    pub async fn tier_progress(&self) -> Result<TierProgress, Error> {
        self.tiers.tier_progress().await
    }

    /// Active tiers, lowest first.
    pub async fn all_tiers(&self) -> Result<Vec<Tier>, Error> {
        self.tiers.list_tiers().await
    }

    pub async fn next_tier(&self) -> Result<Option<Tier>, Error> {
        let current = self.tiers.current_tier().await?;
        let tiers = self.tiers.list_tiers().await?;
        Ok(next_tier(&tiers, &current))
    }

    /// Re-runs the upgrade check on its own. A no-op when nothing is due.
    pub async fn evaluate_upgrade(&self) -> Result<TierUpgrade, Error> {
        let upgrade = self.tiers.evaluate_upgrade().await?;
        match &upgrade {
            TierUpgrade::Upgraded { new_tier, .. } => {
                info!("Manual upgrade check expanded the grid to tier {}", new_tier.tier_number);
            }
            TierUpgrade::Unchanged { current_tier } => {
                info!("No upgrade due; grid stays at tier {}", current_tier.tier_number);
            }
        }
        broadcast_upgrade(&self.event_bus, &upgrade).await;
        Ok(upgrade)
    }
}
