//! src/eventbus/mod.rs
//!
//! In-process fan-out of committed canvas changes to every observer
//! (websocket gateways, loggers...). Publishing is best-effort: it never
//! waits on a slow subscriber and never reports failure to the caller.

use std::sync::Arc;
use serde::Serialize;
use serde_json::json;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, warn};
use fresq_common::models::{GridExpansion, Palette, Tier};

/// Events emitted after a state change has been committed.
///
/// Cell coordinates are those of the grid at commit time. A claim or paint
/// that commits just before an expansion can be published after the
/// `tier_upgrade` event, so its coordinates are pre-shift. Observers must
/// re-fetch the snapshot after `tier_upgrade` or `full_reset` and treat it as
/// the source of truth, comparing `state_version` to detect later changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CanvasEvent {
    CellClaimed { x: i32, y: i32 },
    CellPainted { x: i32, y: i32, color: i16 },
    /// A cell lost its colour or its owner; observers drop it from the canvas.
    CellDeleted { x: i32, y: i32 },
    TierUpgrade {
        old_tier: Tier,
        new_tier: Tier,
        expansion: GridExpansion,
    },
    FullReset,
    PaletteUpdated { palette: Palette, state_version: i64 },
}

impl CanvasEvent {
    /// Channel name used by the pub/sub transport.
    pub fn event_type(&self) -> &'static str {
        match self {
            CanvasEvent::CellClaimed { .. } => "cell:claimed",
            CanvasEvent::CellPainted { .. } => "cell:painted",
            CanvasEvent::CellDeleted { .. } => "cell:deleted",
            CanvasEvent::TierUpgrade { .. } => "tier_upgrade",
            CanvasEvent::FullReset => "full_reset",
            CanvasEvent::PaletteUpdated { .. } => "palette_updated",
        }
    }

    /// Body sent alongside `event_type()`.
    pub fn payload(&self) -> serde_json::Value {
        match self {
            CanvasEvent::CellClaimed { x, y } | CanvasEvent::CellDeleted { x, y } => {
                json!({ "x": x, "y": y })
            }
            CanvasEvent::CellPainted { x, y, color } => json!({ "x": x, "y": y, "color": color }),
            CanvasEvent::TierUpgrade { old_tier, new_tier, expansion } => json!({
                "oldTier": old_tier,
                "newTier": new_tier,
                "expansion": expansion,
            }),
            CanvasEvent::FullReset => json!({}),
            CanvasEvent::PaletteUpdated { palette, state_version } => json!({
                "palette": palette,
                "state_version": state_version,
            }),
        }
    }
}

/// Each subscriber gets its own bounded `mpsc` queue.
///
/// - A full queue drops the event for that subscriber only.
/// - A closed queue (receiver dropped) is pruned on the next publish.
#[derive(Clone)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<mpsc::Sender<CanvasEvent>>>>,
    buffer_size: usize,
    shutdown_tx: watch::Sender<bool>,
    pub shutdown_rx: watch::Receiver<bool>,
}

/// Default size for each subscriber's buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(buffer_size: usize) -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            subscribers: Arc::new(Mutex::new(vec![])),
            buffer_size: buffer_size.max(1),
            shutdown_tx: tx,
            shutdown_rx: rx,
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Returns a receiver on which events will be delivered.
    pub async fn subscribe(&self, buffer_size: Option<usize>) -> mpsc::Receiver<CanvasEvent> {
        let size = buffer_size.unwrap_or(self.buffer_size).max(1);
        let (tx, rx) = mpsc::channel(size);
        let mut subs = self.subscribers.lock().await;
        subs.push(tx);
        rx
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.lock().await.len()
    }

    /// Publish an event to all subscribers. Returns how many received it.
    pub async fn publish(&self, event: CanvasEvent) -> usize {
        let mut subs = self.subscribers.lock().await;
        let mut delivered = 0;
        subs.retain(|s| match s.try_send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Subscriber queue full; dropping '{}' event for it", event.event_type());
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
        debug!("Published '{}' to {} subscriber(s)", event.event_type(), delivered);
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let bus = EventBus::new();

        let mut rx1 = bus.subscribe(Some(5)).await;
        let mut rx2 = bus.subscribe(Some(5)).await;

        let delivered = bus.publish(CanvasEvent::CellClaimed { x: 1, y: 2 }).await;
        assert_eq!(delivered, 2);

        let evt1 = rx1.recv().await.expect("rx1 should get event");
        let evt2 = rx2.recv().await.expect("rx2 should get event");
        assert_eq!(evt1, CanvasEvent::CellClaimed { x: 1, y: 2 });
        assert_eq!(evt2, evt1);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_a_no_op() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(CanvasEvent::FullReset).await, 0);
    }

    #[tokio::test]
    async fn test_full_queue_drops_instead_of_blocking() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe(Some(1)).await;

        assert_eq!(bus.publish(CanvasEvent::CellDeleted { x: 0, y: 0 }).await, 1);
        // queue is full: the second publish returns immediately
        assert_eq!(bus.publish(CanvasEvent::CellDeleted { x: 1, y: 1 }).await, 0);

        assert_eq!(rx.recv().await, Some(CanvasEvent::CellDeleted { x: 0, y: 0 }));
        assert!(rx.try_recv().is_err());
        // still subscribed
        assert_eq!(bus.subscriber_count().await, 1);
    }

    #[tokio::test]
    async fn test_closed_subscribers_are_pruned() {
        let bus = EventBus::new();
        let rx = bus.subscribe(None).await;
        let mut kept = bus.subscribe(None).await;
        drop(rx);

        assert_eq!(bus.publish(CanvasEvent::FullReset).await, 1);
        assert_eq!(bus.subscriber_count().await, 1);
        assert_eq!(kept.recv().await, Some(CanvasEvent::FullReset));
    }

    #[tokio::test]
    async fn test_shutdown_flag() {
        let bus = EventBus::new();
        let mut rx = bus.shutdown_rx.clone();
        assert!(!*rx.borrow());
        bus.shutdown();
        rx.changed().await.expect("sender alive");
        assert!(*rx.borrow());
    }

    #[test]
    fn test_tier_upgrade_payload_carries_the_shift() {
        let tier = |n: i32, size: i32| Tier {
            tier_id: uuid::Uuid::new_v4(),
            tier_number: n,
            min_tickets: 0,
            max_tickets: None,
            grid_width: size,
            grid_height: size,
            prize_amount_cents: 0,
            is_active: true,
        };
        let (old_tier, new_tier) = (tier(0, 100), tier(1, 200));
        let expansion = GridExpansion::plan(&old_tier, &new_tier);
        let event = CanvasEvent::TierUpgrade { old_tier, new_tier, expansion };

        let payload = event.payload();
        assert_eq!(event.event_type(), "tier_upgrade");
        assert_eq!(payload["expansion"]["offset_x"], json!(50));
        assert_eq!(payload["expansion"]["new_width"], json!(200));
        assert_eq!(payload["newTier"]["tier_number"], json!(1));
    }

    #[test]
    fn test_event_names_and_payloads() {
        let painted = CanvasEvent::CellPainted { x: 10, y: 10, color: 4 };
        assert_eq!(painted.event_type(), "cell:painted");
        assert_eq!(painted.payload(), json!({ "x": 10, "y": 10, "color": 4 }));
        assert_eq!(CanvasEvent::FullReset.event_type(), "full_reset");
        assert_eq!(CanvasEvent::CellDeleted { x: 3, y: 4 }.payload(), json!({ "x": 3, "y": 4 }));
    }
}
