// File: fresq-common/src/models/ticket.rs

use std::fmt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, RefundBlock, ValidationError};
use crate::models::code::{CellState, Code};
use crate::models::tier::{Tier, TierUpgrade};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Pending,
    Paid,
    Refunded,
    Cancelled,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Pending => "pending",
            TicketStatus::Paid => "paid",
            TicketStatus::Refunded => "refunded",
            TicketStatus::Cancelled => "cancelled",
        }
    }

    /// `pending→paid`, `paid→refunded`, `pending→cancelled`; nothing else.
    pub fn can_transition_to(&self, next: TicketStatus) -> bool {
        matches!(
            (self, next),
            (TicketStatus::Pending, TicketStatus::Paid)
                | (TicketStatus::Paid, TicketStatus::Refunded)
                | (TicketStatus::Pending, TicketStatus::Cancelled)
        )
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, TicketStatus::Refunded | TicketStatus::Cancelled)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TicketStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TicketStatus::Pending),
            "paid" => Ok(TicketStatus::Paid),
            "refunded" => Ok(TicketStatus::Refunded),
            "cancelled" => Ok(TicketStatus::Cancelled),
            other => Err(Error::Parse(format!("unknown ticket status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub ticket_id: Uuid,
    pub order_id: String,
    pub email: String,
    pub user_id: Option<Uuid>,
    pub payment_provider: String,
    pub payment_session_id: Option<String>,
    pub amount_cents: i64,
    pub base_quantity: i32,
    pub bonus_quantity: i32,
    pub quantity: i32,
    pub status: TicketStatus,
    /// Tier in effect when the order was created.
    pub tier_id: Option<Uuid>,
    /// First purchased code minted for this ticket.
    pub code_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
}

impl Ticket {
    pub fn is_pack(&self) -> bool {
        self.quantity > 1
    }

    /// Reason this ticket may not be refunded, given its primary code.
    pub fn refund_block(&self, primary_code: Option<&Code>) -> Option<RefundBlock> {
        if self.is_pack() {
            return Some(RefundBlock::PackPurchase);
        }
        match primary_code.map(|c| c.cell) {
            Some(CellState::Painted { .. }) => Some(RefundBlock::CellPainted),
            Some(CellState::Claimed { .. }) => Some(RefundBlock::CellClaimed),
            _ => None,
        }
    }
}

/// Input for a new pending order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTicket {
    pub email: String,
    pub payment_provider: String,
    pub payment_session_id: Option<String>,
    pub amount_cents: i64,
    pub base_quantity: i32,
    pub bonus_quantity: i32,
}

impl NewTicket {
    pub const DEFAULT_PRICE_CENTS: i64 = 200;

    /// One paid unit, no bonus.
    pub fn single(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            payment_provider: "manual".to_string(),
            payment_session_id: None,
            amount_cents: Self::DEFAULT_PRICE_CENTS,
            base_quantity: 1,
            bonus_quantity: 0,
        }
    }

    pub fn for_pack(email: impl Into<String>, pack: &PackConfig) -> Self {
        Self {
            email: email.into(),
            payment_provider: "manual".to_string(),
            payment_session_id: None,
            amount_cents: pack.price_cents,
            base_quantity: pack.base_tickets,
            bonus_quantity: pack.bonus_tickets,
        }
    }

    pub fn quantity(&self) -> i32 {
        self.base_quantity + self.bonus_quantity
    }
}

pub const MAX_PACK_KEY_LEN: usize = 32;
pub const MAX_PACK_LABEL_LEN: usize = 64;

/// Discount against buying `total_tickets` singles, rounded to the nearest
/// percent. A one-unit pack has none.
pub fn pack_discount_percent(total_tickets: i32, price_cents: i64) -> i32 {
    if total_tickets <= 1 {
        return 0;
    }
    let full_price = (NewTicket::DEFAULT_PRICE_CENTS * i64::from(total_tickets)) as f64;
    ((1.0 - price_cents as f64 / full_price) * 100.0).round() as i32
}

/// Trims and lowercases a pack key and checks it is `[a-z0-9_-]+`.
pub fn normalize_pack_key(raw: &str) -> Result<String, ValidationError> {
    let key = raw.trim().to_lowercase();
    let well_formed = !key.is_empty()
        && key.len() <= MAX_PACK_KEY_LEN
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if well_formed {
        Ok(key)
    } else {
        Err(ValidationError::InvalidPack(format!("malformed key '{key}'")))
    }
}

/// A purchasable bundle. `base_tickets` are minted as purchased codes and
/// `bonus_tickets` as bonus codes when the order is paid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PackConfig {
    pub pack_key: String,
    pub label: String,
    pub base_tickets: i32,
    pub bonus_tickets: i32,
    pub total_tickets: i32,
    pub price_cents: i64,
    pub discount_percent: i32,
    pub display_order: i32,
    pub is_active: bool,
}

impl PackConfig {
    /// Re-derives `total_tickets` and `discount_percent`.
    pub fn with_derived_fields(mut self) -> Self {
        self.total_tickets = self.base_tickets + self.bonus_tickets;
        self.discount_percent = pack_discount_percent(self.total_tickets, self.price_cents);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let invalid = |reason: &str| Err(ValidationError::InvalidPack(reason.to_string()));
        if self.label.trim().is_empty() || self.label.len() > MAX_PACK_LABEL_LEN {
            return invalid("label must be 1 to 64 characters");
        }
        if self.base_tickets < 1 {
            return invalid("base_tickets must be at least 1");
        }
        if self.bonus_tickets < 0 {
            return invalid("bonus_tickets cannot be negative");
        }
        if self.price_cents < 0 {
            return invalid("price cannot be negative");
        }
        if self.display_order < 0 {
            return invalid("display_order cannot be negative");
        }
        Ok(())
    }
}

/// Input for a new catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPackConfig {
    pub pack_key: String,
    pub label: String,
    pub base_tickets: i32,
    pub bonus_tickets: i32,
    pub price_cents: i64,
    pub display_order: i32,
}

impl NewPackConfig {
    /// Normalises the key and builds a validated, active pack.
    pub fn into_config(self) -> Result<PackConfig, ValidationError> {
        let pack = PackConfig {
            pack_key: normalize_pack_key(&self.pack_key)?,
            label: self.label.trim().to_string(),
            base_tickets: self.base_tickets,
            bonus_tickets: self.bonus_tickets,
            total_tickets: 0,
            price_cents: self.price_cents,
            discount_percent: 0,
            display_order: self.display_order,
            is_active: true,
        }
        .with_derived_fields();
        pack.validate()?;
        Ok(pack)
    }
}

/// Partial edit of a catalog entry; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackUpdate {
    pub label: Option<String>,
    pub base_tickets: Option<i32>,
    pub bonus_tickets: Option<i32>,
    pub price_cents: Option<i64>,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

impl PackUpdate {
    pub fn is_empty(&self) -> bool {
        *self == PackUpdate::default()
    }

    pub fn apply(&self, current: &PackConfig) -> Result<PackConfig, ValidationError> {
        let pack = PackConfig {
            pack_key: current.pack_key.clone(),
            label: self
                .label
                .as_deref()
                .map_or_else(|| current.label.clone(), |l| l.trim().to_string()),
            base_tickets: self.base_tickets.unwrap_or(current.base_tickets),
            bonus_tickets: self.bonus_tickets.unwrap_or(current.bonus_tickets),
            total_tickets: current.total_tickets,
            price_cents: self.price_cents.unwrap_or(current.price_cents),
            discount_percent: current.discount_percent,
            display_order: self.display_order.unwrap_or(current.display_order),
            is_active: self.is_active.unwrap_or(current.is_active),
        }
        .with_derived_fields();
        pack.validate()?;
        Ok(pack)
    }
}

/// Paid sales attributed to a pack: tickets whose split and amount match it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PackStats {
    pub pack_key: String,
    pub label: String,
    pub price_cents: i64,
    pub total_tickets: i32,
    pub purchases: i64,
    pub units_sold: i64,
    pub revenue_cents: i64,
}

/// What a successful payment confirmation produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketConfirmation {
    pub ticket: Ticket,
    /// Purchased codes first, then bonus codes.
    pub codes: Vec<Code>,
    /// Tier in effect before this payment was counted.
    pub tier_before: Tier,
    pub tier_upgrade: TierUpgrade,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketStats {
    pub pending: i64,
    pub paid: i64,
    pub refunded: i64,
    pub cancelled: i64,
    pub total: i64,
    pub revenue_cents: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::code::CodeSource;

    fn ticket(quantity: i32) -> Ticket {
        Ticket {
            ticket_id: Uuid::new_v4(),
            order_id: "ORDER-1".into(),
            email: "a@b.co".into(),
            user_id: None,
            payment_provider: "manual".into(),
            payment_session_id: None,
            amount_cents: 200,
            base_quantity: quantity,
            bonus_quantity: 0,
            quantity,
            status: TicketStatus::Paid,
            tier_id: None,
            code_id: None,
            created_at: Utc::now(),
            paid_at: Some(Utc::now()),
            refunded_at: None,
        }
    }

    fn code(cell: CellState) -> Code {
        Code {
            code_id: Uuid::new_v4(),
            code: "ABCD2345".into(),
            user_id: None,
            cell,
            source: CodeSource::Purchased,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_transitions_are_one_way() {
        use TicketStatus::*;
        assert!(Pending.can_transition_to(Paid));
        assert!(Paid.can_transition_to(Refunded));
        assert!(Pending.can_transition_to(Cancelled));

        assert!(!Paid.can_transition_to(Pending));
        assert!(!Paid.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Paid));
        assert!(!Refunded.can_transition_to(Paid));
        assert!(!Paid.can_transition_to(Paid));
    }

    #[test]
    fn test_refund_guard() {
        let single = ticket(1);
        assert_eq!(single.refund_block(None), None);
        assert_eq!(single.refund_block(Some(&code(CellState::Empty))), None);
        assert_eq!(
            single.refund_block(Some(&code(CellState::Claimed { x: 1, y: 1 }))),
            Some(RefundBlock::CellClaimed)
        );
        assert_eq!(
            single.refund_block(Some(&code(CellState::Painted { x: 1, y: 1, color: 2 }))),
            Some(RefundBlock::CellPainted)
        );

        // packs are blocked even when untouched
        assert_eq!(ticket(5).refund_block(Some(&code(CellState::Empty))), Some(RefundBlock::PackPurchase));
    }

    #[test]
    fn test_new_ticket_quantities() {
        let pack = PackConfig {
            pack_key: "mini".into(),
            label: "Mini".into(),
            base_tickets: 3,
            bonus_tickets: 2,
            total_tickets: 5,
            price_cents: 600,
            discount_percent: 40,
            display_order: 1,
            is_active: true,
        };
        let t = NewTicket::for_pack("x@y.z", &pack);
        assert_eq!(t.quantity(), 5);
        assert_eq!(t.amount_cents, 600);
        assert_eq!(NewTicket::single("x@y.z").quantity(), 1);
    }

    fn mini() -> PackConfig {
        NewPackConfig {
            pack_key: " Mini ".into(),
            label: "Mini".into(),
            base_tickets: 3,
            bonus_tickets: 1,
            price_cents: 600,
            display_order: 1,
        }
        .into_config()
        .unwrap()
    }

    #[test]
    fn test_pack_discount_matches_seeded_catalog() {
        assert_eq!(pack_discount_percent(1, 200), 0);
        assert_eq!(pack_discount_percent(4, 600), 25);
        assert_eq!(pack_discount_percent(8, 1000), 38);
        assert_eq!(pack_discount_percent(18, 2000), 44);
        assert_eq!(pack_discount_percent(50, 5000), 50);
    }

    #[test]
    fn test_new_pack_is_normalized_and_derived() {
        let pack = mini();
        assert_eq!(pack.pack_key, "mini");
        assert_eq!(pack.total_tickets, 4);
        assert_eq!(pack.discount_percent, 25);
        assert!(pack.is_active);

        let bad_key = NewPackConfig { pack_key: "mini pack".into(), ..base_new_pack() };
        assert!(matches!(bad_key.into_config(), Err(ValidationError::InvalidPack(_))));
        let no_base = NewPackConfig { base_tickets: 0, ..base_new_pack() };
        assert!(no_base.into_config().is_err());
    }

    fn base_new_pack() -> NewPackConfig {
        NewPackConfig {
            pack_key: "duo".into(),
            label: "Duo".into(),
            base_tickets: 2,
            bonus_tickets: 0,
            price_cents: 380,
            display_order: 0,
        }
    }

    #[test]
    fn test_pack_update_recomputes_total_and_discount() {
        let current = mini();
        assert!(PackUpdate::default().is_empty());

        let update = PackUpdate { bonus_tickets: Some(3), price_cents: Some(1000), ..Default::default() };
        assert!(!update.is_empty());
        let updated = update.apply(&current).unwrap();
        assert_eq!((updated.base_tickets, updated.bonus_tickets, updated.total_tickets), (3, 3, 6));
        assert_eq!(updated.discount_percent, 17);
        assert_eq!(updated.label, "Mini");

        let deactivate = PackUpdate { is_active: Some(false), ..Default::default() };
        let hidden = deactivate.apply(&current).unwrap();
        assert!(!hidden.is_active);
        assert_eq!(hidden.discount_percent, current.discount_percent);

        let negative = PackUpdate { price_cents: Some(-1), ..Default::default() };
        assert!(negative.apply(&current).is_err());
    }
}
