// ================================================================
// File: fresq-common/src/error.rs
// ================================================================

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not found error: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Rejected input; raised before any transaction is opened.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Detected inside a transaction, which has been rolled back.
    #[error("Conflict: {0}")]
    Conflict(#[from] ConflictError),

    /// The deployment is corrupted or not initialised (missing config row,
    /// grid dimensions that match no tier, impossible cell columns...).
    #[error("Integrity error: {0}")]
    Integrity(String),
}

impl Error {
    /// Stable machine-readable code the API layer can branch on.
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "not_found",
            Error::Validation(v) => v.code(),
            Error::Conflict(c) => c.code(),
            Error::Integrity(_) => "integrity_error",
            Error::Database(_)
            | Error::Json(_)
            | Error::Parse(_)
            | Error::Migration(_) => "server_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing code")]
    MissingCode,

    #[error("malformed code '{0}'")]
    MalformedCode(String),

    #[error("cell ({x}, {y}) is outside the {width}x{height} grid")]
    OutOfBounds { x: i32, y: i32, width: i32, height: i32 },

    #[error("color {0} is outside 1..=10")]
    ColorOutOfRange(i32),

    #[error("invalid email '{0}'")]
    InvalidEmail(String),

    #[error("palette must hold exactly 10 #RRGGBB colors")]
    InvalidPalette,

    #[error("invalid count {0}")]
    InvalidCount(i64),

    #[error("unknown or inactive pack '{0}'")]
    UnknownPack(String),

    #[error("invalid pack: {0}")]
    InvalidPack(String),
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::MissingCode => "missing_code",
            ValidationError::MalformedCode(_) => "malformed_code",
            ValidationError::OutOfBounds { .. } => "out_of_bounds",
            ValidationError::ColorOutOfRange(_) => "out_of_range",
            ValidationError::InvalidEmail(_) => "invalid_email",
            ValidationError::InvalidPalette => "invalid_palette",
            ValidationError::InvalidCount(_) => "invalid_count",
            ValidationError::UnknownPack(_) => "unknown_pack",
            ValidationError::InvalidPack(_) => "invalid_pack",
        }
    }
}

/// Why a ticket cannot be cancelled or refunded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefundBlock {
    /// Multi-quantity purchases are never refundable.
    PackPurchase,
    CellPainted,
    CellClaimed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflictError {
    #[error("ticket {0} is already paid")]
    TicketAlreadyPaid(String),

    #[error("ticket {order_id} is {status} and can no longer change")]
    TicketClosed { order_id: String, status: String },

    #[error("refund blocked for ticket {order_id}: {reason:?}")]
    RefundBlocked { order_id: String, reason: RefundBlock },

    #[error("pack '{0}' already exists")]
    PackExists(String),
}

impl ConflictError {
    pub fn code(&self) -> &'static str {
        match self {
            ConflictError::TicketAlreadyPaid(_) => "ticket_already_paid",
            ConflictError::TicketClosed { .. } => "ticket_closed",
            ConflictError::RefundBlocked { reason, .. } => match reason {
                RefundBlock::PackPurchase => "refund_blocked_pack",
                RefundBlock::CellPainted => "refund_blocked_painted",
                RefundBlock::CellClaimed => "refund_blocked_claimed",
            },
            ConflictError::PackExists(_) => "pack_exists",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        let e: Error = ValidationError::ColorOutOfRange(11).into();
        assert_eq!(e.code(), "out_of_range");

        let e: Error = ConflictError::RefundBlocked {
            order_id: "ORDER-1".into(),
            reason: RefundBlock::CellPainted,
        }
        .into();
        assert_eq!(e.code(), "refund_blocked_painted");

        assert_eq!(Error::Integrity("config row missing".into()).code(), "integrity_error");
    }

    #[test]
    fn test_infrastructure_errors_collapse_to_server_error() {
        assert_eq!(Error::Parse("unknown code source 'x'".into()).code(), "server_error");
        assert_eq!(Error::Database(sqlx::Error::RowNotFound).code(), "server_error");
        assert_eq!(Error::NotFound("ticket ORDER-1".into()).code(), "not_found");
    }
}
