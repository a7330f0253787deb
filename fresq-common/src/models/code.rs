// File: fresq-common/src/models/code.rs

use std::fmt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// Characters a code may contain: no `0/O`, `1/I` look-alikes.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const CODE_LENGTH: usize = 8;

pub const COLOR_MIN: i16 = 1;
pub const COLOR_MAX: i16 = 10;

/// Where a code came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeSource {
    Purchased,
    PackBonus,
    Referral,
    /// Minted by an operator, not tied to any purchase.
    Admin,
}

impl CodeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeSource::Purchased => "purchased",
            CodeSource::PackBonus => "pack_bonus",
            CodeSource::Referral => "referral",
            CodeSource::Admin => "admin",
        }
    }
}

impl fmt::Display for CodeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CodeSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "purchased" => Ok(CodeSource::Purchased),
            "pack_bonus" => Ok(CodeSource::PackBonus),
            "referral" => Ok(CodeSource::Referral),
            "admin" => Ok(CodeSource::Admin),
            other => Err(Error::Parse(format!("unknown code source '{other}'"))),
        }
    }
}

/// What a code currently holds on the grid.
///
/// Storage keeps three nullable columns (`cell_x`, `cell_y`, `color`); this is
/// the only place those columns are turned into a state, so the
/// "no colour without a position" rule is enforced here once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CellState {
    Empty,
    Claimed { x: i32, y: i32 },
    Painted { x: i32, y: i32, color: i16 },
}

impl CellState {
    pub fn from_columns(
        x: Option<i32>,
        y: Option<i32>,
        color: Option<i16>,
    ) -> Result<Self, Error> {
        match (x, y, color) {
            (None, None, None) => Ok(CellState::Empty),
            (Some(x), Some(y), None) => Ok(CellState::Claimed { x, y }),
            (Some(x), Some(y), Some(color)) if (COLOR_MIN..=COLOR_MAX).contains(&color) => {
                Ok(CellState::Painted { x, y, color })
            }
            _ => Err(Error::Integrity(format!(
                "impossible cell columns x={x:?} y={y:?} color={color:?}"
            ))),
        }
    }

    pub fn position(&self) -> Option<(i32, i32)> {
        match *self {
            CellState::Empty => None,
            CellState::Claimed { x, y } | CellState::Painted { x, y, .. } => Some((x, y)),
        }
    }

    pub fn color(&self) -> Option<i16> {
        match *self {
            CellState::Painted { color, .. } => Some(color),
            _ => None,
        }
    }

    pub fn is_claimed(&self) -> bool {
        !matches!(self, CellState::Empty)
    }

    pub fn is_painted(&self) -> bool {
        matches!(self, CellState::Painted { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Code {
    pub code_id: Uuid,
    pub code: String,
    pub user_id: Option<Uuid>,
    pub cell: CellState,
    pub source: CodeSource,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A painted cell as sent to observers in a canvas snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PaintedCell {
    pub x: i32,
    pub y: i32,
    pub color: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimRejection {
    InvalidCode,
    CellTaken,
    AlreadyAssigned,
}

impl ClaimRejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimRejection::InvalidCode => "invalid_code",
            ClaimRejection::CellTaken => "cell_taken",
            ClaimRejection::AlreadyAssigned => "already_assigned",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ClaimOutcome {
    /// The code was empty and now owns the cell.
    Claimed { x: i32, y: i32 },
    /// The code already owned exactly this cell; nothing changed.
    AlreadyOwned { x: i32, y: i32 },
    Rejected { error: ClaimRejection },
}

impl ClaimOutcome {
    pub fn is_ok(&self) -> bool {
        !matches!(self, ClaimOutcome::Rejected { .. })
    }

    pub fn error(&self) -> Option<ClaimRejection> {
        match self {
            ClaimOutcome::Rejected { error } => Some(*error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaintRejection {
    NotClaimed,
}

impl PaintRejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaintRejection::NotClaimed => "not_claimed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PaintOutcome {
    Painted { x: i32, y: i32, color: i16 },
    Rejected { error: PaintRejection },
}

impl PaintOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, PaintOutcome::Painted { .. })
    }
}

/// Totals shown on the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeStats {
    pub total: i64,
    pub claimed: i64,
    pub painted: i64,
}
