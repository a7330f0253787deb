// File: fresq-common/src/models/grid.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::models::code::PaintedCell;

pub const PALETTE_SIZE: usize = 10;

/// The ten displayable colours; colour index `n` maps to `colors[n - 1]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Palette(Vec<String>);

impl Palette {
    pub fn new(colors: Vec<String>) -> Result<Self, ValidationError> {
        if colors.len() != PALETTE_SIZE {
            return Err(ValidationError::InvalidPalette);
        }
        let normalized = colors
            .into_iter()
            .map(|c| {
                let c = c.trim().to_uppercase();
                let valid = c.len() == 7
                    && c.starts_with('#')
                    && c[1..].chars().all(|ch| ch.is_ascii_hexdigit());
                if valid { Ok(c) } else { Err(ValidationError::InvalidPalette) }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(normalized))
    }

    pub fn colors(&self) -> &[String] {
        &self.0
    }
}

impl TryFrom<Vec<String>> for Palette {
    type Error = ValidationError;

    fn try_from(colors: Vec<String>) -> Result<Self, Self::Error> {
        Palette::new(colors)
    }
}

impl From<Palette> for Vec<String> {
    fn from(p: Palette) -> Self {
        p.0
    }
}

/// Singleton grid configuration row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    pub grid_width: i32,
    pub grid_height: i32,
    /// Bumped on every clear, reset, palette change and expansion.
    pub state_version: i64,
    pub palette: Palette,
    pub updated_at: DateTime<Utc>,
}

impl GridConfig {
    pub fn contains(&self, x: i32, y: i32) -> bool {
        (0..self.grid_width).contains(&x) && (0..self.grid_height).contains(&y)
    }
}

/// Everything an observer needs to draw the canvas from scratch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasSnapshot {
    pub config: GridConfig,
    pub cells: Vec<PaintedCell>,
}
