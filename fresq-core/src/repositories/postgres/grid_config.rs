// File: fresq-core/src/repositories/postgres/grid_config.rs
//
// Every transaction that touches both the config row and code rows takes the
// config row first, so claims, clears and expansions cannot deadlock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Pool, Postgres, Row};
use fresq_common::error::Error;
use fresq_common::models::{GridConfig, Palette};
use fresq_common::traits::repository_traits::GridConfigRepository;

/// Row lock taken on the singleton config row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RowLock {
    None,
    /// Held by claims: blocks an expansion, not other claims.
    Share,
    /// Held by expansions and upgrade checks.
    Update,
}

impl RowLock {
    fn clause(self) -> &'static str {
        match self {
            RowLock::None => "",
            RowLock::Share => "FOR SHARE",
            RowLock::Update => "FOR UPDATE",
        }
    }
}

fn config_from_row(r: &PgRow) -> Result<GridConfig, Error> {
    let colors: Vec<String> = r.try_get("palette")?;
    let palette = Palette::new(colors)
        .map_err(|e| Error::Integrity(format!("stored palette is invalid: {e}")))?;
    Ok(GridConfig {
        grid_width: r.try_get("grid_width")?,
        grid_height: r.try_get("grid_height")?,
        state_version: r.try_get("state_version")?,
        palette,
        updated_at: r.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

fn missing_config() -> Error {
    Error::Integrity("grid_config row is missing; run migrations".to_string())
}

pub(crate) async fn read_config(conn: &mut PgConnection, lock: RowLock) -> Result<GridConfig, Error> {
    let sql = format!(
        r#"
        SELECT grid_width, grid_height, state_version, palette, updated_at
        FROM grid_config
        WHERE id = TRUE
        {}
        "#,
        lock.clause()
    );
    let row = sqlx::query(&sql)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(missing_config)?;
    config_from_row(&row)
}

/// Marks the grid as changed. Also takes the row lock for the rest of the
/// transaction.
pub(crate) async fn bump_state_version(conn: &mut PgConnection) -> Result<GridConfig, Error> {
    let row = sqlx::query(
        r#"
        UPDATE grid_config
        SET state_version = state_version + 1,
            updated_at = NOW()
        WHERE id = TRUE
        RETURNING grid_width, grid_height, state_version, palette, updated_at
        "#,
    )
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(missing_config)?;
    config_from_row(&row)
}

pub(crate) async fn resize(conn: &mut PgConnection, width: i32, height: i32) -> Result<GridConfig, Error> {
    let row = sqlx::query(
        r#"
        UPDATE grid_config
        SET grid_width = $1,
            grid_height = $2,
            state_version = state_version + 1,
            updated_at = NOW()
        WHERE id = TRUE
        RETURNING grid_width, grid_height, state_version, palette, updated_at
        "#,
    )
        .bind(width)
        .bind(height)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(missing_config)?;
    config_from_row(&row)
}

#[derive(Clone)]
pub struct PostgresGridConfigRepository {
    pool: Pool<Postgres>,
}

impl PostgresGridConfigRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GridConfigRepository for PostgresGridConfigRepository {
    async fn get_config(&self) -> Result<GridConfig, Error> {
        let mut conn = self.pool.acquire().await?;
        read_config(&mut conn, RowLock::None).await
    }

    async fn update_palette(&self, palette: &Palette) -> Result<GridConfig, Error> {
        let row = sqlx::query(
            r#"
            UPDATE grid_config
            SET palette = $1,
                state_version = state_version + 1,
                updated_at = NOW()
            WHERE id = TRUE
            RETURNING grid_width, grid_height, state_version, palette, updated_at
            "#,
        )
            .bind(palette.colors())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(missing_config)?;
        config_from_row(&row)
    }
}
