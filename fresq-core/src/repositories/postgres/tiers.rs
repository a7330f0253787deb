// File: fresq-core/src/repositories/postgres/tiers.rs

use async_trait::async_trait;
use sqlx::{PgConnection, Pool, Postgres};
use tracing::info;
use fresq_common::error::Error;
use fresq_common::models::tier::{next_tier, select_tier, tier_for_dimensions};
use fresq_common::models::{GridExpansion, Tier, TierProgress, TierUpgrade};
use fresq_common::traits::repository_traits::TierRepository;

use super::grid_config::{read_config, resize, RowLock};

pub(crate) async fn load_tiers(conn: &mut PgConnection) -> Result<Vec<Tier>, Error> {
    let tiers = sqlx::query_as::<_, Tier>(
        r#"
        SELECT tier_id, tier_number, min_tickets, max_tickets,
               grid_width, grid_height, prize_amount_cents, is_active
        FROM tiers
        ORDER BY tier_number ASC
        "#,
    )
        .fetch_all(&mut *conn)
        .await?;
    Ok(tiers)
}

pub(crate) async fn count_paid(conn: &mut PgConnection) -> Result<i64, Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tickets WHERE status = 'paid'")
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

pub(crate) fn tier_for_count(tiers: &[Tier], paid: i64) -> Result<Tier, Error> {
    select_tier(tiers, paid)
        .cloned()
        .ok_or_else(|| Error::Integrity("tier catalog has no tier 0".to_string()))
}

/// Compares the tier reached by the paid count with the tier matching the
/// current grid, and expands the grid if the former is higher.
///
/// Locks the config row `FOR UPDATE` before counting, so two transactions
/// that each pay a ticket decide one after the other and the second sees the
/// first one's expansion.
pub(crate) async fn evaluate_upgrade_in(conn: &mut PgConnection) -> Result<TierUpgrade, Error> {
    let config = read_config(conn, RowLock::Update).await?;
    let tiers = load_tiers(conn).await?;
    let paid = count_paid(conn).await?;

    let target = tier_for_count(&tiers, paid)?;
    let old = tier_for_dimensions(&tiers, config.grid_width, config.grid_height)
        .cloned()
        .ok_or_else(|| {
            Error::Integrity(format!(
                "grid {}x{} matches no tier",
                config.grid_width, config.grid_height
            ))
        })?;

    if target.tier_number <= old.tier_number {
        return Ok(TierUpgrade::Unchanged { current_tier: old });
    }

    let mut expansion = GridExpansion::plan(&old, &target);
    if !expansion.grows() {
        return Err(Error::Integrity(format!(
            "tier {} does not grow the grid beyond tier {}",
            target.tier_number, old.tier_number
        )));
    }

    // One statement: the cell uniqueness check runs once all rows moved.
    let shifted = sqlx::query(
        r#"
        UPDATE codes
        SET cell_x = cell_x + $1,
            cell_y = cell_y + $2
        WHERE cell_x IS NOT NULL
        "#,
    )
        .bind(expansion.offset_x)
        .bind(expansion.offset_y)
        .execute(&mut *conn)
        .await?;
    expansion.cells_shifted = shifted.rows_affected();

    resize(conn, target.grid_width, target.grid_height).await?;

    info!(
        "Tier upgrade {} -> {}: grid {}x{} -> {}x{}, {} cell(s) shifted by ({}, {})",
        old.tier_number,
        target.tier_number,
        expansion.old_width,
        expansion.old_height,
        expansion.new_width,
        expansion.new_height,
        expansion.cells_shifted,
        expansion.offset_x,
        expansion.offset_y,
    );

    Ok(TierUpgrade::Upgraded { old_tier: old, new_tier: target, expansion })
}

#[derive(Clone)]
pub struct PostgresTierRepository {
    pool: Pool<Postgres>,
}

impl PostgresTierRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TierRepository for PostgresTierRepository {
    async fn list_tiers(&self) -> Result<Vec<Tier>, Error> {
        let mut conn = self.pool.acquire().await?;
        let tiers = load_tiers(&mut conn).await?;
        Ok(tiers.into_iter().filter(|t| t.is_active).collect())
    }

    async fn count_paid_tickets(&self) -> Result<i64, Error> {
        let mut conn = self.pool.acquire().await?;
        count_paid(&mut conn).await
    }

    async fn current_tier(&self) -> Result<Tier, Error> {
        let mut conn = self.pool.acquire().await?;
        let tiers = load_tiers(&mut conn).await?;
        let paid = count_paid(&mut conn).await?;
        tier_for_count(&tiers, paid)
    }

    async fn tier_progress(&self) -> Result<TierProgress, Error> {
        let mut conn = self.pool.acquire().await?;
        let tiers = load_tiers(&mut conn).await?;
        let paid = count_paid(&mut conn).await?;
        let current = tier_for_count(&tiers, paid)?;
        let next = next_tier(&tiers, &current);
        Ok(TierProgress::compute(current, next, paid))
    }

    async fn evaluate_upgrade(&self) -> Result<TierUpgrade, Error> {
        let mut tx = self.pool.begin().await?;
        let outcome = evaluate_upgrade_in(&mut tx).await?;
        tx.commit().await?;
        Ok(outcome)
    }
}
