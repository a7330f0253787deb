// File: fresq-core/src/repositories/postgres/packs.rs

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use tracing::info;
use fresq_common::error::{ConflictError, Error};
use fresq_common::models::{PackConfig, PackStats, PackUpdate};
use fresq_common::traits::repository_traits::PackRepository;

const PACK_COLUMNS: &str = "pack_key, label, base_tickets, bonus_tickets, total_tickets, \
    price_cents, discount_percent, display_order, is_active";

#[derive(Clone)]
pub struct PostgresPackRepository {
    pool: Pool<Postgres>,
}

impl PostgresPackRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PackRepository for PostgresPackRepository {
    async fn list_active_packs(&self) -> Result<Vec<PackConfig>, Error> {
        let sql = format!(
            "SELECT {PACK_COLUMNS} FROM pack_configs WHERE is_active = TRUE ORDER BY display_order ASC"
        );
        let packs = sqlx::query_as::<_, PackConfig>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(packs)
    }

    async fn get_active_pack(&self, pack_key: &str) -> Result<Option<PackConfig>, Error> {
        let sql = format!(
            "SELECT {PACK_COLUMNS} FROM pack_configs WHERE pack_key = $1 AND is_active = TRUE"
        );
        let pack = sqlx::query_as::<_, PackConfig>(&sql)
            .bind(pack_key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(pack)
    }

    async fn create_pack(&self, pack: &PackConfig) -> Result<PackConfig, Error> {
        let sql = format!(
            r#"
            INSERT INTO pack_configs ({PACK_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (pack_key) DO NOTHING
            RETURNING {PACK_COLUMNS}
            "#
        );
        let created = sqlx::query_as::<_, PackConfig>(&sql)
            .bind(&pack.pack_key)
            .bind(&pack.label)
            .bind(pack.base_tickets)
            .bind(pack.bonus_tickets)
            .bind(pack.total_tickets)
            .bind(pack.price_cents)
            .bind(pack.discount_percent)
            .bind(pack.display_order)
            .bind(pack.is_active)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ConflictError::PackExists(pack.pack_key.clone()))?;

        info!("Pack '{}' created ({} units)", created.pack_key, created.total_tickets);
        Ok(created)
    }

    async fn update_pack(&self, pack_key: &str, update: &PackUpdate) -> Result<PackConfig, Error> {
        let mut tx = self.pool.begin().await?;

        let select = format!("SELECT {PACK_COLUMNS} FROM pack_configs WHERE pack_key = $1 FOR UPDATE");
        let current = sqlx::query_as::<_, PackConfig>(&select)
            .bind(pack_key)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound(format!("pack {pack_key}")))?;
        let updated = update.apply(&current)?;

        let sql = format!(
            r#"
            UPDATE pack_configs
            SET label = $2,
                base_tickets = $3,
                bonus_tickets = $4,
                total_tickets = $5,
                price_cents = $6,
                discount_percent = $7,
                display_order = $8,
                is_active = $9,
                updated_at = NOW()
            WHERE pack_key = $1
            RETURNING {PACK_COLUMNS}
            "#
        );
        let saved = sqlx::query_as::<_, PackConfig>(&sql)
            .bind(&updated.pack_key)
            .bind(&updated.label)
            .bind(updated.base_tickets)
            .bind(updated.bonus_tickets)
            .bind(updated.total_tickets)
            .bind(updated.price_cents)
            .bind(updated.discount_percent)
            .bind(updated.display_order)
            .bind(updated.is_active)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("Pack '{}' updated", saved.pack_key);
        Ok(saved)
    }

    async fn delete_pack(&self, pack_key: &str) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM pack_configs WHERE pack_key = $1")
            .bind(pack_key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn pack_stats(&self) -> Result<Vec<PackStats>, Error> {
        // tickets do not record their pack; the split and amount identify it
        let stats = sqlx::query_as::<_, PackStats>(
            r#"
            SELECT pc.pack_key,
                   pc.label,
                   pc.price_cents,
                   pc.total_tickets,
                   COUNT(t.ticket_id) FILTER (WHERE t.status = 'paid') AS purchases,
                   COALESCE(SUM(t.quantity) FILTER (WHERE t.status = 'paid'), 0)::BIGINT AS units_sold,
                   COALESCE(SUM(t.amount_cents) FILTER (WHERE t.status = 'paid'), 0)::BIGINT AS revenue_cents
            FROM pack_configs pc
            LEFT JOIN tickets t
                   ON t.base_quantity = pc.base_tickets
                  AND t.bonus_quantity = pc.bonus_tickets
                  AND t.amount_cents = pc.price_cents
            WHERE pc.is_active = TRUE
            GROUP BY pc.pack_key, pc.label, pc.price_cents, pc.total_tickets, pc.display_order
            ORDER BY pc.display_order ASC
            "#,
        )
            .fetch_all(&self.pool)
            .await?;
        Ok(stats)
    }
}
