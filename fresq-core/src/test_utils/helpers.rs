// File: fresq-core/src/test_utils/helpers.rs

use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use tokio::sync::{Mutex, MutexGuard};
use crate::Error;
use crate::db::Database;

/// Database tests share one schema; each holds this for its whole run.
static DB_LOCK: Mutex<()> = Mutex::const_new(());

pub async fn lock_database() -> MutexGuard<'static, ()> {
    DB_LOCK.lock().await
}

/// Tier rows as `(tier_number, min_tickets, max_tickets, square grid size)`.
pub const DEFAULT_TIERS: &[(i32, i64, Option<i64>, i32)] = &[
    (0, 0, Some(999), 200),
    (1, 1000, Some(2499), 300),
    (2, 2500, Some(4999), 400),
    (3, 5000, Some(9999), 500),
    (4, 10000, None, 700),
];

/// Seeded pack catalog as `(key, label, base, bonus, price_cents, discount)`.
pub const DEFAULT_PACKS: &[(&str, &str, i32, i32, i64, i32)] = &[
    ("solo", "Solo", 1, 0, 200, 0),
    ("mini", "Mini", 3, 1, 600, 25),
    ("medium", "Medium", 5, 3, 1000, 38),
    ("mega", "Mega", 10, 8, 2000, 44),
    ("ultra", "Ultra", 25, 25, 5000, 50),
];

/// Connects to `TEST_DATABASE_URL`, or returns `None` when it is unset so
/// tests can skip themselves on machines without Postgres.
pub async fn create_test_db_pool() -> Result<Option<Pool<Postgres>>, Error> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        return Ok(None);
    };
    let pool = PgPoolOptions::new()
        .max_connections(8)
        .connect(&url)
        .await?;
    Ok(Some(pool))
}

/// Replaces the tier catalog and resizes the grid to tier 0.
/// Removes all tickets, since they reference tiers.
pub async fn install_tiers(
    pool: &Pool<Postgres>,
    tiers: &[(i32, i64, Option<i64>, i32)],
) -> Result<(), Error> {
    sqlx::query("TRUNCATE TABLE tickets, tiers CASCADE")
        .execute(pool)
        .await?;
    for &(number, min, max, size) in tiers {
        sqlx::query(
            r#"
            INSERT INTO tiers (tier_number, min_tickets, max_tickets, grid_width, grid_height)
            VALUES ($1, $2, $3, $4, $4)
            "#,
        )
            .bind(number)
            .bind(min)
            .bind(max)
            .bind(size)
            .execute(pool)
            .await?;
    }
    if let Some(&(_, _, _, size)) = tiers.iter().find(|t| t.0 == 0) {
        set_grid_size(pool, size, size).await?;
    }
    Ok(())
}

pub async fn set_grid_size(pool: &Pool<Postgres>, width: i32, height: i32) -> Result<(), Error> {
    sqlx::query("UPDATE grid_config SET grid_width = $1, grid_height = $2 WHERE id = TRUE")
        .bind(width)
        .bind(height)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn install_default_packs(pool: &Pool<Postgres>) -> Result<(), Error> {
    sqlx::query("DELETE FROM pack_configs").execute(pool).await?;
    for (order, &(key, label, base, bonus, price, discount)) in DEFAULT_PACKS.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO pack_configs (pack_key, label, base_tickets, bonus_tickets, total_tickets,
                                      price_cents, discount_percent, display_order)
            VALUES ($1, $2, $3, $4, $3 + $4, $5, $6, $7)
            "#,
        )
            .bind(key)
            .bind(label)
            .bind(base)
            .bind(bonus)
            .bind(price)
            .bind(discount)
            .bind(order as i32)
            .execute(pool)
            .await?;
    }
    Ok(())
}

/// Wipes out test data and restores the seeded grid and tiers.
pub async fn clean_database(pool: &Pool<Postgres>) -> Result<(), Error> {
    sqlx::query("TRUNCATE TABLE tickets, codes, users RESTART IDENTITY CASCADE")
        .execute(pool)
        .await?;
    sqlx::query(
        r#"
        UPDATE grid_config
        SET state_version = 1,
            palette = ARRAY['#000000', '#FFFFFF', '#E53935', '#FB8C00', '#FDD835',
                            '#43A047', '#1E88E5', '#8E24AA', '#6D4C41', '#9E9E9E'],
            updated_at = NOW()
        WHERE id = TRUE
        "#,
    )
        .execute(pool)
        .await?;
    install_tiers(pool, DEFAULT_TIERS).await?;
    install_default_packs(pool).await?;
    Ok(())
}

/// Returns a migrated, empty test DB handle, or `None` without
/// `TEST_DATABASE_URL`.
pub async fn setup_test_database() -> Result<Option<Database>, Error> {
    let Some(pool) = create_test_db_pool().await? else {
        return Ok(None);
    };
    let db = Database::from_pool(pool);
    db.migrate().await?;
    clean_database(db.pool()).await?;
    Ok(Some(db))
}
