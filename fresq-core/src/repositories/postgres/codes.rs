// File: fresq-core/src/repositories/postgres/codes.rs

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Pool, Postgres, Row};
use tracing::{debug, info};
use uuid::Uuid;
use fresq_common::error::{Error, ValidationError};
use fresq_common::models::{
    CellState, ClaimOutcome, ClaimRejection, Code, CodeSource, CodeStats, PaintOutcome,
    PaintRejection, PaintedCell,
};
use fresq_common::traits::repository_traits::CodeRepository;

use super::grid_config::{bump_state_version, read_config, RowLock};
use crate::utils::code_gen::{generate_code, MAX_GENERATION_ATTEMPTS};

pub(crate) const CODE_COLUMNS: &str =
    "code_id, code, user_id, cell_x, cell_y, color, source, created_at, updated_at";

/// Name of the unique constraint on `(cell_x, cell_y)`.
const CELL_UNIQUE_CONSTRAINT: &str = "codes_cell_unique";

pub(crate) fn code_from_row(r: &PgRow) -> Result<Code, Error> {
    let source: String = r.try_get("source")?;
    Ok(Code {
        code_id: r.try_get("code_id")?,
        code: r.try_get("code")?,
        user_id: r.try_get("user_id")?,
        cell: CellState::from_columns(
            r.try_get("cell_x")?,
            r.try_get("cell_y")?,
            r.try_get("color")?,
        )?,
        source: source.parse()?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

fn is_cell_conflict(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|d| d.constraint())
        .is_some_and(|c| c == CELL_UNIQUE_CONSTRAINT)
}

/// Inserts a code with a fresh random value, retrying on collision.
pub(crate) async fn insert_unique_code(
    conn: &mut PgConnection,
    user_id: Option<Uuid>,
    source: CodeSource,
) -> Result<Code, Error> {
    let sql = format!(
        r#"
        INSERT INTO codes (code, user_id, source)
        VALUES ($1, $2, $3)
        ON CONFLICT (code) DO NOTHING
        RETURNING {CODE_COLUMNS}
        "#
    );
    for attempt in 1..=MAX_GENERATION_ATTEMPTS {
        let candidate = generate_code();
        let row = sqlx::query(&sql)
            .bind(&candidate)
            .bind(user_id)
            .bind(source.as_str())
            .fetch_optional(&mut *conn)
            .await?;
        match row {
            Some(r) => return code_from_row(&r),
            None => debug!("code collision on attempt {attempt}, regenerating"),
        }
    }
    Err(Error::Integrity(format!(
        "could not generate a unique code after {MAX_GENERATION_ATTEMPTS} attempts"
    )))
}

async fn lock_code_at(conn: &mut PgConnection, x: i32, y: i32) -> Result<Option<Code>, Error> {
    let sql = format!(
        "SELECT {CODE_COLUMNS} FROM codes WHERE cell_x = $1 AND cell_y = $2 FOR UPDATE"
    );
    sqlx::query(&sql)
        .bind(x)
        .bind(y)
        .fetch_optional(&mut *conn)
        .await?
        .map(|r| code_from_row(&r))
        .transpose()
}

#[derive(Clone)]
pub struct PostgresCodeRepository {
    pool: Pool<Postgres>,
}

impl PostgresCodeRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn fetch_many(&self, sql: &str, bind: i64) -> Result<Vec<Code>, Error> {
        let rows = sqlx::query(sql).bind(bind).fetch_all(&self.pool).await?;
        rows.iter().map(code_from_row).collect()
    }
}

#[async_trait]
impl CodeRepository for PostgresCodeRepository {
    async fn get_by_code(&self, code: &str) -> Result<Option<Code>, Error> {
        let sql = format!("SELECT {CODE_COLUMNS} FROM codes WHERE code = $1");
        sqlx::query(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?
            .map(|r| code_from_row(&r))
            .transpose()
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Code>, Error> {
        let sql = format!(
            "SELECT {CODE_COLUMNS} FROM codes WHERE user_id = $1 ORDER BY created_at ASC"
        );
        let rows = sqlx::query(&sql).bind(user_id).fetch_all(&self.pool).await?;
        rows.iter().map(code_from_row).collect()
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Code>, Error> {
        let sql = format!("SELECT {CODE_COLUMNS} FROM codes ORDER BY created_at DESC LIMIT $1");
        self.fetch_many(&sql, limit).await
    }

    async fn find_at(&self, x: i32, y: i32) -> Result<Option<Code>, Error> {
        let sql = format!("SELECT {CODE_COLUMNS} FROM codes WHERE cell_x = $1 AND cell_y = $2");
        sqlx::query(&sql)
            .bind(x)
            .bind(y)
            .fetch_optional(&self.pool)
            .await?
            .map(|r| code_from_row(&r))
            .transpose()
    }

    async fn is_cell_taken(&self, x: i32, y: i32) -> Result<bool, Error> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM codes WHERE cell_x = $1 AND cell_y = $2)",
        )
            .bind(x)
            .bind(y)
            .fetch_one(&self.pool)
            .await?;
        Ok(taken)
    }

    async fn painted_cells(&self) -> Result<Vec<PaintedCell>, Error> {
        let cells = sqlx::query_as::<_, PaintedCell>(
            r#"
            SELECT cell_x AS x, cell_y AS y, color
            FROM codes
            WHERE color IS NOT NULL
            ORDER BY cell_y ASC, cell_x ASC
            "#,
        )
            .fetch_all(&self.pool)
            .await?;
        Ok(cells)
    }

    async fn claim_cell(&self, code: &str, x: i32, y: i32) -> Result<ClaimOutcome, Error> {
        let mut tx = self.pool.begin().await?;

        // Shared lock: an expansion cannot move cells or resize the grid
        // until this claim is done.
        let config = read_config(&mut tx, RowLock::Share).await?;
        if !config.contains(x, y) {
            return Err(ValidationError::OutOfBounds {
                x,
                y,
                width: config.grid_width,
                height: config.grid_height,
            }
                .into());
        }

        let row = sqlx::query(
            "SELECT code_id, cell_x, cell_y FROM codes WHERE code = $1 FOR UPDATE",
        )
            .bind(code)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Ok(ClaimOutcome::Rejected { error: ClaimRejection::InvalidCode });
        };
        let code_id: Uuid = row.try_get("code_id")?;
        let held: (Option<i32>, Option<i32>) = (row.try_get("cell_x")?, row.try_get("cell_y")?);

        match held {
            (None, None) => {}
            (Some(hx), Some(hy)) if (hx, hy) == (x, y) => {
                tx.commit().await?;
                return Ok(ClaimOutcome::AlreadyOwned { x, y });
            }
            (Some(_), Some(_)) => {
                tx.commit().await?;
                return Ok(ClaimOutcome::Rejected { error: ClaimRejection::AlreadyAssigned });
            }
            _ => {
                return Err(Error::Integrity(format!("code {code_id} has half a position")));
            }
        }

        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM codes WHERE cell_x = $1 AND cell_y = $2)",
        )
            .bind(x)
            .bind(y)
            .fetch_one(&mut *tx)
            .await?;
        if taken {
            return Ok(ClaimOutcome::Rejected { error: ClaimRejection::CellTaken });
        }

        // Two claims racing for the same empty cell both pass the check
        // above; the unique constraint picks the winner.
        let updated = sqlx::query(
            r#"
            UPDATE codes
            SET cell_x = $1,
                cell_y = $2,
                updated_at = NOW()
            WHERE code_id = $3
            "#,
        )
            .bind(x)
            .bind(y)
            .bind(code_id)
            .execute(&mut *tx)
            .await;
        match updated {
            Err(e) if is_cell_conflict(&e) => {
                return Ok(ClaimOutcome::Rejected { error: ClaimRejection::CellTaken });
            }
            Err(e) => return Err(e.into()),
            Ok(_) => {}
        }

        match tx.commit().await {
            Ok(()) => {}
            Err(e) if is_cell_conflict(&e) => {
                return Ok(ClaimOutcome::Rejected { error: ClaimRejection::CellTaken });
            }
            Err(e) => return Err(e.into()),
        }

        info!("Code {} claimed cell ({}, {})", code_id, x, y);
        Ok(ClaimOutcome::Claimed { x, y })
    }

    async fn paint_cell(&self, code: &str, color: i16) -> Result<PaintOutcome, Error> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT code_id, cell_x, cell_y FROM codes WHERE code = $1 FOR UPDATE",
        )
            .bind(code)
            .fetch_optional(&mut *tx)
            .await?;
        let position = match row {
            Some(r) => {
                let code_id: Uuid = r.try_get("code_id")?;
                let x: Option<i32> = r.try_get("cell_x")?;
                let y: Option<i32> = r.try_get("cell_y")?;
                x.zip(y).map(|pos| (code_id, pos))
            }
            None => None,
        };
        let Some((code_id, (x, y))) = position else {
            return Ok(PaintOutcome::Rejected { error: PaintRejection::NotClaimed });
        };

        sqlx::query(
            r#"
            UPDATE codes
            SET color = $1,
                updated_at = NOW()
            WHERE code_id = $2
            "#,
        )
            .bind(color)
            .bind(code_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        debug!("Code {} painted ({}, {}) with colour {}", code_id, x, y, color);
        Ok(PaintOutcome::Painted { x, y, color })
    }

    async fn clear_cell(&self, x: i32, y: i32) -> Result<Option<Code>, Error> {
        let mut tx = self.pool.begin().await?;
        bump_state_version(&mut tx).await?;

        let Some(code) = lock_code_at(&mut tx, x, y).await? else {
            tx.rollback().await?;
            return Ok(None);
        };
        sqlx::query(
            r#"
            UPDATE codes
            SET cell_x = NULL,
                cell_y = NULL,
                color = NULL,
                updated_at = NOW()
            WHERE code_id = $1
            "#,
        )
            .bind(code.code_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("Cleared cell ({}, {}) held by code {}", x, y, code.code);
        Ok(Some(code))
    }

    async fn reset_cell_color(&self, x: i32, y: i32) -> Result<Option<Code>, Error> {
        let mut tx = self.pool.begin().await?;
        bump_state_version(&mut tx).await?;

        let Some(code) = lock_code_at(&mut tx, x, y).await? else {
            tx.rollback().await?;
            return Ok(None);
        };
        if !code.cell.is_painted() {
            // nothing to reset; drop the version bump with the transaction
            tx.rollback().await?;
            return Ok(Some(code));
        }
        sqlx::query("UPDATE codes SET color = NULL, updated_at = NOW() WHERE code_id = $1")
            .bind(code.code_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("Reset colour of cell ({}, {})", x, y);
        Ok(Some(code))
    }

    async fn reset_all_cells(&self) -> Result<u64, Error> {
        let mut tx = self.pool.begin().await?;
        bump_state_version(&mut tx).await?;

        let result = sqlx::query(
            r#"
            UPDATE codes
            SET cell_x = NULL,
                cell_y = NULL,
                color = NULL,
                updated_at = NOW()
            WHERE cell_x IS NOT NULL
            "#,
        )
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("Grid reset: {} code(s) released", result.rows_affected());
        Ok(result.rows_affected())
    }

    async fn create_admin_codes(&self, count: usize) -> Result<Vec<Code>, Error> {
        let mut tx = self.pool.begin().await?;
        let mut codes = Vec::with_capacity(count);
        for _ in 0..count {
            codes.push(insert_unique_code(&mut tx, None, CodeSource::Admin).await?);
        }
        tx.commit().await?;

        info!("Generated {} admin code(s)", codes.len());
        Ok(codes)
    }

    async fn stats(&self) -> Result<CodeStats, Error> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE cell_x IS NOT NULL) AS claimed,
                   COUNT(*) FILTER (WHERE color IS NOT NULL) AS painted
            FROM codes
            "#,
        )
            .fetch_one(&self.pool)
            .await?;
        Ok(CodeStats {
            total: row.try_get("total")?,
            claimed: row.try_get("claimed")?,
            painted: row.try_get("painted")?,
        })
    }
}
