// File: fresq-core/src/repositories/postgres/tickets.rs

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Pool, Postgres, Row};
use tracing::{debug, info};
use uuid::Uuid;
use fresq_common::error::{ConflictError, Error};
use fresq_common::models::{
    Code, CodeSource, NewTicket, Ticket, TicketConfirmation, TicketStats, TicketStatus,
};
use fresq_common::traits::repository_traits::TicketRepository;

use super::codes::{code_from_row, insert_unique_code, CODE_COLUMNS};
use super::grid_config::{read_config, RowLock};
use super::tiers::{count_paid, evaluate_upgrade_in, load_tiers, tier_for_count};
use crate::utils::code_gen::{generate_order_id, MAX_GENERATION_ATTEMPTS};

const TICKET_COLUMNS: &str = "ticket_id, order_id, email, user_id, payment_provider, \
    payment_session_id, amount_cents, base_quantity, bonus_quantity, quantity, status, \
    tier_id, code_id, created_at, paid_at, refunded_at";

fn ticket_from_row(r: &PgRow) -> Result<Ticket, Error> {
    let status: String = r.try_get("status")?;
    Ok(Ticket {
        ticket_id: r.try_get("ticket_id")?,
        order_id: r.try_get("order_id")?,
        email: r.try_get("email")?,
        user_id: r.try_get("user_id")?,
        payment_provider: r.try_get("payment_provider")?,
        payment_session_id: r.try_get("payment_session_id")?,
        amount_cents: r.try_get("amount_cents")?,
        base_quantity: r.try_get("base_quantity")?,
        bonus_quantity: r.try_get("bonus_quantity")?,
        quantity: r.try_get("quantity")?,
        status: status.parse()?,
        tier_id: r.try_get("tier_id")?,
        code_id: r.try_get("code_id")?,
        created_at: r.try_get("created_at")?,
        paid_at: r.try_get("paid_at")?,
        refunded_at: r.try_get("refunded_at")?,
    })
}

/// Returns the user for `email`, creating it if needed.
async fn get_or_create_user(conn: &mut PgConnection, email: &str) -> Result<Uuid, Error> {
    let user_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO users (email)
        VALUES ($1)
        ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
        RETURNING user_id
        "#,
    )
        .bind(email)
        .fetch_one(&mut *conn)
        .await?;
    Ok(user_id)
}

async fn lock_ticket(conn: &mut PgConnection, order_id: &str) -> Result<Ticket, Error> {
    let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE order_id = $1 FOR UPDATE");
    let row = sqlx::query(&sql)
        .bind(order_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::NotFound(format!("ticket {order_id}")))?;
    ticket_from_row(&row)
}

fn closed(ticket: &Ticket) -> Error {
    ConflictError::TicketClosed {
        order_id: ticket.order_id.clone(),
        status: ticket.status.to_string(),
    }
        .into()
}

#[derive(Clone)]
pub struct PostgresTicketRepository {
    pool: Pool<Postgres>,
}

impl PostgresTicketRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TicketRepository for PostgresTicketRepository {
    async fn create_ticket(&self, new_ticket: &NewTicket) -> Result<Ticket, Error> {
        let mut tx = self.pool.begin().await?;

        let user_id = get_or_create_user(&mut tx, &new_ticket.email).await?;
        let tiers = load_tiers(&mut tx).await?;
        let paid = count_paid(&mut tx).await?;
        let tier = tier_for_count(&tiers, paid)?;

        let sql = format!(
            r#"
            INSERT INTO tickets (
                order_id, email, user_id, payment_provider, payment_session_id,
                amount_cents, base_quantity, bonus_quantity, quantity, status, tier_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending', $10)
            ON CONFLICT (order_id) DO NOTHING
            RETURNING {TICKET_COLUMNS}
            "#
        );
        for _ in 0..MAX_GENERATION_ATTEMPTS {
            let row = sqlx::query(&sql)
                .bind(generate_order_id())
                .bind(&new_ticket.email)
                .bind(user_id)
                .bind(&new_ticket.payment_provider)
                .bind(&new_ticket.payment_session_id)
                .bind(new_ticket.amount_cents)
                .bind(new_ticket.base_quantity)
                .bind(new_ticket.bonus_quantity)
                .bind(new_ticket.quantity())
                .bind(tier.tier_id)
                .fetch_optional(&mut *tx)
                .await?;
            if let Some(row) = row {
                let ticket = ticket_from_row(&row)?;
                tx.commit().await?;
                info!(
                    "Created ticket {} for {} ({} unit(s), {} cents)",
                    ticket.order_id, ticket.email, ticket.quantity, ticket.amount_cents
                );
                return Ok(ticket);
            }
        }
        Err(Error::Integrity("could not generate a unique order id".to_string()))
    }

    async fn get_by_order_id(&self, order_id: &str) -> Result<Option<Ticket>, Error> {
        let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE order_id = $1");
        sqlx::query(&sql)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?
            .map(|r| ticket_from_row(&r))
            .transpose()
    }

    async fn list_for_email(&self, email: &str) -> Result<Vec<Ticket>, Error> {
        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE email = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query(&sql).bind(email).fetch_all(&self.pool).await?;
        rows.iter().map(ticket_from_row).collect()
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Ticket>, Error> {
        let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets ORDER BY created_at DESC LIMIT $1");
        let rows = sqlx::query(&sql).bind(limit).fetch_all(&self.pool).await?;
        rows.iter().map(ticket_from_row).collect()
    }

    async fn confirm_payment(&self, order_id: &str) -> Result<TicketConfirmation, Error> {
        let mut tx = self.pool.begin().await?;

        let ticket = lock_ticket(&mut tx, order_id).await?;
        match ticket.status {
            TicketStatus::Pending => {}
            TicketStatus::Paid => {
                return Err(ConflictError::TicketAlreadyPaid(ticket.order_id).into());
            }
            TicketStatus::Refunded | TicketStatus::Cancelled => return Err(closed(&ticket)),
        }

        let mut codes: Vec<Code> = Vec::with_capacity(ticket.quantity.max(0) as usize);
        for _ in 0..ticket.base_quantity {
            codes.push(insert_unique_code(&mut tx, ticket.user_id, CodeSource::Purchased).await?);
        }
        for _ in 0..ticket.bonus_quantity {
            codes.push(insert_unique_code(&mut tx, ticket.user_id, CodeSource::PackBonus).await?);
        }
        let primary_code_id = codes.first().map(|c| c.code_id);

        // Serializes confirmations: the paid count below only changes under
        // this lock.
        read_config(&mut tx, RowLock::Update).await?;
        let tiers = load_tiers(&mut tx).await?;
        let tier_before = tier_for_count(&tiers, count_paid(&mut tx).await?)?;

        let sql = format!(
            r#"
            UPDATE tickets
            SET status = 'paid',
                code_id = $1,
                paid_at = NOW()
            WHERE ticket_id = $2
            RETURNING {TICKET_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(primary_code_id)
            .bind(ticket.ticket_id)
            .fetch_one(&mut *tx)
            .await?;
        let ticket = ticket_from_row(&row)?;

        let tier_upgrade = evaluate_upgrade_in(&mut tx).await?;
        tx.commit().await?;

        info!(
            "Ticket {} paid: {} code(s) issued to {}",
            ticket.order_id,
            codes.len(),
            ticket.email
        );
        Ok(TicketConfirmation { ticket, codes, tier_before, tier_upgrade })
    }

    async fn cancel_ticket(&self, order_id: &str) -> Result<Ticket, Error> {
        let mut tx = self.pool.begin().await?;

        let ticket = lock_ticket(&mut tx, order_id).await?;
        if ticket.status.is_closed() {
            return Err(closed(&ticket));
        }

        let primary_code = match ticket.code_id {
            Some(code_id) => {
                let sql = format!("SELECT {CODE_COLUMNS} FROM codes WHERE code_id = $1 FOR UPDATE");
                sqlx::query(&sql)
                    .bind(code_id)
                    .fetch_optional(&mut *tx)
                    .await?
                    .map(|r| code_from_row(&r))
                    .transpose()?
            }
            None => None,
        };
        if let Some(reason) = ticket.refund_block(primary_code.as_ref()) {
            return Err(ConflictError::RefundBlocked {
                order_id: ticket.order_id.clone(),
                reason,
            }
                .into());
        }

        if let Some(code) = &primary_code {
            sqlx::query("DELETE FROM codes WHERE code_id = $1")
                .bind(code.code_id)
                .execute(&mut *tx)
                .await?;
            debug!("Deleted unused code {} of ticket {}", code.code, ticket.order_id);
        }

        let next = if ticket.status == TicketStatus::Paid {
            TicketStatus::Refunded
        } else {
            TicketStatus::Cancelled
        };
        if !ticket.status.can_transition_to(next) {
            return Err(closed(&ticket));
        }

        let sql = format!(
            r#"
            UPDATE tickets
            SET status = $1,
                refunded_at = NOW()
            WHERE ticket_id = $2
            RETURNING {TICKET_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(next.as_str())
            .bind(ticket.ticket_id)
            .fetch_one(&mut *tx)
            .await?;
        let updated = ticket_from_row(&row)?;
        tx.commit().await?;

        info!("Ticket {} is now {}", updated.order_id, updated.status);
        Ok(updated)
    }

    async fn stats(&self) -> Result<TicketStats, Error> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                   COUNT(*) FILTER (WHERE status = 'paid') AS paid,
                   COUNT(*) FILTER (WHERE status = 'refunded') AS refunded,
                   COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled,
                   COUNT(*) AS total,
                   COALESCE(SUM(amount_cents) FILTER (WHERE status = 'paid'), 0)::BIGINT AS revenue_cents
            FROM tickets
            "#,
        )
            .fetch_one(&self.pool)
            .await?;
        Ok(TicketStats {
            pending: row.try_get("pending")?,
            paid: row.try_get("paid")?,
            refunded: row.try_get("refunded")?,
            cancelled: row.try_get("cancelled")?,
            total: row.try_get("total")?,
            revenue_cents: row.try_get("revenue_cents")?,
        })
    }
}
