use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;
use ucs_common::Usdt;

use crate::{
    db_types::{Currency, NewTopUp, TopUp},
    traits::StorefrontError,
};

/// Inserts a top-up. Wallet (USDT) deposits land on a shared address and are matched back to the
/// customer purely by the transferred amount, so the commission is bumped in 0.001 steps until
/// `to_pay` is unique among unpaid top-ups. Ruble deposits go through a payment gateway with their
/// own reference and carry no commission.
pub(crate) async fn insert_topup(
    topup: NewTopUp,
    min_commission: Usdt,
    conn: &mut SqliteConnection,
) -> Result<TopUp, StorefrontError> {
    let (commission, to_pay) = match topup.currency {
        Currency::Usdt => {
            let mut step = 1i64;
            loop {
                let commission = min_commission + Usdt::from_milli(step);
                let to_pay = topup.amount + commission;
                let clashes: i64 =
                    sqlx::query_scalar("SELECT COUNT(*) FROM topups WHERE to_pay = $1 AND is_paid = 0")
                        .bind(to_pay)
                        .fetch_one(&mut *conn)
                        .await?;
                if clashes == 0 {
                    break (commission, to_pay);
                }
                debug!("💰️ Top-up amount {to_pay} is taken. Bumping the commission.");
                step += 1;
            }
        },
        Currency::Rub => (Usdt::default(), topup.amount),
    };
    let topup = sqlx::query_as(
        r#"
        INSERT INTO topups (customer_id, amount, commission, to_pay, currency, payment_url)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(topup.customer_id)
    .bind(topup.amount)
    .bind(commission)
    .bind(to_pay)
    .bind(topup.currency)
    .bind(topup.payment_url)
    .fetch_one(conn)
    .await?;
    Ok(topup)
}

pub(crate) async fn fetch_topup(topup_id: i64, conn: &mut SqliteConnection) -> Result<Option<TopUp>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM topups WHERE id = $1").bind(topup_id).fetch_optional(conn).await
}

/// Marks a top-up as paid. `paid_at` is stamped on the first application only, and an existing
/// transaction id is never overwritten with nothing.
pub(crate) async fn mark_paid(
    topup_id: i64,
    tx_id: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<TopUp, StorefrontError> {
    let topup: Option<TopUp> = sqlx::query_as(
        r#"
        UPDATE topups SET
            is_paid = 1,
            tx_id = COALESCE($1, tx_id),
            paid_at = COALESCE(paid_at, CURRENT_TIMESTAMP),
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $2
        RETURNING *
        "#,
    )
    .bind(tx_id)
    .bind(topup_id)
    .fetch_optional(conn)
    .await?;
    topup.ok_or(StorefrontError::TopUpNotFound(topup_id))
}

/// Flips the credited flag, but only for a paid, not-yet-credited top-up. Returns `false` when the
/// guard fails, which is how double crediting is absorbed.
pub(crate) async fn mark_topped(topup_id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE topups SET is_topped = 1, updated_at = CURRENT_TIMESTAMP \
         WHERE id = $1 AND is_paid = 1 AND is_topped = 0",
    )
    .bind(topup_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Deletes never-paid top-ups created before `cutoff`.
pub(crate) async fn delete_stale(cutoff: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    // Rows are stamped with sqlite's space-separated CURRENT_TIMESTAMP format, so the cutoff must
    // be bound in the same format for the comparison to be meaningful.
    let cutoff = cutoff.format("%Y-%m-%d %H:%M:%S").to_string();
    let result = sqlx::query("DELETE FROM topups WHERE is_paid = 0 AND is_topped = 0 AND created_at < $1")
        .bind(cutoff)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
