//! Inventory code access.
//!
//! Claiming a code for an order is a single conditional `UPDATE ... RETURNING` against one
//! candidate row. The `order_id IS NULL` predicate is re-checked in the outer update, so two
//! orders racing for the same row produce exactly one winner; the loser simply gets no row back
//! and retries against the next candidate (or rolls its transaction back).
use std::collections::HashMap;

use sqlx::{QueryBuilder, Row, SqliteConnection};

use crate::db_types::{Activator, GiftcardCode, StockCode, UcCode};

pub(crate) async fn insert_uc_code(
    code: &str,
    amount: i64,
    is_priority_use: bool,
    conn: &mut SqliteConnection,
) -> Result<UcCode, sqlx::Error> {
    let code = sqlx::query_as(
        "INSERT INTO uc_codes (code, amount, is_priority_use) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(code)
    .bind(amount)
    .bind(is_priority_use)
    .fetch_one(conn)
    .await?;
    Ok(code)
}

pub(crate) async fn insert_stock_code(
    code: &str,
    amount: i64,
    conn: &mut SqliteConnection,
) -> Result<StockCode, sqlx::Error> {
    let code = sqlx::query_as("INSERT INTO stock_codes (code, amount) VALUES ($1, $2) RETURNING *")
        .bind(code)
        .bind(amount)
        .fetch_one(conn)
        .await?;
    Ok(code)
}

pub(crate) async fn insert_giftcard_code(
    code: &str,
    item_id: i64,
    conn: &mut SqliteConnection,
) -> Result<GiftcardCode, sqlx::Error> {
    let code = sqlx::query_as("INSERT INTO giftcard_codes (code, item_id) VALUES ($1, $2) RETURNING *")
        .bind(code)
        .bind(item_id)
        .fetch_one(conn)
        .await?;
    Ok(code)
}

pub(crate) async fn count_stock_codes(amount: i64, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM stock_codes WHERE amount = $1 AND order_id IS NULL")
        .bind(amount)
        .fetch_one(conn)
        .await?;
    Ok(count)
}

pub(crate) async fn count_giftcards(item_id: i64, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM giftcard_codes WHERE item_id = $1 AND order_id IS NULL")
        .bind(item_id)
        .fetch_one(conn)
        .await?;
    Ok(count)
}

/// Unreserved, unresolved UC code counts per denomination, for the given denominations only.
pub(crate) async fn available_uc_counts(
    amounts: &[i64],
    conn: &mut SqliteConnection,
) -> Result<HashMap<i64, i64>, sqlx::Error> {
    if amounts.is_empty() {
        return Ok(HashMap::new());
    }
    let mut builder = QueryBuilder::new(
        "SELECT amount, COUNT(*) AS cnt FROM uc_codes WHERE order_id IS NULL AND is_activated = 0 AND amount IN (",
    );
    let mut values = builder.separated(", ");
    for amount in amounts {
        values.push_bind(*amount);
    }
    builder.push(") GROUP BY amount");
    let rows = builder.build().fetch_all(conn).await?;
    let counts = rows.into_iter().map(|row| (row.get::<i64, _>("amount"), row.get::<i64, _>("cnt"))).collect();
    Ok(counts)
}

/// Claims one unreserved stock code of the given denomination for the order, oldest first.
pub(crate) async fn claim_stock_code(
    order_id: i64,
    amount: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<String>, sqlx::Error> {
    let code = sqlx::query_scalar(
        r#"
        UPDATE stock_codes SET order_id = $1, updated_at = CURRENT_TIMESTAMP
        WHERE id = (
            SELECT id FROM stock_codes WHERE amount = $2 AND order_id IS NULL ORDER BY created_at, id LIMIT 1
        ) AND order_id IS NULL
        RETURNING code
        "#,
    )
    .bind(order_id)
    .bind(amount)
    .fetch_optional(conn)
    .await?;
    Ok(code)
}

/// Claims one unreserved gift-card code belonging to the given catalog item.
pub(crate) async fn claim_giftcard(
    order_id: i64,
    item_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<String>, sqlx::Error> {
    let code = sqlx::query_scalar(
        r#"
        UPDATE giftcard_codes SET order_id = $1, updated_at = CURRENT_TIMESTAMP
        WHERE id = (
            SELECT id FROM giftcard_codes WHERE item_id = $2 AND order_id IS NULL ORDER BY created_at, id LIMIT 1
        ) AND order_id IS NULL
        RETURNING code
        "#,
    )
    .bind(order_id)
    .bind(item_id)
    .fetch_optional(conn)
    .await?;
    Ok(code)
}

/// Claims one unreserved, unresolved UC code of the given denomination. Priority-use codes are
/// consumed first, then oldest stock.
pub(crate) async fn claim_uc_code(
    order_id: i64,
    amount: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<String>, sqlx::Error> {
    let code = sqlx::query_scalar(
        r#"
        UPDATE uc_codes SET order_id = $1, updated_at = CURRENT_TIMESTAMP
        WHERE id = (
            SELECT id FROM uc_codes
            WHERE amount = $2 AND order_id IS NULL AND is_activated = 0
            ORDER BY is_priority_use DESC, created_at, id LIMIT 1
        ) AND order_id IS NULL
        RETURNING code
        "#,
    )
    .bind(order_id)
    .bind(amount)
    .fetch_optional(conn)
    .await?;
    Ok(code)
}

pub(crate) async fn stock_codes_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT code FROM stock_codes WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await
}

pub(crate) async fn giftcards_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT code FROM giftcard_codes WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await
}

pub(crate) async fn uc_codes_for_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<UcCode>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM uc_codes WHERE order_id = $1 ORDER BY id").bind(order_id).fetch_all(conn).await
}

/// Total denomination already reserved for the order, resolved or not.
pub(crate) async fn reserved_uc_sum(order_id: i64, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COALESCE(SUM(amount), 0) FROM uc_codes WHERE order_id = $1")
        .bind(order_id)
        .fetch_one(conn)
        .await
}

/// Total denomination successfully activated for the order.
pub(crate) async fn successful_uc_sum(order_id: i64, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COALESCE(SUM(amount), 0) FROM uc_codes WHERE order_id = $1 AND is_success = 1")
        .bind(order_id)
        .fetch_one(conn)
        .await
}

pub(crate) async fn fetch_uc_code(code: &str, conn: &mut SqliteConnection) -> Result<Option<UcCode>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM uc_codes WHERE code = $1").bind(code).fetch_optional(conn).await
}

pub(crate) async fn set_activator(
    code: &str,
    activator: Activator,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE uc_codes SET activator = $1, updated_at = CURRENT_TIMESTAMP WHERE code = $2")
        .bind(activator)
        .bind(code)
        .execute(conn)
        .await?;
    Ok(())
}

/// Stores a transient provider status on an unresolved code. Resolved codes are never touched.
pub(crate) async fn set_transient_status(
    code: &str,
    status: &str,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE uc_codes SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE code = $2 AND is_activated = 0")
        .bind(status)
        .bind(code)
        .execute(conn)
        .await?;
    Ok(())
}

/// Records the terminal activation outcome. Returns `false` when the code was already resolved,
/// which is how webhook replays are absorbed.
pub(crate) async fn mark_resolved(
    code: &str,
    success: bool,
    status: &str,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE uc_codes SET is_activated = 1, is_success = $1, status = $2, updated_at = CURRENT_TIMESTAMP \
         WHERE code = $3 AND is_activated = 0",
    )
    .bind(success)
    .bind(status)
    .bind(code)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}
