use sqlx::SqliteConnection;
use ucs_common::Usdt;

use crate::{
    db_types::{Customer, NewCustomer, POINTS_RATIO},
    traits::AccountApiError,
};

pub(crate) async fn fetch_customer(
    customer_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Customer>, AccountApiError> {
    let customer =
        sqlx::query_as("SELECT * FROM customers WHERE id = $1").bind(customer_id).fetch_optional(conn).await?;
    Ok(customer)
}

pub(crate) async fn fetch_customer_by_tg_id(
    tg_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Customer>, AccountApiError> {
    let customer =
        sqlx::query_as("SELECT * FROM customers WHERE tg_id = $1").bind(tg_id).fetch_optional(conn).await?;
    Ok(customer)
}

/// Inserts the customer, or refreshes the mutable profile fields if the telegram id is already
/// known. `is_admin` is deliberately not overwritten on conflict.
pub(crate) async fn upsert_customer(
    customer: NewCustomer,
    conn: &mut SqliteConnection,
) -> Result<Customer, AccountApiError> {
    let customer = sqlx::query_as(
        r#"
        INSERT INTO customers (tg_id, username, first_name, last_name, is_admin)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (tg_id) DO UPDATE SET
            username = excluded.username,
            first_name = excluded.first_name,
            last_name = excluded.last_name,
            updated_at = CURRENT_TIMESTAMP
        RETURNING *
        "#,
    )
    .bind(customer.tg_id)
    .bind(customer.username)
    .bind(customer.first_name)
    .bind(customer.last_name)
    .bind(customer.is_admin)
    .fetch_one(conn)
    .await?;
    Ok(customer)
}

/// Adjusts the balance by `amount` (negative = debit). The guard clause keeps the balance
/// non-negative under concurrent debits. Debits accrue 1 loyalty point per whole USDT spent.
/// Call this inside a transaction when the adjustment must be atomic with other writes.
pub(crate) async fn adjust_balance(
    customer_id: i64,
    amount: Usdt,
    conn: &mut SqliteConnection,
) -> Result<Usdt, AccountApiError> {
    let result = sqlx::query(
        "UPDATE customers SET balance = balance + $1, updated_at = CURRENT_TIMESTAMP \
         WHERE id = $2 AND balance + $1 >= 0",
    )
    .bind(amount)
    .bind(customer_id)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        return match fetch_customer(customer_id, conn).await? {
            Some(_) => Err(AccountApiError::InsufficientFunds),
            None => Err(AccountApiError::CustomerNotFound(customer_id)),
        };
    }
    if amount.is_negative() {
        // 1 point per whole USDT spent
        let points = amount.value().abs() / 1_000;
        if points > 0 {
            sqlx::query("UPDATE customers SET points = points + $1 WHERE id = $2")
                .bind(points)
                .bind(customer_id)
                .execute(&mut *conn)
                .await?;
        }
    }
    let balance: Usdt =
        sqlx::query_scalar("SELECT balance FROM customers WHERE id = $1").bind(customer_id).fetch_one(conn).await?;
    Ok(balance)
}

/// Converts every full block of [`POINTS_RATIO`] points into 1 USDT of balance, in one atomic
/// statement. Returns `false` when the customer has fewer than [`POINTS_RATIO`] points.
pub(crate) async fn redeem_points(customer_id: i64, conn: &mut SqliteConnection) -> Result<bool, AccountApiError> {
    let result = sqlx::query(
        r#"
        UPDATE customers SET
            balance = balance + (points / $1) * 1000,
            points = points % $1,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $2 AND points >= $1
        "#,
    )
    .bind(POINTS_RATIO)
    .bind(customer_id)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() > 0 {
        return Ok(true);
    }
    match fetch_customer(customer_id, conn).await? {
        Some(_) => Ok(false),
        None => Err(AccountApiError::CustomerNotFound(customer_id)),
    }
}
