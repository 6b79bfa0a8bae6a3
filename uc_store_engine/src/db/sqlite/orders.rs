use sqlx::SqliteConnection;
use ucs_common::Usdt;

use crate::{
    db_types::{NewOrder, Order, OrderStatus},
    traits::StorefrontError,
};

/// Inserts a new order in `Pending` state. This is not atomic on its own; the caller wraps it in
/// a transaction together with the balance debit and passes `&mut *tx` as the connection.
pub(crate) async fn insert_order(
    order: NewOrder,
    balance_before: Usdt,
    conn: &mut SqliteConnection,
) -> Result<Order, StorefrontError> {
    let order = sqlx::query_as(
        r#"
        INSERT INTO orders (
            customer_id,
            item_id,
            quantity,
            item_data,
            price,
            category,
            player_id,
            balance_before
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(order.customer_id)
    .bind(order.item_id)
    .bind(order.quantity)
    .bind(order.item_data)
    .bind(order.price)
    .bind(order.category)
    .bind(order.player_id)
    .bind(balance_before)
    .fetch_one(conn)
    .await?;
    Ok(order)
}

pub(crate) async fn fetch_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(order)
}

/// Orders for a customer, newest first.
pub(crate) async fn fetch_orders_for_customer(
    customer_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE customer_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(customer_id)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

pub(crate) async fn set_message_id(
    order_id: i64,
    message_id: i64,
    conn: &mut SqliteConnection,
) -> Result<(), StorefrontError> {
    let result = sqlx::query("UPDATE orders SET message_id = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
        .bind(message_id)
        .bind(order_id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StorefrontError::OrderNotFound(order_id));
    }
    Ok(())
}

/// Writes the new status without any legality checks. Lifecycle rules live in the caller.
pub(crate) async fn update_status(
    order_id: i64,
    status: OrderStatus,
    conn: &mut SqliteConnection,
) -> Result<Order, StorefrontError> {
    let result: Option<Order> =
        sqlx::query_as("UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
            .bind(status)
            .bind(order_id)
            .fetch_optional(conn)
            .await?;
    result.ok_or(StorefrontError::OrderNotFound(order_id))
}
