use sqlx::SqliteConnection;

use crate::db_types::{Activator, ActivatorPriority};

/// The active ranking, lowest priority value first. Re-read on every activation attempt so that
/// operator edits take effect immediately.
pub(crate) async fn fetch_active(conn: &mut SqliteConnection) -> Result<Vec<ActivatorPriority>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM activator_priorities WHERE is_active = 1 ORDER BY priority, id")
        .fetch_all(conn)
        .await
}

pub(crate) async fn upsert(
    name: Activator,
    priority: i64,
    is_active: bool,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO activator_priorities (name, priority, is_active) VALUES ($1, $2, $3)
        ON CONFLICT (name) DO UPDATE SET priority = excluded.priority, is_active = excluded.is_active
        "#,
    )
    .bind(name)
    .bind(priority)
    .bind(is_active)
    .execute(conn)
    .await?;
    Ok(())
}
