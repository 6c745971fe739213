use sqlx::any::AnyPoolOptions;
use sqlx::{AnyPool, Row};

/// Single-connection in-memory SQLite pool; every connection of a memory
/// database is its own database, so the pool must never open a second one.
pub async fn memory_pool() -> AnyPool {
    AnyPoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite")
}

pub async fn create_prices_table(pool: &AnyPool) {
    sqlx::query(
        "CREATE TABLE product_prices (id INTEGER PRIMARY KEY, product_id INTEGER NOT NULL, amount_type TEXT NOT NULL)",
    )
    .execute(pool)
    .await
    .expect("create product_prices");
}

/// `(name, declared type, not null)` for every column, in table order.
pub async fn table_columns(pool: &AnyPool, table_name: &str) -> Vec<(String, String, bool)> {
    sqlx::query(&format!(
        "SELECT name, type, \"notnull\" FROM pragma_table_info('{}') ORDER BY cid",
        table_name
    ))
    .fetch_all(pool)
    .await
    .expect("table info")
    .iter()
    .map(|row| {
        (
            row.get::<String, _>("name"),
            row.get::<String, _>("type"),
            row.get::<i64, _>("notnull") != 0,
        )
    })
    .collect()
}

pub async fn column_names(pool: &AnyPool, table_name: &str) -> Vec<String> {
    table_columns(pool, table_name)
        .await
        .into_iter()
        .map(|(name, _, _)| name)
        .collect()
}
