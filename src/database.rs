use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;

pub type Database = Pool<Sqlite>;

pub async fn create_database_pool(database_url: &str) -> Result<Database, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Test the connection
    sqlx::query("SELECT 1")
        .fetch_one(&pool)
        .await?;

    init_schema(&pool).await?;

    log::info!("Connected to ledger store at {}", database_url);
    Ok(pool)
}

pub async fn init_schema(db: &Database) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT,
            item_code TEXT,
            item_name TEXT,
            action_type TEXT NOT NULL,
            quantity REAL CHECK (quantity IS NULL OR quantity >= 0),
            unit TEXT,
            category TEXT,
            expiry_date TEXT,
            department TEXT,
            requester TEXT,
            remark TEXT,
            upload_time TEXT NOT NULL
        )
        "#,
    )
    .execute(db)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chem_transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT,
            chem_code TEXT NOT NULL,
            chem_desc TEXT,
            action_type TEXT NOT NULL,
            qty_kg REAL CHECK (qty_kg IS NULL OR qty_kg >= 0),
            qty_l REAL,
            density REAL,
            department TEXT,
            requester TEXT,
            remark TEXT,
            upload_time TEXT NOT NULL
        )
        "#,
    )
    .execute(db)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_transactions_upload_time ON transactions (upload_time)")
        .execute(db)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chem_transactions_upload_time ON chem_transactions (upload_time)")
        .execute(db)
        .await?;

    Ok(())
}

/// Single-connection in-memory store for tests.
#[cfg(test)]
pub async fn memory_pool() -> Database {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init_schema(&pool).await.unwrap();
    pool
}

/// Same as [`memory_pool`] but without any tables.
#[cfg(test)]
pub async fn empty_memory_pool() -> Database {
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap()
}
