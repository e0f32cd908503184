//! Runtime SQL for the key/value record table

use hotswap_errors::Error;
use sqlx::{query, Pool, Row, Sqlite};

/// Raw value stored under `key`
pub async fn get_value(pool: &Pool<Sqlite>, key: &str) -> Result<Option<String>, Error> {
    let row = query("SELECT value FROM records WHERE key = ?1")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| r.get::<String, _>("value")))
}

/// Insert or replace the value stored under `key`
pub async fn set_value(pool: &Pool<Sqlite>, key: &str, value: &str) -> Result<(), Error> {
    let now = chrono::Utc::now().timestamp();

    query(
        "INSERT INTO records (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
    )
    .bind(key)
    .bind(value)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete `key`; absent keys are not an error
pub async fn remove_value(pool: &Pool<Sqlite>, key: &str) -> Result<(), Error> {
    query("DELETE FROM records WHERE key = ?1")
        .bind(key)
        .execute(pool)
        .await?;

    Ok(())
}
