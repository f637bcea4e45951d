use crate::core::storage::{KvStore, StoreError};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;

/// SQLite-backed `KvStore`, one row per (guild, key).
pub struct SqliteKvStore {
    pool: Pool<Sqlite>,
}

fn db_error(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

impl SqliteKvStore {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let in_memory = database_url.contains(":memory:");

        // Ensure the file exists if it's a file path
        let path_str = database_url.trim_start_matches("sqlite://");
        if !in_memory && !Path::new(path_str).exists() {
            if let Some(parent) = Path::new(path_str).parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::File::create(path_str)?;
        }

        let conn_str = if database_url.starts_with("sqlite:") {
            database_url.to_string()
        } else {
            format!("sqlite://{}", database_url)
        };

        // Every in-memory connection is its own database
        let max_connections = if in_memory { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&conn_str)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        tracing::info!(database = %conn_str, "Opened SQLite settings store");
        Ok(store)
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS guild_settings (
                guild_id INTEGER NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (guild_id, key)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn read(&self, guild_id: u64, key: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT value FROM guild_settings WHERE guild_id = ? AND key = ?")
            .bind(guild_id as i64)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(row.map(|row| row.get::<String, _>(0)))
    }

    async fn create(&self, guild_id: u64, key: &str, value: &str) -> Result<(), StoreError> {
        let result =
            sqlx::query("INSERT INTO guild_settings (guild_id, key, value) VALUES (?, ?, ?)")
                .bind(guild_id as i64)
                .bind(key)
                .bind(value)
                .execute(&self.pool)
                .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::AlreadyExists {
                    guild_id,
                    key: key.to_string(),
                })
            }
            Err(e) => Err(db_error(e)),
        }
    }

    async fn update(&self, guild_id: u64, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO guild_settings (guild_id, key, value)
            VALUES (?, ?, ?)
            ON CONFLICT(guild_id, key) DO UPDATE SET
            value = excluded.value
            "#,
        )
        .bind(guild_id as i64)
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn delete(&self, guild_id: u64, key: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM guild_settings WHERE guild_id = ? AND key = ?")
            .bind(guild_id as i64)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(())
    }
}
