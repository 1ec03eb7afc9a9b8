use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Durable client-side session: the bearer token plus the serialized user
/// object, restored at startup and dropped on logout.
#[derive(Clone)]
pub struct SessionStorage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSession {
    pub token: String,
    pub user_json: String,
    pub updated_at: DateTime<Utc>,
}

impl SessionStorage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // A single connection keeps `sqlite::memory:` databases alive and shared.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open session database '{database_url}'"))?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn load_session(&self) -> Result<Option<StoredSession>> {
        let row = sqlx::query("SELECT token, user_json, updated_at FROM client_session WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .context("failed to read stored session")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let updated_at: String = row.try_get("updated_at")?;
        let updated_at = DateTime::parse_from_rfc3339(&updated_at)
            .with_context(|| format!("invalid session timestamp '{updated_at}'"))?
            .with_timezone(&Utc);

        Ok(Some(StoredSession {
            token: row.try_get("token")?,
            user_json: row.try_get("user_json")?,
            updated_at,
        }))
    }

    pub async fn save_session(&self, token: &str, user_json: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO client_session (id, token, user_json, updated_at)
            VALUES (1, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                token = excluded.token,
                user_json = excluded.user_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(token)
        .bind(user_json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .context("failed to persist session")?;
        Ok(())
    }

    pub async fn clear_session(&self) -> Result<()> {
        sqlx::query("DELETE FROM client_session")
            .execute(&self.pool)
            .await
            .context("failed to clear stored session")?;
        Ok(())
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
