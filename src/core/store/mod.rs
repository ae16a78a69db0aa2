use std::path::{Path, PathBuf};

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use tokio::fs as async_fs;
use tracing::debug;

use crate::models::ProjectName;

const LAST_PROJECT_KEY: &str = "last_project";

/// Small key-value store kept next to the client, used for the "recent project" shortcut.
#[derive(Debug, Clone)]
pub struct LocalStore {
    path: PathBuf,
    pool: SqlitePool,
}

impl LocalStore {
    /// Opens (creating if needed) the store at `path` and applies migrations.
    pub async fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            async_fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create store directory {:?}", parent))?;
        }

        let connect_opts = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(connect_opts)
            .await
            .with_context(|| format!("Failed to open local store {:?}", path))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to migrate local store")?;

        debug!(?path, "local store opened");
        Ok(Self { path, pool })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM local_settings WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to read setting '{key}'"))?;
        Ok(value)
    }

    pub async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"INSERT INTO local_settings (key, value) VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value"#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to write setting '{key}'"))?;
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM local_settings WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to remove setting '{key}'"))?;
        Ok(())
    }

    /// Last project opened or created, if any. Blank entries read as none.
    pub async fn last_project(&self) -> anyhow::Result<Option<ProjectName>> {
        Ok(self
            .get(LAST_PROJECT_KEY)
            .await?
            .and_then(|name| ProjectName::new(name).ok()))
    }

    pub async fn remember_project(&self, name: &ProjectName) -> anyhow::Result<()> {
        self.set(LAST_PROJECT_KEY, name.as_str()).await
    }

    pub async fn forget_project(&self) -> anyhow::Result<()> {
        self.remove(LAST_PROJECT_KEY).await
    }

    /// Flushes and releases the database file.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
