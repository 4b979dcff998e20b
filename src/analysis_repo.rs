// SQLite slot for the last saved AnalysisResult. Single row (id = 1), JSON text, no versioning.

use std::path::Path;
use std::str::FromStr;

use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{instrument, warn};

use crate::models::AnalysisResult;

pub struct AnalysisRepo {
    pool: SqlitePool,
}

impl AnalysisRepo {
    pub async fn connect(path: &str) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(opts)
            .await?;
        Ok(Self { pool })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS saved_analysis (id INTEGER PRIMARY KEY CHECK (id = 1), data TEXT NOT NULL)",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn has_saved(&self) -> anyhow::Result<bool> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM saved_analysis WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    #[instrument(skip(self, result), fields(repo = "analysis", operation = "save"))]
    pub async fn save(&self, result: &AnalysisResult) -> anyhow::Result<()> {
        let data = serde_json::to_string(result)?;
        sqlx::query("INSERT OR REPLACE INTO saved_analysis (id, data) VALUES (1, $1)")
            .bind(&data)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Saved report, or `None` if the slot is empty or holds unreadable JSON.
    #[instrument(skip(self), fields(repo = "analysis", operation = "load"))]
    pub async fn load(&self) -> anyhow::Result<Option<AnalysisResult>> {
        let row = sqlx::query("SELECT data FROM saved_analysis WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let data: String = row.try_get("data")?;
        match serde_json::from_str(&data) {
            Ok(result) => Ok(Some(result)),
            Err(e) => {
                warn!(error = %e, "saved analysis is corrupt; ignoring");
                Ok(None)
            }
        }
    }

    pub async fn clear(&self) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM saved_analysis WHERE id = 1")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Writes raw text into the slot, bypassing serialization (tests for corrupt data).
    #[doc(hidden)]
    pub async fn save_raw(&self, data: &str) -> anyhow::Result<()> {
        sqlx::query("INSERT OR REPLACE INTO saved_analysis (id, data) VALUES (1, $1)")
            .bind(data)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
