use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use crate::persistence::{PersistenceError, PersistencePort};
use crate::types::LearnerRecord;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS learner_records (
    learner_id TEXT PRIMARY KEY,
    record     TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

/// SQLite adapter storing each learner record as one JSON document row.
pub struct SqlitePersistence {
    pool: SqlitePool,
}

impl SqlitePersistence {
    pub async fn connect(db_path: &Path) -> Result<Self, PersistenceError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|err| PersistenceError::Backend(err.to_string()))?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
        let options = SqliteConnectOptions::from_str(&db_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::with_pool(pool).await
    }

    pub async fn with_pool(pool: SqlitePool) -> Result<Self, PersistenceError> {
        sqlx::query(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl PersistencePort for SqlitePersistence {
    async fn load(&self, learner_id: &str) -> Result<Option<LearnerRecord>, PersistenceError> {
        let row = sqlx::query("SELECT record FROM learner_records WHERE learner_id = ? LIMIT 1")
            .bind(learner_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let document: String = row.try_get("record")?;
        match serde_json::from_str::<LearnerRecord>(&document) {
            Ok(record) => Ok(Some(record)),
            Err(err) => {
                tracing::warn!(learner_id, error = %err, "corrupt learner record, treating as absent");
                Ok(None)
            }
        }
    }

    async fn save(
        &self,
        learner_id: &str,
        record: &LearnerRecord,
    ) -> Result<(), PersistenceError> {
        let document = serde_json::to_string(record)
            .map_err(|err| PersistenceError::Backend(err.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO learner_records (learner_id, record, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(learner_id) DO UPDATE SET
                record = excluded.record,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(learner_id)
        .bind(&document)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
