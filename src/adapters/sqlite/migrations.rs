//! Embedded schema migrations, tracked in `schema_migrations`.

use sqlx::SqlitePool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("migration {version} failed: {source}")]
    Apply {
        version: i64,
        #[source]
        source: sqlx::Error,
    },
    #[error("could not read schema version: {0}")]
    Version(#[source] sqlx::Error),
}

/// One schema step. Versions are applied in ascending order, each at most once.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub sql: &'static str,
}

const EMBEDDED: [Migration; 2] = [
    Migration {
        version: 1,
        description: "projects",
        sql: include_str!("../../../migrations/001_initial_schema.sql"),
    },
    Migration {
        version: 2,
        description: "submissions",
        sql: include_str!("../../../migrations/002_add_submissions.sql"),
    },
];

pub fn all_embedded_migrations() -> Vec<Migration> {
    EMBEDDED.to_vec()
}

pub struct Migrator {
    pool: SqlitePool,
}

impl Migrator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Apply every migration newer than the recorded version, each in its
    /// own transaction together with its `schema_migrations` row.
    ///
    /// Returns how many were applied.
    pub async fn run_embedded_migrations(&self, mut migrations: Vec<Migration>) -> Result<usize, MigrationError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                description TEXT,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|source| MigrationError::Apply { version: 0, source })?;

        let current = self.get_current_version().await?;
        migrations.retain(|m| m.version > current);
        migrations.sort_by_key(|m| m.version);

        for migration in &migrations {
            self.apply(migration).await?;
            tracing::debug!(version = migration.version, description = migration.description, "applied migration");
        }
        Ok(migrations.len())
    }

    pub async fn get_current_version(&self) -> Result<i64, MigrationError> {
        let (version,): (i64,) = sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
            .fetch_one(&self.pool)
            .await
            .map_err(MigrationError::Version)?;
        Ok(version)
    }

    async fn apply(&self, migration: &Migration) -> Result<(), MigrationError> {
        let failed = |source: sqlx::Error| MigrationError::Apply { version: migration.version, source };

        let mut tx = self.pool.begin().await.map_err(failed)?;
        sqlx::raw_sql(migration.sql).execute(&mut *tx).await.map_err(failed)?;
        sqlx::query("INSERT INTO schema_migrations (version, description) VALUES (?, ?)")
            .bind(migration.version)
            .bind(migration.description)
            .execute(&mut *tx)
            .await
            .map_err(failed)?;
        tx.commit().await.map_err(failed)
    }
}
