//! Database migration management.
//!
//! Migrations are embedded into the binary at compile time and extracted to
//! a temporary directory at runtime when the source `migrations/` directory
//! is absent, so distributed binaries migrate without shipping the directory
//! alongside the executable.

use include_dir::{include_dir, Dir};
use sqlx::{Pool, Sqlite};
use tempfile::TempDir;

static MIGRATIONS_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/migrations");

/// Runs SQLx migrations embedded in the binary.
///
/// In development builds the source migrations directory is used directly;
/// distributed binaries extract the embedded copies to a temp directory.
pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<(), anyhow::Error> {
    let source_migrations = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");

    if source_migrations.exists() {
        let migrator = sqlx::migrate::Migrator::new(source_migrations.as_path()).await?;
        migrator.run(pool).await?;
        Ok(())
    } else {
        // Keep temp_dir alive for the whole function so the extracted files
        // stay readable while the migrator runs.
        let temp_dir = TempDir::new()?;
        let migrations_path = temp_dir.path().join("migrations");
        std::fs::create_dir_all(&migrations_path)?;

        for file in MIGRATIONS_DIR.files() {
            let file_path = migrations_path.join(file.path());
            if let Some(parent) = file_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&file_path, file.contents())?;
        }

        let migrator = sqlx::migrate::Migrator::new(migrations_path.as_path()).await?;
        migrator.run(pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::SqlitePool;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_run_migrations_success_with_memory_db() {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create test pool");

        let result = run_migrations(&pool).await;
        assert!(
            result.is_ok(),
            "Migrations should succeed on fresh database"
        );
    }

    #[tokio::test]
    async fn test_run_migrations_success_with_file_db() {
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        let db_path = temp_file.path();

        let pool = SqlitePool::connect(&format!("sqlite:{}", db_path.display()))
            .await
            .expect("Failed to create test pool");

        let result = run_migrations(&pool).await;
        assert!(result.is_ok(), "Migrations should succeed on file database");
    }

    #[tokio::test]
    async fn test_run_migrations_idempotency() {
        // Migrations must be safe to run multiple times.
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create test pool");

        let result1 = run_migrations(&pool).await;
        assert!(result1.is_ok(), "First migration run should succeed");

        let result2 = run_migrations(&pool).await;
        assert!(result2.is_ok(), "Second migration run should succeed");
    }

    #[tokio::test]
    async fn test_migrations_create_expected_tables() {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create test pool");
        run_migrations(&pool).await.expect("migrations failed");

        for table in ["targets", "queue", "pages", "classifier_records", "logs"] {
            let count: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
            )
            .bind(table)
            .fetch_one(&pool)
            .await
            .expect("schema query failed");
            assert_eq!(count, 1, "expected table {table} to exist");
        }
    }
}
