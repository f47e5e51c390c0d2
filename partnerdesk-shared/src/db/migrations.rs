/// Schema migrations
///
/// The SQL files under the workspace `migrations/` directory are embedded at
/// compile time. Each migration is reversible: `<version>_<name>.up.sql` and
/// `<version>_<name>.down.sql`.

use sqlx::{
    migrate::{MigrateDatabase, MigrateError, Migrator},
    postgres::PgPool,
    Postgres,
};
use tracing::{debug, info};

pub static MIGRATOR: Migrator = sqlx::migrate!("../migrations");

/// Applied versus embedded migrations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub applied_migrations: usize,
    pub latest_version: Option<i64>,

    /// Number of embedded migrations (up direction only)
    pub known_migrations: usize,
}

impl MigrationStatus {
    pub fn is_up_to_date(&self) -> bool {
        self.applied_migrations >= self.known_migrations
    }

    pub fn pending(&self) -> usize {
        self.known_migrations.saturating_sub(self.applied_migrations)
    }
}

fn known_migrations() -> usize {
    MIGRATOR
        .iter()
        .filter(|m| !m.migration_type.is_down_migration())
        .count()
}

/// Applies every pending migration
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    info!(known = known_migrations(), "Running database migrations");

    MIGRATOR.run(pool).await.map_err(|e| {
        tracing::error!(error = %e, "Migration failed");
        e
    })?;

    info!("Database schema is up to date");
    Ok(())
}

/// Reads `_sqlx_migrations` and compares it with the embedded set
pub async fn migration_status(pool: &PgPool) -> Result<MigrationStatus, sqlx::Error> {
    let known = known_migrations();

    let table_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (
            SELECT FROM information_schema.tables
            WHERE table_schema = current_schema()
              AND table_name = '_sqlx_migrations'
        )",
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        debug!("No migrations applied yet");
        return Ok(MigrationStatus {
            applied_migrations: 0,
            latest_version: None,
            known_migrations: known,
        });
    }

    let (count, latest_version): (i64, Option<i64>) = sqlx::query_as(
        "SELECT COUNT(*), MAX(version) FROM _sqlx_migrations WHERE success = true",
    )
    .fetch_one(pool)
    .await?;

    Ok(MigrationStatus {
        applied_migrations: usize::try_from(count).unwrap_or(0),
        latest_version,
        known_migrations: known,
    })
}

/// Creates the database named in `database_url` when it is missing
///
/// Meant for local development; production databases are provisioned
/// separately.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), sqlx::Error> {
    if Postgres::database_exists(database_url).await? {
        debug!("Database already exists");
        return Ok(());
    }

    info!("Database does not exist, creating it");
    Postgres::create_database(database_url).await
}
