/// PostgreSQL plumbing
///
/// - [`pool`]: connection pool with a startup health check
/// - [`migrations`]: embedded schema migrations and status reporting
///
/// # Example
///
/// ```no_run
/// use partnerdesk_shared::db::{migrations::run_migrations, pool::{create_pool, DatabaseConfig}};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = create_pool(DatabaseConfig::new(std::env::var("DATABASE_URL")?)).await?;
///     run_migrations(&pool).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;
