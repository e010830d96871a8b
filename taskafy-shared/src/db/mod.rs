/// Database layer
///
/// - `pool`: PostgreSQL pool creation, health check, and shutdown
/// - `migrations`: embedded schema migrations from the workspace `migrations/` directory
///
/// Row types and their queries live in [`crate::models`].
///
/// # Example
///
/// ```no_run
/// use taskafy_shared::db::{migrations::run_migrations, pool::{create_pool, DatabaseConfig}};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = create_pool(DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     })
///     .await?;
///
///     run_migrations(&pool).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;
