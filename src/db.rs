use anyhow::{Context, Result, anyhow};
use diesel::{Connection, pg::PgConnection};
use diesel_async::{
    AsyncPgConnection,
    pooled_connection::{AsyncDieselConnectionManager, bb8::Pool},
};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness};

/// Shared async connection pool handed to every handler through `AppState`.
pub type DbPool = Pool<AsyncPgConnection>;

pub async fn create_pool(database_url: &str) -> Result<DbPool> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    let pool = Pool::builder()
        .build(manager)
        .await
        .context("Failed to build the database connection pool")?;

    Ok(pool)
}

/// Runs any pending embedded migrations on a blocking thread.
///
/// Migrations use diesel's synchronous harness, so they get a dedicated
/// short-lived connection instead of going through the async pool.
pub async fn run_migrations_blocking(
    migrations: EmbeddedMigrations,
    database_url: &str,
) -> Result<usize> {
    let database_url = database_url.to_string();

    tokio::task::spawn_blocking(move || {
        let mut conn = PgConnection::establish(&database_url)
            .context("Failed to connect to the database for migrations")?;

        let versions = conn
            .run_pending_migrations(migrations)
            .map_err(|err| anyhow!("Failed to run migrations: {err}"))?;

        Ok(versions.len())
    })
    .await
    .context("Migration task panicked")?
}
