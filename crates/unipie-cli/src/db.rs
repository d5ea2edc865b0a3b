//! Database-facing command handlers.

use anyhow::Context;
use unipie_core::AppConfig;
use unipie_db::PoolConfig;

/// Open a pool and verify it answers before any work is done.
pub(crate) async fn connect(config: &AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool = unipie_db::connect_pool(
        &config.database_url,
        PoolConfig::from_app_config(config),
    )
    .await
    .context("failed to connect to database")?;
    unipie_db::ping(&pool)
        .await
        .context("database did not answer ping")?;
    Ok(pool)
}

pub(crate) async fn run_schema(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    unipie_db::ensure_schema(pool).await?;
    println!("schema ready");
    Ok(())
}

/// Print row counts for every destination table.
///
/// # Errors
///
/// Returns an error if the tables have not been created yet.
pub(crate) async fn run_status(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let counts = unipie_db::table_counts(pool)
        .await
        .context("failed to count rows; run `unipie schema` first")?;

    println!("{:<24}ROWS", "TABLE");
    for (entity, rows) in counts {
        println!("{:<24}{rows}", entity.table_name());
    }
    Ok(())
}
