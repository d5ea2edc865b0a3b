//! Workbook normalization handlers.
//!
//! `load` normalizes the whole data directory before connecting, so a bad
//! workbook aborts the run without touching the database.

use std::path::Path;

use anyhow::Context;
use unipie_core::{AppConfig, SourcesConfig};
use unipie_sheets::PipelineOutput;

fn load_sources(config: &AppConfig) -> anyhow::Result<SourcesConfig> {
    unipie_core::load_sources(&config.sources_path).with_context(|| {
        format!(
            "failed to load sources config from {}",
            config.sources_path.display()
        )
    })
}

/// Normalize every workbook in `data_dir`.
pub(crate) fn normalize(config: &AppConfig, data_dir: &Path) -> anyhow::Result<PipelineOutput> {
    let sources = load_sources(config)?;
    unipie_sheets::normalize_directory(data_dir, &sources)
        .with_context(|| format!("failed to normalize workbooks in {}", data_dir.display()))
}

pub(crate) fn print_tables(output: &PipelineOutput) {
    println!("{} workbook(s)", output.files.len());
    for file in &output.files {
        println!("  {:<40}{}", file.file_name, file.anchor);
    }
    println!("{:<24}ROWS", "TABLE");
    for table in output.tables.iter() {
        println!("{:<24}{}", table.entity.table_name(), table.len());
    }
}

/// Ensure the schema exists, then replace every table.
pub(crate) async fn run_load(pool: &sqlx::PgPool, output: &PipelineOutput) -> anyhow::Result<()> {
    unipie_db::ensure_schema(pool)
        .await
        .context("failed to create tables")?;
    let written = unipie_db::write_tables(pool, &output.tables)
        .await
        .context("failed to write tables")?;

    let total: u64 = written.iter().map(|(_, rows)| rows).sum();
    tracing::info!(files = output.files.len(), rows = total, "load complete");
    for (entity, rows) in written {
        println!("{:<24}{rows}", entity.table_name());
    }
    Ok(())
}

/// Normalize a single workbook and print its anchor and fragment sizes.
pub(crate) fn run_inspect(config: &AppConfig, file: &Path) -> anyhow::Result<()> {
    let sources = load_sources(config)?;
    let fragments = unipie_sheets::normalize_file(file, &sources)
        .with_context(|| format!("failed to normalize {}", file.display()))?;

    println!("file:   {}", fragments.file_name);
    println!("anchor: {}", fragments.anchor);
    println!(
        "header offset: {}",
        sources.programme_header_offset(&fragments.file_name)
    );
    for table in &fragments.fragments {
        println!("  {:<24}{}", table.entity.table_name(), table.len());
    }
    Ok(())
}
