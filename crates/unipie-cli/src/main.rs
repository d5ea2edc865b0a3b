mod db;
mod load;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "unipie")]
#[command(about = "Normalize university workbooks into Postgres")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Normalize every workbook in the data directory and replace the tables
    Load {
        /// Directory holding the `.xlsx` exports (defaults to `UNIPIE_DATA_DIR`)
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Normalize and report row counts without touching the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Create the destination tables if they do not exist
    Schema,
    /// Show row counts per destination table
    Status,
    /// Normalize one workbook and print what it contributes
    Inspect {
        /// Path to the workbook
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = unipie_core::load_app_config().context("failed to load configuration")?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let Some(command) = cli.command else {
        println!("unipie: run `unipie --help` for available commands");
        return Ok(());
    };

    match command {
        Commands::Load { data_dir, dry_run } => {
            let data_dir = data_dir.unwrap_or_else(|| config.data_dir.clone());
            let output = load::normalize(&config, &data_dir)?;
            if dry_run {
                load::print_tables(&output);
                return Ok(());
            }
            let pool = db::connect(&config).await?;
            load::run_load(&pool, &output).await?;
        }
        Commands::Schema => {
            let pool = db::connect(&config).await?;
            db::run_schema(&pool).await?;
        }
        Commands::Status => {
            let pool = db::connect(&config).await?;
            db::run_status(&pool).await?;
        }
        Commands::Inspect { file } => load::run_inspect(&config, &file)?,
    }

    Ok(())
}
