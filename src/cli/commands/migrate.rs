use anyhow::Context;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::database::{DatabaseManager, PgStore};

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let config = super::load_config()?;
    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to DATABASE_URL")?;

    PgStore::new(pool).migrate().await.context("migration failed")?;

    match output_format {
        OutputFormat::Json => println!("{}", json!({ "migrated": true })),
        OutputFormat::Text => println!("Catalog schema is up to date"),
    }
    Ok(())
}
