//! Batch shorten command

use colored::Colorize;

use crate::interfaces::cli::CliError;
use crate::services::{BatchRequestItem, ShortUrlService};

pub async fn batch_shorten(
    service: &ShortUrlService,
    owner_id: &str,
    file_path: String,
) -> Result<(), CliError> {
    let content = tokio::fs::read_to_string(&file_path)
        .await
        .map_err(|e| CliError::CommandError(format!("Failed to read {}: {}", file_path, e)))?;
    let items: Vec<BatchRequestItem> = serde_json::from_str(&content)
        .map_err(|e| CliError::ParseError(format!("{}: {}", file_path, e)))?;

    let results = service.make_short_url_batch(owner_id, &items).await?;

    for result in &results {
        println!(
            "  {} {} -> {}",
            result.correlation_id.dimmed(),
            result.short_url.cyan(),
            result.original_url.blue().underline()
        );
    }

    let skipped = items.len() - results.len();
    println!(
        "{} Shortened {} of {} items",
        "✓".bold().green(),
        results.len().to_string().green(),
        items.len()
    );
    if skipped > 0 {
        println!(
            "{} Skipped {} items with invalid URLs",
            "ℹ".bold().blue(),
            skipped.to_string().yellow()
        );
    }
    Ok(())
}
