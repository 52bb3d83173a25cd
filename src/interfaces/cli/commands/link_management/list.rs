//! List links command

use colored::Colorize;

use crate::interfaces::cli::CliError;
use crate::services::ShortUrlService;

pub async fn list_links(service: &ShortUrlService, owner_id: &str) -> Result<(), CliError> {
    let config = service.storage().backend_config();
    if !config.supports_ownership_queries {
        println!(
            "{} The {} backend does not track owners; listing is always empty",
            "ℹ".bold().blue(),
            config.storage_type.yellow()
        );
    }

    let records = service.get_all_records(owner_id).await?;

    if records.is_empty() {
        println!("{} No short links found", "ℹ".bold().blue());
    } else {
        println!("{}", "Short link list:".bold().green());
        println!();
        for record in &records {
            println!(
                "  {} -> {}",
                record.short_url.cyan(),
                record.original_url.blue().underline()
            );
        }
        println!();
        println!(
            "{} Total {} short links",
            "ℹ".bold().blue(),
            records.len().to_string().green()
        );
    }
    Ok(())
}
