//! Ping command

use colored::Colorize;

use crate::interfaces::cli::CliError;
use crate::services::ShortUrlService;

pub async fn ping_storage(service: &ShortUrlService) -> Result<(), CliError> {
    let backend = service.storage().backend_config().storage_type;
    service.ping().await?;
    println!("{} {} storage is reachable", "✓".bold().green(), backend.cyan());
    Ok(())
}
