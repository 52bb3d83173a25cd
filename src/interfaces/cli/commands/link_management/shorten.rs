//! Shorten command

use colored::Colorize;

use crate::interfaces::cli::CliError;
use crate::services::ShortUrlService;

pub async fn shorten_link(
    service: &ShortUrlService,
    owner_id: &str,
    url: String,
) -> Result<(), CliError> {
    let outcome = service.make_short_url(owner_id, &url).await?;

    if outcome.already_existed {
        println!(
            "{} Already shortened: {} -> {}",
            "ℹ".bold().blue(),
            outcome.short_url.cyan(),
            url.blue().underline()
        );
    } else {
        println!(
            "{} Added short link: {} -> {}",
            "✓".bold().green(),
            outcome.short_url.cyan(),
            url.blue().underline()
        );
    }
    Ok(())
}
