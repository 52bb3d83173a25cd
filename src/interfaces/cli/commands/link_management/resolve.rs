use crate::interfaces::cli::CliError;
use crate::services::ShortUrlService;

/// Print the original URL on its own line so it can be piped.
pub async fn resolve_link(service: &ShortUrlService, key: String) -> Result<(), CliError> {
    let url = service.get_true_url(&key).await?;
    println!("{}", url);
    Ok(())
}
