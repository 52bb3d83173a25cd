//! Delete links command

use colored::Colorize;

use crate::interfaces::cli::CliError;
use crate::services::ShortUrlService;

/// Queue the deletion, then wait for the detached run so the process does
/// not exit underneath it.
pub async fn delete_links(
    service: &ShortUrlService,
    owner_id: &str,
    keys: Vec<String>,
) -> Result<(), CliError> {
    let requested = keys.len();
    let handle = service.delete_user_urls(owner_id, keys);
    println!(
        "{} Accepted deletion of {} keys",
        "ℹ".bold().blue(),
        requested
    );

    let report = handle
        .await
        .map_err(|e| CliError::CommandError(format!("Deletion task failed: {}", e)))?;

    if report.committed {
        println!(
            "{} Deleted {} of {} keys",
            "✓".bold().green(),
            report.verified.to_string().green(),
            report.requested
        );
    } else {
        println!(
            "{} Nothing deleted ({} of {} keys verified)",
            "ℹ".bold().blue(),
            report.verified,
            report.requested
        );
    }
    if report.timed_out {
        println!(
            "{}",
            "Ownership checks timed out; unverified keys were left untouched".yellow()
        );
    }
    Ok(())
}
