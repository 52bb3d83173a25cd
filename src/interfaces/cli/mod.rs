//! CLI interface module
//!
//! This module provides command-line interface functionality for shortener.

pub mod commands;

use std::fmt;

use crate::cli::{Cli, Commands, ConfigCommands};
use crate::config::StaticConfig;
use crate::errors::ShortenerError;
use crate::services::{FixedOwner, OwnerResolver, ShortUrlService, issue_owner_id};
use crate::storage::StorageFactory;
use commands::{
    batch_shorten, config_generate, delete_links, list_links, ping_storage, resolve_link,
    shorten_link,
};

#[derive(Debug)]
pub enum CliError {
    /// Failure reported by the service or a storage backend
    Service(ShortenerError),
    ParseError(String),
    CommandError(String),
}

impl CliError {
    /// Format as simple output
    pub fn format_simple(&self) -> String {
        match self {
            CliError::Service(err) => err.format_simple(),
            CliError::ParseError(msg) => format!("Parse error: {}", msg),
            CliError::CommandError(msg) => format!("Command error: {}", msg),
        }
    }

    /// Format as colored output
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        match self {
            CliError::Service(err) => err.format_colored(),
            CliError::ParseError(msg) => {
                format!("{} {}", "Parse error:".yellow().bold(), msg.white())
            }
            CliError::CommandError(msg) => {
                format!("{} {}", "Command error:".red().bold(), msg.white())
            }
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for CliError {}

impl From<ShortenerError> for CliError {
    fn from(err: ShortenerError) -> Self {
        CliError::Service(err)
    }
}

/// Run a CLI command from clap-parsed input
pub async fn run_cli_command(cli: Cli, config: StaticConfig) -> Result<(), CliError> {
    // Generate doesn't need storage
    if let Commands::Config {
        action: ConfigCommands::Generate { output_path, force },
    } = cli.command
    {
        return config_generate(output_path, force).await;
    }

    let storage = StorageFactory::create(&config).await?;
    let service = ShortUrlService::new(storage, &config);
    let resolver = FixedOwner::anonymous();

    match cli.command {
        Commands::Shorten { url } => {
            let owner_id = resolve_or_issue(&resolver, cli.user.as_deref());
            shorten_link(&service, &owner_id, url).await
        }

        Commands::Resolve { key } => resolve_link(&service, key).await,

        Commands::Batch { file_path } => {
            let owner_id = resolve_or_issue(&resolver, cli.user.as_deref());
            batch_shorten(&service, &owner_id, file_path).await
        }

        Commands::List => {
            let owner_id = resolver.resolve_owner(cli.user.as_deref())?;
            list_links(&service, &owner_id).await
        }

        Commands::Delete { keys } => {
            let owner_id = resolver.resolve_owner(cli.user.as_deref())?;
            delete_links(&service, &owner_id, keys).await
        }

        Commands::Ping => ping_storage(&service).await,

        Commands::Config { .. } => unreachable!("handled above"),
    }
}

/// Creating links never requires a prior identity; one is issued instead.
fn resolve_or_issue(resolver: &dyn OwnerResolver, credential: Option<&str>) -> String {
    resolver.resolve_owner(credential).unwrap_or_else(|_| {
        let issued = issue_owner_id();
        eprintln!("[INFO] No --user given; issued owner id {}", issued);
        issued
    })
}
