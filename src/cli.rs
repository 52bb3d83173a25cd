//! Command-line interface definitions using clap
//!
//! Each subcommand mirrors one operation of the HTTP boundary.

use clap::{Parser, Subcommand};

use crate::config::StaticConfig;

/// Shortener - content-addressed URL shortener
#[derive(Parser, Debug)]
#[command(name = "shortener")]
#[command(version)]
#[command(about = "A content-addressed URL shortener", long_about = None)]
pub struct Cli {
    /// Owner identity for the invocation
    #[arg(long, short = 'u', global = true)]
    pub user: Option<String>,

    /// Prefix short URLs are rendered under
    #[arg(long, short = 'b', global = true)]
    pub base_url: Option<String>,

    /// Use the append-only file store at this path
    #[arg(long, short = 'f', global = true)]
    pub file_path: Option<String>,

    /// Use the relational store at this URL (sqlite://, mysql://, postgres://)
    #[arg(long, short = 'd', global = true)]
    pub database_url: Option<String>,

    /// Force a backend: memory, file or database
    #[arg(long, global = true)]
    pub backend: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Shorten a URL
    Shorten {
        /// Absolute URL to shorten
        url: String,
    },

    /// Print the original URL behind a short key
    Resolve {
        /// Short key
        key: String,
    },

    /// Shorten every item of a JSON array of {correlation_id, original_url}
    Batch {
        /// Input file path
        file_path: String,
    },

    /// List the caller's short links
    List,

    /// Delete short links owned by the caller
    Delete {
        /// Short keys to delete
        #[arg(required = true, num_args = 1..)]
        keys: Vec<String>,
    },

    /// Check that the configured storage backend is reachable
    Ping,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

/// Configuration management commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Generate {
        /// Output path (default: config.example.toml, `-` for stdout)
        output_path: Option<String>,

        /// Force overwrite without confirmation
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    /// Command-line flags win over config.toml and the environment.
    pub fn apply_overrides(&self, config: &mut StaticConfig) {
        if let Some(base_url) = &self.base_url {
            config.server.base_url = base_url.clone();
        }
        if let Some(file_path) = &self.file_path {
            config.storage.file_path = file_path.clone();
        }
        if let Some(database_url) = &self.database_url {
            config.database.database_url = database_url.clone();
        }
        if let Some(backend) = &self.backend {
            config.storage.backend = Some(backend.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_delete_with_global_user() {
        let cli = Cli::parse_from(["shortener", "delete", "k1", "k2", "-u", "alice"]);
        assert_eq!(cli.user.as_deref(), Some("alice"));
        match cli.command {
            Commands::Delete { keys } => assert_eq!(keys, vec!["k1", "k2"]),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_delete_requires_keys() {
        assert!(Cli::try_parse_from(["shortener", "delete"]).is_err());
    }

    #[test]
    fn test_parse_ping_and_stdout_config() {
        let cli = Cli::parse_from(["shortener", "ping", "-d", "sqlite://links.db"]);
        assert!(matches!(cli.command, Commands::Ping));
        assert_eq!(cli.database_url.as_deref(), Some("sqlite://links.db"));

        let cli = Cli::parse_from(["shortener", "config", "generate", "-"]);
        match cli.command {
            Commands::Config {
                action: ConfigCommands::Generate { output_path, force },
            } => {
                assert_eq!(output_path.as_deref(), Some("-"));
                assert!(!force);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::parse_from([
            "shortener",
            "--base-url",
            "https://sho.rt",
            "--file-path",
            "/tmp/links.jsonl",
            "--backend",
            "file",
            "list",
        ]);
        let mut config = StaticConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.server.base_url, "https://sho.rt");
        assert_eq!(config.storage.file_path, "/tmp/links.jsonl");
        assert_eq!(config.storage.backend.as_deref(), Some("file"));
        assert!(config.database.database_url.is_empty());
    }
}
