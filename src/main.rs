use clap::Parser;

use shortener::cli::Cli;
use shortener::config::StaticConfig;
use shortener::interfaces::cli::run_cli_command;
use shortener::system::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = StaticConfig::load();
    cli.apply_overrides(&mut config);

    let _guard = init_logging(&config.logging)?;

    if let Err(e) = run_cli_command(cli, config).await {
        eprintln!("{}", e.format_colored());
        std::process::exit(1);
    }
    Ok(())
}
