//! docferry entry point.

mod cli;
mod commands;
mod config;
mod logging;
mod providers;

use clap::Parser;

use cli::{Cli, Command};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(config::default_path);
    let config = config::Config::load(&config_path)?;
    let _guard = logging::init(&config.log_dir)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        "starting docferry"
    );

    match cli.command {
        Command::Migrate {
            mapping,
            ignore_schedule,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            let summary = rt.block_on(commands::migrate(&config, mapping, ignore_schedule))?;
            print!("{}", commands::render_summary(&summary));
            if !summary.failed_cases.is_empty() {
                anyhow::bail!("{} case(s) did not complete", summary.failed_cases.len());
            }
        }
        Command::Status => {
            print!("{}", commands::status(&config)?);
        }
    }

    Ok(())
}
