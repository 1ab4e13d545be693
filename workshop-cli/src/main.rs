use clap::Parser;
use tracing::debug;

use workshop_cli::cli::Cli;
use workshop_cli::config::{FileConfig, Settings};
use workshop_cli::{app, logging};

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let file = FileConfig::load(cli.config.as_deref())?;
    let settings = Settings::resolve(file, cli.overrides());
    logging::init_logging(&settings.log_level, settings.log_file.as_deref())?;

    debug!(
        backend = %settings.db.backend,
        connection = %settings.db.connection_string,
        "connecting"
    );
    let repo = app::open_repository(&settings.db).await?;

    let output = app::run(repo.as_ref(), cli.command).await?;
    println!("{output}");

    Ok(())
}
