use clap::Parser;
use tracing_subscriber::EnvFilter;

use linkdeck::commands;
use linkdeck::config::{Cli, Config};
use linkdeck::db;
use linkdeck::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they never mix with rendered output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli)?;
    std::fs::create_dir_all(&data_dir)?;
    tracing::debug!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    let pool = db::create_pool(&config.db_path())?;
    db::run_migrations(&pool)?;

    let mut state = AppState::open(config, pool)?;
    if state.session.is_logged_in() {
        state.sync_saved().await;
    }

    match commands::run(&mut state, cli.command).await {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output.trim_end());
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {}", e.user_message());
            std::process::exit(1);
        }
    }
}
