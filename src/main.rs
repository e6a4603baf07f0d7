use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use bootwire::{App, AppError};

/// Wire the service container and check the database binding
#[derive(Parser, Debug)]
#[command(name = "bootwire", version, about)]
struct Cli {
    /// Path to the TOML configuration (defaults to $BOOTWIRE_CONFIG or config/app.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Resolve DB, ping the server and close the connection
    Check,
    /// List the bindings registered by bootstrap
    Keys,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let container = bootwire::init(cli.config).map_err(AppError::from)?;

    match cli.command.unwrap_or(Command::Check) {
        Command::Check => {
            let mut conn = App::db().await?;
            conn.ping().await.map_err(AppError::from)?;
            tracing::info!("database ping succeeded");
            conn.close().await.map_err(AppError::from)?;
        }
        Command::Keys => {
            for key in container.keys() {
                println!("{}", key);
            }
        }
    }

    Ok(())
}
