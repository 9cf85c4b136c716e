use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use stockchat::{app, Config};

#[derive(Parser)]
#[command(name = "stockchat", version, about = "Chat rooms with a stock quote bot")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the chat server (HTTP, WebSocket and result routing).
    Server {
        /// Path to the configuration file.
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
    /// Run the quote bot.
    Bot {
        /// Path to the configuration file.
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
    /// Run server and bot in one process over an in-memory queue.
    Standalone {
        /// Path to the configuration file.
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
}

impl Command {
    fn config_path(&self) -> &PathBuf {
        match self {
            Command::Server { config } | Command::Bot { config } | Command::Standalone { config } => {
                config
            }
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Command::Server { .. } => "server",
            Command::Bot { .. } => "bot",
            Command::Standalone { .. } => "standalone",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration
    let path = cli.command.config_path();
    let config = match Config::load_with_env(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", path.display());
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = stockchat::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        stockchat::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received");
                signal.cancel();
            }
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
    });

    let role = cli.command.name();
    info!(role, "stockchat starting");
    let result = match cli.command {
        Command::Server { .. } => app::run_server(&config, shutdown).await,
        Command::Bot { .. } => app::run_bot(&config, shutdown).await,
        Command::Standalone { .. } => app::run_standalone(&config, shutdown).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("stockchat {} failed: {}", role, e);
            ExitCode::FAILURE
        }
    }
}
