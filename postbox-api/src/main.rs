use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use postbox_core::auth::hash_password;
use postbox_core::config::Config;
use postbox_core::logging::{init_logging_with_config, LogConfig, LogLevel};
use postbox_core::shutdown::{install_signal_handlers, ShutdownCoordinator};
use postbox_core::MessagingService;
use postbox_api::ApiServer;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "postbox")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Override the configured log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Enable JSON formatted logging
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API server
    Serve {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Address to listen on, overriding the configuration
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },
    /// Print an argon2 hash suitable for a `[[users]]` entry
    HashPassword {
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Serve { config, bind } => {
            let mut config =
                Config::load(config.as_deref()).context("Failed to load configuration")?;
            if let Some(level) = &args.log_level {
                config.logging.level = level.clone();
            }
            if args.json_logs {
                config.logging.json_format = true;
            }

            init_logging_with_config(LogConfig::try_from(&config.logging)?)?;

            config.ensure_jwt_secret();
            if let Some(bind) = bind {
                config.server.bind_address = bind;
            }
            config.validate().context("Invalid configuration")?;

            postbox_core::metrics::init_metrics();
            serve(config).await
        }
        Command::HashPassword { password } => {
            let level = match &args.log_level {
                Some(level) => level.parse()?,
                None => LogLevel::Warn,
            };
            init_logging_with_config(LogConfig::new(level).json_format(args.json_logs))?;

            println!("{}", hash_password(&password)?);
            Ok(())
        }
    }
}

async fn serve(config: Config) -> Result<()> {
    info!("Postbox starting");

    let shutdown = Arc::new(ShutdownCoordinator::new(config.server.shutdown_timeout));
    install_signal_handlers(shutdown.clone()).context("Failed to install signal handlers")?;

    let service = Arc::new(MessagingService::from_config(&config)?);
    ApiServer::new(service, config.server.bind_address)
        .run(shutdown)
        .await?;

    info!("Postbox stopped");
    Ok(())
}
