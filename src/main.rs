//! drive-search - keep an Elasticsearch index in sync with Google Drive
//!
//! Provides commands for:
//! - Serving the HTTP API (sync trigger, search, Drive webhook)
//! - Running a single sync pass
//! - Searching the index
//! - Registering a Drive push-notification channel

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use core_runtime::{init_logging, LogFormat, ServiceConfig};
use core_service::Application;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "drive-search", version, about = "Google Drive to Elasticsearch search index")]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run an initial sync, then serve the HTTP API
    Serve {
        /// Skip the sync pass at startup
        #[arg(long)]
        skip_initial_sync: bool,
    },
    /// Run one sync pass and print its report
    Sync,
    /// Print the names of files whose content matches a query
    Search {
        query: String,
    },
    /// Register a Drive changes channel pointing at the webhook endpoint
    RegisterWebhook {
        /// Public URL of `/drive-webhook`; defaults to the configured webhook URL
        #[arg(long)]
        address: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = ServiceConfig::from_env().context("Invalid configuration")?;
    if cli.json_logs {
        config.logging.format = LogFormat::Json;
    }
    init_logging(config.logging.clone()).context("Failed to initialize logging")?;

    let app = Application::bootstrap(config)
        .await
        .context("Failed to start application")?;

    match cli.command {
        Commands::Serve { skip_initial_sync } => serve(app, skip_initial_sync).await,
        Commands::Sync => {
            let report = app.coordinator().run_sync().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::Search { query } => {
            let query = query.trim();
            if query.is_empty() {
                bail!("Search query must not be empty");
            }
            for hit in app.search(query).await? {
                println!("{}", hit.file_name);
            }
            Ok(())
        }
        Commands::RegisterWebhook { address } => {
            let address = match address.or_else(|| app.config().webhook_url.clone()) {
                Some(address) => address,
                None => bail!("No webhook address given and none configured"),
            };
            let channel = app.drive().register_changes_watch(&address).await?;
            println!("channel id: {}", channel.channel_id);
            match channel.expiration {
                Some(expiration) => println!("expires:    {}", expiration.to_rfc3339()),
                None => println!("expires:    unknown"),
            }
            Ok(())
        }
    }
}

async fn serve(app: Application, skip_initial_sync: bool) -> Result<()> {
    if !skip_initial_sync {
        match app.coordinator().run_sync().await {
            Ok(report) => info!("Initial sync completed: {}", report),
            Err(e) => error!("Initial sync failed, serving anyway: {}", e),
        }
    }

    app.serve(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
