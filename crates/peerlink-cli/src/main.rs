//! PeerLink CLI entry point

use std::path::Path;

use clap::Parser;
use tracing::{error, info};

use peerlink_cli::{
    app::PeerlinkApp,
    cli::Cli,
    config::AppConfig,
    display::render_device_list,
    error::Result,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load(cli.config.as_deref().map(Path::new))?;

    // Initialize logging
    setup_logging(cli.verbose || config.cli.verbose);

    let Some((mode, duration)) = cli.command.session() else {
        print!("{}", config.to_toml()?);
        return Ok(());
    };

    let app = match PeerlinkApp::new(&config).await {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to start radio: {}", e);
            std::process::exit(1);
        }
    };

    let devices = match app.run(mode, duration).await {
        Ok(devices) => devices,
        Err(e) => {
            error!("PeerLink node failed: {}", e);
            std::process::exit(1);
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
    } else if config.cli.list_on_exit {
        print!("{}", render_device_list(&devices));
    }

    info!("PeerLink exited successfully");
    Ok(())
}

/// Setup logging based on verbosity level
fn setup_logging(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
