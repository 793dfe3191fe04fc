//! diabetes-predict: HTTP inference endpoint for a binary diabetes classifier.
//!
//! Loads the model artifact once at startup and serves:
//!   POST /predict  feature record → { Diabetes, Probability }
//!   GET  /         liveness text
//!
//! A model that fails to load stops the process before the listener is bound.

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use diabetes_predict::config::{Cli, Config};
use diabetes_predict::server::build_app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "diabetes_predict=debug,tower_http=debug"
    } else {
        "diabetes_predict=info,tower_http=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| filter.into());

    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }

    info!("diabetes-predict v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration.
    let config = Config::load(&cli.config)?.with_cli_overrides(&cli);

    info!(
        model = %config.model.path.display(),
        positive_class = config.model.positive_class,
        listen = %config.server.listen,
        "Configuration loaded"
    );

    // Load the model. Any failure here ends the process.
    let app = build_app(&config)?;

    // Start the server.
    let listen_addr = &config.server.listen;
    let listener = TcpListener::bind(listen_addr).await?;
    info!("Listening on {listen_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
