use anyhow::{anyhow, Context};
use clap::Parser;
use screenshot_api::{
    build_router, install_metrics, setup_logging, AppState, BrowserSession, Cli, Commands, Config,
    ScreenshotCapturer,
};
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Cli::parse();

    setup_logging(args.verbose).map_err(|e| anyhow!("failed to install logging: {e}"))?;

    info!("Starting screenshot-api v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args).await?;

    match args.command.unwrap_or(Commands::Serve) {
        Commands::Validate => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Serve => serve(config).await,
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    install_metrics(&config.metrics)?;

    // The server must not accept requests without a running browser.
    let session = Arc::new(
        BrowserSession::launch(&config.browser)
            .await
            .context("failed to launch browser")?,
    );

    let capturer = ScreenshotCapturer::new(session.clone(), config.capture.navigation_timeout);
    let router = build_router(AppState::new(Arc::new(capturer), config.capture.clone()));

    let listener = match tokio::net::TcpListener::bind(config.server.bind).await {
        Ok(listener) => listener,
        Err(e) => {
            session.shutdown().await;
            return Err(e).with_context(|| format!("failed to bind {}", config.server.bind));
        }
    };
    info!("Listening on {}", config.server.bind);

    let result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    info!("Shutting down...");
    session.shutdown().await;

    if let Err(e) = &result {
        error!("Server error: {}", e);
    }
    result.context("server error")?;

    info!("Screenshot-api stopped");
    Ok(())
}

async fn load_config(args: &Cli) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => read_config_file(path).await?,
        None => Config::default(),
    };

    args.overrides.apply(&mut config);
    config.validate()?;

    info!("Configuration loaded successfully");
    info!("Bind address: {}", config.server.bind);
    info!("Default format: {}", config.capture.default_format);
    info!(
        "Default viewport: {}x{}",
        config.capture.viewport.width, config.capture.viewport.height
    );
    info!("Navigation timeout: {:?}", config.capture.navigation_timeout);

    Ok(config)
}

async fn read_config_file(path: &Path) -> anyhow::Result<Config> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    serde_json::from_str(&content).with_context(|| format!("invalid configuration in {}", path.display()))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to create SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
