// Main entry point for the standalone HTTP event source

use anyhow::Context;
use http_eventsource::config::Config;
use http_eventsource::loader::event_loader::EventLoader;
use http_eventsource::{
    CanonicalEvent, EventContext, EventProcessor, EventSource, EventSourceError, HttpEventSource,
    StatusResult,
};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

/// Answers every event with the event itself, for exercising routes without
/// a host framework attached.
async fn echo_processor(
    event: CanonicalEvent,
    context: EventContext,
) -> Result<StatusResult, EventSourceError> {
    let data = serde_json::json!({
        "context": context.to_value(),
        "event": event,
    });
    Ok(StatusResult::ok(data))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load and validate configuration first (before any logging)
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // 2. Initialize tracing subscriber once
    init_tracing(&config)?;

    info!(
        bind_address = %config.http.bind_address,
        port = config.http.port,
        jwt = config.http.jwt.is_some(),
        "Configuration loaded"
    );

    // 3. Load event definitions before binding so bad routes fail fast
    let loader = match config.events_yaml_path {
        Some(ref path) => EventLoader::from_file(path).map_err(|e| {
            error!(error = %e, path = ?path, "Failed to load event definitions");
            e
        })?,
        None => EventLoader::default(),
    };
    if loader.requires_authentication() && config.http.jwt.is_none() {
        anyhow::bail!("event definitions require authentication but JWT_SECRET_OR_KEY is not set");
    }

    // 4. Start listening
    let mut source = HttpEventSource::new(config.http.clone());
    source.init_client().await.context("failed to initialize HTTP client")?;

    // 5. Subscribe every declared route
    let processor: Arc<dyn EventProcessor> = Arc::new(echo_processor);
    for definition in loader.definitions() {
        source
            .subscribe_to_event(
                &definition.route_key,
                definition.config.clone(),
                processor.clone(),
                definition.meta,
            )
            .await
            .with_context(|| format!("failed to subscribe {}", definition.route_key))?;
    }
    info!(routes = loader.definitions().len(), "Event source ready");

    // 6. Run until a shutdown signal arrives
    shutdown_signal().await;
    if let Some(client) = source.client() {
        client.shutdown().await?;
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing subscriber based on configuration
fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_env_filter(filter);

    let result = if config.log_format == "json" {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    };
    result.map_err(|e| anyhow::anyhow!("failed to initialize tracing: {}", e))
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            info!("SIGTERM received, starting graceful shutdown");
        },
    }
}
