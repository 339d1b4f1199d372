//! Cancer Risk Inference - Main Entry Point
//!
//! Loads the model artifacts once, then serves `POST /predict` and
//! `GET /health` until interrupted.

use anyhow::{Context, Result};
use cancer_risk_inference::{
    config::{AppConfig, LogFormat},
    metrics::{MetricsReporter, ServiceMetrics},
    models::inference::InferenceEngine,
    server::{self, AppState},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration before logging so the configured level applies
    let config = AppConfig::load()?;
    init_logging(&config)?;

    info!("Starting Cancer Risk Inference service");
    info!(
        "Risk tiers: medium>={:.2}, high>={:.2}, alert>={:.2}, danger>={:.2}",
        config.detection.risk_tiers.medium,
        config.detection.risk_tiers.high,
        config.detection.risk_tiers.alert,
        config.detection.risk_tiers.danger
    );

    // Artifacts that fail to load are fatal; nothing is served without them
    let engine = Arc::new(
        InferenceEngine::new(&config).context("Failed to load model artifacts")?,
    );
    info!(
        variant = %engine.variant(),
        trees = engine.tree_count(),
        features = engine.feature_count(),
        logistic_loaded = engine.has_logistic(),
        "Models loaded"
    );

    let metrics = Arc::new(ServiceMetrics::new());

    let interval = config.metrics.report_interval_secs;
    if interval > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), interval);
        tokio::spawn(reporter.start());
    } else {
        warn!("Periodic metrics reporting disabled");
    }

    let state = AppState::new(engine, metrics.clone(), &config);
    let app = server::router(state, &config.server);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(format!(
            "cancer_risk_inference={},tower_http={}",
            config.logging.level, config.logging.level
        ))
    })?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Full => builder.init(),
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
