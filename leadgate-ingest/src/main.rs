//! leadgate-ingest - Lead validation and ingestion service
//!
//! Accepts lead submissions over HTTP, checks them against the fraud-signal
//! and consent-certificate providers, and keeps every non-duplicate
//! submission in the lead store for audit.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use leadgate_ingest::cli::Args;
use leadgate_ingest::clients::{ConsentCertificateClient, FraudSignalClient};
use leadgate_ingest::store::SqliteLeadStore;
use leadgate_ingest::{AppState, LeadPipeline};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "leadgate_ingest=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = args.resolve().context("Failed to resolve configuration")?;

    info!("Starting leadgate-ingest v{}", env!("CARGO_PKG_VERSION"));
    info!(
        table = %config.leads_table_name,
        region = %config.region,
        database = %config.redacted_database_url(),
        "Lead store configured"
    );

    let store = SqliteLeadStore::connect(&config.database_url, &config.leads_table_name)
        .await
        .context("Failed to open lead store")?;

    let fraud = FraudSignalClient::new(config.ipqs_api_key.clone(), config.ipqs_base_url.clone())
        .context("Failed to build fraud signal client")?;
    let consent = ConsentCertificateClient::new(
        config.trustedform_username.clone(),
        config.trustedform_password.clone(),
        config.trustedform_base_url.clone(),
    )
    .context("Failed to build consent certificate client")?;

    info!(
        ipqs_configured = fraud.is_configured(),
        trustedform_configured = consent.is_configured(),
        "Provider clients initialized"
    );

    let pipeline = LeadPipeline::new(Arc::new(store), Arc::new(fraud), Arc::new(consent));
    let state = AppState::new(pipeline, &config.leads_table_name, &config.region);
    let app = leadgate_ingest::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.listen_addr))?;
    info!("Listening on http://{}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
