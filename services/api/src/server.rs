use crate::cli::ServeArgs;
use crate::infra::{AppState, Workflows};
use crate::routes::with_workflow_routes;
use axum::{Extension, Router};
use axum_prometheus::PrometheusMetricLayer;
use cohort_intake::config::{AppConfig, CohortConfig};
use cohort_intake::error::AppError;
use cohort_intake::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let readiness = Arc::new(AtomicBool::new(false));
    let app = build_app(&config.cohorts, Arc::clone(&readiness));

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        sessions_per_cycle = config.cohorts.sessions_per_cycle,
        "cohort intake service ready"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(readiness))
        .await?;
    info!("cohort intake service stopped");
    Ok(())
}

/// Workflow routes over a fresh in-memory store, with metrics and readiness attached.
fn build_app(cohorts: &CohortConfig, readiness: Arc<AtomicBool>) -> Router {
    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let state = AppState {
        readiness,
        metrics: Arc::new(prometheus_handle),
    };

    with_workflow_routes(&Workflows::in_memory(cohorts))
        .layer(Extension(state))
        .layer(prometheus_layer)
}

async fn shutdown_signal(readiness: Arc<AtomicBool>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    readiness.store(false, Ordering::Release);
    info!("shutdown requested, draining connections");
}
