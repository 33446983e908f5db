use crate::cli::ServeArgs;
use crate::email::OutboundEmail;
use crate::infra::{load_engine, load_partners, AppState, InMemoryLeadRepository};
use crate::routes::with_api_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use jeanbrun::config::AppConfig;
use jeanbrun::error::AppError;
use jeanbrun::leads::{
    DispatchSettings, LeadCaptureService, LeadRepository, RetentionPolicy, RetentionService,
};
use jeanbrun::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

const RETENTION_SWEEP_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let engine = Arc::new(load_engine(&config)?);
    let partners = Arc::new(load_partners(&config)?);
    if partners.is_empty() {
        warn!("no partner roster configured, captured leads will stay new");
    }
    let email_config = config.email.clone();
    let email = tokio::task::spawn_blocking(move || OutboundEmail::from_config(&email_config))
        .await
        .map_err(std::io::Error::other)??;
    let email = Arc::new(email);
    let provider = email.provider();
    let repository = Arc::new(InMemoryLeadRepository::default());

    let capture = Arc::new(LeadCaptureService::new(
        repository.clone(),
        partners,
        email,
        engine.clone(),
        config.leads.platform,
        DispatchSettings {
            public_url: config.leads.public_url.clone(),
        },
    ));
    let retention = Arc::new(RetentionService::new(
        repository,
        RetentionPolicy {
            months: config.leads.retention_months,
        },
    ));
    spawn_retention_sweep(retention.clone());

    let app = with_api_routes(engine, capture, retention)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        platform = %config.leads.platform,
        email = provider,
        "jeanbrun api ready"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Daily anonymization of leads past the retention window. The first tick
/// fires immediately.
fn spawn_retention_sweep<R>(retention: Arc<RetentionService<R>>) -> JoinHandle<()>
where
    R: LeadRepository + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(RETENTION_SWEEP_PERIOD);
        loop {
            ticker.tick().await;
            let service = Arc::clone(&retention);
            match tokio::task::spawn_blocking(move || service.anonymize_expired(Utc::now())).await {
                Ok(Ok(_)) => {}
                Ok(Err(err)) => error!(error = %err, "retention sweep failed"),
                Err(err) => error!(error = %err, "retention sweep task aborted"),
            }
        }
    })
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "unable to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
