use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryObligationStore};
use crate::routes::with_obligation_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use internship_compliance::config::AppConfig;
use internship_compliance::error::AppError;
use internship_compliance::obligations::ObligationService;
use internship_compliance::telemetry;
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

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryObligationStore::default());
    let obligation_service = Arc::new(ObligationService::new(
        store,
        config.obligations.clone(),
    ));

    let app = with_obligation_routes(obligation_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        min_days = config.obligations.min_days_for_inclusion,
        max_segments = config.obligations.max_segments,
        "internship compliance scheduler ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
