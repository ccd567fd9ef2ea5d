use crate::cli::ServeArgs;
use crate::infra::{build_financing_service, AppState};
use crate::routes::with_financing_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use solar_finance::config::AppConfig;
use solar_finance::error::AppError;
use solar_finance::telemetry;
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

    let financing_service = build_financing_service(&config.financing);

    let app = with_financing_routes(financing_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        term_months = config.financing.term_months,
        annual_rate = config.financing.annual_rate,
        calendar_start = %config.financing.calendar_start,
        "solar financing service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
