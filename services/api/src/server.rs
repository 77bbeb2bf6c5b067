use crate::cli::ServeArgs;
use crate::infra::{
    load_criteria_catalog, load_overlay, load_rate_catalog, AppState, InMemoryQuoteRepository,
};
use crate::routes::with_quote_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use quote_engine::config::AppConfig;
use quote_engine::error::AppError;
use quote_engine::quoting::QuoteService;
use quote_engine::telemetry;
use std::sync::atomic::Ordering;
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
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let catalog = load_rate_catalog(&config.sources)?;
    let criteria = load_criteria_catalog(&config.sources)?;
    let overlay = load_overlay(&config.sources);

    let repository = Arc::new(InMemoryQuoteRepository::default());
    let quote_service = Arc::new(QuoteService::new(repository, catalog, criteria, overlay));

    let app = with_quote_routes(quote_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "quote engine ready");

    axum::serve(listener, app).await?;
    Ok(())
}
