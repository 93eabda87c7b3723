use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryAuthProvider};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use motocredito::auth::SessionCache;
use motocredito::config::AppConfig;
use motocredito::error::AppError;
use motocredito::storage::MemoryFileStorage;
use motocredito::telemetry;
use motocredito::workflows::credit::{
    CreditApplicationService, EvaluationEngine, MemoryDocumentStore,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

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
        sessions: Arc::new(SessionCache::new(config.session.ttl_minutes)),
        auth: Arc::new(InMemoryAuthProvider::default()),
        storage: Arc::new(MemoryFileStorage::new(&config.storage)),
    };

    spawn_session_purge(app_state.sessions.clone());

    let store = Arc::new(MemoryDocumentStore::new());
    let credit_service = Arc::new(CreditApplicationService::new(
        store,
        EvaluationEngine::new(config.evaluation.clone()),
    ));

    let app = with_service_routes(credit_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, bucket = %config.storage.bucket, "motocredito credit desk ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn spawn_session_purge(sessions: Arc<SessionCache>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(300));
        loop {
            ticker.tick().await;
            let purged = sessions.purge_expired(Utc::now());
            if purged > 0 {
                debug!(purged, "expired sessions purged");
            }
        }
    });
}
