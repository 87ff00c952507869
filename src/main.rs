mod business_logic;
mod errors;
mod handlers;
mod models;
mod services;
mod settings;
mod state;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::business_logic::config::ThresholdConfig;
use crate::business_logic::cup_handle::CupHandleDetector;
use crate::services::collector::CollectorService;
use crate::services::quotes::QuoteClient;
use crate::services::sample_store::RollingSampleStore;
use crate::settings::Settings;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::pattern::check_pattern,
        handlers::pattern::get_pattern_report
    ),
    components(schemas(
        models::health::HealthResponse,
        models::pattern::CheckPatternRequest,
        models::pattern::CheckPatternResponse,
        models::pattern::PatternReport,
        errors::ErrorResponse
    ))
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let settings = Settings::from_env();

    // Held until shutdown so buffered file logs are flushed
    let _log_guard = init_tracing(&settings);

    let thresholds = ThresholdConfig::default();
    let detector = CupHandleDetector::new(thresholds.clone())?;
    let store = Arc::new(RollingSampleStore::new(settings.retention_days));

    let client = match &settings.quotes_base_url {
        Some(url) => QuoteClient::with_base_url(url.clone())?,
        None => QuoteClient::new()?,
    };
    let collector = CollectorService::new(
        client,
        store.clone(),
        detector,
        settings.symbols.clone(),
        settings.fetch_interval,
    );

    tokio::spawn(async move {
        tracing::info!("Quote collection active");
        collector.run().await;
    });

    let state = AppState {
        samples: store,
        thresholds: Arc::new(thresholds),
        symbols: Arc::new(settings.symbols.clone()),
    };

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/check_pattern", post(handlers::pattern::check_pattern))
        .route("/pattern/{symbol}", get(handlers::pattern::get_pattern_report))
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("Server running on http://{}", settings.bind_addr);
    tracing::info!("Tracking {}", settings.symbols.join(", "));
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(settings: &Settings) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cupscreener=info,tower_http=debug".into());

    match &settings.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "cupscreener.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
            None
        }
    }
}
