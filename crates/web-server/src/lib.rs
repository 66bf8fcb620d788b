//! # Breakpoint Web Server
//!
//! The HTTP adapter in front of the query façade. Handlers translate between the
//! dashboard's JSON shapes and façade calls; they hold no analytical logic.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use configuration::Config;
use data_loader::LoaderOptions;
use query::QueryFacade;
use series_store::SeriesStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer, ExposeHeaders},
    trace::TraceLayer,
};

pub mod dto;
pub mod error;
pub mod handlers;

/// The shared application state that all handlers can access.
pub struct AppState {
    pub facade: QueryFacade,
    /// How uploaded CSV bodies are parsed.
    pub loader_options: LoaderOptions,
}

impl AppState {
    pub fn new(facade: QueryFacade, loader_options: LoaderOptions) -> Self {
        Self {
            facade,
            loader_options,
        }
    }

    /// Builds the state from configuration, loading the configured dataset.
    ///
    /// A dataset that cannot be read is logged and skipped: the server still starts
    /// on an empty store and data can be supplied through `/api/upload`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let facade = QueryFacade::from_config(Arc::new(SeriesStore::new()), config)?;

        match data_loader::load_dataset(&config.data) {
            Ok(dataset) => {
                facade.load_dataset(dataset.prices, dataset.events)?;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Starting without data; upload a price series to begin.");
            }
        }

        Ok(Self::new(facade, LoaderOptions::from_settings(&config.data)))
    }
}

/// Builds the router with every API route and the shared middleware.
pub fn app(state: Arc<AppState>, body_limit_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(Any)
        .allow_headers(AllowHeaders::any())
        .expose_headers(ExposeHeaders::any());

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/prices", get(handlers::get_prices))
        .route("/api/events", get(handlers::get_events))
        .route("/api/events/:name/impact", get(handlers::get_event_impact))
        .route("/api/change_points", get(handlers::get_change_points))
        .route("/api/change_points/events", get(handlers::get_change_point_events))
        .route("/api/analyze", post(handlers::analyze_period))
        .route("/api/upload", post(handlers::upload_prices))
        .with_state(state)
        .layer(cors)
        // Logs every incoming request.
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(body_limit_bytes))
}

/// The main function to configure and run the web server.
///
/// Tracing must already be initialized by the caller.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let state = Arc::new(AppState::from_config(&config)?);
    let app = app(state, config.server.body_limit_mb * 1024 * 1024);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Web server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
