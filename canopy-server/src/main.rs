//! Canopy Dashboard Server
//!
//! Loads one canopy-metric dataset and serves the two synchronized figure
//! scenes for every selection posted by the dashboard front end.

mod api;
mod cache;
mod config;
mod error;
mod loader;

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, routing::get};
use canopy::prelude::{Dataset, ViewController};
use clap::Parser;
use parking_lot::RwLock;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cache::ViewCache;
use crate::config::Config;

/// Selections are small; anything larger is not a dashboard request
const MAX_BODY_BYTES: usize = 64 * 1024;

/// One loaded dataset together with the views computed from it. Replaced as a
/// unit on reload, so a view can only ever be cached beside its own dataset.
pub struct Generation {
    pub controller: ViewController,
    pub cache: ViewCache,
}

/// Application state shared across handlers
pub struct AppState {
    generation: RwLock<Arc<Generation>>,
    pub config: Config,
}

impl AppState {
    pub fn new(dataset: Dataset, config: Config) -> Self {
        let generation = Self::generation(dataset, &config);
        Self {
            generation: RwLock::new(Arc::new(generation)),
            config,
        }
    }

    fn generation(dataset: Dataset, config: &Config) -> Generation {
        Generation {
            controller: ViewController::new(Arc::new(dataset)).with_options(config.view_options()),
            cache: ViewCache::new(config.cache_capacity),
        }
    }

    /// Current generation; cheap to clone and safe to use without the lock.
    pub fn current(&self) -> Arc<Generation> {
        Arc::clone(&self.generation.read())
    }

    /// Swap in a new dataset with an empty cache. Views still being computed
    /// against the old generation land in its cache and are dropped with it.
    pub fn replace_dataset(&self, dataset: Dataset) {
        let generation = Self::generation(dataset, &self.config);
        *self.generation.write() = Arc::new(generation);
    }
}

/// Build the full router around `state`
pub fn app(state: Arc<AppState>) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout);
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest("/api/v1", api::views::router())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "canopy_server=debug,canopy_views=debug,tower_http=debug".into()),
        )
        .init();

    // Parse CLI args
    let config = Config::parse();
    info!("Starting canopy-server on {}:{}", config.host, config.port);

    let dataset = loader::load_dataset(&config.dataset)?;
    let state = Arc::new(AppState::new(dataset, config.clone()));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, app(state)).await?;

    Ok(())
}
