//! View REST API handlers

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use canopy::prelude::{AxisOptions, Selection};
use serde::Serialize;
use tracing::{info, warn};

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::loader;

/// Build the view API router
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cultivars", get(list_cultivars))
        .route("/columns", get(list_columns))
        .route("/views", post(compute_views))
        .route("/dataset/reload", post(reload_dataset))
}

#[derive(Debug, Serialize)]
struct CultivarCount {
    cultivar: String,
    count: usize,
}

/// GET /api/v1/cultivars - Cultivars by descending pixel count
async fn list_cultivars(State(state): State<Arc<AppState>>) -> Json<Vec<CultivarCount>> {
    let cultivars = state
        .current()
        .controller
        .dataset()
        .cultivars_by_count()
        .into_iter()
        .map(|(cultivar, count)| CultivarCount { cultivar, count })
        .collect();
    Json(cultivars)
}

/// GET /api/v1/columns - Selectable X and Y columns
async fn list_columns(State(state): State<Arc<AppState>>) -> Json<AxisOptions> {
    Json(state.current().controller.dataset().axis_options())
}

/// POST /api/v1/views - Both figure scenes for a selection
async fn compute_views(
    State(state): State<Arc<AppState>>,
    Json(selection): Json<Selection>,
) -> Result<Response> {
    let generation = state.current();
    if let Some(views) = generation.cache.get(&selection) {
        return Ok(Json(views.as_ref()).into_response());
    }

    let worker = Arc::clone(&generation);
    let requested = selection.clone();
    let views = tokio::task::spawn_blocking(move || worker.controller.compute_views(&requested))
        .await
        .map_err(|e| ServerError::Dataset(format!("view task failed: {}", e)))?
        .map_err(|report| {
            warn!("Rejected selection {:?}: {:?}", selection, report);
            ServerError::from(report)
        })?;
    let views = Arc::new(views);
    generation.cache.insert(selection, Arc::clone(&views));
    Ok(Json(views.as_ref()).into_response())
}

#[derive(Debug, Serialize)]
struct ReloadSummary {
    rows: usize,
    measures: Vec<String>,
}

/// POST /api/v1/dataset/reload - Re-read the dataset file and flush cached views
async fn reload_dataset(State(state): State<Arc<AppState>>) -> Result<Json<ReloadSummary>> {
    let path = state.config.dataset.clone();
    let dataset = tokio::task::spawn_blocking(move || loader::load_dataset(&path))
        .await
        .map_err(|e| ServerError::Dataset(format!("reload task failed: {}", e)))??;

    let summary = ReloadSummary {
        rows: dataset.len(),
        measures: dataset.schema().measures().to_vec(),
    };
    state.replace_dataset(dataset);
    info!("Dataset reloaded: {} rows", summary.rows);
    Ok(Json(summary))
}
