//! Chart image endpoints.
//!
//! Every response here is a `200 image/png`, including failures, which are
//! drawn as an error image instead of an error status.

use std::time::SystemTime;

use axum::{
    extract::{Path, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
};

use crate::charts::{self, render_chart, seconds_left_in_bucket, ChartType, ImageSource};
use crate::errors::AppError;
use crate::AppState;

/// Reports whether the image was a cache hit, a fresh render or a placeholder.
pub const CHART_CACHE_HEADER: &str = "x-chart-cache";

/// GET /api/visualization/ - All four charts in one 2x2 image.
pub async fn get_visualization(State(state): State<AppState>) -> Response {
    chart_response(&state, ChartType::Combined).await
}

/// GET /api/chart/{name}/ - A single chart: departments, roles, attendance
/// or signatures.
pub async fn get_chart(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    match name.parse::<ChartType>() {
        Ok(chart) if chart != ChartType::Combined => chart_response(&state, chart).await,
        _ => AppError::NotFound(format!("Unknown chart {}", name)).into_response(),
    }
}

async fn chart_response(state: &AppState, chart: ChartType) -> Response {
    let window = state.config.chart_window_secs;
    let image = charts::produce(
        &state.cache,
        chart,
        window,
        state.repo.list_employees(),
        render_chart,
    )
    .await;

    let cache_control = match image.source {
        ImageSource::Placeholder => "no-store".to_string(),
        ImageSource::Cached | ImageSource::Rendered => format!(
            "max-age={}",
            seconds_left_in_bucket(SystemTime::now(), window)
        ),
    };

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (header::CACHE_CONTROL, cache_control),
            (HeaderName::from_static(CHART_CACHE_HEADER), image.source.as_str().to_string()),
        ],
        image.png,
    )
        .into_response()
}
