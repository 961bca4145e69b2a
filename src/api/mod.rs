//! REST API module.
//!
//! Employee CRUD, the analysis summary and the chart images.

mod analysis;
mod charts;
mod employees;

pub use analysis::*;
pub use charts::*;
pub use employees::*;

use std::collections::BTreeMap;

use axum::{
    extract::OriginalUri,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Success response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
            status: StatusCode::OK,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, crate::errors::AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::new(data))
}

/// GET /api/ - List the API's entry points.
pub async fn api_root(OriginalUri(uri): OriginalUri) -> ApiResult<BTreeMap<&'static str, String>> {
    let base = uri.path().trim_end_matches('/');
    let mut links = BTreeMap::new();
    links.insert("employees", format!("{}/employees/", base));
    links.insert("analysis", format!("{}/analysis/", base));
    links.insert("visualization", format!("{}/visualization/", base));
    for chart in ["departments", "roles", "attendance", "signatures"] {
        links.insert(chart, format!("{}/chart/{}/", base, chart));
    }
    success(links)
}
