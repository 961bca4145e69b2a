//! Analysis API endpoint.

use axum::{extract::State, Json};

use crate::analytics::{self, AttendanceSummary};
use crate::errors::AppError;
use crate::AppState;

/// GET /api/analysis/ - Attendance counts grouped by signature, department,
/// role and day. Returned without the success envelope.
pub async fn get_analysis(
    State(state): State<AppState>,
) -> Result<Json<AttendanceSummary>, AppError> {
    let rows = state.repo.list_employees().await?;
    Ok(Json(analytics::summarize(&rows)))
}
