//! Employee API endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::{Employee, EmployeeRequest};
use crate::AppState;

/// Path ids that are not integers cannot name an employee.
fn parse_id(raw: &str) -> Result<i64, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound(format!("Employee {} not found", raw)))
}

async fn find_employee(state: &AppState, raw_id: &str) -> Result<Employee, AppError> {
    let id = parse_id(raw_id)?;
    state
        .repo
        .get_employee(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", id)))
}

/// GET /api/employees/ - List all employees.
pub async fn list_employees(State(state): State<AppState>) -> ApiResult<Vec<Employee>> {
    success(state.repo.list_employees().await?)
}

/// GET /api/employees/{id}/ - Get a single employee.
pub async fn get_employee(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Employee> {
    success(find_employee(&state, &id).await?)
}

/// POST /api/employees/ - Record a new employee entry.
pub async fn create_employee(
    State(state): State<AppState>,
    payload: Result<Json<EmployeeRequest>, JsonRejection>,
) -> ApiResult<Employee> {
    let Json(request) = payload?;
    let fields = request.into_fields()?;

    let employee = state.repo.create_employee(&fields).await?;
    tracing::info!(
        "Created employee {} ({})",
        employee.id,
        employee.display_name()
    );
    success(employee).map(|r| r.with_status(StatusCode::CREATED))
}

/// PUT /api/employees/{id}/ - Replace all writable fields.
pub async fn update_employee(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<EmployeeRequest>, JsonRejection>,
) -> ApiResult<Employee> {
    let existing = find_employee(&state, &id).await?;
    let Json(request) = payload?;
    let fields = request.into_fields()?;

    success(state.repo.update_employee(existing.id, &fields).await?)
}

/// PATCH /api/employees/{id}/ - Update only the supplied fields.
pub async fn patch_employee(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<EmployeeRequest>, JsonRejection>,
) -> ApiResult<Employee> {
    let existing = find_employee(&state, &id).await?;
    let Json(request) = payload?;
    let fields = request.merge_into(&existing)?;

    success(state.repo.update_employee(existing.id, &fields).await?)
}

/// DELETE /api/employees/{id}/ - Delete an employee.
pub async fn delete_employee(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;
    state.repo.delete_employee(id).await?;
    tracing::info!("Deleted employee {}", id);
    Ok(StatusCode::NO_CONTENT)
}
