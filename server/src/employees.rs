use axum::{
    Json, Router,
    extract::{FromRef, Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::get,
};
use platform_api::{ApiError, ApiResult};
use products_hr::{Employee, EmployeeId, EmployeeService, EmployeeServiceError};
use serde::Deserialize;

/// Request body for create and update. Any `id` in the body is ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmployeePayload {
    first_name: String,
    last_name: String,
    email: String,
}

pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    EmployeeService: FromRef<S>,
{
    Router::new()
        .route("/api/employees", get(list_employees).post(create_employee))
        .route(
            "/api/employees/{id}",
            get(get_employee)
                .put(update_employee)
                .delete(delete_employee),
        )
}

async fn create_employee(
    State(service): State<EmployeeService>,
    payload: Result<Json<EmployeePayload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Employee>)> {
    let Json(payload) = payload.map_err(bad_json)?;
    let employee = Employee::new(payload.first_name, payload.last_name, payload.email);
    let saved = service.create(employee).await.map_err(service_error)?;
    Ok((StatusCode::CREATED, Json(saved)))
}

async fn list_employees(State(service): State<EmployeeService>) -> ApiResult<Json<Vec<Employee>>> {
    let employees = service.get_all().await.map_err(service_error)?;
    Ok(Json(employees))
}

async fn get_employee(
    State(service): State<EmployeeService>,
    Path(id): Path<EmployeeId>,
) -> ApiResult<Json<Employee>> {
    service
        .get_by_id(id)
        .await
        .map_err(service_error)?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

async fn update_employee(
    State(service): State<EmployeeService>,
    Path(id): Path<EmployeeId>,
    payload: Result<Json<EmployeePayload>, JsonRejection>,
) -> ApiResult<Json<Employee>> {
    let Json(payload) = payload.map_err(bad_json)?;
    let existing = service
        .get_by_id(id)
        .await
        .map_err(service_error)?
        .ok_or(ApiError::NotFound)?;
    let replacement = Employee {
        first_name: payload.first_name,
        last_name: payload.last_name,
        email: payload.email,
        ..existing
    };
    let saved = service.update(replacement).await.map_err(service_error)?;
    Ok(Json(saved))
}

async fn delete_employee(
    State(service): State<EmployeeService>,
    Path(id): Path<EmployeeId>,
) -> ApiResult<StatusCode> {
    service.delete_by_id(id).await.map_err(service_error)?;
    Ok(StatusCode::NO_CONTENT)
}

fn bad_json(rejection: JsonRejection) -> ApiError {
    ApiError::InvalidInput(rejection.body_text())
}

fn service_error(err: EmployeeServiceError) -> ApiError {
    match err {
        EmployeeServiceError::DuplicateResource { .. } => ApiError::Conflict(err.to_string()),
        EmployeeServiceError::InvalidInput(inner) => ApiError::InvalidInput(inner.to_string()),
        EmployeeServiceError::Storage(inner) => ApiError::internal(inner.into()),
    }
}
