use axum::{Json, extract::State, http::StatusCode};
use sm_common::api::{
    AssignProject, AssignRequest, CreateEmployee, Employee, EmployeeFilter, EmployeePatch,
    EmployeeView,
};
use uuid::Uuid;

use super::{PopulateParams, Success};
use crate::SharedState;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};

pub async fn create(
    State(state): State<SharedState>,
    ApiJson(input): ApiJson<CreateEmployee>,
) -> Result<(StatusCode, Json<Employee>), ApiError> {
    let created = state.staffing.employees().create(input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn create_many(
    State(state): State<SharedState>,
    ApiJson(batch): ApiJson<Vec<CreateEmployee>>,
) -> Result<(StatusCode, Json<Vec<Employee>>), ApiError> {
    let created = state.staffing.employees().create_many(batch).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list(
    State(state): State<SharedState>,
    ApiQuery(filter): ApiQuery<EmployeeFilter>,
) -> Result<Json<Vec<EmployeeView>>, ApiError> {
    Ok(Json(state.staffing.employees().find_all(&filter).await?))
}

pub async fn search(
    State(state): State<SharedState>,
    ApiJson(filter): ApiJson<EmployeeFilter>,
) -> Result<Json<Vec<EmployeeView>>, ApiError> {
    Ok(Json(state.staffing.employees().find_all(&filter).await?))
}

pub async fn get(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(params): ApiQuery<PopulateParams>,
) -> Result<Json<EmployeeView>, ApiError> {
    Ok(Json(
        state
            .staffing
            .employees()
            .find_by_id(id, params.populate)
            .await?,
    ))
}

pub async fn update(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<EmployeePatch>,
) -> Result<Json<Employee>, ApiError> {
    Ok(Json(state.staffing.employees().update(id, patch).await?))
}

pub async fn remove(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.staffing.employees().remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn assign_project(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<AssignProject>,
) -> Result<Json<Success>, ApiError> {
    state
        .staffing
        .employees()
        .assign_project(id, body.project_id)
        .await?;
    Ok(Success::ok())
}

pub async fn remove_project(
    State(state): State<SharedState>,
    ApiPath((id, project_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state.staffing.employees().remove_project(id, project_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn assign_request(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<AssignRequest>,
) -> Result<Json<Success>, ApiError> {
    state
        .staffing
        .employees()
        .assign_request(id, body.request_id)
        .await?;
    Ok(Success::ok())
}

pub async fn remove_request(
    State(state): State<SharedState>,
    ApiPath((id, request_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state.staffing.employees().remove_request(id, request_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
