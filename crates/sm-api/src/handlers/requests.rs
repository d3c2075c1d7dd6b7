use axum::{Json, extract::State, http::StatusCode};
use sm_common::api::{
    AssignEmployee, AssignProject, CreateRequest, RequestFilter, RequestPatch, RequestView,
    StaffingRequest,
};
use uuid::Uuid;

use super::{PopulateParams, Success};
use crate::SharedState;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};

pub async fn create(
    State(state): State<SharedState>,
    ApiJson(input): ApiJson<CreateRequest>,
) -> Result<(StatusCode, Json<StaffingRequest>), ApiError> {
    let created = state.staffing.requests().create(input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn create_many(
    State(state): State<SharedState>,
    ApiJson(batch): ApiJson<Vec<CreateRequest>>,
) -> Result<(StatusCode, Json<Vec<StaffingRequest>>), ApiError> {
    let created = state.staffing.requests().create_many(batch).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list(
    State(state): State<SharedState>,
    ApiQuery(filter): ApiQuery<RequestFilter>,
) -> Result<Json<Vec<RequestView>>, ApiError> {
    Ok(Json(state.staffing.requests().find_all(&filter).await?))
}

pub async fn search(
    State(state): State<SharedState>,
    ApiJson(filter): ApiJson<RequestFilter>,
) -> Result<Json<Vec<RequestView>>, ApiError> {
    Ok(Json(state.staffing.requests().find_all(&filter).await?))
}

pub async fn get(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(params): ApiQuery<PopulateParams>,
) -> Result<Json<RequestView>, ApiError> {
    Ok(Json(
        state
            .staffing
            .requests()
            .find_by_id(id, params.populate)
            .await?,
    ))
}

pub async fn update(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<RequestPatch>,
) -> Result<Json<StaffingRequest>, ApiError> {
    Ok(Json(state.staffing.requests().update(id, patch).await?))
}

pub async fn remove(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.staffing.requests().remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn assign_employee(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<AssignEmployee>,
) -> Result<Json<Success>, ApiError> {
    state
        .staffing
        .requests()
        .assign_employee(id, body.employee_id)
        .await?;
    Ok(Success::ok())
}

pub async fn remove_employee(
    State(state): State<SharedState>,
    ApiPath((id, employee_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state.staffing.requests().remove_employee(id, employee_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn assign_project(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<AssignProject>,
) -> Result<Json<Success>, ApiError> {
    state
        .staffing
        .requests()
        .assign_project(id, body.project_id)
        .await?;
    Ok(Success::ok())
}

pub async fn remove_project(
    State(state): State<SharedState>,
    ApiPath((id, project_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state.staffing.requests().remove_project(id, project_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
