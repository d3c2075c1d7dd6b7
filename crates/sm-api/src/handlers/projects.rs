use axum::{Json, extract::State, http::StatusCode};
use sm_common::api::{
    AssignEmployee, AssignRequest, CreateProject, Project, ProjectFilter, ProjectPatch,
    ProjectView,
};
use uuid::Uuid;

use super::{PopulateParams, Success};
use crate::SharedState;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};

pub async fn create(
    State(state): State<SharedState>,
    ApiJson(input): ApiJson<CreateProject>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    let created = state.staffing.projects().create(input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn create_many(
    State(state): State<SharedState>,
    ApiJson(batch): ApiJson<Vec<CreateProject>>,
) -> Result<(StatusCode, Json<Vec<Project>>), ApiError> {
    let created = state.staffing.projects().create_many(batch).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list(
    State(state): State<SharedState>,
    ApiQuery(filter): ApiQuery<ProjectFilter>,
) -> Result<Json<Vec<ProjectView>>, ApiError> {
    Ok(Json(state.staffing.projects().find_all(&filter).await?))
}

pub async fn search(
    State(state): State<SharedState>,
    ApiJson(filter): ApiJson<ProjectFilter>,
) -> Result<Json<Vec<ProjectView>>, ApiError> {
    Ok(Json(state.staffing.projects().find_all(&filter).await?))
}

pub async fn get(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(params): ApiQuery<PopulateParams>,
) -> Result<Json<ProjectView>, ApiError> {
    Ok(Json(
        state
            .staffing
            .projects()
            .find_by_id(id, params.populate)
            .await?,
    ))
}

pub async fn update(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<ProjectPatch>,
) -> Result<Json<Project>, ApiError> {
    Ok(Json(state.staffing.projects().update(id, patch).await?))
}

pub async fn remove(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.staffing.projects().remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn assign_employee(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<AssignEmployee>,
) -> Result<Json<Success>, ApiError> {
    state
        .staffing
        .projects()
        .assign_employee(id, body.employee_id)
        .await?;
    Ok(Success::ok())
}

pub async fn remove_employee(
    State(state): State<SharedState>,
    ApiPath((id, employee_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state.staffing.projects().remove_employee(id, employee_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn assign_request(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<AssignRequest>,
) -> Result<Json<Success>, ApiError> {
    state
        .staffing
        .projects()
        .assign_request(id, body.request_id)
        .await?;
    Ok(Success::ok())
}

pub async fn remove_request(
    State(state): State<SharedState>,
    ApiPath((id, request_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state.staffing.projects().remove_request(id, request_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
