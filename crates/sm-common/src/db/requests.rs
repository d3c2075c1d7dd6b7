use chrono::Utc;
use serde_json::{Map, Value};
use tokio_postgres::Row;
use tokio_postgres::types::Json;
use tracing::instrument;
use uuid::Uuid;

use super::PgPool;
use super::store::{StoreError, order_by_ids};
use super::util::{SqlParams, TimedClientExt, parse_column, unique_violation};
use crate::api::filter::like_pattern;
use crate::api::{
    CreateRequest, Languages, LocationInfo, Management, RequestFilter, RequestPatch,
    StaffingInfo, StaffingRequest,
};

const COLUMNS: &str = "id, request_id, name, meta, staffing, location, languages, management, \
    technologies, skills, status, project_status, assigned_employees, project, created_at, \
    updated_at";

fn row_to_request(row: &Row) -> Result<StaffingRequest, StoreError> {
    let meta: Json<Map<String, Value>> = row.get("meta");
    let staffing: Json<StaffingInfo> = row.get("staffing");
    let location: Json<LocationInfo> = row.get("location");
    let languages: Json<Languages> = row.get("languages");
    let management: Json<Management> = row.get("management");

    Ok(StaffingRequest {
        id: row.get("id"),
        request_id: row.get("request_id"),
        name: row.get("name"),
        meta: meta.0,
        staffing: staffing.0,
        location: location.0,
        languages: languages.0,
        management: management.0,
        technologies: row.get("technologies"),
        skills: row.get("skills"),
        status: parse_column("status", row.get("status"))?,
        project_status: parse_column("project_status", row.get("project_status"))?,
        assigned_employees: row.get("assigned_employees"),
        project: row.get("project"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn rows_to_requests(rows: &[Row]) -> Result<Vec<StaffingRequest>, StoreError> {
    rows.iter().map(row_to_request).collect()
}

pub(crate) fn filter_sql(filter: &RequestFilter) -> (String, SqlParams) {
    let mut params = SqlParams::new();
    let mut query = format!("SELECT {COLUMNS} FROM sm.requests WHERE 1=1");

    if let Some(name) = &filter.name {
        query.push_str(&format!(" AND name ILIKE {}", params.push(like_pattern(name))));
    }
    if let Some(status) = filter.status {
        query.push_str(&format!(" AND status = {}", params.push(status.as_ref().to_string())));
    }
    if let Some(project_status) = filter.project_status {
        query.push_str(&format!(
            " AND project_status = {}",
            params.push(project_status.as_ref().to_string())
        ));
    }
    if let Some(grade) = &filter.grade {
        query.push_str(&format!(" AND staffing->>'grade' = {}", params.push(grade.clone())));
    }
    if let Some(skills) = filter.skills.as_ref().filter(|s| !s.is_empty()) {
        query.push_str(&format!(" AND skills && {}::text[]", params.push(skills.clone())));
    }
    if let Some(technologies) = filter.technologies.as_ref().filter(|t| !t.is_empty()) {
        query.push_str(&format!(
            " AND technologies && {}::text[]",
            params.push(technologies.clone())
        ));
    }
    if let Some(project) = filter.project_id {
        query.push_str(&format!(" AND project = {}", params.push(project)));
    }
    if let Some(after) = filter.created_after {
        query.push_str(&format!(" AND created_at >= {}", params.push(after)));
    }
    if let Some(before) = filter.created_before {
        query.push_str(&format!(" AND created_at <= {}", params.push(before)));
    }

    query.push_str(" ORDER BY seq ASC");
    (query, params)
}

pub(crate) fn patch_sql(id: Uuid, patch: &RequestPatch) -> (String, SqlParams) {
    let mut params = SqlParams::new();
    let mut sets = vec![format!("updated_at = {}", params.push(Utc::now()))];

    if let Some(name) = &patch.name {
        sets.push(format!("name = {}", params.push(name.clone())));
    }
    if let Some(meta) = &patch.meta {
        sets.push(format!("meta = {}", params.push(Json(meta.clone()))));
    }
    if let Some(staffing) = &patch.staffing {
        sets.push(format!("staffing = {}", params.push(Json(staffing.clone()))));
    }
    if let Some(location) = &patch.location {
        sets.push(format!("location = {}", params.push(Json(location.clone()))));
    }
    if let Some(languages) = &patch.languages {
        sets.push(format!("languages = {}", params.push(Json(languages.clone()))));
    }
    if let Some(management) = &patch.management {
        sets.push(format!("management = {}", params.push(Json(management.clone()))));
    }
    if let Some(technologies) = &patch.technologies {
        sets.push(format!("technologies = {}", params.push(technologies.clone())));
    }
    if let Some(skills) = &patch.skills {
        sets.push(format!("skills = {}", params.push(skills.clone())));
    }
    if let Some(status) = patch.status {
        sets.push(format!("status = {}", params.push(status.as_ref().to_string())));
    }
    if let Some(project_status) = patch.project_status {
        sets.push(format!(
            "project_status = {}",
            params.push(project_status.as_ref().to_string())
        ));
    }

    let id_param = params.push(id);
    let query = format!(
        "UPDATE sm.requests SET {} WHERE id = {id_param} RETURNING {COLUMNS}",
        sets.join(", ")
    );
    (query, params)
}

fn conflict(name: &str) -> impl FnOnce() -> String + '_ {
    move || format!("Request with name \"{name}\" already exists")
}

#[instrument(skip(pool, batch), fields(count = batch.len()))]
pub async fn insert_requests(
    pool: &PgPool,
    batch: Vec<CreateRequest>,
) -> Result<Vec<StaffingRequest>, StoreError> {
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;
    let now = Utc::now();

    let mut created = Vec::with_capacity(batch.len());
    for input in batch {
        let request = StaffingRequest::from_create(input, now);
        tx.timed_execute(
            "INSERT INTO sm.requests (id, request_id, name, meta, staffing, location, languages, \
             management, technologies, skills, status, project_status, assigned_employees, \
             project, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
            &[
                &request.id,
                &request.request_id,
                &request.name,
                &Json(&request.meta),
                &Json(&request.staffing),
                &Json(&request.location),
                &Json(&request.languages),
                &Json(&request.management),
                &request.technologies,
                &request.skills,
                &request.status.as_ref(),
                &request.project_status.as_ref(),
                &request.assigned_employees,
                &request.project,
                &request.created_at,
                &request.updated_at,
            ],
            "requests.insert",
        )
        .await
        .map_err(|e| unique_violation(e, conflict(&request.name)))?;
        created.push(request);
    }

    tx.commit().await?;
    Ok(created)
}

#[instrument(skip(pool))]
pub async fn find_requests(
    pool: &PgPool,
    filter: &RequestFilter,
) -> Result<Vec<StaffingRequest>, StoreError> {
    let client = pool.get().await?;
    let (query, params) = filter_sql(filter);
    let rows = client
        .timed_query(query.as_str(), &params.as_refs(), "requests.find")
        .await?;
    rows_to_requests(&rows)
}

#[instrument(skip(pool, ids), fields(count = ids.len()))]
pub async fn get_requests(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<StaffingRequest>, StoreError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let client = pool.get().await?;
    let query = format!("SELECT {COLUMNS} FROM sm.requests WHERE id = ANY($1)");
    let rows = client
        .timed_query(query.as_str(), &[&ids], "requests.get")
        .await?;
    Ok(order_by_ids(rows_to_requests(&rows)?, ids, |r| r.id))
}

#[instrument(skip(pool, patch))]
pub async fn update_request(
    pool: &PgPool,
    id: Uuid,
    patch: &RequestPatch,
) -> Result<Option<StaffingRequest>, StoreError> {
    let client = pool.get().await?;
    let (query, params) = patch_sql(id, patch);
    let row = client
        .timed_query_opt(query.as_str(), &params.as_refs(), "requests.update")
        .await
        .map_err(|e| unique_violation(e, conflict(patch.name.as_deref().unwrap_or_default())))?;
    row.as_ref().map(row_to_request).transpose()
}

#[instrument(skip(pool))]
pub async fn delete_request(pool: &PgPool, id: Uuid) -> Result<Option<StaffingRequest>, StoreError> {
    let client = pool.get().await?;
    let query = format!("DELETE FROM sm.requests WHERE id = $1 RETURNING {COLUMNS}");
    let row = client
        .timed_query_opt(query.as_str(), &[&id], "requests.delete")
        .await?;
    row.as_ref().map(row_to_request).transpose()
}
