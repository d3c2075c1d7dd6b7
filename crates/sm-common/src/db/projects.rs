use chrono::Utc;
use tokio_postgres::Row;
use tracing::instrument;
use uuid::Uuid;

use super::PgPool;
use super::store::{StoreError, order_by_ids};
use super::util::{SqlParams, TimedClientExt, parse_column, unique_violation};
use crate::api::filter::like_pattern;
use crate::api::{CreateProject, Project, ProjectDirection, ProjectFilter, ProjectPatch};

const COLUMNS: &str = "id, project_id, name, status, domain, directions, technologies, \
    start_date, end_date, team, project_coordinator, intermediary, location, language, \
    request_description, requests, created_at, updated_at";

fn direction_strings(directions: &[ProjectDirection]) -> Vec<String> {
    directions.iter().map(|d| d.as_ref().to_string()).collect()
}

fn row_to_project(row: &Row) -> Result<Project, StoreError> {
    let directions = row
        .get::<_, Vec<String>>("directions")
        .iter()
        .map(|raw| parse_column("directions", raw))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Project {
        id: row.get("id"),
        project_id: row.get("project_id"),
        name: row.get("name"),
        status: parse_column("status", row.get("status"))?,
        domain: row.get("domain"),
        directions,
        technologies: row.get("technologies"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        team: row.get("team"),
        project_coordinator: row.get("project_coordinator"),
        intermediary: row.get("intermediary"),
        location: row.get("location"),
        language: row.get("language"),
        request_description: row.get("request_description"),
        requests: row.get("requests"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn rows_to_projects(rows: &[Row]) -> Result<Vec<Project>, StoreError> {
    rows.iter().map(row_to_project).collect()
}

pub(crate) fn filter_sql(filter: &ProjectFilter) -> (String, SqlParams) {
    let mut params = SqlParams::new();
    let mut query = format!("SELECT {COLUMNS} FROM sm.projects WHERE 1=1");

    if let Some(name) = &filter.name {
        query.push_str(&format!(" AND name ILIKE {}", params.push(like_pattern(name))));
    }
    if let Some(status) = filter.status {
        query.push_str(&format!(" AND status = {}", params.push(status.as_ref().to_string())));
    }
    if let Some(domain) = &filter.domain {
        query.push_str(&format!(" AND domain = {}", params.push(domain.clone())));
    }
    if let Some(directions) = filter.directions.as_ref().filter(|d| !d.is_empty()) {
        query.push_str(&format!(
            " AND directions && {}::text[]",
            params.push(direction_strings(directions))
        ));
    }
    if let Some(technologies) = filter.technologies.as_ref().filter(|t| !t.is_empty()) {
        query.push_str(&format!(
            " AND technologies && {}::text[]",
            params.push(technologies.clone())
        ));
    }
    if let Some(member) = filter.team_member_id {
        query.push_str(&format!(" AND {} = ANY(team)", params.push(member)));
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

pub(crate) fn patch_sql(id: Uuid, patch: &ProjectPatch) -> (String, SqlParams) {
    let mut params = SqlParams::new();
    let mut sets = vec![format!("updated_at = {}", params.push(Utc::now()))];

    if let Some(name) = &patch.name {
        sets.push(format!("name = {}", params.push(name.clone())));
    }
    if let Some(status) = patch.status {
        sets.push(format!("status = {}", params.push(status.as_ref().to_string())));
    }
    if let Some(domain) = &patch.domain {
        sets.push(format!("domain = {}", params.push(domain.clone())));
    }
    if let Some(directions) = &patch.directions {
        sets.push(format!("directions = {}", params.push(direction_strings(directions))));
    }
    if let Some(technologies) = &patch.technologies {
        sets.push(format!("technologies = {}", params.push(technologies.clone())));
    }
    if let Some(start_date) = patch.start_date {
        sets.push(format!("start_date = {}", params.push(start_date)));
    }
    if let Some(end_date) = patch.end_date {
        sets.push(format!("end_date = {}", params.push(end_date)));
    }
    if let Some(coordinator) = &patch.project_coordinator {
        sets.push(format!("project_coordinator = {}", params.push(coordinator.clone())));
    }
    if let Some(intermediary) = &patch.intermediary {
        sets.push(format!("intermediary = {}", params.push(intermediary.clone())));
    }
    if let Some(location) = &patch.location {
        sets.push(format!("location = {}", params.push(location.clone())));
    }
    if let Some(language) = &patch.language {
        sets.push(format!("language = {}", params.push(language.clone())));
    }
    if let Some(description) = &patch.request_description {
        sets.push(format!("request_description = {}", params.push(description.clone())));
    }

    let id_param = params.push(id);
    let query = format!(
        "UPDATE sm.projects SET {} WHERE id = {id_param} RETURNING {COLUMNS}",
        sets.join(", ")
    );
    (query, params)
}

fn conflict(name: &str) -> impl FnOnce() -> String + '_ {
    move || format!("Project with name \"{name}\" already exists")
}

#[instrument(skip(pool, batch), fields(count = batch.len()))]
pub async fn insert_projects(
    pool: &PgPool,
    batch: Vec<CreateProject>,
) -> Result<Vec<Project>, StoreError> {
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;
    let now = Utc::now();

    let mut created = Vec::with_capacity(batch.len());
    for input in batch {
        let project = Project::from_create(input, now);
        let directions = direction_strings(&project.directions);
        tx.timed_execute(
            "INSERT INTO sm.projects (id, project_id, name, status, domain, directions, \
             technologies, start_date, end_date, team, project_coordinator, intermediary, \
             location, language, request_description, requests, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)",
            &[
                &project.id,
                &project.project_id,
                &project.name,
                &project.status.as_ref(),
                &project.domain,
                &directions,
                &project.technologies,
                &project.start_date,
                &project.end_date,
                &project.team,
                &project.project_coordinator,
                &project.intermediary,
                &project.location,
                &project.language,
                &project.request_description,
                &project.requests,
                &project.created_at,
                &project.updated_at,
            ],
            "projects.insert",
        )
        .await
        .map_err(|e| unique_violation(e, conflict(&project.name)))?;
        created.push(project);
    }

    tx.commit().await?;
    Ok(created)
}

#[instrument(skip(pool))]
pub async fn find_projects(pool: &PgPool, filter: &ProjectFilter) -> Result<Vec<Project>, StoreError> {
    let client = pool.get().await?;
    let (query, params) = filter_sql(filter);
    let rows = client
        .timed_query(query.as_str(), &params.as_refs(), "projects.find")
        .await?;
    rows_to_projects(&rows)
}

#[instrument(skip(pool, ids), fields(count = ids.len()))]
pub async fn get_projects(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Project>, StoreError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let client = pool.get().await?;
    let query = format!("SELECT {COLUMNS} FROM sm.projects WHERE id = ANY($1)");
    let rows = client
        .timed_query(query.as_str(), &[&ids], "projects.get")
        .await?;
    Ok(order_by_ids(rows_to_projects(&rows)?, ids, |p| p.id))
}

#[instrument(skip(pool, patch))]
pub async fn update_project(
    pool: &PgPool,
    id: Uuid,
    patch: &ProjectPatch,
) -> Result<Option<Project>, StoreError> {
    let client = pool.get().await?;
    let (query, params) = patch_sql(id, patch);
    let row = client
        .timed_query_opt(query.as_str(), &params.as_refs(), "projects.update")
        .await
        .map_err(|e| unique_violation(e, conflict(patch.name.as_deref().unwrap_or_default())))?;
    row.as_ref().map(row_to_project).transpose()
}

#[instrument(skip(pool))]
pub async fn delete_project(pool: &PgPool, id: Uuid) -> Result<Option<Project>, StoreError> {
    let client = pool.get().await?;
    let query = format!("DELETE FROM sm.projects WHERE id = $1 RETURNING {COLUMNS}");
    let row = client
        .timed_query_opt(query.as_str(), &[&id], "projects.delete")
        .await?;
    row.as_ref().map(row_to_project).transpose()
}
