use chrono::Utc;
use tokio_postgres::Row;
use tracing::instrument;
use uuid::Uuid;

use super::PgPool;
use super::store::{StoreError, order_by_ids};
use super::util::{SqlParams, TimedClientExt, parse_column, unique_violation};
use crate::api::filter::like_pattern;
use crate::api::{CreateEmployee, Employee, EmployeeFilter, EmployeePatch};

const COLUMNS: &str = "id, employee_id, name, role, grade, status, team, sub_team, \
    can_take_second_project, can_work_on_ru_project, has_higher_education, workload, skills, \
    cv_link, projects, requests, created_at, updated_at";

fn row_to_employee(row: &Row) -> Result<Employee, StoreError> {
    Ok(Employee {
        id: row.get("id"),
        employee_id: row.get("employee_id"),
        name: row.get("name"),
        role: row.get("role"),
        grade: parse_column("grade", row.get("grade"))?,
        status: parse_column("status", row.get("status"))?,
        team: row.get("team"),
        sub_team: row.get("sub_team"),
        can_take_second_project: row.get("can_take_second_project"),
        can_work_on_ru_project: row.get("can_work_on_ru_project"),
        has_higher_education: row.get("has_higher_education"),
        workload: parse_column("workload", row.get("workload"))?,
        skills: row.get("skills"),
        cv_link: row.get("cv_link"),
        projects: row.get("projects"),
        requests: row.get("requests"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn rows_to_employees(rows: &[Row]) -> Result<Vec<Employee>, StoreError> {
    rows.iter().map(row_to_employee).collect()
}

pub(crate) fn filter_sql(filter: &EmployeeFilter) -> (String, SqlParams) {
    let mut params = SqlParams::new();
    let mut query = format!("SELECT {COLUMNS} FROM sm.employees WHERE 1=1");

    if let Some(status) = filter.status {
        query.push_str(&format!(" AND status = {}", params.push(status.as_ref().to_string())));
    }
    if let Some(grade) = filter.grade {
        query.push_str(&format!(" AND grade = {}", params.push(grade.as_ref().to_string())));
    }
    if let Some(role) = &filter.role {
        query.push_str(&format!(" AND role = {}", params.push(role.clone())));
    }
    if let Some(team) = &filter.team {
        query.push_str(&format!(" AND team = {}", params.push(team.clone())));
    }
    if let Some(name) = &filter.name {
        query.push_str(&format!(" AND name ILIKE {}", params.push(like_pattern(name))));
    }
    if let Some(workload) = filter.workload {
        query.push_str(&format!(" AND workload = {}", params.push(workload.as_ref().to_string())));
    }
    if let Some(flag) = filter.can_take_second_project {
        query.push_str(&format!(" AND can_take_second_project = {}", params.push(flag)));
    }
    if let Some(flag) = filter.can_work_on_ru_project {
        query.push_str(&format!(" AND can_work_on_ru_project = {}", params.push(flag)));
    }
    if let Some(flag) = filter.has_higher_education {
        query.push_str(&format!(" AND has_higher_education = {}", params.push(flag)));
    }
    if let Some(skills) = filter.skills.as_ref().filter(|s| !s.is_empty()) {
        query.push_str(&format!(" AND skills && {}::text[]", params.push(skills.clone())));
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

pub(crate) fn patch_sql(id: Uuid, patch: &EmployeePatch) -> (String, SqlParams) {
    let mut params = SqlParams::new();
    let mut sets = vec![format!("updated_at = {}", params.push(Utc::now()))];

    if let Some(name) = &patch.name {
        sets.push(format!("name = {}", params.push(name.clone())));
    }
    if let Some(role) = &patch.role {
        sets.push(format!("role = {}", params.push(role.clone())));
    }
    if let Some(grade) = patch.grade {
        sets.push(format!("grade = {}", params.push(grade.as_ref().to_string())));
    }
    if let Some(status) = patch.status {
        sets.push(format!("status = {}", params.push(status.as_ref().to_string())));
    }
    if let Some(team) = &patch.team {
        sets.push(format!("team = {}", params.push(team.clone())));
    }
    if let Some(sub_team) = &patch.sub_team {
        sets.push(format!("sub_team = {}", params.push(sub_team.clone())));
    }
    if let Some(flag) = patch.can_take_second_project {
        sets.push(format!("can_take_second_project = {}", params.push(flag)));
    }
    if let Some(flag) = patch.can_work_on_ru_project {
        sets.push(format!("can_work_on_ru_project = {}", params.push(flag)));
    }
    if let Some(flag) = patch.has_higher_education {
        sets.push(format!("has_higher_education = {}", params.push(flag)));
    }
    if let Some(workload) = patch.workload {
        sets.push(format!("workload = {}", params.push(workload.as_ref().to_string())));
    }
    if let Some(skills) = &patch.skills {
        sets.push(format!("skills = {}", params.push(skills.clone())));
    }
    if let Some(cv_link) = &patch.cv_link {
        sets.push(format!("cv_link = {}", params.push(cv_link.clone())));
    }

    let id_param = params.push(id);
    let query = format!(
        "UPDATE sm.employees SET {} WHERE id = {id_param} RETURNING {COLUMNS}",
        sets.join(", ")
    );
    (query, params)
}

fn conflict(name: &str) -> impl FnOnce() -> String + '_ {
    move || format!("Employee with name \"{name}\" already exists")
}

#[instrument(skip(pool, batch), fields(count = batch.len()))]
pub async fn insert_employees(
    pool: &PgPool,
    batch: Vec<CreateEmployee>,
) -> Result<Vec<Employee>, StoreError> {
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;
    let now = Utc::now();

    let mut created = Vec::with_capacity(batch.len());
    for input in batch {
        let employee = Employee::from_create(input, now);
        tx.timed_execute(
            "INSERT INTO sm.employees (id, employee_id, name, role, grade, status, team, sub_team, \
             can_take_second_project, can_work_on_ru_project, has_higher_education, workload, \
             skills, cv_link, projects, requests, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)",
            &[
                &employee.id,
                &employee.employee_id,
                &employee.name,
                &employee.role,
                &employee.grade.as_ref(),
                &employee.status.as_ref(),
                &employee.team,
                &employee.sub_team,
                &employee.can_take_second_project,
                &employee.can_work_on_ru_project,
                &employee.has_higher_education,
                &employee.workload.as_ref(),
                &employee.skills,
                &employee.cv_link,
                &employee.projects,
                &employee.requests,
                &employee.created_at,
                &employee.updated_at,
            ],
            "employees.insert",
        )
        .await
        .map_err(|e| unique_violation(e, conflict(&employee.name)))?;
        created.push(employee);
    }

    tx.commit().await?;
    Ok(created)
}

#[instrument(skip(pool))]
pub async fn find_employees(pool: &PgPool, filter: &EmployeeFilter) -> Result<Vec<Employee>, StoreError> {
    let client = pool.get().await?;
    let (query, params) = filter_sql(filter);
    let rows = client
        .timed_query(query.as_str(), &params.as_refs(), "employees.find")
        .await?;
    rows_to_employees(&rows)
}

#[instrument(skip(pool, ids), fields(count = ids.len()))]
pub async fn get_employees(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Employee>, StoreError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let client = pool.get().await?;
    let query = format!("SELECT {COLUMNS} FROM sm.employees WHERE id = ANY($1)");
    let rows = client
        .timed_query(query.as_str(), &[&ids], "employees.get")
        .await?;
    Ok(order_by_ids(rows_to_employees(&rows)?, ids, |e| e.id))
}

#[instrument(skip(pool, patch))]
pub async fn update_employee(
    pool: &PgPool,
    id: Uuid,
    patch: &EmployeePatch,
) -> Result<Option<Employee>, StoreError> {
    let client = pool.get().await?;
    let (query, params) = patch_sql(id, patch);
    let row = client
        .timed_query_opt(query.as_str(), &params.as_refs(), "employees.update")
        .await
        .map_err(|e| unique_violation(e, conflict(patch.name.as_deref().unwrap_or_default())))?;
    row.as_ref().map(row_to_employee).transpose()
}

#[instrument(skip(pool))]
pub async fn delete_employee(pool: &PgPool, id: Uuid) -> Result<Option<Employee>, StoreError> {
    let client = pool.get().await?;
    let query = format!("DELETE FROM sm.employees WHERE id = $1 RETURNING {COLUMNS}");
    let row = client
        .timed_query_opt(query.as_str(), &[&id], "employees.delete")
        .await?;
    row.as_ref().map(row_to_employee).transpose()
}
