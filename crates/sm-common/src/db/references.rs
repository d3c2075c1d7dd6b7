//! Atomic single-document updates of reference arrays.

use tracing::instrument;
use uuid::Uuid;

use super::PgPool;
use super::store::{RefField, StoreError};
use super::util::TimedClientExt;
use crate::api::EntityKind;

pub(crate) fn table(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Employee => "sm.employees",
        EntityKind::Project => "sm.projects",
        EntityKind::Request => "sm.requests",
    }
}

pub(crate) fn column(field: RefField) -> &'static str {
    match field {
        RefField::EmployeeProjects => "projects",
        RefField::EmployeeRequests => "requests",
        RefField::ProjectTeam => "team",
        RefField::ProjectRequests => "requests",
        RefField::RequestAssignedEmployees => "assigned_employees",
        RefField::RequestProject => "project",
    }
}

/// `$1` is the owner id, `$2` the target id.
pub(crate) fn add_sql(field: RefField) -> String {
    let table = table(field.owner());
    let col = column(field);
    if field.is_single() {
        format!(
            "UPDATE {table} AS t SET {col} = $2, updated_at = NOW() \
             FROM (SELECT id, {col} AS previous FROM {table} WHERE id = $1 FOR UPDATE) prior \
             WHERE t.id = prior.id AND t.{col} IS DISTINCT FROM $2 \
             RETURNING prior.previous"
        )
    } else {
        format!(
            "UPDATE {table} SET {col} = array_append({col}, $2), updated_at = NOW() \
             WHERE id = $1 AND NOT ($2 = ANY({col}))"
        )
    }
}

/// `$1` is the owner id, `$2` the target id.
pub(crate) fn pull_sql(field: RefField) -> String {
    let table = table(field.owner());
    let col = column(field);
    if field.is_single() {
        format!("UPDATE {table} SET {col} = NULL, updated_at = NOW() WHERE id = $1 AND {col} = $2")
    } else {
        format!(
            "UPDATE {table} SET {col} = array_remove({col}, $2), updated_at = NOW() \
             WHERE id = $1 AND $2 = ANY({col})"
        )
    }
}

/// `$1` is the target id.
pub(crate) fn pull_everywhere_sql(field: RefField) -> String {
    let table = table(field.owner());
    let col = column(field);
    if field.is_single() {
        format!("UPDATE {table} SET {col} = NULL, updated_at = NOW() WHERE {col} = $1")
    } else {
        format!(
            "UPDATE {table} SET {col} = array_remove({col}, $1), updated_at = NOW() \
             WHERE $1 = ANY({col})"
        )
    }
}

#[instrument(skip(pool))]
pub async fn add_reference(
    pool: &PgPool,
    field: RefField,
    owner: Uuid,
    target: Uuid,
) -> Result<Option<Uuid>, StoreError> {
    let client = pool.get().await?;
    let query = add_sql(field);
    if field.is_single() {
        let row = client
            .timed_query_opt(query.as_str(), &[&owner, &target], "references.add_single")
            .await?;
        Ok(row.and_then(|row| row.get::<_, Option<Uuid>>(0)))
    } else {
        client
            .timed_execute(query.as_str(), &[&owner, &target], "references.add")
            .await?;
        Ok(None)
    }
}

#[instrument(skip(pool))]
pub async fn pull_reference(
    pool: &PgPool,
    field: RefField,
    owner: Uuid,
    target: Uuid,
) -> Result<(), StoreError> {
    let client = pool.get().await?;
    client
        .timed_execute(pull_sql(field).as_str(), &[&owner, &target], "references.pull")
        .await?;
    Ok(())
}

#[instrument(skip(pool))]
pub async fn pull_reference_everywhere(
    pool: &PgPool,
    field: RefField,
    target: Uuid,
) -> Result<u64, StoreError> {
    let client = pool.get().await?;
    let touched = client
        .timed_execute(
            pull_everywhere_sql(field).as_str(),
            &[&target],
            "references.pull_everywhere",
        )
        .await?;
    Ok(touched)
}

#[instrument(skip(pool))]
pub async fn exists(pool: &PgPool, kind: EntityKind, id: Uuid) -> Result<bool, StoreError> {
    let client = pool.get().await?;
    let query = format!("SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1)", table(kind));
    let row = client
        .timed_query_one(query.as_str(), &[&id], "references.exists")
        .await?;
    Ok(row.get(0))
}

pub async fn ping(pool: &PgPool) -> Result<(), StoreError> {
    let client = pool.get().await?;
    client.timed_execute("SELECT 1", &[], "ping").await?;
    Ok(())
}
