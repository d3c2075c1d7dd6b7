use deadpool_postgres::PoolError;
use thiserror::Error;
use tokio_postgres::Error as PgError;
use tracing::{info, instrument};

use crate::db::PgPool;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("failed to run migration: {0}")]
    Postgres(#[from] PgError),
}

struct Migration {
    id: i32,
    description: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        id: 1,
        description: "employees, projects, requests and dictionaries",
        sql: r#"
CREATE TABLE IF NOT EXISTS sm.employees (
    id UUID PRIMARY KEY,
    seq BIGSERIAL NOT NULL,
    employee_id UUID NOT NULL,
    name TEXT NOT NULL,
    role TEXT NOT NULL,
    grade TEXT NOT NULL,
    status TEXT NOT NULL,
    team TEXT NOT NULL,
    sub_team TEXT,
    can_take_second_project BOOLEAN NOT NULL DEFAULT FALSE,
    can_work_on_ru_project BOOLEAN NOT NULL DEFAULT FALSE,
    has_higher_education BOOLEAN NOT NULL DEFAULT FALSE,
    workload TEXT NOT NULL,
    skills TEXT[] NOT NULL DEFAULT '{}',
    cv_link TEXT,
    projects UUID[] NOT NULL DEFAULT '{}',
    requests UUID[] NOT NULL DEFAULT '{}',
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    CONSTRAINT employees_name_key UNIQUE (name)
);

CREATE TABLE IF NOT EXISTS sm.projects (
    id UUID PRIMARY KEY,
    seq BIGSERIAL NOT NULL,
    project_id UUID NOT NULL,
    name TEXT NOT NULL,
    status TEXT NOT NULL,
    domain TEXT NOT NULL,
    directions TEXT[] NOT NULL DEFAULT '{}',
    technologies TEXT[] NOT NULL DEFAULT '{}',
    start_date TIMESTAMPTZ NOT NULL,
    end_date TIMESTAMPTZ,
    team UUID[] NOT NULL DEFAULT '{}',
    project_coordinator TEXT NOT NULL,
    intermediary TEXT,
    location TEXT,
    language TEXT NOT NULL,
    request_description TEXT[] NOT NULL DEFAULT '{}',
    requests UUID[] NOT NULL DEFAULT '{}',
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    CONSTRAINT projects_name_key UNIQUE (name)
);

CREATE TABLE IF NOT EXISTS sm.requests (
    id UUID PRIMARY KEY,
    seq BIGSERIAL NOT NULL,
    request_id UUID NOT NULL,
    name TEXT NOT NULL,
    meta JSONB NOT NULL DEFAULT '{}'::jsonb,
    staffing JSONB NOT NULL,
    location JSONB NOT NULL,
    languages JSONB NOT NULL,
    management JSONB NOT NULL,
    technologies TEXT[] NOT NULL DEFAULT '{}',
    skills TEXT[] NOT NULL DEFAULT '{}',
    status TEXT NOT NULL,
    project_status TEXT NOT NULL,
    assigned_employees UUID[] NOT NULL DEFAULT '{}',
    project UUID,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    CONSTRAINT requests_name_key UNIQUE (name)
);

CREATE TABLE IF NOT EXISTS sm.dictionaries (
    name TEXT PRIMARY KEY,
    vals JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#,
    },
    Migration {
        id: 2,
        description: "indexes for reference cleanup and list filters",
        sql: r#"
CREATE INDEX IF NOT EXISTS idx_employees_projects ON sm.employees USING GIN (projects);
CREATE INDEX IF NOT EXISTS idx_employees_requests ON sm.employees USING GIN (requests);
CREATE INDEX IF NOT EXISTS idx_employees_skills ON sm.employees USING GIN (skills);
CREATE INDEX IF NOT EXISTS idx_projects_team ON sm.projects USING GIN (team);
CREATE INDEX IF NOT EXISTS idx_projects_requests ON sm.projects USING GIN (requests);
CREATE INDEX IF NOT EXISTS idx_projects_technologies ON sm.projects USING GIN (technologies);
CREATE INDEX IF NOT EXISTS idx_requests_assigned ON sm.requests USING GIN (assigned_employees);
CREATE INDEX IF NOT EXISTS idx_requests_project ON sm.requests(project) WHERE project IS NOT NULL;
CREATE INDEX IF NOT EXISTS idx_requests_status_created ON sm.requests(status, created_at);
"#,
    },
];

#[instrument(skip(pool))]
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrationError> {
    let mut client = pool.get().await?;
    client
        .batch_execute(
            "CREATE SCHEMA IF NOT EXISTS sm;
             CREATE TABLE IF NOT EXISTS sm.schema_migrations (
                id INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
             );",
        )
        .await?;

    for migration in MIGRATIONS {
        let already_applied: bool = client
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM sm.schema_migrations WHERE id = $1)",
                &[&migration.id],
            )
            .await?
            .get(0);

        if already_applied {
            continue;
        }

        let tx = client.transaction().await?;
        tx.batch_execute(migration.sql).await?;
        tx.execute(
            "INSERT INTO sm.schema_migrations (id, description) VALUES ($1, $2)",
            &[&migration.id, &migration.description],
        )
        .await?;
        tx.commit().await?;

        info!(
            id = migration.id,
            description = migration.description,
            "applied migration"
        );
    }

    Ok(())
}
