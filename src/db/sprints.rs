use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{ProjectRole, Sprint};

pub async fn create(
    pool: &PgPool,
    project_id: Uuid,
    name: &str,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
) -> Result<Sprint, sqlx::Error> {
    sqlx::query_as::<_, Sprint>(
        "INSERT INTO sprints (id, project_id, name, start_date, end_date)
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(project_id)
    .bind(name)
    .bind(start_date)
    .bind(end_date)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Sprint>, sqlx::Error> {
    sqlx::query_as::<_, Sprint>("SELECT * FROM sprints WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_for_project(pool: &PgPool, project_id: Uuid) -> Result<Vec<Sprint>, sqlx::Error> {
    sqlx::query_as::<_, Sprint>(
        "SELECT * FROM sprints WHERE project_id = $1 ORDER BY start_date, created_at",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await
}

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RetrospectiveSprint {
    pub project_id: Uuid,
    pub project_name: String,
    pub role: ProjectRole,
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Every workspace project the user is a member of, one row per sprint.
/// A project without sprints yields a single row with the sprint columns null.
pub async fn list_for_member(
    pool: &PgPool,
    workspace_id: Uuid,
    user_id: Uuid,
) -> Result<Vec<RetrospectiveSprint>, sqlx::Error> {
    sqlx::query_as::<_, RetrospectiveSprint>(
        "SELECT p.id AS project_id, p.name AS project_name, pm.role, s.id, s.name, s.end_date
         FROM projects p
         JOIN project_members pm ON pm.project_id = p.id
         LEFT JOIN sprints s ON s.project_id = p.id
         WHERE p.workspace_id = $1 AND pm.user_id = $2
         ORDER BY p.created_at, p.id, s.start_date",
    )
    .bind(workspace_id)
    .bind(user_id)
    .fetch_all(pool)
    .await
}
