use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{ProjectMember, ProjectRole, UserSummary};

pub async fn add<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    project_id: Uuid,
    user_id: Uuid,
    role: ProjectRole,
) -> Result<ProjectMember, sqlx::Error> {
    sqlx::query_as::<_, ProjectMember>(
        "INSERT INTO project_members (project_id, user_id, role) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(project_id)
    .bind(user_id)
    .bind(role)
    .fetch_one(executor)
    .await
}

/// Adds every user as a plain member; users already in the project are skipped.
pub async fn add_members(
    pool: &PgPool,
    project_id: Uuid,
    user_ids: &[Uuid],
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO project_members (project_id, user_id)
         SELECT $1, u FROM UNNEST($2::uuid[]) AS u
         ON CONFLICT (project_id, user_id) DO NOTHING",
    )
    .bind(project_id)
    .bind(user_ids)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn find_role(
    pool: &PgPool,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<Option<ProjectRole>, sqlx::Error> {
    sqlx::query_scalar::<_, ProjectRole>(
        "SELECT role FROM project_members WHERE project_id = $1 AND user_id = $2",
    )
    .bind(project_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMemberEntry {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub image_url: Option<String>,
    pub avatar_color: String,
    pub role: ProjectRole,
    pub join_date: DateTime<Utc>,
}

pub async fn list(
    pool: &PgPool,
    project_id: Uuid,
) -> Result<Vec<ProjectMemberEntry>, sqlx::Error> {
    sqlx::query_as::<_, ProjectMemberEntry>(
        "SELECT u.id, u.username AS name, u.email, u.image_url, u.avatar_color,
                pm.role, pm.join_date
         FROM project_members pm
         JOIN users u ON u.id = pm.user_id
         WHERE pm.project_id = $1
         ORDER BY pm.join_date",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await
}

/// Members of the project's workspace that are not in the project yet.
pub async fn list_candidates(
    pool: &PgPool,
    project_id: Uuid,
    workspace_id: Uuid,
) -> Result<Vec<UserSummary>, sqlx::Error> {
    sqlx::query_as::<_, UserSummary>(
        "SELECT u.id, u.username, u.email, u.image_url, u.avatar_color
         FROM workspace_members wm
         JOIN users u ON u.id = wm.user_id
         WHERE wm.workspace_id = $2
           AND NOT EXISTS (
               SELECT 1 FROM project_members pm
               WHERE pm.project_id = $1 AND pm.user_id = wm.user_id
           )
         ORDER BY u.username",
    )
    .bind(project_id)
    .bind(workspace_id)
    .fetch_all(pool)
    .await
}

pub async fn list_users(pool: &PgPool, project_id: Uuid) -> Result<Vec<UserSummary>, sqlx::Error> {
    sqlx::query_as::<_, UserSummary>(
        "SELECT u.id, u.username, u.email, u.image_url, u.avatar_color
         FROM project_members pm
         JOIN users u ON u.id = pm.user_id
         WHERE pm.project_id = $1
         ORDER BY u.username",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await
}

pub async fn update_role(
    pool: &PgPool,
    project_id: Uuid,
    user_id: Uuid,
    role: ProjectRole,
) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("UPDATE project_members SET role = $3 WHERE project_id = $1 AND user_id = $2")
            .bind(project_id)
            .bind(user_id)
            .bind(role)
            .execute(pool)
            .await?;
    Ok(result.rows_affected())
}

/// Of `user_ids`, the ones that are members of the project.
pub async fn filter_members(
    pool: &PgPool,
    project_id: Uuid,
    user_ids: &[Uuid],
) -> Result<Vec<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(
        "SELECT user_id FROM project_members WHERE project_id = $1 AND user_id = ANY($2)",
    )
    .bind(project_id)
    .bind(user_ids)
    .fetch_all(pool)
    .await
}
