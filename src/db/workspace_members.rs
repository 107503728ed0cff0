use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{WorkspaceMember, WorkspaceRole};

pub async fn add<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    workspace_id: Uuid,
    user_id: Uuid,
    role: WorkspaceRole,
) -> Result<WorkspaceMember, sqlx::Error> {
    sqlx::query_as::<_, WorkspaceMember>(
        "INSERT INTO workspace_members (workspace_id, user_id, role)
         VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(workspace_id)
    .bind(user_id)
    .bind(role)
    .fetch_one(executor)
    .await
}

pub async fn find_role(
    pool: &PgPool,
    workspace_id: Uuid,
    user_id: Uuid,
) -> Result<Option<WorkspaceRole>, sqlx::Error> {
    sqlx::query_scalar::<_, WorkspaceRole>(
        "SELECT role FROM workspace_members WHERE workspace_id = $1 AND user_id = $2",
    )
    .bind(workspace_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceMemberEntry {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub image_url: Option<String>,
    pub avatar_color: String,
    pub role: WorkspaceRole,
    pub join_date: DateTime<Utc>,
}

pub async fn list(
    pool: &PgPool,
    workspace_id: Uuid,
) -> Result<Vec<WorkspaceMemberEntry>, sqlx::Error> {
    sqlx::query_as::<_, WorkspaceMemberEntry>(
        "SELECT u.id, u.username AS name, u.email, u.image_url, u.avatar_color,
                wm.role, wm.join_date
         FROM workspace_members wm
         JOIN users u ON u.id = wm.user_id
         WHERE wm.workspace_id = $1
         ORDER BY wm.join_date",
    )
    .bind(workspace_id)
    .fetch_all(pool)
    .await
}

pub async fn update_role(
    pool: &PgPool,
    workspace_id: Uuid,
    user_id: Uuid,
    role: WorkspaceRole,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE workspace_members SET role = $3 WHERE workspace_id = $1 AND user_id = $2")
        .bind(workspace_id)
        .bind(user_id)
        .bind(role)
        .execute(pool)
        .await?;
    Ok(())
}

/// Of `user_ids`, the ones that belong to the workspace.
pub async fn filter_members(
    pool: &PgPool,
    workspace_id: Uuid,
    user_ids: &[Uuid],
) -> Result<Vec<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(
        "SELECT user_id FROM workspace_members WHERE workspace_id = $1 AND user_id = ANY($2)",
    )
    .bind(workspace_id)
    .bind(user_ids)
    .fetch_all(pool)
    .await
}

pub async fn count_owners(pool: &PgPool, workspace_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM workspace_members WHERE workspace_id = $1 AND role = 'Owner'",
    )
    .bind(workspace_id)
    .fetch_one(pool)
    .await
}

/// Workspaces where the user is the only Owner.
pub async fn sole_owned_workspaces(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(
        "SELECT wm.workspace_id FROM workspace_members wm
         WHERE wm.user_id = $1 AND wm.role = 'Owner'
           AND (SELECT COUNT(*) FROM workspace_members o
                WHERE o.workspace_id = wm.workspace_id AND o.role = 'Owner') = 1",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}
