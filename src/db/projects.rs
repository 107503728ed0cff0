use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Project, ProjectRole};

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    workspace_id: Uuid,
    name: &str,
    start_date: DateTime<Utc>,
    due_date: DateTime<Utc>,
    ideal_task_count: Option<i32>,
) -> Result<Project, sqlx::Error> {
    sqlx::query_as::<_, Project>(
        "INSERT INTO projects (id, workspace_id, name, start_date, due_date, ideal_task_count)
         VALUES ($1, $2, $3, $4, $5, COALESCE($6, 10)) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(workspace_id)
    .bind(name)
    .bind(start_date)
    .bind(due_date)
    .bind(ideal_task_count)
    .fetch_one(executor)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// A project together with the caller's role in it.
#[derive(Debug, sqlx::FromRow)]
pub struct MemberProject {
    #[sqlx(flatten)]
    pub project: Project,
    pub role: ProjectRole,
}

/// Projects of a workspace the user is a project member of.
pub async fn list_for_member(
    pool: &PgPool,
    workspace_id: Uuid,
    user_id: Uuid,
) -> Result<Vec<MemberProject>, sqlx::Error> {
    sqlx::query_as::<_, MemberProject>(
        "SELECT p.*, pm.role FROM projects p
         JOIN project_members pm ON pm.project_id = p.id
         WHERE p.workspace_id = $1 AND pm.user_id = $2
         ORDER BY p.created_at",
    )
    .bind(workspace_id)
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn ids_in_workspace<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    workspace_id: Uuid,
) -> Result<Vec<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>("SELECT id FROM projects WHERE workspace_id = $1")
        .bind(workspace_id)
        .fetch_all(executor)
        .await
}

#[derive(Debug, Default)]
pub struct ProjectChanges<'a> {
    pub name: Option<&'a str>,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub ideal_task_count: Option<i32>,
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    changes: &ProjectChanges<'_>,
) -> Result<Project, sqlx::Error> {
    sqlx::query_as::<_, Project>(
        "UPDATE projects SET
            name = COALESCE($2, name),
            start_date = COALESCE($3, start_date),
            due_date = COALESCE($4, due_date),
            ideal_task_count = COALESCE($5, ideal_task_count),
            updated_at = now()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(changes.name)
    .bind(changes.start_date)
    .bind(changes.due_date)
    .bind(changes.ideal_task_count)
    .fetch_one(pool)
    .await
}
