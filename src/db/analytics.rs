//! Count queries behind project, user and workspace analytics.
//!
//! Status counts match on the status *type*, so every custom status of a type
//! contributes to that type's total.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Priority, StatusType};
use crate::reporting::{PriorityCounts, StatusCounts};

pub async fn count_tasks_by_status(
    pool: &PgPool,
    project_id: Uuid,
    status_type: StatusType,
    sprint_id: Option<Uuid>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM tasks t
         JOIN sprints sp ON sp.id = t.sprint_id
         JOIN statuses st ON st.id = t.status_id
         WHERE sp.project_id = $1
           AND st.type = $2
           AND ($3::uuid IS NULL OR sp.id = $3)",
    )
    .bind(project_id)
    .bind(status_type)
    .bind(sprint_id)
    .fetch_one(pool)
    .await
}

pub async fn count_tasks_by_priority(
    pool: &PgPool,
    project_id: Uuid,
    priority: Priority,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM tasks t
         JOIN sprints sp ON sp.id = t.sprint_id
         WHERE sp.project_id = $1 AND t.priority = $2",
    )
    .bind(project_id)
    .bind(priority)
    .fetch_one(pool)
    .await
}

pub async fn count_tasks_by_status_for_user(
    pool: &PgPool,
    project_id: Uuid,
    user_id: Uuid,
    status_type: StatusType,
    sprint_id: Option<Uuid>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM tasks t
         JOIN sprints sp ON sp.id = t.sprint_id
         JOIN statuses st ON st.id = t.status_id
         WHERE sp.project_id = $1
           AND st.type = $3
           AND ($4::uuid IS NULL OR sp.id = $4)
           AND EXISTS (
               SELECT 1 FROM task_assignments ta
               WHERE ta.task_id = t.id AND ta.user_id = $2
           )",
    )
    .bind(project_id)
    .bind(user_id)
    .bind(status_type)
    .bind(sprint_id)
    .fetch_one(pool)
    .await
}

pub async fn count_tasks_for_user(
    pool: &PgPool,
    project_id: Uuid,
    user_id: Uuid,
    sprint_id: Option<Uuid>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM tasks t
         JOIN sprints sp ON sp.id = t.sprint_id
         JOIN task_assignments ta ON ta.task_id = t.id
         WHERE sp.project_id = $1
           AND ta.user_id = $2
           AND ($3::uuid IS NULL OR sp.id = $3)",
    )
    .bind(project_id)
    .bind(user_id)
    .bind(sprint_id)
    .fetch_one(pool)
    .await
}

/// Sum of all three bug counters over the given tasks. Unknown ids add 0.
pub async fn sum_bug_counts(pool: &PgPool, task_ids: &[Uuid]) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(frontend_bug_count + backend_bug_count + database_bug_count), 0)::bigint
         FROM tasks WHERE id = ANY($1)",
    )
    .bind(task_ids)
    .fetch_one(pool)
    .await
}

/// Ids of the user's assigned tasks in a project, optionally one sprint.
pub async fn assigned_task_ids(
    pool: &PgPool,
    project_id: Uuid,
    user_id: Uuid,
    sprint_id: Option<Uuid>,
) -> Result<Vec<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(
        "SELECT t.id FROM tasks t
         JOIN sprints sp ON sp.id = t.sprint_id
         JOIN task_assignments ta ON ta.task_id = t.id
         WHERE sp.project_id = $1
           AND ta.user_id = $2
           AND ($3::uuid IS NULL OR sp.id = $3)",
    )
    .bind(project_id)
    .bind(user_id)
    .bind(sprint_id)
    .fetch_all(pool)
    .await
}

pub async fn count_members(pool: &PgPool, project_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM project_members WHERE project_id = $1")
        .bind(project_id)
        .fetch_one(pool)
        .await
}

pub async fn count_sprints(pool: &PgPool, project_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sprints WHERE project_id = $1")
        .bind(project_id)
        .fetch_one(pool)
        .await
}

/// To_Do / In_Progress / Completed counts for a project, issued concurrently.
pub async fn project_status_counts(
    pool: &PgPool,
    project_id: Uuid,
    sprint_id: Option<Uuid>,
) -> Result<StatusCounts, sqlx::Error> {
    let (to_do, in_progress, completed) = tokio::try_join!(
        count_tasks_by_status(pool, project_id, StatusType::ToDo, sprint_id),
        count_tasks_by_status(pool, project_id, StatusType::InProgress, sprint_id),
        count_tasks_by_status(pool, project_id, StatusType::Completed, sprint_id),
    )?;
    Ok(StatusCounts { to_do, in_progress, completed })
}

pub async fn user_status_counts(
    pool: &PgPool,
    project_id: Uuid,
    user_id: Uuid,
    sprint_id: Option<Uuid>,
) -> Result<StatusCounts, sqlx::Error> {
    let (to_do, in_progress, completed) = tokio::try_join!(
        count_tasks_by_status_for_user(pool, project_id, user_id, StatusType::ToDo, sprint_id),
        count_tasks_by_status_for_user(pool, project_id, user_id, StatusType::InProgress, sprint_id),
        count_tasks_by_status_for_user(pool, project_id, user_id, StatusType::Completed, sprint_id),
    )?;
    Ok(StatusCounts { to_do, in_progress, completed })
}

pub async fn project_priority_counts(
    pool: &PgPool,
    project_id: Uuid,
) -> Result<PriorityCounts, sqlx::Error> {
    let (low, medium, high) = tokio::try_join!(
        count_tasks_by_priority(pool, project_id, Priority::Low),
        count_tasks_by_priority(pool, project_id, Priority::Medium),
        count_tasks_by_priority(pool, project_id, Priority::High),
    )?;
    Ok(PriorityCounts { low, medium, high })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceAnalytics {
    pub projects: i64,
    pub members: i64,
    pub sprints: i64,
    pub overdue_projects: i64,
}

pub async fn workspace_analytics(
    pool: &PgPool,
    workspace_id: Uuid,
) -> Result<WorkspaceAnalytics, sqlx::Error> {
    let projects = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM projects WHERE workspace_id = $1",
    )
    .bind(workspace_id)
    .fetch_one(pool);
    let members = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM workspace_members WHERE workspace_id = $1",
    )
    .bind(workspace_id)
    .fetch_one(pool);
    let sprints = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM sprints s
         JOIN projects p ON p.id = s.project_id
         WHERE p.workspace_id = $1",
    )
    .bind(workspace_id)
    .fetch_one(pool);
    let overdue = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM projects WHERE workspace_id = $1 AND due_date < $2",
    )
    .bind(workspace_id)
    .bind(Utc::now())
    .fetch_one(pool);

    let (projects, members, sprints, overdue_projects) =
        tokio::try_join!(projects, members, sprints, overdue)?;

    Ok(WorkspaceAnalytics {
        projects,
        members,
        sprints,
        overdue_projects,
    })
}
