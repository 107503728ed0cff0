use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::{Priority, Task};
use crate::reporting::board::AssigneeRow;

pub struct NewTask<'a> {
    pub sprint_id: Uuid,
    pub status_id: Uuid,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub priority: Priority,
}

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    task: &NewTask<'_>,
) -> Result<Task, sqlx::Error> {
    sqlx::query_as::<_, Task>(
        "INSERT INTO tasks (id, sprint_id, status_id, name, description, priority)
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(task.sprint_id)
    .bind(task.status_id)
    .bind(task.name)
    .bind(task.description)
    .bind(task.priority)
    .fetch_one(executor)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Task>, sqlx::Error> {
    sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_for_project(pool: &PgPool, project_id: Uuid) -> Result<Vec<Task>, sqlx::Error> {
    sqlx::query_as::<_, Task>(
        "SELECT t.* FROM tasks t
         JOIN sprints s ON s.id = t.sprint_id
         WHERE s.project_id = $1
         ORDER BY t.created_at, t.id",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await
}

pub async fn list_for_sprint(pool: &PgPool, sprint_id: Uuid) -> Result<Vec<Task>, sqlx::Error> {
    sqlx::query_as::<_, Task>(
        "SELECT * FROM tasks WHERE sprint_id = $1 ORDER BY created_at, id",
    )
    .bind(sprint_id)
    .fetch_all(pool)
    .await
}

#[derive(Debug, Default)]
pub struct TaskChanges<'a> {
    pub name: Option<&'a str>,
    pub description: Option<&'a str>,
    pub priority: Option<Priority>,
    pub status_id: Option<Uuid>,
    pub frontend_bug_count: Option<i32>,
    pub backend_bug_count: Option<i32>,
    pub database_bug_count: Option<i32>,
}

pub async fn update(pool: &PgPool, id: Uuid, changes: &TaskChanges<'_>) -> Result<Task, sqlx::Error> {
    sqlx::query_as::<_, Task>(
        "UPDATE tasks SET
            name = COALESCE($2, name),
            description = COALESCE($3, description),
            priority = COALESCE($4, priority),
            status_id = COALESCE($5, status_id),
            frontend_bug_count = COALESCE($6, frontend_bug_count),
            backend_bug_count = COALESCE($7, backend_bug_count),
            database_bug_count = COALESCE($8, database_bug_count),
            updated_at = now()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(changes.name)
    .bind(changes.description)
    .bind(changes.priority)
    .bind(changes.status_id)
    .bind(changes.frontend_bug_count)
    .bind(changes.backend_bug_count)
    .bind(changes.database_bug_count)
    .fetch_one(pool)
    .await
}

const ASSIGNEE_COLUMNS: &str =
    "ta.task_id, u.id, u.username, u.email, u.image_url, u.avatar_color";

pub async fn assignees_for_project(
    pool: &PgPool,
    project_id: Uuid,
) -> Result<Vec<AssigneeRow>, sqlx::Error> {
    sqlx::query_as::<_, AssigneeRow>(&format!(
        "SELECT {ASSIGNEE_COLUMNS} FROM task_assignments ta
         JOIN users u ON u.id = ta.user_id
         JOIN tasks t ON t.id = ta.task_id
         JOIN sprints s ON s.id = t.sprint_id
         WHERE s.project_id = $1
         ORDER BY u.username"
    ))
    .bind(project_id)
    .fetch_all(pool)
    .await
}

pub async fn assignees_for_sprint(
    pool: &PgPool,
    sprint_id: Uuid,
) -> Result<Vec<AssigneeRow>, sqlx::Error> {
    sqlx::query_as::<_, AssigneeRow>(&format!(
        "SELECT {ASSIGNEE_COLUMNS} FROM task_assignments ta
         JOIN users u ON u.id = ta.user_id
         JOIN tasks t ON t.id = ta.task_id
         WHERE t.sprint_id = $1
         ORDER BY u.username"
    ))
    .bind(sprint_id)
    .fetch_all(pool)
    .await
}

pub async fn assignees_for_task(
    pool: &PgPool,
    task_id: Uuid,
) -> Result<Vec<AssigneeRow>, sqlx::Error> {
    sqlx::query_as::<_, AssigneeRow>(&format!(
        "SELECT {ASSIGNEE_COLUMNS} FROM task_assignments ta
         JOIN users u ON u.id = ta.user_id
         WHERE ta.task_id = $1
         ORDER BY u.username"
    ))
    .bind(task_id)
    .fetch_all(pool)
    .await
}

/// Replace the assignee set of a task. Runs inside the caller's transaction.
pub async fn replace_assignees(
    tx: &mut Transaction<'_, Postgres>,
    task_id: Uuid,
    user_ids: &[Uuid],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM task_assignments WHERE task_id = $1")
        .bind(task_id)
        .execute(&mut **tx)
        .await?;
    sqlx::query(
        "INSERT INTO task_assignments (task_id, user_id)
         SELECT $1, u FROM UNNEST($2::uuid[]) AS u
         ON CONFLICT DO NOTHING",
    )
    .bind(task_id)
    .bind(user_ids)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
