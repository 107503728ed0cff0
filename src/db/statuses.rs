use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Status, StatusType};

/// A status as submitted by a client, already validated.
#[derive(Debug, Clone)]
pub struct NewStatus {
    pub name: String,
    pub status_type: StatusType,
    pub color: String,
}

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    project_id: Uuid,
    status: &NewStatus,
) -> Result<Status, sqlx::Error> {
    sqlx::query_as::<_, Status>(
        "INSERT INTO statuses (id, project_id, name, type, color)
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(project_id)
    .bind(&status.name)
    .bind(status.status_type)
    .bind(&status.color)
    .fetch_one(executor)
    .await
}

/// Creation order, so columns of the same type keep a stable order.
pub async fn list_for_project(pool: &PgPool, project_id: Uuid) -> Result<Vec<Status>, sqlx::Error> {
    sqlx::query_as::<_, Status>(
        "SELECT * FROM statuses WHERE project_id = $1 ORDER BY created_at, id",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await
}

/// The status, if it belongs to the project the sprint is in.
pub async fn find_for_sprint<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    status_id: Uuid,
    sprint_id: Uuid,
) -> Result<Option<Status>, sqlx::Error> {
    sqlx::query_as::<_, Status>(
        "SELECT s.* FROM statuses s
         JOIN sprints sp ON sp.project_id = s.project_id
         WHERE s.id = $1 AND sp.id = $2",
    )
    .bind(status_id)
    .bind(sprint_id)
    .fetch_optional(executor)
    .await
}

/// First status of the given type in the project, used as a default column.
pub async fn first_of_type<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    project_id: Uuid,
    status_type: StatusType,
) -> Result<Option<Status>, sqlx::Error> {
    sqlx::query_as::<_, Status>(
        "SELECT * FROM statuses WHERE project_id = $1 AND type = $2
         ORDER BY created_at, id LIMIT 1",
    )
    .bind(project_id)
    .bind(status_type)
    .fetch_optional(executor)
    .await
}

pub async fn update<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    project_id: Uuid,
    id: Uuid,
    status: &NewStatus,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE statuses SET name = $3, type = $4, color = $5
         WHERE id = $1 AND project_id = $2",
    )
    .bind(id)
    .bind(project_id)
    .bind(&status.name)
    .bind(status.status_type)
    .bind(&status.color)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub async fn delete<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    project_id: Uuid,
    id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM statuses WHERE id = $1 AND project_id = $2")
        .bind(id)
        .bind(project_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
