use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::TaskComment;

pub async fn create(
    pool: &PgPool,
    task_id: Uuid,
    user_id: Uuid,
    body: &str,
) -> Result<TaskComment, sqlx::Error> {
    sqlx::query_as::<_, TaskComment>(
        "INSERT INTO task_comments (id, task_id, user_id, body) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(task_id)
    .bind(user_id)
    .bind(body)
    .fetch_one(pool)
    .await
}

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CommentEntry {
    pub id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub author_id: Option<Uuid>,
    pub author_name: Option<String>,
    pub author_avatar_color: Option<String>,
}

pub async fn list_for_task(pool: &PgPool, task_id: Uuid) -> Result<Vec<CommentEntry>, sqlx::Error> {
    sqlx::query_as::<_, CommentEntry>(
        "SELECT c.id, c.body, c.created_at, u.id AS author_id,
                u.username AS author_name, u.avatar_color AS author_avatar_color
         FROM task_comments c
         LEFT JOIN users u ON u.id = c.user_id
         WHERE c.task_id = $1
         ORDER BY c.created_at",
    )
    .bind(task_id)
    .fetch_all(pool)
    .await
}
