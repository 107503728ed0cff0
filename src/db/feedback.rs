use sqlx::PgPool;
use uuid::Uuid;

use crate::models::SprintFeedback;

pub async fn create(
    pool: &PgPool,
    sprint_id: Uuid,
    feedback: &serde_json::Value,
) -> Result<SprintFeedback, sqlx::Error> {
    sqlx::query_as::<_, SprintFeedback>(
        "INSERT INTO sprint_feedback (id, sprint_id, feedback) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(sprint_id)
    .bind(feedback)
    .fetch_one(pool)
    .await
}

pub async fn list_for_sprint(
    pool: &PgPool,
    sprint_id: Uuid,
) -> Result<Vec<SprintFeedback>, sqlx::Error> {
    sqlx::query_as::<_, SprintFeedback>(
        "SELECT * FROM sprint_feedback WHERE sprint_id = $1 ORDER BY created_at",
    )
    .bind(sprint_id)
    .fetch_all(pool)
    .await
}
