use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskComment {
    pub id: Uuid,
    pub task_id: Uuid,
    /// `None` once the author deleted their account.
    pub user_id: Option<Uuid>,
    pub body: String,
    pub created_at: DateTime<Utc>,
}
