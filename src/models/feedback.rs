use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Free-form retrospective entry. The `feedback` object is stored as given.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintFeedback {
    pub id: Uuid,
    pub sprint_id: Uuid,
    pub feedback: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
