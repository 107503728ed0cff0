use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Category a status belongs to. Counting and column ordering look only at
/// this, never at the status name or color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "status_type")]
pub enum StatusType {
    #[serde(rename = "To_Do")]
    #[sqlx(rename = "To_Do")]
    ToDo,
    #[serde(rename = "In_Progress")]
    #[sqlx(rename = "In_Progress")]
    InProgress,
    Completed,
}

impl StatusType {
    pub const ALL: [StatusType; 3] = [StatusType::ToDo, StatusType::InProgress, StatusType::Completed];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusType::ToDo => "To_Do",
            StatusType::InProgress => "In_Progress",
            StatusType::Completed => "Completed",
        }
    }
}

impl fmt::Display for StatusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "To_Do" => Ok(StatusType::ToDo),
            "In_Progress" => Ok(StatusType::InProgress),
            "Completed" => Ok(StatusType::Completed),
            other => Err(format!("Invalid status type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub status_type: StatusType,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

/// Columns every new project starts with when no custom set is supplied.
pub const DEFAULT_STATUSES: [(&str, StatusType, &str); 4] = [
    ("To Do", StatusType::ToDo, "#90a9d0"),
    ("In Progress", StatusType::InProgress, "#f9d171"),
    ("Bug", StatusType::InProgress, "#dc2626"),
    ("Completed", StatusType::Completed, "#008844"),
];
