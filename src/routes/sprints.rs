use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::access;
use crate::auth::extractor::AuthUser;
use crate::db;
use crate::db::tasks::NewTask;
use crate::error::{not_found_on_missing, AppError};
use crate::models::{Priority, SprintFeedback, StatusType, Task};
use crate::reporting::board::{self, SprintBoard};
use crate::routes::tasks::check_assignees;
use crate::state::SharedState;
use crate::validate;

/// The sprint's tasks grouped under every project status, board order.
pub async fn board(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SprintBoard>, AppError> {
    let (sprint, _) = access::sprint(&state.pool, auth.user_id, id).await?;
    let (statuses, tasks, assignees) = tokio::try_join!(
        db::statuses::list_for_project(&state.pool, sprint.project_id),
        db::tasks::list_for_sprint(&state.pool, id),
        db::tasks::assignees_for_sprint(&state.pool, id),
    )?;

    let assignees = board::index_assignees(assignees);
    Ok(Json(SprintBoard {
        id: sprint.id,
        name: sprint.name,
        task_status: board::status_columns(&statuses, &tasks, &assignees),
    }))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (_, access) = access::sprint(&state.pool, auth.user_id, id).await?;
    access.require_manager()?;

    db::cascade::delete_sprint(&state.pool, id)
        .await
        .map_err(not_found_on_missing("Sprint"))?;

    Ok(Json(serde_json::json!({ "message": "Sprint deleted successfully" })))
}

pub async fn list_feedback(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<SprintFeedback>>, AppError> {
    access::sprint(&state.pool, auth.user_id, id).await?;
    let feedback = db::feedback::list_for_sprint(&state.pool, id).await?;
    Ok(Json(feedback))
}

#[derive(Deserialize)]
pub struct FeedbackRequest {
    pub feedback: Option<serde_json::Value>,
}

/// Feedback is stored without its author.
pub async fn create_feedback(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<FeedbackRequest>,
) -> Result<(StatusCode, Json<SprintFeedback>), AppError> {
    let feedback = match req.feedback {
        Some(value @ serde_json::Value::Object(_)) => value,
        _ => {
            return Err(AppError::BadRequest(
                "Feedback must be a JSON object".to_string(),
            ));
        }
    };
    let (_, access) = access::sprint(&state.pool, auth.user_id, id).await?;
    access.require_contributor()?;

    let entry = db::feedback::create(&state.pool, id, &feedback).await?;

    tracing::info!(sprint_id = %id, feedback_id = %entry.id, "sprint feedback recorded");
    Ok((StatusCode::CREATED, Json(entry)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub status_id: Option<Uuid>,
    #[serde(default)]
    pub assignees: Vec<Uuid>,
}

/// Without a status the task lands in the project's first To_Do column.
pub async fn create_task(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    let name = validate::required(req.name.as_deref(), "Task name")?;
    let priority = match req.priority.as_deref() {
        Some(p) => validate::parse::<Priority>(p)?,
        None => Priority::Medium,
    };

    let (sprint, access) = access::sprint(&state.pool, auth.user_id, id).await?;
    access.require_contributor()?;
    check_assignees(&state.pool, sprint.project_id, &req.assignees).await?;

    let status = match req.status_id {
        Some(status_id) => db::statuses::find_for_sprint(&state.pool, status_id, id)
            .await?
            .ok_or_else(|| {
                AppError::BadRequest("Status does not belong to this project".to_string())
            })?,
        None => db::statuses::first_of_type(&state.pool, sprint.project_id, StatusType::ToDo)
            .await?
            .ok_or_else(|| AppError::BadRequest("Project has no To_Do status".to_string()))?,
    };

    let new_task = NewTask {
        sprint_id: id,
        status_id: status.id,
        name,
        description: req.description.as_deref().map(str::trim).filter(|d| !d.is_empty()),
        priority,
    };

    let mut tx = state.pool.begin().await?;
    let task = db::tasks::create(&mut *tx, &new_task).await?;
    if !req.assignees.is_empty() {
        db::tasks::replace_assignees(&mut tx, task.id, &req.assignees).await?;
    }
    tx.commit().await?;

    tracing::info!(sprint_id = %id, task_id = %task.id, "task created");
    Ok((StatusCode::CREATED, Json(task)))
}
