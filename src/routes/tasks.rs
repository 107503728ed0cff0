use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::access;
use crate::auth::extractor::AuthUser;
use crate::db;
use crate::db::comments::CommentEntry;
use crate::db::tasks::TaskChanges;
use crate::error::{not_found_on_missing, AppError};
use crate::models::{Priority, Task, TaskComment, UserSummary};
use crate::reporting::aggregate::bug_total;
use crate::reporting::board::index_assignees;
use crate::state::SharedState;
use crate::validate;

/// Every assignee has to be a member of the project.
pub(crate) async fn check_assignees(
    pool: &PgPool,
    project_id: Uuid,
    user_ids: &[Uuid],
) -> Result<(), AppError> {
    if user_ids.is_empty() {
        return Ok(());
    }
    let members = db::project_members::filter_members(pool, project_id, user_ids).await?;
    match user_ids.iter().find(|u| !members.contains(*u)) {
        Some(outsider) => Err(AppError::BadRequest(format!(
            "User {outsider} is not a member of this project"
        ))),
        None => Ok(()),
    }
}

async fn load_assignees(pool: &PgPool, task_id: Uuid) -> Result<Vec<UserSummary>, sqlx::Error> {
    let rows = db::tasks::assignees_for_task(pool, task_id).await?;
    Ok(index_assignees(rows).remove(&task_id).unwrap_or_default())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetails {
    #[serde(flatten)]
    pub task: Task,
    pub bug_count: i64,
    pub assignees: Vec<UserSummary>,
}

impl TaskDetails {
    fn new(task: Task, assignees: Vec<UserSummary>) -> Self {
        Self {
            bug_count: bug_total(&task),
            task,
            assignees,
        }
    }
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TaskDetails>, AppError> {
    let (task, _) = access::task(&state.pool, auth.user_id, id).await?;
    let assignees = load_assignees(&state.pool, id).await?;
    Ok(Json(TaskDetails::new(task, assignees)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub status_id: Option<Uuid>,
    pub frontend_bug_count: Option<i32>,
    pub backend_bug_count: Option<i32>,
    pub database_bug_count: Option<i32>,
}

/// Partial update; absent fields keep their value.
pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<TaskDetails>, AppError> {
    let name = match req.name.as_deref() {
        Some(name) => Some(validate::required(Some(name), "Task name")?),
        None => None,
    };
    let priority = req
        .priority
        .as_deref()
        .map(validate::parse::<Priority>)
        .transpose()?;
    validate::bug_count(req.frontend_bug_count, "Frontend bug count")?;
    validate::bug_count(req.backend_bug_count, "Backend bug count")?;
    validate::bug_count(req.database_bug_count, "Database bug count")?;

    let (task, access) = access::task(&state.pool, auth.user_id, id).await?;
    access.require_contributor()?;

    if let Some(status_id) = req.status_id {
        db::statuses::find_for_sprint(&state.pool, status_id, task.sprint_id)
            .await?
            .ok_or_else(|| {
                AppError::BadRequest("Status does not belong to this project".to_string())
            })?;
    }

    let changes = TaskChanges {
        name,
        description: req.description.as_deref().map(str::trim),
        priority,
        status_id: req.status_id,
        frontend_bug_count: req.frontend_bug_count,
        backend_bug_count: req.backend_bug_count,
        database_bug_count: req.database_bug_count,
    };
    let task = db::tasks::update(&state.pool, id, &changes)
        .await
        .map_err(not_found_on_missing("Task"))?;
    let assignees = load_assignees(&state.pool, id).await?;

    tracing::info!(task_id = %id, "task updated");
    Ok(Json(TaskDetails::new(task, assignees)))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (_, access) = access::task(&state.pool, auth.user_id, id).await?;
    access.require_contributor()?;

    db::cascade::delete_task(&state.pool, id)
        .await
        .map_err(not_found_on_missing("Task"))?;

    Ok(Json(serde_json::json!({ "message": "Task deleted successfully" })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssigneesRequest {
    #[serde(default)]
    pub user_ids: Vec<Uuid>,
}

/// Replaces the whole assignee set; an empty list unassigns everyone.
pub async fn replace_assignees(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AssigneesRequest>,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    let (_, access) = access::task(&state.pool, auth.user_id, id).await?;
    access.require_contributor()?;
    check_assignees(&state.pool, access.project.id, &req.user_ids).await?;

    let mut tx = state.pool.begin().await?;
    db::tasks::replace_assignees(&mut tx, id, &req.user_ids).await?;
    tx.commit().await?;

    tracing::info!(task_id = %id, assignees = req.user_ids.len(), "task assignees replaced");
    let assignees = load_assignees(&state.pool, id).await?;
    Ok(Json(assignees))
}

pub async fn list_comments(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<CommentEntry>>, AppError> {
    access::task(&state.pool, auth.user_id, id).await?;
    let comments = db::comments::list_for_task(&state.pool, id).await?;
    Ok(Json(comments))
}

#[derive(Deserialize)]
pub struct CommentRequest {
    pub body: Option<String>,
}

pub async fn create_comment(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CommentRequest>,
) -> Result<(StatusCode, Json<TaskComment>), AppError> {
    let body = validate::required(req.body.as_deref(), "Comment")?;
    let (_, access) = access::task(&state.pool, auth.user_id, id).await?;
    access.require_contributor()?;

    let comment = db::comments::create(&state.pool, id, auth.user_id, body).await?;

    tracing::info!(task_id = %id, comment_id = %comment.id, "comment added");
    Ok((StatusCode::CREATED, Json(comment)))
}
