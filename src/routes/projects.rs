use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access;
use crate::auth::extractor::AuthUser;
use crate::db;
use crate::db::project_members::ProjectMemberEntry;
use crate::db::projects::ProjectChanges;
use crate::error::{not_found_on_missing, AppError};
use crate::models::{Project, ProjectRole, Sprint, Status, UserSummary};
use crate::reporting::board::{self, ProjectOverview, SprintBoard};
use crate::reporting::StatusOrder;
use crate::routes::workspaces::StatusRequest;
use crate::state::SharedState;
use crate::validate;

#[derive(Serialize)]
pub struct ProjectDetails {
    pub project: ProjectOverview,
    pub sprints: Vec<SprintBoard>,
}

/// Overview counts plus a board for every sprint of the project.
pub async fn details(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectDetails>, AppError> {
    let access = access::project(&state.pool, auth.user_id, id).await?;
    let pool = &state.pool;

    let (counts, priorities, members, statuses, sprints, tasks, assignees) = tokio::try_join!(
        db::analytics::project_status_counts(pool, id, None),
        db::analytics::project_priority_counts(pool, id),
        db::analytics::count_members(pool, id),
        db::statuses::list_for_project(pool, id),
        db::sprints::list_for_project(pool, id),
        db::tasks::list_for_project(pool, id),
        db::tasks::assignees_for_project(pool, id),
    )?;

    let assignees = board::index_assignees(assignees);
    Ok(Json(ProjectDetails {
        project: board::project_overview(&access.project, counts, priorities, members),
        sprints: board::sprint_boards(&statuses, &sprints, &tasks, &assignees),
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub ideal_task_count: Option<i32>,
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProjectRequest>,
) -> Result<Json<Project>, AppError> {
    let access = access::project(&state.pool, auth.user_id, id).await?;
    access.require_manager()?;

    let name = match req.name.as_deref() {
        Some(name) => Some(validate::required(Some(name), "Project name")?),
        None => None,
    };
    // The resulting range must hold even when only one end moves.
    validate::date_range(
        req.start_date.unwrap_or(access.project.start_date),
        req.due_date.unwrap_or(access.project.due_date),
    )?;
    if req.ideal_task_count.is_some_and(|n| n < 1) {
        return Err(AppError::BadRequest(
            "Ideal task count must be positive".to_string(),
        ));
    }

    let changes = ProjectChanges {
        name,
        start_date: req.start_date,
        due_date: req.due_date,
        ideal_task_count: req.ideal_task_count,
    };
    let project = db::projects::update(&state.pool, id, &changes)
        .await
        .map_err(not_found_on_missing("Project"))?;

    tracing::info!(project_id = %id, "project updated");
    Ok(Json(project))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let access = access::project(&state.pool, auth.user_id, id).await?;
    access.require_manager()?;

    db::cascade::delete_project(&state.pool, id)
        .await
        .map_err(not_found_on_missing("Project"))?;

    Ok(Json(serde_json::json!({ "message": "Project deleted successfully" })))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStatuses {
    pub name: String,
    pub ideal_task_count: i32,
    pub statuses: Vec<Status>,
    pub members: Vec<UserSummary>,
}

/// Statuses in workflow order (To_Do first), for forms and pickers.
pub async fn statuses(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectStatuses>, AppError> {
    let access = access::project(&state.pool, auth.user_id, id).await?;
    let (mut statuses, members) = tokio::try_join!(
        db::statuses::list_for_project(&state.pool, id),
        db::project_members::list_users(&state.pool, id),
    )?;
    StatusOrder::Workflow.sort_by(&mut statuses, |s| s.status_type);

    Ok(Json(ProjectStatuses {
        name: access.project.name,
        ideal_task_count: access.project.ideal_task_count,
        statuses,
        members,
    }))
}

#[derive(Deserialize)]
pub struct StatusEdit {
    pub id: Option<Uuid>,
    #[serde(flatten)]
    pub status: StatusRequest,
}

#[derive(Deserialize)]
pub struct StatusEditRequest {
    #[serde(default)]
    pub statuses: Vec<StatusEdit>,
}

enum StatusChange {
    Create(db::statuses::NewStatus),
    Update(Uuid, db::statuses::NewStatus),
    Delete(Uuid),
}

impl StatusEdit {
    /// An entry with an id and a name updates, an id alone deletes, and a
    /// name alone creates.
    fn into_change(self) -> Result<StatusChange, AppError> {
        match (self.id, self.status.name.is_some()) {
            (Some(id), true) => Ok(StatusChange::Update(id, self.status.validate()?)),
            (Some(id), false) => Ok(StatusChange::Delete(id)),
            (None, true) => Ok(StatusChange::Create(self.status.validate()?)),
            (None, false) => Err(AppError::BadRequest(
                "Each status needs an id or a name".to_string(),
            )),
        }
    }
}

pub async fn edit_statuses(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusEditRequest>,
) -> Result<Json<Vec<Status>>, AppError> {
    let access = access::project(&state.pool, auth.user_id, id).await?;
    access.require_manager()?;

    let changes = req
        .statuses
        .into_iter()
        .map(StatusEdit::into_change)
        .collect::<Result<Vec<_>, _>>()?;

    let mut tx = state.pool.begin().await?;
    for change in &changes {
        let affected = match change {
            StatusChange::Create(status) => {
                db::statuses::create(&mut *tx, id, status).await?;
                1
            }
            StatusChange::Update(status_id, status) => {
                db::statuses::update(&mut *tx, id, *status_id, status).await?
            }
            StatusChange::Delete(status_id) => db::statuses::delete(&mut *tx, id, *status_id)
                .await
                .map_err(|e| match e {
                    sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                        AppError::Conflict("Status is still in use by tasks".to_string())
                    }
                    _ => AppError::Database(e),
                })?,
        };
        if affected == 0 {
            return Err(AppError::not_found("Status"));
        }
    }
    tx.commit().await?;

    tracing::info!(project_id = %id, changes = changes.len(), "statuses edited");

    let mut statuses = db::statuses::list_for_project(&state.pool, id).await?;
    StatusOrder::Workflow.sort_by(&mut statuses, |s| s.status_type);
    Ok(Json(statuses))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMembers {
    pub current_members: Vec<ProjectMemberEntry>,
    pub remaining_members: Vec<UserSummary>,
    pub user_role: Option<ProjectRole>,
}

pub async fn members(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectMembers>, AppError> {
    let access = access::project(&state.pool, auth.user_id, id).await?;
    let (current_members, remaining_members) = tokio::try_join!(
        db::project_members::list(&state.pool, id),
        db::project_members::list_candidates(&state.pool, id, access.project.workspace_id),
    )?;

    Ok(Json(ProjectMembers {
        current_members,
        remaining_members,
        user_role: access.role,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMembersRequest {
    #[serde(default)]
    pub user_ids: Vec<Uuid>,
}

/// Only members of the project's workspace can be added.
pub async fn add_members(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AddMembersRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if req.user_ids.is_empty() {
        return Err(AppError::BadRequest("No users selected".to_string()));
    }
    let access = access::project(&state.pool, auth.user_id, id).await?;
    access.require_manager()?;

    let eligible = db::workspace_members::filter_members(
        &state.pool,
        access.project.workspace_id,
        &req.user_ids,
    )
    .await?;
    if let Some(outsider) = req.user_ids.iter().find(|u| !eligible.contains(*u)) {
        return Err(AppError::BadRequest(format!(
            "User {outsider} is not a member of this workspace"
        )));
    }

    let added = db::project_members::add_members(&state.pool, id, &eligible).await?;

    tracing::info!(project_id = %id, added, "project members added");
    Ok(Json(serde_json::json!({ "added": added })))
}

#[derive(Deserialize)]
pub struct ProjectRoleRequest {
    pub role: Option<String>,
}

pub async fn update_member_role(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<ProjectRoleRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let role: ProjectRole = validate::parse(validate::required(req.role.as_deref(), "Role")?)?;
    let access = access::project(&state.pool, auth.user_id, id).await?;
    access.require_manager()?;

    if db::project_members::update_role(&state.pool, id, user_id, role).await? == 0 {
        return Err(AppError::not_found("Member"));
    }

    tracing::info!(project_id = %id, %user_id, %role, "project role changed");
    Ok(Json(serde_json::json!({ "message": "User role updated successfully" })))
}

pub async fn remove_member(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let access = access::project(&state.pool, auth.user_id, id).await?;
    access.require_manager()?;

    db::cascade::remove_project_member(&state.pool, id, user_id)
        .await
        .map_err(not_found_on_missing("Member"))?;

    Ok(Json(serde_json::json!({ "message": "Member removed successfully" })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSprintRequest {
    pub name: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

pub async fn create_sprint(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CreateSprintRequest>,
) -> Result<(StatusCode, Json<Sprint>), AppError> {
    let name = validate::required(req.name.as_deref(), "Sprint name")?;
    let (Some(start_date), Some(end_date)) = (req.start_date, req.end_date) else {
        return Err(AppError::BadRequest(
            "Start and end dates are required".to_string(),
        ));
    };
    validate::date_range(start_date, end_date)?;

    let access = access::project(&state.pool, auth.user_id, id).await?;
    access.require_manager()?;

    let sprint = db::sprints::create(&state.pool, id, name, start_date, end_date).await?;

    tracing::info!(project_id = %id, sprint_id = %sprint.id, "sprint created");
    Ok((StatusCode::CREATED, Json(sprint)))
}
