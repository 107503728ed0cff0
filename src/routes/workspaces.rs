use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use futures_util::future::try_join_all;
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access;
use crate::auth::extractor::AuthUser;
use crate::db;
use crate::db::analytics::WorkspaceAnalytics;
use crate::db::statuses::NewStatus;
use crate::db::workspace_members::WorkspaceMemberEntry;
use crate::db::workspaces::WorkspaceWithRole;
use crate::email::{self, templates, InviteReport};
use crate::error::{not_found_on_missing, AppError};
use crate::models::status::DEFAULT_STATUSES;
use crate::models::{Project, ProjectRole, StatusType, Workspace, WorkspaceRole};
use crate::reporting::board::{self, ProjectOverview};
use crate::state::SharedState;
use crate::validate;

const INVITE_CODE_LEN: usize = 7;
const INVITE_CODE_ATTEMPTS: usize = 5;

fn generate_invite_code() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(INVITE_CODE_LEN)
        .map(char::from)
        .collect()
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[derive(Deserialize)]
pub struct WorkspaceRequest {
    pub name: Option<String>,
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<WorkspaceWithRole>>, AppError> {
    let workspaces = db::workspaces::list_for_user(&state.pool, auth.user_id).await?;
    Ok(Json(workspaces))
}

/// The creator becomes the Owner. A colliding invite code is regenerated.
pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<WorkspaceRequest>,
) -> Result<(StatusCode, Json<Workspace>), AppError> {
    let name = validate::required(req.name.as_deref(), "Workspace name")?;

    for _ in 0..INVITE_CODE_ATTEMPTS {
        let code = generate_invite_code();
        let mut tx = state.pool.begin().await?;
        let workspace = match db::workspaces::create(&mut *tx, name, &code).await {
            Ok(workspace) => workspace,
            Err(e) if is_unique_violation(&e) => continue,
            Err(e) => return Err(e.into()),
        };
        db::workspace_members::add(&mut *tx, workspace.id, auth.user_id, WorkspaceRole::Owner)
            .await?;
        tx.commit().await?;

        tracing::info!(workspace_id = %workspace.id, user_id = %auth.user_id, "workspace created");
        return Ok((StatusCode::CREATED, Json(workspace)));
    }

    Err(AppError::Internal(
        "Could not generate a unique invite code".to_string(),
    ))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<WorkspaceRequest>,
) -> Result<Json<Workspace>, AppError> {
    let name = validate::required(req.name.as_deref(), "Workspace name")?;
    let access = access::workspace(&state.pool, auth.user_id, id).await?;
    access.require_owner("update")?;

    let workspace = db::workspaces::rename(&state.pool, id, name)
        .await
        .map_err(not_found_on_missing("Workspace"))?;

    tracing::info!(workspace_id = %id, "workspace renamed");
    Ok(Json(workspace))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let access = access::workspace(&state.pool, auth.user_id, id).await?;
    access.require_owner("delete")?;

    db::cascade::delete_workspace(&state.pool, id)
        .await
        .map_err(not_found_on_missing("Workspace"))?;

    Ok(Json(serde_json::json!({ "message": "Workspace deleted successfully" })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub invite_code: Option<String>,
}

pub async fn join(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<JoinRequest>,
) -> Result<(StatusCode, Json<Workspace>), AppError> {
    let code = validate::required(req.invite_code.as_deref(), "Invite code")?;

    let workspace = db::workspaces::find_by_invite_code(&state.pool, code)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid invite code".to_string()))?;

    db::workspace_members::add(&state.pool, workspace.id, auth.user_id, WorkspaceRole::Member)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("User already is part of the workspace".to_string())
            } else {
                AppError::Database(e)
            }
        })?;

    tracing::info!(workspace_id = %workspace.id, user_id = %auth.user_id, "joined workspace");
    Ok((StatusCode::CREATED, Json(workspace)))
}

pub async fn analytics(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<WorkspaceAnalytics>, AppError> {
    access::workspace(&state.pool, auth.user_id, id).await?;
    let analytics = db::analytics::workspace_analytics(&state.pool, id).await?;
    Ok(Json(analytics))
}

pub async fn members(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<WorkspaceMemberEntry>>, AppError> {
    access::workspace(&state.pool, auth.user_id, id).await?;
    let members = db::workspace_members::list(&state.pool, id).await?;
    Ok(Json(members))
}

#[derive(Deserialize)]
pub struct RoleRequest {
    pub role: Option<String>,
}

pub async fn update_member_role(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<RoleRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let role = validate::required(req.role.as_deref(), "Role")?;
    let new_role: WorkspaceRole = validate::parse(role)?;

    let access = access::workspace(&state.pool, auth.user_id, id).await?;
    let current = access::workspace_role(&state.pool, user_id, id)
        .await?
        .ok_or_else(|| AppError::not_found("Member"))?;
    access.check_role_change(user_id, current, new_role)?;

    db::workspace_members::update_role(&state.pool, id, user_id, new_role).await?;

    tracing::info!(workspace_id = %id, %user_id, role = %new_role, "workspace role changed");
    Ok(Json(serde_json::json!({ "message": "User role updated successfully" })))
}

pub async fn remove_member(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let access = access::workspace(&state.pool, auth.user_id, id).await?;
    let target = access::workspace_role(&state.pool, user_id, id)
        .await?
        .ok_or_else(|| AppError::not_found("Member"))?;
    access.check_removal(user_id, target)?;

    db::cascade::remove_workspace_member(&state.pool, id, user_id)
        .await
        .map_err(not_found_on_missing("Member"))?;

    Ok(Json(serde_json::json!({ "message": "Member removed successfully" })))
}

/// Removes only the caller's own memberships and assignments. The last
/// Owner has to hand over ownership first.
pub async fn leave(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let access = access::workspace(&state.pool, auth.user_id, id).await?;
    if access.role == WorkspaceRole::Owner
        && db::workspace_members::count_owners(&state.pool, id).await? <= 1
    {
        return Err(AppError::BadRequest(
            "Transfer ownership before leaving the workspace".to_string(),
        ));
    }

    db::cascade::remove_workspace_member(&state.pool, id, auth.user_id)
        .await
        .map_err(not_found_on_missing("Workspace"))?;

    Ok(Json(serde_json::json!({ "message": "Workspace left successfully" })))
}

#[derive(Deserialize)]
pub struct InviteRequest {
    #[serde(default)]
    pub emails: Vec<String>,
}

/// One mail per recipient. Succeeds when at least one invitation went out.
pub async fn invite(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<InviteRequest>,
) -> Result<Json<InviteReport>, AppError> {
    if req.emails.is_empty() {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }
    let recipients: Vec<String> = req.emails.iter().map(|e| e.trim().to_string()).collect();
    for address in &recipients {
        validate::email(address)?;
    }

    access::workspace(&state.pool, auth.user_id, id).await?;
    let workspace = db::workspaces::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Workspace"))?;

    let mailer = state
        .mailer
        .as_deref()
        .ok_or_else(|| AppError::Internal("Email service is not configured".to_string()))?;

    let html = templates::render_workspace_invite(
        &workspace.name,
        &workspace.invite_code,
        &state.config.client_url,
    );
    let report = email::send_invites(mailer, &recipients, "Workspace Invitation", &html).await;

    if report.sent.is_empty() {
        return Err(AppError::Internal(format!(
            "No invitation could be delivered for workspace {id}"
        )));
    }

    tracing::info!(
        workspace_id = %id,
        sent = report.sent.len(),
        failed = report.failed.len(),
        "workspace invitations sent"
    );
    Ok(Json(report))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectListing {
    #[serde(flatten)]
    pub overview: ProjectOverview,
    pub sprint_count: i64,
    pub role: ProjectRole,
}

/// Projects the caller belongs to, each with its task and member counts.
pub async fn list_projects(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ProjectListing>>, AppError> {
    access::workspace(&state.pool, auth.user_id, id).await?;
    let pool = &state.pool;
    let projects = db::projects::list_for_member(pool, id, auth.user_id).await?;

    let listings = try_join_all(projects.into_iter().map(|entry| async move {
        let (counts, priorities, members, sprint_count) = tokio::try_join!(
            db::analytics::project_status_counts(pool, entry.project.id, None),
            db::analytics::project_priority_counts(pool, entry.project.id),
            db::analytics::count_members(pool, entry.project.id),
            db::analytics::count_sprints(pool, entry.project.id),
        )?;
        Ok::<_, sqlx::Error>(ProjectListing {
            overview: board::project_overview(&entry.project, counts, priorities, members),
            sprint_count,
            role: entry.role,
        })
    }))
    .await?;

    Ok(Json(listings))
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub status_type: Option<String>,
    pub color: Option<String>,
}

impl StatusRequest {
    pub fn validate(&self) -> Result<NewStatus, AppError> {
        let name = validate::required(self.name.as_deref(), "Status name")?;
        let status_type: StatusType =
            validate::parse(validate::required(self.status_type.as_deref(), "Status type")?)?;
        let color = validate::required(self.color.as_deref(), "Status color")?;
        validate::color(color)?;
        Ok(NewStatus {
            name: name.to_string(),
            status_type,
            color: color.to_string(),
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub ideal_task_count: Option<i32>,
    #[serde(default)]
    pub statuses: Vec<StatusRequest>,
}

/// Project, its statuses and the creator's manager membership are written
/// together or not at all.
pub async fn create_project(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Project>), AppError> {
    let name = validate::required(req.name.as_deref(), "Project name")?;
    let start_date = req
        .start_date
        .ok_or_else(|| AppError::BadRequest("Start date is required".to_string()))?;
    let due_date = req
        .due_date
        .ok_or_else(|| AppError::BadRequest("Due date is required".to_string()))?;
    validate::date_range(start_date, due_date)?;
    if req.ideal_task_count.is_some_and(|n| n < 1) {
        return Err(AppError::BadRequest(
            "Ideal task count must be positive".to_string(),
        ));
    }

    let statuses = if req.statuses.is_empty() {
        DEFAULT_STATUSES
            .iter()
            .map(|(name, status_type, color)| NewStatus {
                name: name.to_string(),
                status_type: *status_type,
                color: color.to_string(),
            })
            .collect()
    } else {
        req.statuses
            .iter()
            .map(StatusRequest::validate)
            .collect::<Result<Vec<_>, _>>()?
    };

    access::workspace(&state.pool, auth.user_id, id).await?;

    let mut tx = state.pool.begin().await?;
    let project = db::projects::create(
        &mut *tx,
        id,
        name,
        start_date,
        due_date,
        req.ideal_task_count,
    )
    .await?;
    for status in &statuses {
        db::statuses::create(&mut *tx, project.id, status).await?;
    }
    let manager =
        db::project_members::add(&mut *tx, project.id, auth.user_id, ProjectRole::ProjectManager)
            .await?;
    tx.commit().await?;

    tracing::info!(
        workspace_id = %id,
        project_id = %project.id,
        manager = %manager.user_id,
        statuses = statuses.len(),
        "project created"
    );
    Ok((StatusCode::CREATED, Json(project)))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrospectiveSprintEntry {
    pub id: Uuid,
    pub name: String,
    pub end_date: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrospectiveProject {
    pub project_id: Uuid,
    pub project_name: String,
    pub role: ProjectRole,
    pub sprints: Vec<RetrospectiveSprintEntry>,
}

/// The caller's projects with their sprints, for picking a retrospective.
pub async fn retrospectives(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<RetrospectiveProject>>, AppError> {
    access::workspace(&state.pool, auth.user_id, id).await?;
    let rows = db::sprints::list_for_member(&state.pool, id, auth.user_id).await?;

    let mut projects: Vec<RetrospectiveProject> = Vec::new();
    for row in rows {
        if projects.last().is_none_or(|last| last.project_id != row.project_id) {
            projects.push(RetrospectiveProject {
                project_id: row.project_id,
                project_name: row.project_name,
                role: row.role,
                sprints: Vec::new(),
            });
        }
        let (Some(id), Some(name), Some(end_date)) = (row.id, row.name, row.end_date) else {
            continue;
        };
        if let Some(last) = projects.last_mut() {
            last.sprints.push(RetrospectiveSprintEntry { id, name, end_date });
        }
    }

    Ok(Json(projects))
}
