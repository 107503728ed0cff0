//! Membership and role resolution.
//!
//! Handlers resolve the caller's role once, up front, into an explicit access
//! value and pass it to the checks below. A caller who is not a member of the
//! workspace gets the same 404 as for a missing entity.

use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::error::AppError;
use crate::models::{Project, ProjectRole, Sprint, Task, WorkspaceRole};

pub async fn workspace_role(
    pool: &PgPool,
    user_id: Uuid,
    workspace_id: Uuid,
) -> Result<Option<WorkspaceRole>, sqlx::Error> {
    db::workspace_members::find_role(pool, workspace_id, user_id).await
}

pub async fn project_role(
    pool: &PgPool,
    user_id: Uuid,
    project_id: Uuid,
) -> Result<Option<ProjectRole>, sqlx::Error> {
    db::project_members::find_role(pool, project_id, user_id).await
}

#[derive(Debug, Clone, Copy)]
pub struct WorkspaceAccess {
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub role: WorkspaceRole,
}

impl WorkspaceAccess {
    pub fn require_owner(&self, action: &str) -> Result<(), AppError> {
        if self.role == WorkspaceRole::Owner {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "You are not authorized to {action} this workspace"
            )))
        }
    }

    pub fn check_role_change(
        &self,
        target_user: Uuid,
        current: WorkspaceRole,
        new_role: WorkspaceRole,
    ) -> Result<(), AppError> {
        role_change_allowed(self.role, self.user_id == target_user, current, new_role)
            .map_err(|msg| AppError::Forbidden(msg.to_string()))
    }

    pub fn check_removal(&self, target_user: Uuid, target: WorkspaceRole) -> Result<(), AppError> {
        removal_allowed(self.role, self.user_id == target_user, target)
            .map_err(|msg| AppError::Forbidden(msg.to_string()))
    }
}

/// Owner or Admin may change another member's role. Only an Owner may touch
/// the Owner role, in either direction.
pub fn role_change_allowed(
    actor: WorkspaceRole,
    is_self: bool,
    current: WorkspaceRole,
    new_role: WorkspaceRole,
) -> Result<(), &'static str> {
    if !actor.is_owner_or_admin() {
        return Err("You do not have permission to change this role");
    }
    if is_self {
        return Err("You cannot change your own role");
    }
    if (current == WorkspaceRole::Owner || new_role == WorkspaceRole::Owner)
        && actor != WorkspaceRole::Owner
    {
        return Err("Only an owner can grant or revoke the owner role");
    }
    Ok(())
}

/// Owner or Admin may remove plain members; only an Owner removes an Admin;
/// Owners are never removed by someone else.
pub fn removal_allowed(
    actor: WorkspaceRole,
    is_self: bool,
    target: WorkspaceRole,
) -> Result<(), &'static str> {
    if is_self {
        return Err("Use leave to remove yourself from a workspace");
    }
    match (actor, target) {
        (_, WorkspaceRole::Owner) => Err("The workspace owner cannot be removed"),
        (WorkspaceRole::Owner, _) => Ok(()),
        (WorkspaceRole::Admin, WorkspaceRole::Member) => Ok(()),
        (WorkspaceRole::Admin, WorkspaceRole::Admin) => Err("Only an owner can remove an admin"),
        (WorkspaceRole::Member, _) => Err("You do not have permission to remove members"),
    }
}

pub async fn workspace(
    pool: &PgPool,
    user_id: Uuid,
    workspace_id: Uuid,
) -> Result<WorkspaceAccess, AppError> {
    let role = workspace_role(pool, user_id, workspace_id)
        .await?
        .ok_or_else(|| AppError::not_found("Workspace"))?;
    Ok(WorkspaceAccess {
        workspace_id,
        user_id,
        role,
    })
}

#[derive(Debug, Clone)]
pub struct ProjectAccess {
    pub project: Project,
    pub user_id: Uuid,
    pub role: Option<ProjectRole>,
    pub workspace_role: WorkspaceRole,
}

impl ProjectAccess {
    /// Project managers and workspace owners/admins.
    pub fn can_manage(&self) -> bool {
        self.role == Some(ProjectRole::ProjectManager) || self.workspace_role.is_owner_or_admin()
    }

    /// Anyone on the project, plus workspace owners/admins.
    pub fn can_contribute(&self) -> bool {
        self.role.is_some() || self.workspace_role.is_owner_or_admin()
    }

    pub fn require_manager(&self) -> Result<(), AppError> {
        if self.can_manage() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Project manager access required".to_string(),
            ))
        }
    }

    pub fn require_contributor(&self) -> Result<(), AppError> {
        if self.can_contribute() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "You are not a member of this project".to_string(),
            ))
        }
    }
}

pub async fn project(
    pool: &PgPool,
    user_id: Uuid,
    project_id: Uuid,
) -> Result<ProjectAccess, AppError> {
    let project = db::projects::find_by_id(pool, project_id)
        .await?
        .ok_or_else(|| AppError::not_found("Project"))?;
    let (workspace_role, role) = tokio::try_join!(
        workspace_role(pool, user_id, project.workspace_id),
        project_role(pool, user_id, project_id),
    )?;
    let workspace_role = workspace_role.ok_or_else(|| AppError::not_found("Project"))?;
    Ok(ProjectAccess {
        project,
        user_id,
        role,
        workspace_role,
    })
}

pub async fn sprint(
    pool: &PgPool,
    user_id: Uuid,
    sprint_id: Uuid,
) -> Result<(Sprint, ProjectAccess), AppError> {
    let sprint = db::sprints::find_by_id(pool, sprint_id)
        .await?
        .ok_or_else(|| AppError::not_found("Sprint"))?;
    let access = project(pool, user_id, sprint.project_id).await?;
    Ok((sprint, access))
}

pub async fn task(
    pool: &PgPool,
    user_id: Uuid,
    task_id: Uuid,
) -> Result<(Task, ProjectAccess), AppError> {
    let task = db::tasks::find_by_id(pool, task_id)
        .await?
        .ok_or_else(|| AppError::not_found("Task"))?;
    let (_, access) = sprint(pool, user_id, task.sprint_id).await?;
    Ok((task, access))
}
