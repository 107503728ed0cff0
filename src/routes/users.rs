use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access;
use crate::auth::extractor::AuthUser;
use crate::auth::password::{self, MIN_PASSWORD_LEN};
use crate::db;
use crate::db::users::ProfileChanges;
use crate::error::{conflict_on_unique, AppError};
use crate::models::{ProjectRole, UserSummary};
use crate::state::SharedState;
use crate::upload::{self, ProfileForm};
use crate::validate;

#[derive(Deserialize)]
struct ProfileJson {
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

pub async fn me(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<UserSummary>, AppError> {
    let user = db::users::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;
    Ok(Json(UserSummary::from(&user)))
}

/// Accepts `multipart/form-data` (with an optional `image` file) or JSON.
pub async fn update_profile(
    auth: AuthUser,
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UserSummary>, AppError> {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let form = if content_type.contains("multipart/form-data") {
        upload::parse_profile_form(&headers, body)
            .await
            .map_err(AppError::BadRequest)?
    } else {
        let json: ProfileJson = serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid JSON: {e}")))?;
        ProfileForm {
            username: json.username.filter(|v| !v.trim().is_empty()),
            email: json.email.filter(|v| !v.trim().is_empty()),
            password: json.password.filter(|v| !v.is_empty()),
            image: None,
        }
    };

    if let Some(email) = form.email.as_deref() {
        validate::email(email.trim())?;
    }

    let password_hash = match form.password.as_deref() {
        Some(pw) if pw.len() < MIN_PASSWORD_LEN => {
            return Err(AppError::BadRequest(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        Some(pw) => Some(password::hash(pw).map_err(AppError::Internal)?),
        None => None,
    };

    // A failed upload keeps the current image; the rest of the update proceeds.
    let image_url = match (form.image, state.uploader.as_ref()) {
        (Some((filename, data)), Some(uploader)) => match uploader.upload(data, &filename).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(user_id = %auth.user_id, "{e}");
                None
            }
        },
        (Some(_), None) => {
            tracing::warn!("Image upload requested but no upload service is configured");
            None
        }
        (None, _) => None,
    };

    let changes = ProfileChanges {
        username: form.username.as_deref().map(str::trim),
        email: form.email.as_deref().map(str::trim),
        password_hash: password_hash.as_deref(),
        image_url: image_url.as_deref(),
    };

    let user = db::users::update_profile(&state.pool, auth.user_id, &changes)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => AppError::not_found("User"),
            e => conflict_on_unique("A user with this email or username already exists")(e),
        })?;

    tracing::info!(user_id = %user.id, "profile updated");
    Ok(Json(UserSummary::from(&user)))
}

pub async fn delete_account(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let sole_owned =
        db::workspace_members::sole_owned_workspaces(&state.pool, auth.user_id).await?;
    if !sole_owned.is_empty() {
        tracing::warn!(
            user_id = %auth.user_id,
            workspaces = sole_owned.len(),
            "account deletion blocked by ownership"
        );
        return Err(AppError::BadRequest(
            "Transfer ownership of your workspaces before deleting the account".to_string(),
        ));
    }

    db::cascade::delete_user(&state.pool, auth.user_id)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => AppError::not_found("User"),
            e => AppError::Database(e),
        })?;

    Ok(Json(serde_json::json!({
        "message": "Account and all associated data deleted successfully"
    })))
}

#[derive(Deserialize)]
pub struct AnalyticsQuery {
    pub sprint_id: Option<Uuid>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTaskStats {
    pub total: i64,
    pub completed: i64,
    pub in_progress: i64,
    pub todo: i64,
    pub bugs: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAnalytics {
    #[serde(flatten)]
    pub user: UserSummary,
    pub role: Option<ProjectRole>,
    pub sprint_count: i64,
    pub ideal_task_count: i32,
    pub tasks: UserTaskStats,
    pub sprints: Vec<SprintRef>,
}

pub async fn analytics(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path((project_id, user_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let access = access::project(&state.pool, auth.user_id, project_id).await?;
    let pool = &state.pool;

    if let Some(sprint_id) = query.sprint_id {
        let sprint = db::sprints::find_by_id(pool, sprint_id).await?;
        if sprint.is_none_or(|s| s.project_id != project_id) {
            return Err(AppError::not_found("Sprint"));
        }
    }

    let user = db::users::find_by_id(pool, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    let (role, sprints, counts, total, task_ids) = tokio::try_join!(
        access::project_role(pool, user_id, project_id),
        db::sprints::list_for_project(pool, project_id),
        db::analytics::user_status_counts(pool, project_id, user_id, query.sprint_id),
        db::analytics::count_tasks_for_user(pool, project_id, user_id, query.sprint_id),
        db::analytics::assigned_task_ids(pool, project_id, user_id, query.sprint_id),
    )?;
    let bugs = db::analytics::sum_bug_counts(pool, &task_ids).await?;

    let details = UserAnalytics {
        user: UserSummary::from(&user),
        role,
        sprint_count: sprints.len() as i64,
        ideal_task_count: access.project.ideal_task_count,
        tasks: UserTaskStats {
            total,
            completed: counts.completed,
            in_progress: counts.in_progress,
            todo: counts.to_do,
            bugs,
        },
        sprints: sprints
            .into_iter()
            .map(|s| SprintRef { id: s.id, name: s.name })
            .collect(),
    };

    Ok(Json(serde_json::json!({ "details": details })))
}
