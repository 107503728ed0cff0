pub mod auth;
pub mod projects;
pub mod sprints;
pub mod tasks;
pub mod users;
pub mod workspaces;

use axum::routing::{get, post, put};
use axum::Router;

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Auth
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
        // Users
        .route(
            "/api/v1/users/me",
            get(users::me)
                .put(users::update_profile)
                .delete(users::delete_account),
        )
        .route(
            "/api/v1/projects/{id}/users/{user_id}/analytics",
            get(users::analytics),
        )
        // Workspaces
        .route(
            "/api/v1/workspaces",
            get(workspaces::list).post(workspaces::create),
        )
        .route("/api/v1/workspaces/join", post(workspaces::join))
        .route(
            "/api/v1/workspaces/{id}",
            put(workspaces::update).delete(workspaces::delete),
        )
        .route("/api/v1/workspaces/{id}/analytics", get(workspaces::analytics))
        .route("/api/v1/workspaces/{id}/members", get(workspaces::members))
        .route(
            "/api/v1/workspaces/{id}/members/{user_id}",
            put(workspaces::update_member_role).delete(workspaces::remove_member),
        )
        .route("/api/v1/workspaces/{id}/leave", post(workspaces::leave))
        .route("/api/v1/workspaces/{id}/invites", post(workspaces::invite))
        .route(
            "/api/v1/workspaces/{id}/projects",
            get(workspaces::list_projects).post(workspaces::create_project),
        )
        .route(
            "/api/v1/workspaces/{id}/retrospectives",
            get(workspaces::retrospectives),
        )
        // Projects
        .route(
            "/api/v1/projects/{id}",
            get(projects::details)
                .put(projects::update)
                .delete(projects::delete),
        )
        .route(
            "/api/v1/projects/{id}/statuses",
            get(projects::statuses).put(projects::edit_statuses),
        )
        .route(
            "/api/v1/projects/{id}/members",
            get(projects::members).post(projects::add_members),
        )
        .route(
            "/api/v1/projects/{id}/members/{user_id}",
            put(projects::update_member_role).delete(projects::remove_member),
        )
        .route("/api/v1/projects/{id}/sprints", post(projects::create_sprint))
        // Sprints
        .route(
            "/api/v1/sprints/{id}",
            get(sprints::board).delete(sprints::delete),
        )
        .route(
            "/api/v1/sprints/{id}/feedback",
            get(sprints::list_feedback).post(sprints::create_feedback),
        )
        .route("/api/v1/sprints/{id}/tasks", post(sprints::create_task))
        // Tasks
        .route(
            "/api/v1/tasks/{id}",
            get(tasks::get).put(tasks::update).delete(tasks::delete),
        )
        .route("/api/v1/tasks/{id}/assignees", put(tasks::replace_assignees))
        .route(
            "/api/v1/tasks/{id}/comments",
            get(tasks::list_comments).post(tasks::create_comment),
        )
}
