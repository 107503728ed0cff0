pub mod analytics;
pub mod cascade;
pub mod comments;
pub mod feedback;
pub mod project_members;
pub mod projects;
pub mod sprints;
pub mod statuses;
pub mod tasks;
pub mod users;
pub mod workspace_members;
pub mod workspaces;
