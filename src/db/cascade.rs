//! Cascading deletes.
//!
//! Each root entity has an ordered list of delete statements, deepest
//! dependents first. A whole list runs inside one transaction: if any
//! statement fails the transaction is dropped without commit and nothing is
//! removed. Foreign keys carry no `ON DELETE` actions, so a dependent that is
//! missing from a list makes the root delete fail instead of leaving orphans.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// A labelled delete statement. `$n` placeholders bind the ids passed to
/// [`run_steps`] in order.
type Step = (&'static str, &'static str);

const PROJECT_STEPS: &[Step] = &[
    (
        "task_comments",
        "DELETE FROM task_comments WHERE task_id IN (
            SELECT t.id FROM tasks t JOIN sprints s ON s.id = t.sprint_id WHERE s.project_id = $1)",
    ),
    (
        "task_assignments",
        "DELETE FROM task_assignments WHERE task_id IN (
            SELECT t.id FROM tasks t JOIN sprints s ON s.id = t.sprint_id WHERE s.project_id = $1)",
    ),
    (
        "tasks",
        "DELETE FROM tasks WHERE sprint_id IN (SELECT id FROM sprints WHERE project_id = $1)",
    ),
    (
        "sprint_feedback",
        "DELETE FROM sprint_feedback WHERE sprint_id IN (SELECT id FROM sprints WHERE project_id = $1)",
    ),
    ("sprints", "DELETE FROM sprints WHERE project_id = $1"),
    ("statuses", "DELETE FROM statuses WHERE project_id = $1"),
    ("project_members", "DELETE FROM project_members WHERE project_id = $1"),
    ("projects", "DELETE FROM projects WHERE id = $1"),
];

const WORKSPACE_STEPS: &[Step] = &[
    ("workspace_members", "DELETE FROM workspace_members WHERE workspace_id = $1"),
    ("workspaces", "DELETE FROM workspaces WHERE id = $1"),
];

const USER_STEPS: &[Step] = &[
    ("task_assignments", "DELETE FROM task_assignments WHERE user_id = $1"),
    (
        "task_comments",
        "UPDATE task_comments SET user_id = NULL WHERE user_id = $1",
    ),
    ("project_members", "DELETE FROM project_members WHERE user_id = $1"),
    ("workspace_members", "DELETE FROM workspace_members WHERE user_id = $1"),
    ("users", "DELETE FROM users WHERE id = $1"),
];

/// `$1` = workspace, `$2` = user. Only that user's rows are touched.
const WORKSPACE_MEMBER_STEPS: &[Step] = &[
    (
        "task_assignments",
        "DELETE FROM task_assignments ta
         USING tasks t, sprints s, projects p
         WHERE ta.task_id = t.id AND t.sprint_id = s.id AND s.project_id = p.id
           AND p.workspace_id = $1 AND ta.user_id = $2",
    ),
    (
        "project_members",
        "DELETE FROM project_members pm
         USING projects p
         WHERE pm.project_id = p.id AND p.workspace_id = $1 AND pm.user_id = $2",
    ),
    (
        "workspace_members",
        "DELETE FROM workspace_members WHERE workspace_id = $1 AND user_id = $2",
    ),
];

/// `$1` = project, `$2` = user.
const PROJECT_MEMBER_STEPS: &[Step] = &[
    (
        "task_assignments",
        "DELETE FROM task_assignments ta
         USING tasks t, sprints s
         WHERE ta.task_id = t.id AND t.sprint_id = s.id
           AND s.project_id = $1 AND ta.user_id = $2",
    ),
    (
        "project_members",
        "DELETE FROM project_members WHERE project_id = $1 AND user_id = $2",
    ),
];

const SPRINT_STEPS: &[Step] = &[
    (
        "task_comments",
        "DELETE FROM task_comments WHERE task_id IN (SELECT id FROM tasks WHERE sprint_id = $1)",
    ),
    (
        "task_assignments",
        "DELETE FROM task_assignments WHERE task_id IN (SELECT id FROM tasks WHERE sprint_id = $1)",
    ),
    ("tasks", "DELETE FROM tasks WHERE sprint_id = $1"),
    ("sprint_feedback", "DELETE FROM sprint_feedback WHERE sprint_id = $1"),
    ("sprints", "DELETE FROM sprints WHERE id = $1"),
];

const TASK_STEPS: &[Step] = &[
    ("task_comments", "DELETE FROM task_comments WHERE task_id = $1"),
    ("task_assignments", "DELETE FROM task_assignments WHERE task_id = $1"),
    ("tasks", "DELETE FROM tasks WHERE id = $1"),
];

/// Run `steps` in order and return the row count of the last one (the root).
/// A root count of zero means the entity did not exist and is reported as
/// `RowNotFound`, which also rolls back the dependents removed before it.
async fn run_steps(
    conn: &mut PgConnection,
    steps: &[Step],
    ids: &[Uuid],
) -> Result<u64, sqlx::Error> {
    let mut last = 0;
    for (label, sql) in steps {
        let mut query = sqlx::query(sql);
        for id in ids {
            query = query.bind(*id);
        }
        last = query.execute(&mut *conn).await?.rows_affected();
        tracing::debug!(step = *label, rows = last, "cascade step");
    }
    if last == 0 {
        return Err(sqlx::Error::RowNotFound);
    }
    Ok(last)
}

async fn purge_project(conn: &mut PgConnection, project_id: Uuid) -> Result<(), sqlx::Error> {
    run_steps(conn, PROJECT_STEPS, &[project_id]).await?;
    Ok(())
}

pub async fn delete_project(pool: &PgPool, project_id: Uuid) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    purge_project(&mut tx, project_id).await?;
    tx.commit().await?;
    tracing::info!(%project_id, "project deleted");
    Ok(())
}

/// Every project of the workspace goes through the full project cascade
/// before the workspace itself is removed.
pub async fn delete_workspace(pool: &PgPool, workspace_id: Uuid) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    let project_ids = crate::db::projects::ids_in_workspace(&mut *tx, workspace_id).await?;
    for project_id in &project_ids {
        purge_project(&mut tx, *project_id).await?;
    }
    run_steps(&mut tx, WORKSPACE_STEPS, &[workspace_id]).await?;
    tx.commit().await?;
    tracing::info!(%workspace_id, projects = project_ids.len(), "workspace deleted");
    Ok(())
}

/// Removes the account and every membership and assignment of it. Tasks,
/// projects and workspaces stay; authored comments lose their author.
pub async fn delete_user(pool: &PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    run_steps(&mut tx, USER_STEPS, &[user_id]).await?;
    tx.commit().await?;
    tracing::info!(%user_id, "user deleted");
    Ok(())
}

/// Used both for leaving a workspace and for removing another member.
pub async fn remove_workspace_member(
    pool: &PgPool,
    workspace_id: Uuid,
    user_id: Uuid,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    run_steps(&mut tx, WORKSPACE_MEMBER_STEPS, &[workspace_id, user_id]).await?;
    tx.commit().await?;
    tracing::info!(%workspace_id, %user_id, "workspace member removed");
    Ok(())
}

pub async fn remove_project_member(
    pool: &PgPool,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    run_steps(&mut tx, PROJECT_MEMBER_STEPS, &[project_id, user_id]).await?;
    tx.commit().await?;
    tracing::info!(%project_id, %user_id, "project member removed");
    Ok(())
}

pub async fn delete_sprint(pool: &PgPool, sprint_id: Uuid) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    run_steps(&mut tx, SPRINT_STEPS, &[sprint_id]).await?;
    tx.commit().await?;
    tracing::info!(%sprint_id, "sprint deleted");
    Ok(())
}

pub async fn delete_task(pool: &PgPool, task_id: Uuid) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    run_steps(&mut tx, TASK_STEPS, &[task_id]).await?;
    tx.commit().await?;
    tracing::info!(%task_id, "task deleted");
    Ok(())
}
