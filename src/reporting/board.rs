use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::aggregate::{bug_total, PriorityCounts, StatusCounts};
use super::ordering::StatusOrder;
use crate::models::{Priority, Project, Sprint, Status, StatusType, Task, UserSummary};

/// One assignee joined to the task it is assigned to.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AssigneeRow {
    pub task_id: Uuid,
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub image_url: Option<String>,
    pub avatar_color: String,
}

pub type AssigneeIndex = HashMap<Uuid, Vec<UserSummary>>;

/// Group assignee rows by task, preserving row order within each task.
pub fn index_assignees(rows: Vec<AssigneeRow>) -> AssigneeIndex {
    let mut index: AssigneeIndex = HashMap::new();
    for row in rows {
        index.entry(row.task_id).or_default().push(UserSummary {
            id: row.id,
            username: row.username,
            email: row.email,
            image_url: row.image_url,
            avatar_color: row.avatar_color,
        });
    }
    index
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCard {
    pub id: Uuid,
    pub name: String,
    pub assignees: Vec<UserSummary>,
    pub bug_count: i64,
    pub priority: Priority,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusColumn {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub status_type: StatusType,
    pub color: String,
    pub tasks: Vec<TaskCard>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintBoard {
    pub id: Uuid,
    pub name: String,
    pub task_status: Vec<StatusColumn>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectOverview {
    pub id: Uuid,
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub to_do: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub tasks: i64,
    pub high_priority: i64,
    pub medium_priority: i64,
    pub low_priority: i64,
    pub members: i64,
}

pub fn project_overview(
    project: &Project,
    counts: StatusCounts,
    priorities: PriorityCounts,
    members: i64,
) -> ProjectOverview {
    ProjectOverview {
        id: project.id,
        name: project.name.clone(),
        start_date: project.start_date,
        due_date: project.due_date,
        updated_at: project.updated_at,
        to_do: counts.to_do,
        in_progress: counts.in_progress,
        completed: counts.completed,
        tasks: counts.total(),
        high_priority: priorities.high,
        medium_priority: priorities.medium,
        low_priority: priorities.low,
        members,
    }
}

fn task_card(task: &Task, assignees: &AssigneeIndex) -> TaskCard {
    TaskCard {
        id: task.id,
        name: task.name.clone(),
        assignees: assignees.get(&task.id).cloned().unwrap_or_default(),
        bug_count: bug_total(task),
        priority: task.priority,
    }
}

/// Every project status becomes a column, even when no task sits in it.
/// Columns are ordered with [`StatusOrder::Board`]; tasks keep their
/// incoming order.
pub fn status_columns<'a>(
    statuses: &[Status],
    tasks: impl IntoIterator<Item = &'a Task> + Clone,
    assignees: &AssigneeIndex,
) -> Vec<StatusColumn> {
    let mut columns: Vec<StatusColumn> = statuses
        .iter()
        .map(|status| StatusColumn {
            id: status.id,
            name: status.name.clone(),
            status_type: status.status_type,
            color: status.color.clone(),
            tasks: tasks
                .clone()
                .into_iter()
                .filter(|task| task.status_id == status.id)
                .map(|task| task_card(task, assignees))
                .collect(),
        })
        .collect();
    StatusOrder::Board.sort_by(&mut columns, |c| c.status_type);
    columns
}

/// One board per sprint, in the order the sprints are given.
pub fn sprint_boards(
    statuses: &[Status],
    sprints: &[Sprint],
    tasks: &[Task],
    assignees: &AssigneeIndex,
) -> Vec<SprintBoard> {
    sprints
        .iter()
        .map(|sprint| SprintBoard {
            id: sprint.id,
            name: sprint.name.clone(),
            task_status: status_columns(
                statuses,
                tasks.iter().filter(|t| t.sprint_id == sprint.id),
                assignees,
            ),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::aggregate::fixtures::{status, task};
    use super::*;

    fn sprint(project_id: Uuid, name: &str) -> Sprint {
        Sprint {
            id: Uuid::now_v7(),
            project_id,
            name: name.to_string(),
            start_date: Utc::now(),
            end_date: Utc::now(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn empty_statuses_still_get_a_column() {
        let project = Uuid::now_v7();
        let s1 = sprint(project, "Sprint 1");
        let todo = status(project, "To Do", StatusType::ToDo);
        let doing = status(project, "Doing", StatusType::InProgress);
        let done = status(project, "Done", StatusType::Completed);
        let tasks = vec![task(s1.id, &todo, (0, 0, 0))];

        let boards = sprint_boards(
            &[todo, doing, done],
            &[s1],
            &tasks,
            &AssigneeIndex::new(),
        );
        assert_eq!(boards.len(), 1);
        let columns = &boards[0].task_status;
        let names: Vec<_> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Done", "Doing", "To Do"]);
        assert!(columns[0].tasks.is_empty());
        assert!(columns[1].tasks.is_empty());
        assert_eq!(columns[2].tasks.len(), 1);
        assert!(columns[2].tasks[0].assignees.is_empty());
    }

    #[test]
    fn tasks_are_split_by_sprint_and_carry_bug_totals() {
        let project = Uuid::now_v7();
        let s1 = sprint(project, "Sprint 1");
        let s2 = sprint(project, "Sprint 2");
        let todo = status(project, "To Do", StatusType::ToDo);
        let t1 = task(s1.id, &todo, (1, 2, 3));
        let t2 = task(s2.id, &todo, (0, 0, 0));

        let user = UserSummary {
            id: Uuid::now_v7(),
            username: "alice".to_string(),
            email: "alice@test.com".to_string(),
            image_url: None,
            avatar_color: "#ff0000".to_string(),
        };
        let assignees = index_assignees(vec![AssigneeRow {
            task_id: t1.id,
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            image_url: None,
            avatar_color: user.avatar_color.clone(),
        }]);

        let boards = sprint_boards(&[todo], &[s1, s2], &[t1.clone(), t2.clone()], &assignees);
        let first = &boards[0].task_status[0].tasks;
        let second = &boards[1].task_status[0].tasks;
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].id, t1.id);
        assert_eq!(first[0].bug_count, 6);
        assert_eq!(first[0].assignees, vec![user]);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, t2.id);
    }

    #[test]
    fn assignee_json_hides_credentials() {
        let card = TaskCard {
            id: Uuid::now_v7(),
            name: "x".to_string(),
            assignees: vec![UserSummary {
                id: Uuid::now_v7(),
                username: "bob".to_string(),
                email: "bob@test.com".to_string(),
                image_url: Some("https://img.test/bob.png".to_string()),
                avatar_color: "#00ff00".to_string(),
            }],
            bug_count: 0,
            priority: Priority::High,
        };
        let json = serde_json::to_value(&card).unwrap();
        let assignee = &json["assignees"][0];
        assert_eq!(assignee["image"], "https://img.test/bob.png");
        assert_eq!(assignee["avatarColor"], "#00ff00");
        assert!(assignee.get("passwordHash").is_none());
        assert_eq!(json["bugCount"], 0);
    }

    #[test]
    fn overview_total_is_sum_of_types() {
        let project = Project {
            id: Uuid::now_v7(),
            workspace_id: Uuid::now_v7(),
            name: "P".to_string(),
            start_date: Utc::now(),
            due_date: Utc::now(),
            ideal_task_count: 10,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let overview = project_overview(
            &project,
            StatusCounts { to_do: 2, in_progress: 2, completed: 1 },
            PriorityCounts { low: 1, medium: 3, high: 1 },
            4,
        );
        assert_eq!(overview.tasks, 5);
        assert_eq!(overview.high_priority, 1);
        assert_eq!(overview.members, 4);
    }
}
