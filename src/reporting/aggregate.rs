use crate::models::Task;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub to_do: i64,
    pub in_progress: i64,
    pub completed: i64,
}

impl StatusCounts {
    pub fn total(&self) -> i64 {
        self.to_do + self.in_progress + self.completed
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriorityCounts {
    pub low: i64,
    pub medium: i64,
    pub high: i64,
}

/// Frontend + backend + database bugs of one task.
pub fn bug_total(task: &Task) -> i64 {
    i64::from(task.frontend_bug_count)
        + i64::from(task.backend_bug_count)
        + i64::from(task.database_bug_count)
}
