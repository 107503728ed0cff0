use crate::models::StatusType;

/// Column orderings over status types, one per kind of view.
///
/// Boards list finished work first and open work last; the status editor
/// and member listing follow the workflow from To_Do to Completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOrder {
    /// Completed, In_Progress, To_Do.
    Board,
    /// To_Do, In_Progress, Completed.
    Workflow,
}

impl StatusOrder {
    pub fn rank(self, status_type: StatusType) -> u8 {
        let board_rank = match status_type {
            StatusType::Completed => 0,
            StatusType::InProgress => 1,
            StatusType::ToDo => 2,
        };
        match self {
            StatusOrder::Board => board_rank,
            StatusOrder::Workflow => 2 - board_rank,
        }
    }

    /// Stable sort: items of the same type keep their incoming order.
    pub fn sort_by<T>(self, items: &mut [T], status_type: impl Fn(&T) -> StatusType) {
        items.sort_by_key(|item| self.rank(status_type(item)));
    }
}
