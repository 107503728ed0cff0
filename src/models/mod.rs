pub mod comment;
pub mod feedback;
pub mod membership;
pub mod project;
pub mod sprint;
pub mod status;
pub mod task;
pub mod user;
pub mod workspace;

pub use comment::TaskComment;
pub use feedback::SprintFeedback;
pub use membership::{ProjectMember, ProjectRole, WorkspaceMember, WorkspaceRole};
pub use project::Project;
pub use sprint::Sprint;
pub use status::{Status, StatusType};
pub use task::{Priority, Task};
pub use user::{User, UserSummary};
pub use workspace::Workspace;
