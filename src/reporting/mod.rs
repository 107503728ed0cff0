//! Derived read models: status ordering, aggregate counts and the board /
//! overview shapes built from them.

pub mod aggregate;
pub mod board;
pub mod ordering;

pub use aggregate::{PriorityCounts, StatusCounts};
pub use ordering::StatusOrder;
