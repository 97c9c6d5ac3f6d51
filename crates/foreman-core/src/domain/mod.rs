//! Domain model (IDs, task records, states, completion results, error kinds).

pub mod completion;
pub mod counts;
pub mod errors;
pub mod ids;
pub mod state;
pub mod task;

pub use completion::Completion;
pub use counts::TaskCounts;
pub use errors::ErrorKind;
pub use ids::{ContentRef, TaskId};
pub use state::TaskState;
pub use task::Task;
