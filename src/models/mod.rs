pub mod task;
pub mod user;

pub use task::{Task, TaskInput, TaskListParams, TaskListQuery, TaskPatch, TaskSort};
pub use user::{User, UserInput, UserPatch};
