use super::task::TaskId;

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("task title must not be empty")]
    EmptyTitle,
    #[error("task {0} not found")]
    NotFound(TaskId),
    #[error("no user is signed in")]
    NotSignedIn,
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

pub type TaskResult<T> = Result<T, TaskError>;
