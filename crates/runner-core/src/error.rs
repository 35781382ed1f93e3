use crate::status::TaskStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Default task template is invalid: {0}")]
    TemplateInvalid(String),

    #[error("Task template is missing '{0}'")]
    TemplateShape(String),

    #[error("Invalid task count: {0}")]
    InvalidCount(String),

    #[error("ECS API call failed: {0}")]
    Provider(String),

    #[error("RunTask rejected by ECS: {0}")]
    Rejected(String),

    #[error("Task stopped while waiting for 'RUNNING' (observed statuses: {})", join_statuses(.statuses))]
    TaskStopped { statuses: Vec<TaskStatus> },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn join_statuses(statuses: &[TaskStatus]) -> String {
    statuses
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
