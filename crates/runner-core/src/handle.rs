use serde::{Deserialize, Serialize};
use std::fmt;

/// Task ARN returned by RunTask for each launched task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TaskHandle(pub String);

impl TaskHandle {
    pub fn new(arn: impl Into<String>) -> Self {
        Self(arn.into())
    }

    pub fn arn(&self) -> &str {
        &self.0
    }

    /// Segment after the last `/`, e.g. the task id of
    /// `arn:aws:ecs:us-east-1:123:task/cluster/abc123`.
    pub fn short_id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
