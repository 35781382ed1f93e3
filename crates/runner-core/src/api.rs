use crate::error::LaunchError;
use crate::handle::TaskHandle;
use crate::request::LaunchRequest;
use crate::status::TaskStatus;

/// The two ECS operations the launcher depends on.
/// `runner-ecs` provides the AWS SDK implementation; tests script their own.
#[async_trait::async_trait]
pub trait EcsApi: Send + Sync {
    /// Submit one RunTask call. The request's `count` is already set to the
    /// batch size. Returns one handle per launched task, in response order.
    async fn run_task(&self, request: &LaunchRequest) -> Result<Vec<TaskHandle>, LaunchError>;

    /// Fetch the current `lastStatus` of every handle in a single call.
    async fn describe_tasks(
        &self,
        cluster: Option<&str>,
        tasks: &[TaskHandle],
    ) -> Result<Vec<TaskStatus>, LaunchError>;
}

#[async_trait::async_trait]
impl<T: EcsApi + ?Sized> EcsApi for std::sync::Arc<T> {
    async fn run_task(&self, request: &LaunchRequest) -> Result<Vec<TaskHandle>, LaunchError> {
        (**self).run_task(request).await
    }

    async fn describe_tasks(
        &self,
        cluster: Option<&str>,
        tasks: &[TaskHandle],
    ) -> Result<Vec<TaskStatus>, LaunchError> {
        (**self).describe_tasks(cluster, tasks).await
    }
}
