use crate::api::EcsApi;
use crate::batch::{batch_sizes, MAX_TASKS_PER_CALL};
use crate::console::{self, DEFAULT_CONSOLE_BASE_URL};
use crate::error::LaunchError;
use crate::handle::TaskHandle;
use crate::request::{self, LaunchRequest};
use crate::status::TaskStatus;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Work done by one [`BatchLauncher::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchSummary {
    pub launched: usize,
    pub calls: usize,
}

/// Launches `desired_count` tasks from one request, split into RunTask calls
/// of at most `max_per_call`, and tracks the returned handles.
pub struct BatchLauncher<C> {
    client: C,
    request: LaunchRequest,
    desired_count: u32,
    max_per_call: u32,
    poll_interval: Duration,
    console_base_url: String,
    handles: Vec<TaskHandle>,
}

impl<C: EcsApi> BatchLauncher<C> {
    pub fn new(client: C, request: LaunchRequest, desired_count: u32) -> Self {
        Self {
            client,
            request,
            desired_count,
            max_per_call: MAX_TASKS_PER_CALL,
            poll_interval: DEFAULT_POLL_INTERVAL,
            console_base_url: DEFAULT_CONSOLE_BASE_URL.to_string(),
            handles: Vec::new(),
        }
    }

    pub fn with_max_per_call(mut self, max_per_call: u32) -> Self {
        self.max_per_call = max_per_call;
        self
    }

    /// Delay between DescribeTasks polls in [`wait`](Self::wait).
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_console_base_url(mut self, base: impl Into<String>) -> Self {
        self.console_base_url = base.into();
        self
    }

    /// Issue one RunTask call per batch. The first failing call aborts the
    /// remaining batches; tasks from earlier batches are left running.
    pub async fn run(&mut self) -> Result<LaunchSummary, LaunchError> {
        let sizes = batch_sizes(self.desired_count, self.max_per_call)?;
        info!(
            "Starting {} task(s) in {} RunTask call(s)",
            self.desired_count,
            sizes.len()
        );

        let mut summary = LaunchSummary {
            launched: 0,
            calls: 0,
        };
        for size in sizes {
            let mut request = self.request.clone();
            request.insert("count".into(), Value::from(size));

            let handles = match self.client.run_task(&request).await {
                Ok(handles) => handles,
                Err(e) => {
                    if summary.launched > 0 {
                        warn!(
                            "{} task(s) from earlier RunTask calls were launched and are left running",
                            summary.launched
                        );
                    }
                    return Err(e);
                }
            };

            summary.calls += 1;
            summary.launched += handles.len();
            for handle in &handles {
                debug!("Launched task {}", handle);
            }
            self.handles.extend(handles);
        }

        info!(
            "Launched {} task(s) with {} RunTask call(s)",
            summary.launched, summary.calls
        );
        Ok(summary)
    }

    /// Poll until at least one task is RUNNING. Any STOPPED task aborts.
    pub async fn wait(&self) -> Result<(), LaunchError> {
        if self.handles.is_empty() {
            error!("You can't 'wait' before calling run()");
            return Ok(());
        }
        info!(
            "Waiting for {} task(s) to reach '{}' status",
            self.handles.len(),
            TaskStatus::Running
        );

        loop {
            let statuses = self
                .client
                .describe_tasks(self.cluster(), &self.handles)
                .await?;

            if statuses.iter().any(TaskStatus::is_terminal) {
                return Err(LaunchError::TaskStopped { statuses });
            }
            if statuses.iter().any(TaskStatus::is_desired) {
                info!("Task reached '{}'", TaskStatus::Running);
                return Ok(());
            }

            info!(
                "Status still {}. Waiting for '{}'",
                statuses
                    .iter()
                    .map(TaskStatus::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
                TaskStatus::Running
            );
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Every handle launched so far, in launch order.
    pub fn handles(&self) -> &[TaskHandle] {
        &self.handles
    }

    pub fn desired_count(&self) -> u32 {
        self.desired_count
    }

    pub fn cluster(&self) -> Option<&str> {
        request::cluster(&self.request)
    }

    /// Console link: the task's detail page for a single task, the cluster's
    /// task list otherwise. `None` until something is launched.
    pub fn console_url(&self) -> Option<String> {
        let cluster = self.cluster()?;
        match self.handles.as_slice() {
            [] => None,
            [only] => Some(console::task_url(
                &self.console_base_url,
                cluster,
                only.short_id(),
            )),
            _ => Some(console::tasks_url(&self.console_base_url, cluster)),
        }
    }
}
