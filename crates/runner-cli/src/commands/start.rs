use crate::dispatch;
use anyhow::Context;
use runner_core::config::Settings;
use runner_core::inputs::ActionInputs;
use runner_core::launcher::{BatchLauncher, LaunchSummary};
use runner_core::runner::{apply_runner_context, desired_count, RunnerContext};
use runner_core::EcsApi;
use std::path::PathBuf;
use tracing::info;

pub struct StartArgs {
    pub template: Option<PathBuf>,
    pub task_params: Option<PathBuf>,
    pub count: Option<u32>,
    pub wait: bool,
    pub json: bool,
}

pub async fn run(settings: &Settings, args: StartArgs) -> anyhow::Result<()> {
    let mut inputs = ActionInputs::from_env();
    if let Some(count) = args.count {
        inputs.insert("count", count.to_string());
    }
    let context = RunnerContext::from_env().context("reading workflow environment")?;
    info!(
        "Launching runners for {} (actor {}, job {})",
        context.repository, context.actor, context.job
    );

    let mut builder =
        dispatch::load_builder(settings, args.template.as_deref(), args.task_params.as_deref())?;
    apply_runner_context(&mut builder, &inputs, &context).context("preparing RunTask request")?;
    let count = desired_count(&inputs)?;
    info!(
        "Task definition {} on cluster {}",
        builder.task_definition().unwrap_or("<unset>"),
        builder.cluster().unwrap_or("default")
    );

    let client = dispatch::create_client(settings).await;
    let mut launcher = BatchLauncher::new(client, builder.into_request(), count)
        .with_max_per_call(settings.max_per_call)
        .with_poll_interval(settings.poll_interval())
        .with_console_base_url(settings.console_base_url.as_str());

    let summary = launcher.run().await.context("launching runner tasks")?;
    report(&launcher, summary, args.json)?;

    if (args.wait || inputs.should_wait()) && wait_for_running(&mut launcher).await? {
        println!("Runner task is RUNNING.");
    }

    Ok(())
}

/// Waits for the launched tasks; `false` when there was nothing to wait for.
async fn wait_for_running<C: EcsApi>(launcher: &mut BatchLauncher<C>) -> anyhow::Result<bool> {
    if launcher.handles().is_empty() {
        launcher.wait().await?;
        return Ok(false);
    }
    launcher
        .wait()
        .await
        .context("waiting for runner tasks")?;
    Ok(true)
}

fn report<C: EcsApi>(
    launcher: &BatchLauncher<C>,
    summary: LaunchSummary,
    json: bool,
) -> anyhow::Result<()> {
    if json {
        let output = serde_json::json!({
            "launched": summary.launched,
            "calls": summary.calls,
            "cluster": launcher.cluster(),
            "tasks": launcher.handles(),
            "url": launcher.console_url(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "Started {} task(s) with {} RunTask call(s):",
        summary.launched, summary.calls
    );
    for handle in launcher.handles() {
        println!("  ID:  {}", handle.short_id());
    }
    if let Some(url) = launcher.console_url() {
        println!("  URL: {}", url);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use runner_core::error::LaunchError;
    use runner_core::handle::TaskHandle;
    use runner_core::request::LaunchRequest;
    use runner_core::status::TaskStatus;
    use std::time::Duration;

    struct RunningEcs;

    #[async_trait::async_trait]
    impl EcsApi for RunningEcs {
        async fn run_task(&self, _: &LaunchRequest) -> Result<Vec<TaskHandle>, LaunchError> {
            Ok(vec![TaskHandle::new("arn:aws:ecs:us-east-1:123456789012:task/runners/abc")])
        }

        async fn describe_tasks(
            &self,
            _: Option<&str>,
            tasks: &[TaskHandle],
        ) -> Result<Vec<TaskStatus>, LaunchError> {
            Ok(vec![TaskStatus::Running; tasks.len()])
        }
    }

    #[tokio::test]
    async fn test_nothing_launched_is_not_reported_running() {
        let mut launcher = BatchLauncher::new(RunningEcs, LaunchRequest::new(), 1);

        assert!(!wait_for_running(&mut launcher).await.unwrap());
    }

    #[tokio::test]
    async fn test_running_task_is_reported() {
        let mut launcher = BatchLauncher::new(RunningEcs, LaunchRequest::new(), 1)
            .with_poll_interval(Duration::ZERO);
        launcher.run().await.unwrap();

        assert!(wait_for_running(&mut launcher).await.unwrap());
    }
}
