use crate::dispatch;
use runner_core::config::Settings;
use runner_core::console;
use runner_core::handle::TaskHandle;
use runner_core::EcsApi;

pub async fn run(
    settings: &Settings,
    cluster: &str,
    tasks: Vec<String>,
    json: bool,
) -> anyhow::Result<()> {
    let handles: Vec<TaskHandle> = tasks.into_iter().map(TaskHandle::new).collect();
    let client = dispatch::create_client(settings).await;
    let statuses = client.describe_tasks(Some(cluster), &handles).await?;

    if json {
        let entries: Vec<serde_json::Value> = handles
            .iter()
            .zip(&statuses)
            .map(|(handle, status)| {
                serde_json::json!({
                    "task": handle,
                    "id": handle.short_id(),
                    "status": status,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("{:<36} {:<16} {}", "TASK ID", "STATUS", "URL");
    println!("{}", "-".repeat(80));
    for (handle, status) in handles.iter().zip(&statuses) {
        println!(
            "{:<36} {:<16} {}",
            handle.short_id(),
            status,
            console::task_url(&settings.console_base_url, cluster, handle.short_id()),
        );
    }

    Ok(())
}
