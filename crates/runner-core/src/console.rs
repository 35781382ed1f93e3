//! Links into the ECS console for humans following up on launched runners.

pub const DEFAULT_CONSOLE_BASE_URL: &str = "https://console.aws.amazon.com/ecs/home#/clusters";

/// Detail page of a single task.
pub fn task_url(base: &str, cluster: &str, task_id: &str) -> String {
    format!("{}/{}/tasks/{}/details", base.trim_end_matches('/'), cluster, task_id)
}

/// Task list of a cluster.
pub fn tasks_url(base: &str, cluster: &str) -> String {
    format!("{}/{}/tasks", base.trim_end_matches('/'), cluster)
}
