use crate::params::{non_empty, RunTaskParams};
use aws_config::BehaviorVersion;
use aws_sdk_ecs::error::DisplayErrorContext;
use aws_sdk_ecs::types::Failure;
use aws_sdk_ecs::Client;
use runner_core::config::Settings;
use runner_core::error::LaunchError;
use runner_core::handle::TaskHandle;
use runner_core::request::LaunchRequest;
use runner_core::status::TaskStatus;
use runner_core::EcsApi;
use tracing::{debug, info, warn};

/// DescribeTasks accepts at most this many tasks per call.
const DESCRIBE_TASKS_LIMIT: usize = 100;

/// [`EcsApi`] backed by the AWS SDK.
pub struct EcsClient {
    client: Client,
}

impl EcsClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the default AWS credential chain, applying the
    /// region and endpoint overrides from `settings`.
    pub async fn from_settings(settings: &Settings) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(ref region) = settings.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        if let Some(ref endpoint) = settings.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let config = loader.load().await;
        debug!("ECS client for region {:?}", config.region());
        Self::new(Client::new(&config))
    }
}

#[async_trait::async_trait]
impl EcsApi for EcsClient {
    async fn run_task(&self, request: &LaunchRequest) -> Result<Vec<TaskHandle>, LaunchError> {
        let params = RunTaskParams::from_request(request)?;
        let task_definition = non_empty(&params.task_definition)
            .ok_or_else(|| LaunchError::Config("taskDefinition is not set".into()))?;
        info!(
            "RunTask {} x{} on cluster {}",
            task_definition,
            params.count.unwrap_or(1),
            non_empty(&params.cluster).unwrap_or("default")
        );

        let output = self
            .client
            .run_task()
            .set_cluster(non_empty(&params.cluster).map(String::from))
            .task_definition(task_definition)
            .set_count(params.count_i32()?)
            .set_group(non_empty(&params.group).map(String::from))
            .set_started_by(non_empty(&params.started_by).map(String::from))
            .set_launch_type(params.launch_type())
            .set_platform_version(non_empty(&params.platform_version).map(String::from))
            .set_propagate_tags(params.propagate_tags_value())
            .set_reference_id(non_empty(&params.reference_id).map(String::from))
            .set_client_token(non_empty(&params.client_token).map(String::from))
            .set_enable_execute_command(params.enable_execute_command)
            .set_enable_ecs_managed_tags(params.enable_ecs_managed_tags)
            .set_capacity_provider_strategy(params.capacity_provider_strategy_items()?)
            .set_placement_constraints(params.placement_constraint_values())
            .set_placement_strategy(params.placement_strategy_values())
            .set_network_configuration(params.network_configuration_value()?)
            .set_overrides(params.task_override()?)
            .set_tags(params.tag_values())
            .send()
            .await
            .map_err(|e| LaunchError::Provider(DisplayErrorContext(&e).to_string()))?;

        let handles: Vec<TaskHandle> = output
            .tasks()
            .iter()
            .filter_map(|t| t.task_arn())
            .map(TaskHandle::new)
            .collect();

        if handles.is_empty() {
            let reasons = if output.failures().is_empty() {
                "no tasks were started and no failures were reported".to_string()
            } else {
                describe_failures(output.failures())
            };
            return Err(LaunchError::Rejected(reasons));
        }
        if !output.failures().is_empty() {
            let reasons = describe_failures(output.failures());
            warn!(
                "RunTask placed {} task(s) but reported failures: {}",
                handles.len(),
                reasons
            );
        }
        Ok(handles)
    }

    async fn describe_tasks(
        &self,
        cluster: Option<&str>,
        tasks: &[TaskHandle],
    ) -> Result<Vec<TaskStatus>, LaunchError> {
        let mut statuses = Vec::with_capacity(tasks.len());
        for chunk in tasks.chunks(DESCRIBE_TASKS_LIMIT) {
            let output = self
                .client
                .describe_tasks()
                .set_cluster(cluster.map(String::from))
                .set_tasks(Some(chunk.iter().map(|h| h.arn().to_string()).collect()))
                .send()
                .await
                .map_err(|e| LaunchError::Provider(DisplayErrorContext(&e).to_string()))?;

            // Reply order is not guaranteed; report in handle order.
            for handle in chunk {
                let status = output
                    .tasks()
                    .iter()
                    .find(|t| t.task_arn() == Some(handle.arn()))
                    .and_then(|t| t.last_status())
                    .unwrap_or("UNKNOWN");
                statuses.push(TaskStatus::from(status));
            }
        }
        Ok(statuses)
    }
}

fn describe_failures(failures: &[Failure]) -> String {
    failures
        .iter()
        .map(|f| {
            let reason = f.reason().unwrap_or("unknown reason");
            match (f.arn(), f.detail()) {
                (Some(arn), Some(detail)) => format!("{} ({}): {}", reason, arn, detail),
                (Some(arn), None) => format!("{} ({})", reason, arn),
                (None, Some(detail)) => format!("{}: {}", reason, detail),
                (None, None) => reason.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_ecs::config::{BehaviorVersion, Credentials, Region};
    use aws_smithy_http_client::test_util::infallible_client_fn;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    type Calls = Arc<Mutex<Vec<(String, Value)>>>;

    /// An [`EcsClient`] whose HTTP calls are answered by `reply`, given the
    /// operation name and the JSON request body. Every call is recorded.
    fn canned<F>(reply: F) -> (EcsClient, Calls)
    where
        F: Fn(&str, &Value) -> Value + Send + Sync + 'static,
    {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&calls);
        let http_client = infallible_client_fn(move |request| {
            let operation = request
                .headers()
                .get("x-amz-target")
                .and_then(|v| v.to_str().ok())
                .and_then(|target| target.rsplit('.').next())
                .unwrap_or_default()
                .to_string();
            let body: Value =
                serde_json::from_slice(request.body().bytes().unwrap_or_default()).unwrap_or(Value::Null);
            let response = reply(&operation, &body);
            recorded.lock().unwrap().push((operation, body));
            http::Response::builder()
                .status(200)
                .header("content-type", "application/x-amz-json-1.1")
                .body(response.to_string())
                .unwrap()
        });

        let config = aws_sdk_ecs::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("AKIDTEST", "secret", None, None, "test"))
            .http_client(http_client)
            .build();
        (EcsClient::new(Client::from_conf(config)), calls)
    }

    fn request(value: Value) -> LaunchRequest {
        let Value::Object(map) = value else {
            panic!("expected an object");
        };
        map
    }

    fn arn(n: usize) -> String {
        format!("arn:aws:ecs:us-east-1:123456789012:task/runners/task-{:03}", n)
    }

    #[test]
    fn test_describe_failures() {
        let failures = vec![
            Failure::builder()
                .reason("RESOURCE:MEMORY")
                .arn("arn:aws:ecs:us-east-1:123456789012:container-instance/abc")
                .build(),
            Failure::builder().reason("AGENT").detail("agent disconnected").build(),
        ];
        assert_eq!(
            describe_failures(&failures),
            "RESOURCE:MEMORY (arn:aws:ecs:us-east-1:123456789012:container-instance/abc); AGENT: agent disconnected"
        );
    }

    #[tokio::test]
    async fn test_describe_nothing_makes_no_call() {
        let (client, calls) = canned(|_, _| json!({}));

        let statuses = client.describe_tasks(Some("runners"), &[]).await.unwrap();
        assert!(statuses.is_empty());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_task_sends_request_fields() {
        let (client, calls) = canned(|_, _| json!({ "tasks": [{ "taskArn": arn(1) }], "failures": [] }));

        let handles = client
            .run_task(&request(json!({
                "cluster": "runners",
                "taskDefinition": "runner:3",
                "count": 1,
                "group": "",
                "enableECSManagedTags": "true",
                "clientToken": "run-42",
                "placementConstraints": [{ "type": "distinctInstance" }]
            })))
            .await
            .unwrap();
        assert_eq!(handles, vec![TaskHandle::new(arn(1))]);

        let calls = calls.lock().unwrap();
        let (operation, body) = &calls[0];
        assert_eq!(operation, "RunTask");
        assert_eq!(body["cluster"], "runners");
        assert_eq!(body["taskDefinition"], "runner:3");
        assert_eq!(body["count"], 1);
        assert_eq!(body["enableECSManagedTags"], true);
        assert_eq!(body["clientToken"], "run-42");
        assert_eq!(body["placementConstraints"][0]["type"], "distinctInstance");
        assert!(body.get("group").is_none());
    }

    #[tokio::test]
    async fn test_run_task_failures_without_tasks_are_rejected() {
        let (client, _) = canned(|_, _| {
            json!({
                "tasks": [],
                "failures": [{ "arn": "arn:aws:ecs:us-east-1:123456789012:capacity-provider/spot", "reason": "RESOURCE:MEMORY" }]
            })
        });

        let err = client
            .run_task(&request(json!({ "taskDefinition": "runner:3", "count": 2 })))
            .await
            .unwrap_err();
        match err {
            LaunchError::Rejected(reasons) => assert!(reasons.contains("RESOURCE:MEMORY")),
            other => panic!("expected a rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_task_empty_reply_is_rejected() {
        let (client, _) = canned(|_, _| json!({ "tasks": [], "failures": [] }));

        let err = client
            .run_task(&request(json!({ "taskDefinition": "runner:3" })))
            .await
            .unwrap_err();
        assert!(matches!(err, LaunchError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_partial_placement_keeps_started_tasks() {
        let (client, _) = canned(|_, _| {
            json!({
                "tasks": [{ "taskArn": arn(1) }, { "taskArn": arn(2) }],
                "failures": [{ "reason": "RESOURCE:CPU" }]
            })
        });

        let handles = client
            .run_task(&request(json!({ "taskDefinition": "runner:3", "count": 3 })))
            .await
            .unwrap();
        assert_eq!(handles, vec![TaskHandle::new(arn(1)), TaskHandle::new(arn(2))]);
    }

    #[tokio::test]
    async fn test_run_task_needs_task_definition() {
        let (client, calls) = canned(|_, _| json!({}));

        let err = client
            .run_task(&request(json!({ "cluster": "runners", "taskDefinition": null })))
            .await
            .unwrap_err();
        assert!(matches!(err, LaunchError::Config(_)));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_describe_tasks_reports_in_handle_order() {
        // Reply is reordered and omits the third task.
        let (client, _) = canned(|_, _| {
            json!({
                "tasks": [
                    { "taskArn": arn(2), "lastStatus": "PENDING" },
                    { "taskArn": arn(1), "lastStatus": "RUNNING" }
                ],
                "failures": [{ "arn": arn(3), "reason": "MISSING" }]
            })
        });
        let handles: Vec<TaskHandle> = (1..=3).map(|n| TaskHandle::new(arn(n))).collect();

        let statuses = client.describe_tasks(Some("runners"), &handles).await.unwrap();
        assert_eq!(
            statuses,
            vec![
                TaskStatus::Running,
                TaskStatus::Pending,
                TaskStatus::Other("UNKNOWN".into())
            ]
        );
    }

    #[tokio::test]
    async fn test_describe_tasks_splits_large_requests() {
        let (client, calls) = canned(|_, body| {
            let tasks: Vec<Value> = body["tasks"]
                .as_array()
                .unwrap()
                .iter()
                .map(|arn| json!({ "taskArn": arn, "lastStatus": "RUNNING" }))
                .collect();
            json!({ "tasks": tasks, "failures": [] })
        });
        let handles: Vec<TaskHandle> = (1..=250).map(|n| TaskHandle::new(arn(n))).collect();

        let statuses = client.describe_tasks(Some("runners"), &handles).await.unwrap();
        assert_eq!(statuses.len(), 250);
        assert!(statuses.iter().all(TaskStatus::is_desired));

        let calls = calls.lock().unwrap();
        let sizes: Vec<usize> = calls
            .iter()
            .map(|(operation, body)| {
                assert_eq!(operation, "DescribeTasks");
                assert_eq!(body["cluster"], "runners");
                body["tasks"].as_array().unwrap().len()
            })
            .collect();
        assert_eq!(sizes, vec![100, 100, 50]);
        assert_eq!(calls[2].1["tasks"][49], arn(250));
    }
}
