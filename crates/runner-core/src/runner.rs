//! Turns the workflow environment into a runner launch request.

use crate::batch::MAX_DESIRED_COUNT;
use crate::error::LaunchError;
use crate::inputs::{ActionInputs, INPUT_PREFIX};
use crate::request::LaunchRequestBuilder;
use std::collections::BTreeMap;
use tracing::debug;

/// Workflow context from the non-input environment (`GITHUB_*`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerContext {
    pub actor: String,
    pub repository: String,
    pub owner: String,
    pub job: String,
}

impl RunnerContext {
    pub fn from_env() -> Result<Self, LaunchError> {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, LaunchError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut general: BTreeMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _)| !k.starts_with(INPUT_PREFIX))
            .collect();

        let mut required = |name: &str| {
            general
                .remove(name)
                .ok_or_else(|| LaunchError::Config(format!("environment variable {} is not set", name)))
        };
        let repository = required("GITHUB_REPOSITORY")?;
        let owner = required("GITHUB_REPOSITORY_OWNER")?;
        let job = required("GITHUB_JOB")?;
        let actor = general
            .remove("GITHUB_ACTOR")
            .unwrap_or_else(|| "unknown".to_string());

        Ok(Self {
            actor,
            repository,
            owner,
            job,
        })
    }
}

/// Apply action inputs and workflow context to the request:
/// template fields from inputs, runner group and actor, the runner
/// registration environment, networking and capacity provider.
pub fn apply_runner_context(
    builder: &mut LaunchRequestBuilder,
    inputs: &ActionInputs,
    context: &RunnerContext,
) -> Result<(), LaunchError> {
    builder.set_fields(inputs.iter());

    builder.set_repository(&context.repository);
    let repo = builder
        .repository()
        .unwrap_or(&context.repository)
        .to_string();
    builder.set_fields([
        ("group", format!("gh-runner:{}", repo)),
        ("startedBy", context.actor.clone()),
    ]);

    let token = inputs
        .get_non_empty("githubPat")
        .ok_or_else(|| LaunchError::Config("input 'github_pat' is required".into()))?;
    builder.set_container_environment([
        ("GITHUB_PERSONAL_TOKEN", token),
        ("GITHUB_OWNER", context.owner.as_str()),
        ("GITHUB_REPOSITORY", repo.as_str()),
        ("RUNNER_NAME", context.job.as_str()),
    ])?;

    if let Some(subnets) = inputs.get_non_empty("subnets") {
        builder.set_subnets(subnets)?;
    }
    if let Some(groups) = inputs.get_non_empty("securityGroups") {
        builder.set_security_groups(groups)?;
    }
    builder.set_capacity_provider(inputs.get("capacityProvider"));

    debug!("Runner request prepared for {}", context.repository);
    Ok(())
}

/// Number of tasks to launch, from the `count` input. Defaults to 1 and is
/// capped at [`MAX_DESIRED_COUNT`].
pub fn desired_count(inputs: &ActionInputs) -> Result<u32, LaunchError> {
    let Some(raw) = inputs.get_non_empty("count") else {
        return Ok(1);
    };
    match raw.trim().parse::<u32>() {
        Ok(0) | Err(_) => Err(LaunchError::InvalidCount(format!(
            "'{}' is not a positive task count",
            raw
        ))),
        Ok(count) if count > MAX_DESIRED_COUNT => Err(LaunchError::InvalidCount(format!(
            "{} exceeds the maximum of {} tasks",
            count, MAX_DESIRED_COUNT
        ))),
        Ok(count) => Ok(count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TEMPLATE: &str = r#"{
        "cluster": null,
        "taskDefinition": null,
        "count": 1,
        "group": "",
        "startedBy": "",
        "capacityProviderStrategy": [{ "capacityProvider": "FARGATE_SPOT" }],
        "networkConfiguration": { "awsvpcConfiguration": { "subnets": [], "securityGroups": [] } },
        "overrides": { "containerOverrides": [{ "name": "runner", "environment": [] }] }
    }"#;

    fn context() -> RunnerContext {
        RunnerContext::from_vars([
            ("GITHUB_REPOSITORY", "Organization/my-repo"),
            ("GITHUB_REPOSITORY_OWNER", "Organization"),
            ("GITHUB_JOB", "build"),
            ("GITHUB_ACTOR", "octocat"),
        ])
        .unwrap()
    }

    #[test]
    fn test_context_requires_repository() {
        let err = RunnerContext::from_vars([("GITHUB_JOB", "build")]).unwrap_err();
        assert!(matches!(err, LaunchError::Config(_)));
    }

    #[test]
    fn test_context_actor_defaults_to_unknown() {
        let ctx = RunnerContext::from_vars([
            ("GITHUB_REPOSITORY", "o/r"),
            ("GITHUB_REPOSITORY_OWNER", "o"),
            ("GITHUB_JOB", "j"),
        ])
        .unwrap();
        assert_eq!(ctx.actor, "unknown");
    }

    #[test]
    fn test_context_ignores_input_variables() {
        let err = RunnerContext::from_vars([
            ("INPUT_GITHUB_REPOSITORY", "o/r"),
            ("GITHUB_REPOSITORY_OWNER", "o"),
            ("GITHUB_JOB", "j"),
        ])
        .unwrap_err();
        assert!(matches!(err, LaunchError::Config(_)));
    }

    #[test]
    fn test_apply_runner_context() {
        let inputs = ActionInputs::from_vars([
            ("INPUT_CLUSTER", "runners"),
            ("INPUT_TASK_DEFINITION", "gh-runner:3"),
            ("INPUT_GITHUB_PAT", "ghp_secret"),
            ("INPUT_SUBNETS", "subnet-a,subnet-b"),
            ("INPUT_SECURITY_GROUPS", "sg-1"),
            ("INPUT_CAPACITY_PROVIDER", "FARGATE"),
            ("INPUT_WAIT", "true"),
        ]);
        let mut builder = LaunchRequestBuilder::load(TEMPLATE, None).unwrap();
        apply_runner_context(&mut builder, &inputs, &context()).unwrap();

        let request = builder.as_request();
        assert_eq!(builder.cluster(), Some("runners"));
        assert_eq!(builder.task_definition(), Some("gh-runner:3"));
        assert_eq!(request["group"], "gh-runner:my-repo");
        assert_eq!(request["startedBy"], "octocat");
        assert!(!request.contains_key("wait"));
        assert!(!request.contains_key("githubPat"));
        assert_eq!(
            request["overrides"]["containerOverrides"][0]["environment"],
            json!([
                { "name": "GITHUB_PERSONAL_TOKEN", "value": "ghp_secret" },
                { "name": "GITHUB_OWNER", "value": "Organization" },
                { "name": "GITHUB_REPOSITORY", "value": "my-repo" },
                { "name": "RUNNER_NAME", "value": "build" }
            ])
        );
        assert_eq!(
            request["networkConfiguration"]["awsvpcConfiguration"],
            json!({ "subnets": ["subnet-a", "subnet-b"], "securityGroups": ["sg-1"] })
        );
        assert_eq!(
            request["capacityProviderStrategy"],
            json!([{ "capacityProvider": "FARGATE" }])
        );
    }

    #[test]
    fn test_apply_requires_github_pat() {
        let mut builder = LaunchRequestBuilder::load(TEMPLATE, None).unwrap();
        let err = apply_runner_context(&mut builder, &ActionInputs::default(), &context())
            .unwrap_err();
        assert!(matches!(err, LaunchError::Config(_)));
    }

    #[test]
    fn test_desired_count() {
        assert_eq!(desired_count(&ActionInputs::default()).unwrap(), 1);
        assert_eq!(
            desired_count(&ActionInputs::from_vars([("INPUT_COUNT", "34")])).unwrap(),
            34
        );
        assert!(desired_count(&ActionInputs::from_vars([("INPUT_COUNT", "0")])).is_err());
        assert!(desired_count(&ActionInputs::from_vars([("INPUT_COUNT", "-2")])).is_err());
        assert!(desired_count(&ActionInputs::from_vars([("INPUT_COUNT", "many")])).is_err());
    }

    #[test]
    fn test_desired_count_is_capped() {
        assert_eq!(
            desired_count(&ActionInputs::from_vars([("INPUT_COUNT", "1000")])).unwrap(),
            MAX_DESIRED_COUNT
        );
        assert!(matches!(
            desired_count(&ActionInputs::from_vars([("INPUT_COUNT", "1001")])),
            Err(LaunchError::InvalidCount(_))
        ));
        assert!(matches!(
            desired_count(&ActionInputs::from_vars([("INPUT_COUNT", "4000000000")])),
            Err(LaunchError::InvalidCount(_))
        ));
    }
}
