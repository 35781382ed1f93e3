//! Typed view of a [`LaunchRequest`] and its conversion to SDK types.
//!
//! Inputs arrive from the environment as strings, so numeric and boolean
//! fields also accept their string spelling (`"true"`, `"2"`).

use aws_sdk_ecs::error::BuildError;
use aws_sdk_ecs::types::{
    AssignPublicIp, AwsVpcConfiguration, CapacityProviderStrategyItem, ContainerOverride,
    EnvironmentFile, EnvironmentFileType, EphemeralStorage, KeyValuePair, LaunchType,
    NetworkConfiguration, PlacementConstraint, PlacementConstraintType, PlacementStrategy,
    PlacementStrategyType, PropagateTags, ResourceRequirement, ResourceType, Tag,
    TaskOverride,
};
use runner_core::error::LaunchError;
use runner_core::request::LaunchRequest;
use serde::{de, Deserialize, Deserializer};
use std::fmt::Display;
use std::str::FromStr;

/// Every key the RunTask call accepts from a request. Keys outside this set
/// (a typo, or `volumeConfigurations`) are rejected rather than dropped.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RunTaskParams {
    pub cluster: Option<String>,
    pub task_definition: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub count: Option<u32>,
    pub group: Option<String>,
    pub started_by: Option<String>,
    pub launch_type: Option<String>,
    pub platform_version: Option<String>,
    pub propagate_tags: Option<String>,
    pub reference_id: Option<String>,
    pub client_token: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub enable_execute_command: Option<bool>,
    #[serde(rename = "enableECSManagedTags", default, deserialize_with = "lenient")]
    pub enable_ecs_managed_tags: Option<bool>,
    pub capacity_provider_strategy: Option<Vec<StrategyItem>>,
    pub placement_constraints: Option<Vec<ConstraintParam>>,
    pub placement_strategy: Option<Vec<PlacementParam>>,
    pub network_configuration: Option<NetworkParams>,
    pub overrides: Option<OverrideParams>,
    pub tags: Option<Vec<TagParam>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StrategyItem {
    pub capacity_provider: String,
    #[serde(default, deserialize_with = "lenient")]
    pub weight: Option<i32>,
    #[serde(default, deserialize_with = "lenient")]
    pub base: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConstraintParam {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub expression: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlacementParam {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub field: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NetworkParams {
    pub awsvpc_configuration: Option<AwsVpcParams>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AwsVpcParams {
    #[serde(default)]
    pub subnets: Vec<String>,
    #[serde(default)]
    pub security_groups: Vec<String>,
    pub assign_public_ip: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OverrideParams {
    #[serde(default)]
    pub container_overrides: Vec<ContainerParams>,
    pub cpu: Option<String>,
    pub memory: Option<String>,
    pub task_role_arn: Option<String>,
    pub execution_role_arn: Option<String>,
    pub ephemeral_storage: Option<StorageParams>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageParams {
    #[serde(rename = "sizeInGiB", default, deserialize_with = "lenient")]
    pub size_in_gib: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContainerParams {
    pub name: Option<String>,
    pub command: Option<Vec<String>>,
    #[serde(default)]
    pub environment: Vec<EnvVar>,
    #[serde(default)]
    pub environment_files: Vec<EnvFileParam>,
    #[serde(default)]
    pub resource_requirements: Vec<ResourceParam>,
    #[serde(default, deserialize_with = "lenient")]
    pub cpu: Option<i32>,
    #[serde(default, deserialize_with = "lenient")]
    pub memory: Option<i32>,
    #[serde(default, deserialize_with = "lenient")]
    pub memory_reservation: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvFileParam {
    pub value: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceParam {
    pub value: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagParam {
    pub key: String,
    pub value: Option<String>,
}

impl RunTaskParams {
    pub fn from_request(request: &LaunchRequest) -> Result<Self, LaunchError> {
        serde_json::from_value(serde_json::Value::Object(request.clone()))
            .map_err(|e| LaunchError::Config(format!("invalid RunTask parameters: {}", e)))
    }

    pub fn count_i32(&self) -> Result<Option<i32>, LaunchError> {
        self.count
            .map(|c| {
                i32::try_from(c).map_err(|_| LaunchError::InvalidCount(format!("{} is too large", c)))
            })
            .transpose()
    }

    pub fn launch_type(&self) -> Option<LaunchType> {
        non_empty(&self.launch_type).map(LaunchType::from)
    }

    pub fn propagate_tags_value(&self) -> Option<PropagateTags> {
        non_empty(&self.propagate_tags).map(PropagateTags::from)
    }

    pub fn capacity_provider_strategy_items(
        &self,
    ) -> Result<Option<Vec<CapacityProviderStrategyItem>>, LaunchError> {
        let Some(items) = &self.capacity_provider_strategy else {
            return Ok(None);
        };
        if items.is_empty() {
            return Ok(None);
        }
        items
            .iter()
            .map(|item| {
                CapacityProviderStrategyItem::builder()
                    .capacity_provider(&item.capacity_provider)
                    .set_weight(item.weight)
                    .set_base(item.base)
                    .build()
                    .map_err(build_error)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    /// `None` when no subnets are configured; awsvpc needs at least one.
    pub fn network_configuration_value(&self) -> Result<Option<NetworkConfiguration>, LaunchError> {
        let Some(awsvpc) = self
            .network_configuration
            .as_ref()
            .and_then(|n| n.awsvpc_configuration.as_ref())
        else {
            return Ok(None);
        };
        if awsvpc.subnets.is_empty() {
            return Ok(None);
        }

        let vpc = AwsVpcConfiguration::builder()
            .set_subnets(Some(awsvpc.subnets.clone()))
            .set_security_groups(
                (!awsvpc.security_groups.is_empty()).then(|| awsvpc.security_groups.clone()),
            )
            .set_assign_public_ip(non_empty(&awsvpc.assign_public_ip).map(AssignPublicIp::from))
            .build()
            .map_err(build_error)?;
        Ok(Some(
            NetworkConfiguration::builder()
                .awsvpc_configuration(vpc)
                .build(),
        ))
    }

    pub fn task_override(&self) -> Result<Option<TaskOverride>, LaunchError> {
        let Some(overrides) = self.overrides.as_ref() else {
            return Ok(None);
        };
        let containers = overrides
            .container_overrides
            .iter()
            .map(container_override)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(
            TaskOverride::builder()
                .set_container_overrides(Some(containers))
                .set_cpu(non_empty(&overrides.cpu).map(String::from))
                .set_memory(non_empty(&overrides.memory).map(String::from))
                .set_task_role_arn(non_empty(&overrides.task_role_arn).map(String::from))
                .set_execution_role_arn(non_empty(&overrides.execution_role_arn).map(String::from))
                .set_ephemeral_storage(
                    overrides
                        .ephemeral_storage
                        .as_ref()
                        .and_then(|s| s.size_in_gib)
                        .map(|size| EphemeralStorage::builder().size_in_gib(size).build()),
                )
                .build(),
        ))
    }

    pub fn placement_constraint_values(&self) -> Option<Vec<PlacementConstraint>> {
        let constraints = self.placement_constraints.as_ref().filter(|c| !c.is_empty())?;
        Some(
            constraints
                .iter()
                .map(|c| {
                    PlacementConstraint::builder()
                        .set_type(non_empty(&c.kind).map(PlacementConstraintType::from))
                        .set_expression(non_empty(&c.expression).map(String::from))
                        .build()
                })
                .collect(),
        )
    }

    pub fn placement_strategy_values(&self) -> Option<Vec<PlacementStrategy>> {
        let strategy = self.placement_strategy.as_ref().filter(|s| !s.is_empty())?;
        Some(
            strategy
                .iter()
                .map(|s| {
                    PlacementStrategy::builder()
                        .set_type(non_empty(&s.kind).map(PlacementStrategyType::from))
                        .set_field(non_empty(&s.field).map(String::from))
                        .build()
                })
                .collect(),
        )
    }

    pub fn tag_values(&self) -> Option<Vec<Tag>> {
        let tags = self.tags.as_ref().filter(|t| !t.is_empty())?;
        Some(
            tags.iter()
                .map(|t| Tag::builder().key(&t.key).set_value(t.value.clone()).build())
                .collect(),
        )
    }
}

fn container_override(c: &ContainerParams) -> Result<ContainerOverride, LaunchError> {
    let environment_files = c
        .environment_files
        .iter()
        .map(|f| {
            EnvironmentFile::builder()
                .value(&f.value)
                .r#type(EnvironmentFileType::from(f.kind.as_str()))
                .build()
                .map_err(build_error)
        })
        .collect::<Result<Vec<_>, _>>()?;
    let resources = c
        .resource_requirements
        .iter()
        .map(|r| {
            ResourceRequirement::builder()
                .value(&r.value)
                .r#type(ResourceType::from(r.kind.as_str()))
                .build()
                .map_err(build_error)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ContainerOverride::builder()
        .set_name(c.name.clone())
        .set_command(c.command.clone())
        .set_environment(Some(
            c.environment
                .iter()
                .map(|e| KeyValuePair::builder().name(&e.name).value(&e.value).build())
                .collect(),
        ))
        .set_environment_files((!environment_files.is_empty()).then_some(environment_files))
        .set_resource_requirements((!resources.is_empty()).then_some(resources))
        .set_cpu(c.cpu)
        .set_memory(c.memory)
        .set_memory_reservation(c.memory_reservation)
        .build())
}

/// Empty strings in the template mean "not set".
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn build_error(e: BuildError) -> LaunchError {
    LaunchError::Config(format!("invalid RunTask parameters: {}", e))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient<T> {
    Value(T),
    Text(String),
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    match Option::<Lenient<T>>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Lenient::Value(v)) => Ok(Some(v)),
        Some(Lenient::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Lenient::Text(s)) => s.trim().parse().map(Some).map_err(de::Error::custom),
    }
}
