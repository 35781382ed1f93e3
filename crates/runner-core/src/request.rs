use crate::error::LaunchError;
use serde_json::{json, Map, Value};
use std::path::Path;
use tracing::{debug, info, warn};

/// Full RunTask parameter set, keyed by the ECS API field names.
pub type LaunchRequest = Map<String, Value>;

const CONTAINER_OVERRIDE: &str = "/overrides/containerOverrides/0";
const AWSVPC_CONFIGURATION: &str = "/networkConfiguration/awsvpcConfiguration";

/// Builds a [`LaunchRequest`] from the default template, an optional
/// override document and caller inputs.
///
/// The template's top-level keys are the allow-list: [`set_fields`] never
/// adds a key the template does not already have.
///
/// [`set_fields`]: LaunchRequestBuilder::set_fields
#[derive(Debug, Clone)]
pub struct LaunchRequestBuilder {
    config: LaunchRequest,
    repository: Option<String>,
}

impl LaunchRequestBuilder {
    /// Parse the default template and shallow-merge the override document
    /// over it when `override_path` names an existing file.
    pub fn load(default_template: &str, override_path: Option<&Path>) -> Result<Self, LaunchError> {
        let mut config = match serde_json::from_str::<Value>(default_template) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                return Err(LaunchError::TemplateInvalid(format!(
                    "expected a JSON object, found {}",
                    json_kind(&other)
                )))
            }
            Err(e) => return Err(LaunchError::TemplateInvalid(e.to_string())),
        };

        match override_path {
            Some(path) if path.exists() => {
                if let Some(overrides) = read_override(path) {
                    info!(
                        "Applying task params from {} ({} keys)",
                        path.display(),
                        overrides.len()
                    );
                    config.extend(overrides);
                }
            }
            Some(path) => info!(
                "Task params file {} not found, using template defaults",
                path.display()
            ),
            None => debug!("No task params file given, using template defaults"),
        }

        Ok(Self {
            config,
            repository: None,
        })
    }

    /// Same as [`load`](Self::load), reading the default template from disk.
    pub fn load_path(template_path: &Path, override_path: Option<&Path>) -> Result<Self, LaunchError> {
        let contents = std::fs::read_to_string(template_path).map_err(|e| {
            LaunchError::TemplateInvalid(format!("{}: {}", template_path.display(), e))
        })?;
        Self::load(&contents, override_path)
    }

    /// Replace top-level values whose key already exists. Unknown keys are dropped.
    pub fn set_fields<I, K, V>(&mut self, fields: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (key, value) in fields {
            let key = key.as_ref();
            match self.config.get_mut(key) {
                Some(slot) => *slot = value.into(),
                None => debug!("Ignoring '{}': not a task template field", key),
            }
        }
    }

    /// Keep the repository name from an `owner/repo` slug.
    pub fn set_repository(&mut self, owner_slash_repo: &str) {
        let repo = owner_slash_repo
            .rsplit('/')
            .next()
            .unwrap_or(owner_slash_repo);
        self.repository = Some(repo.to_string());
    }

    /// Replace the first container override's environment with `pairs`,
    /// in iteration order.
    pub fn set_container_environment<I, K, V>(&mut self, pairs: I) -> Result<(), LaunchError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let environment: Vec<Value> = pairs
            .into_iter()
            .map(|(name, value)| {
                let (name, value): (String, String) = (name.into(), value.into());
                json!({ "name": name, "value": value })
            })
            .collect();

        let container = self
            .config
            .pointer_object_mut(CONTAINER_OVERRIDE)
            .ok_or_else(|| LaunchError::TemplateShape("overrides.containerOverrides[0]".into()))?;
        container.insert("environment".into(), Value::Array(environment));
        Ok(())
    }

    /// Use a single capacity provider. `None` or an empty name keeps the
    /// template's strategy, and a template without a strategy is left alone.
    pub fn set_capacity_provider(&mut self, name: Option<&str>) {
        let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
            debug!("No capacity provider given, keeping template strategy");
            return;
        };
        match self.config.get_mut("capacityProviderStrategy") {
            Some(strategy) => *strategy = json!([{ "capacityProvider": name }]),
            None => debug!(
                "Template has no capacityProviderStrategy, ignoring capacity provider {}",
                name
            ),
        }
    }

    /// Comma-separated subnet ids. Empty input keeps the template's list.
    pub fn set_subnets(&mut self, csv: &str) -> Result<(), LaunchError> {
        self.set_awsvpc_list("subnets", csv)
    }

    /// Comma-separated security group ids. Empty input keeps the template's list.
    pub fn set_security_groups(&mut self, csv: &str) -> Result<(), LaunchError> {
        self.set_awsvpc_list("securityGroups", csv)
    }

    pub fn set_count(&mut self, count: u32) {
        self.config.insert("count".into(), Value::from(count));
    }

    pub fn as_request(&self) -> &LaunchRequest {
        &self.config
    }

    pub fn into_request(self) -> LaunchRequest {
        self.config
    }

    pub fn cluster(&self) -> Option<&str> {
        cluster(&self.config)
    }

    pub fn task_definition(&self) -> Option<&str> {
        self.config.get("taskDefinition").and_then(Value::as_str)
    }

    pub fn repository(&self) -> Option<&str> {
        self.repository.as_deref()
    }

    fn set_awsvpc_list(&mut self, field: &str, csv: &str) -> Result<(), LaunchError> {
        let ids: Vec<Value> = csv
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(Value::from)
            .collect();
        if ids.is_empty() {
            return Ok(());
        }

        let awsvpc = self.config.pointer_object_mut(AWSVPC_CONFIGURATION).ok_or_else(|| {
            LaunchError::TemplateShape("networkConfiguration.awsvpcConfiguration".into())
        })?;
        awsvpc.insert(field.into(), Value::Array(ids));
        Ok(())
    }
}

/// Cluster named by a launch request, if set.
pub fn cluster(request: &LaunchRequest) -> Option<&str> {
    request.get("cluster").and_then(Value::as_str)
}

fn read_override(path: &Path) -> Option<LaunchRequest> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Could not read task params file {}: {}", path.display(), e);
            return None;
        }
    };
    match serde_json::from_str::<Value>(&contents) {
        Ok(Value::Object(map)) => Some(map),
        Ok(other) => {
            warn!(
                "Task params file {} holds {}, expected an object; ignoring it",
                path.display(),
                json_kind(&other)
            );
            None
        }
        Err(e) => {
            warn!("Task params file {} is not valid JSON: {}", path.display(), e);
            None
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

trait PointerObject {
    fn pointer_object_mut(&mut self, pointer: &str) -> Option<&mut Map<String, Value>>;
}

impl PointerObject for LaunchRequest {
    fn pointer_object_mut(&mut self, pointer: &str) -> Option<&mut Map<String, Value>> {
        // Map has no pointer access of its own; walk the tokens by hand.
        let mut tokens = pointer.trim_start_matches('/').split('/');
        let first = tokens.next()?;
        let mut current = self.get_mut(first)?;
        for token in tokens {
            current = match current {
                Value::Object(map) => map.get_mut(token)?,
                Value::Array(items) => items.get_mut(token.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        current.as_object_mut()
    }
}
