use anyhow::Context;
use runner_core::config::Settings;
use runner_core::request::LaunchRequestBuilder;
use runner_ecs::EcsClient;
use std::path::Path;

/// Template shipped with the binary, used when neither `--template` nor
/// `template_path` in the settings names one.
pub const DEFAULT_TEMPLATE: &str = include_str!("../../../task-params-template.json");

/// Settings from an explicit path, or the default location.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    match path {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("loading settings from {}", path.display())),
        None => Settings::load_default().context("loading settings"),
    }
}

/// Load the default template and merge the task params file over it.
pub fn load_builder(
    settings: &Settings,
    template: Option<&Path>,
    task_params: Option<&Path>,
) -> anyhow::Result<LaunchRequestBuilder> {
    let builder = match template.or(settings.template_path.as_deref()) {
        Some(path) => LaunchRequestBuilder::load_path(path, task_params),
        None => LaunchRequestBuilder::load(DEFAULT_TEMPLATE, task_params),
    };
    builder.context("loading task template")
}

pub async fn create_client(settings: &Settings) -> EcsClient {
    EcsClient::from_settings(settings).await
}
