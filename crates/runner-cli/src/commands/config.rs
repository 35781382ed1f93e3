use runner_core::config::Settings;
use std::path::Path;

const SAMPLE_CONFIG: &str = r#"# ecs-runner settings
# Every key is optional.

# AWS region; the SDK default chain decides when unset.
# region: us-east-1

# Custom ECS endpoint, e.g. LocalStack.
# endpoint_url: http://localhost:4566

# RunTask launches at most 10 tasks per call.
max_per_call: 10

# Seconds between DescribeTasks polls while waiting.
poll_interval_secs: 5

console_base_url: https://console.aws.amazon.com/ecs/home#/clusters

# Default task template; the built-in one is used when unset.
# template_path: /etc/ecs-runner/task-params-template.json
"#;

pub fn run(config_path: Option<&Path>, path: bool, init: bool) -> anyhow::Result<()> {
    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(Settings::default_path);

    if path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Settings already exist at: {}", config_path.display());
            println!("Remove the file first if you want to reinitialize.");
            return Ok(());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&config_path, SAMPLE_CONFIG)?;
        println!("Sample settings written to: {}", config_path.display());
        return Ok(());
    }

    // Default: show the settings path and the values in effect
    println!("Settings path:   {}", config_path.display());
    let settings = if config_path.exists() {
        Settings::load_from(&config_path)?
    } else {
        println!("Status:          not found, using defaults");
        println!("Run `ecs-runner config --init` to create one.");
        Settings::default()
    };
    println!("Region:          {}", settings.region.as_deref().unwrap_or("(SDK default)"));
    println!("Endpoint:        {}", settings.endpoint_url.as_deref().unwrap_or("(AWS)"));
    println!("Max per call:    {}", settings.max_per_call);
    println!("Poll interval:   {}s", settings.poll_interval_secs);
    println!(
        "Template:        {}",
        settings
            .template_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(built-in)".into())
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_config_parses_as_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, SAMPLE_CONFIG).unwrap();

        assert_eq!(Settings::load_from(&path).unwrap(), Settings::default());
    }

    #[test]
    fn test_init_writes_sample_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        run(Some(&path), false, true).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), SAMPLE_CONFIG);

        std::fs::write(&path, "max_per_call: 4\n").unwrap();
        run(Some(&path), false, true).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "max_per_call: 4\n");
    }
}
