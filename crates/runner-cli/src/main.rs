use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod dispatch;

#[derive(Parser)]
#[command(name = "ecs-runner")]
#[command(about = "Launch self-hosted GitHub Actions runners on Amazon ECS", long_about = None)]
struct Cli {
    /// Settings file (defaults to ~/.config/ecs-runner/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch runner tasks from the INPUT_* and GITHUB_* environment
    Start {
        /// Default task template (JSON); the built-in template when omitted
        #[arg(long)]
        template: Option<PathBuf>,

        /// Task params file merged over the template
        #[arg(long, env = "INPUT_TASK_PARAMS_FILE")]
        task_params: Option<PathBuf>,

        /// Number of tasks to launch (overrides INPUT_COUNT)
        #[arg(short, long)]
        count: Option<u32>,

        /// Wait until a task is RUNNING (also enabled by INPUT_WAIT=true)
        #[arg(short, long)]
        wait: bool,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the current status of tasks
    Status {
        /// Cluster the tasks run in
        #[arg(long, env = "INPUT_CLUSTER")]
        cluster: String,

        /// Task ARNs
        #[arg(required = true)]
        tasks: Vec<String>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show or create the settings file
    Config {
        /// Print the settings file path
        #[arg(long)]
        path: bool,

        /// Write a sample settings file
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    use Commands::*;

    match cli.command {
        Start {
            template,
            task_params,
            count,
            wait,
            json,
        } => {
            let settings = dispatch::load_settings(cli.config.as_deref())?;
            let args = commands::start::StartArgs {
                template,
                task_params,
                count,
                wait,
                json,
            };
            commands::start(&settings, args).await?;
        }
        Status {
            cluster,
            tasks,
            json,
        } => {
            let settings = dispatch::load_settings(cli.config.as_deref())?;
            commands::status(&settings, &cluster, tasks, json).await?;
        }
        Config { path, init } => {
            commands::config(cli.config.as_deref(), path, init)?;
        }
    }

    Ok(())
}
