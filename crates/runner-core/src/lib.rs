pub mod api;
pub mod batch;
pub mod config;
pub mod console;
pub mod error;
pub mod handle;
pub mod inputs;
pub mod launcher;
pub mod request;
pub mod runner;
pub mod status;

pub use api::EcsApi;
pub use config::Settings;
pub use error::LaunchError;
pub use handle::TaskHandle;
pub use inputs::ActionInputs;
pub use launcher::{BatchLauncher, LaunchSummary};
pub use request::{LaunchRequest, LaunchRequestBuilder};
pub use runner::RunnerContext;
pub use status::TaskStatus;
