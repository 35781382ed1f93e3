pub mod config;
pub mod start;
pub mod status;

pub use config::run as config;
pub use start::run as start;
pub use status::run as status;
