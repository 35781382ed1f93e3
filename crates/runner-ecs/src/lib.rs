pub mod client;
pub mod params;

pub use client::EcsClient;
