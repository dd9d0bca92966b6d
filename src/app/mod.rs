pub mod config;

pub use config::{Config, DispatchConfig, QueueConfig};
