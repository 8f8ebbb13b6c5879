// src/config/mod.rs
mod cluster;
mod secrets;
mod types;

pub use cluster::{AzureConfig, Config, Master};
pub use secrets::{generate_random_key, SECRET_LENGTH};
pub use types::{ClusterSpec, DEFAULT_MASTER_PORT};
