// src/utils/mod.rs
mod logging;

pub use logging::init_logging;
