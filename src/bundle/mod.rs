// src/bundle/mod.rs
mod orchestrator;
mod phases;
mod version;

pub use orchestrator::{BundleOrchestrator, Bundles};
pub use phases::{Phase, LAYOUT_DIRS, MASTER_PHASES, NODE_PHASES};
pub use version::{generate_bundles, OrchestratorVersion};
