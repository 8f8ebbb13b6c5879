// src/bundle/version.rs
use super::orchestrator::{BundleOrchestrator, Bundles};
use crate::config::Config;
use crate::error::{self, Result};
use log::debug;
use std::fmt;
use std::str::FromStr;

/// Orchestrator releases this crate can produce bundles for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorVersion {
    V3_9_0,
    Unstable,
}

impl FromStr for OrchestratorVersion {
    type Err = error::Error;

    fn from_str(version: &str) -> Result<Self> {
        match version {
            "3.9.0" => Ok(OrchestratorVersion::V3_9_0),
            "" | "unstable" => Ok(OrchestratorVersion::Unstable),
            _ => error::UnsupportedVersionSnafu { version }.fail(),
        }
    }
}

impl fmt::Display for OrchestratorVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrchestratorVersion::V3_9_0 => write!(f, "3.9.0"),
            OrchestratorVersion::Unstable => write!(f, "unstable"),
        }
    }
}

/// Entry point for callers: prepares `config` and returns the master and
/// node bundles for the requested orchestrator version.
pub fn generate_bundles(config: &mut Config, version: &str) -> Result<Bundles> {
    let version: OrchestratorVersion = version.parse()?;
    debug!("Generating bundles for orchestrator {}", version);
    match version {
        // Both releases share one file layout.
        OrchestratorVersion::V3_9_0 | OrchestratorVersion::Unstable => {
            BundleOrchestrator::with_defaults()?.generate(config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Master;
    use crate::error::ErrorKind;

    #[test]
    fn parses_known_versions() {
        assert_eq!("3.9.0".parse::<OrchestratorVersion>().unwrap(), OrchestratorVersion::V3_9_0);
        assert_eq!("".parse::<OrchestratorVersion>().unwrap(), OrchestratorVersion::Unstable);
        assert_eq!(
            "unstable".parse::<OrchestratorVersion>().unwrap(),
            OrchestratorVersion::Unstable
        );
    }

    #[test]
    fn unknown_version_is_rejected_before_any_work() {
        let mut config = Config::new(Master::new("m", vec!["10.0.0.1".parse().unwrap()], 8443), "ext");
        let err = generate_bundles(&mut config, "3.7").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("3.7"));
        assert_eq!(config.serial().current(), 0);
    }
}
