// src/bundle/orchestrator.rs
use super::phases::{Phase, MASTER_PHASES, NODE_PHASES};
use crate::config::Config;
use crate::error::Result;
use crate::filesystem::{ArchiveSink, FilePermissionPolicy, PolicySink, Sink};
use crate::template::TemplateRenderer;
use log::info;

/// The two archives one generation run produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundles {
    pub master: Vec<u8>,
    pub node: Vec<u8>,
}

/// Drives preparation and the per-role write phases against a sink.
#[derive(Debug)]
pub struct BundleOrchestrator {
    policy: FilePermissionPolicy,
    renderer: TemplateRenderer,
}

impl BundleOrchestrator {
    pub fn new(policy: FilePermissionPolicy, renderer: TemplateRenderer) -> Self {
        Self { policy, renderer }
    }

    /// The built-in permission table with embedded templates and real bcrypt.
    pub fn with_defaults() -> Result<Self> {
        Ok(Self::new(FilePermissionPolicy::new()?, TemplateRenderer::default()))
    }

    pub fn policy(&self) -> &FilePermissionPolicy {
        &self.policy
    }

    /// Generates every certificate, key, kubeconfig and secret the bundles
    /// need. Material already present in `config` is kept.
    pub fn prepare(&self, config: &mut Config) -> Result<()> {
        config.prepare_master_certs()?;
        config.prepare_master_kubeconfigs()?;
        config.prepare_master_files()?;
        config.prepare_bootstrap_kubeconfig()?;
        config.verify_certificates()?;
        info!("Prepared material for master {}", config.master.hostname);
        Ok(())
    }

    /// Writes the master bundle. On error the sink holds partial output and
    /// must be discarded.
    pub fn write_master(&self, config: &Config, sink: &mut dyn Sink) -> Result<()> {
        self.write_phases(config, MASTER_PHASES, sink)
    }

    /// Writes the node bundle, which never carries master-only material.
    pub fn write_node(&self, config: &Config, sink: &mut dyn Sink) -> Result<()> {
        self.write_phases(config, NODE_PHASES, sink)
    }

    fn write_phases(&self, config: &Config, phases: &[Phase], sink: &mut dyn Sink) -> Result<()> {
        let mut sink = PolicySink::new(sink, &self.policy);
        for phase in phases {
            phase.run(config, &self.renderer, &mut sink)?;
        }
        Ok(())
    }

    /// Prepares `config` and returns its master and node archives. Either
    /// both bundles are returned or neither is.
    pub fn generate(&self, config: &mut Config) -> Result<Bundles> {
        self.prepare(config)?;
        let mtime = u64::try_from(config.created_at().timestamp()).unwrap_or(0);

        let mut master = ArchiveSink::in_memory(mtime);
        self.write_master(config, &mut master)?;
        let master = master.into_inner()?;

        let mut node = ArchiveSink::in_memory(mtime);
        self.write_node(config, &mut node)?;
        let node = node.into_inner()?;

        info!(
            "Generated bundles: master {} bytes, node {} bytes",
            master.len(),
            node.len()
        );
        Ok(Bundles { master, node })
    }
}
