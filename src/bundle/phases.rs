// src/bundle/phases.rs
use crate::config::Config;
use crate::error::Result;
use crate::filesystem::PolicySink;
use crate::template::{Role, TemplateContext, TemplateRenderer};
use log::info;
use std::fmt;

/// Directories created before anything else so they carry their own
/// ownership and mode instead of the implicit parent defaults.
pub const LAYOUT_DIRS: &[&str] = &["tmp", "etc/etcd"];

/// One named step of writing a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Layout,
    Certs,
    Keypair,
    KubeConfigs,
    MasterFiles,
    BootstrapCerts,
    BootstrapKubeConfig,
    NodeFiles,
}

pub const MASTER_PHASES: &[Phase] = &[
    Phase::Layout,
    Phase::Certs,
    Phase::Keypair,
    Phase::KubeConfigs,
    Phase::MasterFiles,
    Phase::BootstrapCerts,
    Phase::BootstrapKubeConfig,
    Phase::NodeFiles,
];

pub const NODE_PHASES: &[Phase] = &[
    Phase::BootstrapCerts,
    Phase::BootstrapKubeConfig,
    Phase::NodeFiles,
];

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Layout => "layout",
            Phase::Certs => "certs",
            Phase::Keypair => "keypair",
            Phase::KubeConfigs => "kubeconfigs",
            Phase::MasterFiles => "master files",
            Phase::BootstrapCerts => "bootstrap certs",
            Phase::BootstrapKubeConfig => "bootstrap kubeconfig",
            Phase::NodeFiles => "node files",
        };
        write!(f, "{}", name)
    }
}

impl Phase {
    pub(super) fn run(
        self,
        config: &Config,
        renderer: &TemplateRenderer,
        sink: &mut PolicySink<'_>,
    ) -> Result<()> {
        info!("Writing {}", self);
        match self {
            Phase::Layout => {
                for dir in LAYOUT_DIRS {
                    sink.mkdir(dir)?;
                }
                Ok(())
            }
            Phase::Certs => config.write_master_certs(sink),
            Phase::Keypair => config.write_master_keypair(sink),
            Phase::KubeConfigs => config.write_master_kubeconfigs(sink),
            Phase::MasterFiles => write_rendered(config, renderer, Role::Master, sink),
            Phase::BootstrapCerts => config.write_bootstrap_certs(sink),
            Phase::BootstrapKubeConfig => config.write_bootstrap_kubeconfig(sink),
            Phase::NodeFiles => write_rendered(config, renderer, Role::Node, sink),
        }
    }
}

// Every template of the role renders before the first one is written.
fn write_rendered(
    config: &Config,
    renderer: &TemplateRenderer,
    role: Role,
    sink: &mut PolicySink<'_>,
) -> Result<()> {
    let context = TemplateContext::from_config(config);
    for file in renderer.render_role(role, &context)? {
        sink.write(&file.path, &file.contents)?;
    }
    Ok(())
}
