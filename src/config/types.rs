// config/types.rs
use super::{AzureConfig, Config, Master};
use crate::error::{self, Result};
use serde::{Deserialize, Serialize};
use snafu::{ensure, OptionExt, ResultExt};
use std::net::IpAddr;
use std::{fs, path::Path};

pub const DEFAULT_MASTER_PORT: u16 = 8443;

/// On-disk description of the cluster a bundle is generated for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    pub orchestrator_name: String,
    #[serde(default)]
    pub cluster_id: String,
    #[serde(default)]
    pub orchestrator_version: String,
    pub dns_prefix: String,
    pub location: String,
    #[serde(rename = "firstConsecutiveStaticIP")]
    pub first_consecutive_static_ip: String,
    pub cluster_username: String,
    #[serde(default)]
    pub cluster_password: String,
    #[serde(default)]
    pub enable_aad_authentication: bool,
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub subscription_id: String,
    #[serde(default)]
    pub aad_client_id: String,
    #[serde(default)]
    pub aad_client_secret: String,
    #[serde(default)]
    pub resource_group: String,
}

impl Default for ClusterSpec {
    fn default() -> Self {
        Self {
            orchestrator_name: "openshift".to_string(),
            cluster_id: String::new(),
            orchestrator_version: "3.9.0".to_string(),
            dns_prefix: "openshift-demo".to_string(),
            location: "eastus".to_string(),
            first_consecutive_static_ip: "10.0.0.11".to_string(),
            cluster_username: "demo".to_string(),
            cluster_password: "changeme".to_string(),
            enable_aad_authentication: false,
            tenant_id: String::new(),
            subscription_id: String::new(),
            aad_client_id: String::new(),
            aad_client_secret: String::new(),
            resource_group: "openshift-demo".to_string(),
        }
    }
}

impl ClusterSpec {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_str = fs::read_to_string(path).context(error::ConfigReadSnafu { path })?;
        serde_json::from_str(&config_str).context(error::ConfigParseSnafu { path })
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let config_str =
            serde_json::to_string_pretty(self).context(error::ConfigSerializeSnafu { path })?;
        fs::write(path, config_str).context(error::ConfigWriteSnafu { path })
    }

    pub fn validate(&self) -> Result<()> {
        self.master_ip()?;
        ensure!(
            !self.orchestrator_name.is_empty(),
            error::InvalidConfigSnafu {
                reason: "orchestratorName is empty"
            }
        );
        ensure!(
            !self.cluster_username.is_empty(),
            error::InvalidConfigSnafu {
                reason: "clusterUsername is empty"
            }
        );
        ensure!(
            self.enable_aad_authentication || !self.cluster_password.is_empty(),
            error::InvalidConfigSnafu {
                reason: "clusterPassword is required unless AAD authentication is enabled"
            }
        );
        Ok(())
    }

    /// Fills in a cluster id when the file did not carry one.
    pub fn ensure_cluster_id(&mut self) -> &str {
        if self.cluster_id.is_empty() {
            let id = uuid::Uuid::new_v4().simple().to_string();
            self.cluster_id = id[..8].to_string();
        }
        &self.cluster_id
    }

    fn master_ip(&self) -> Result<IpAddr> {
        self.first_consecutive_static_ip
            .parse::<IpAddr>()
            .ok()
            .context(error::InvalidConfigSnafu {
                reason: format!(
                    "firstConsecutiveStaticIP '{}' is not an IP address",
                    self.first_consecutive_static_ip
                ),
            })
    }

    pub fn master_hostname(&self) -> String {
        format!("{}-master-{}-0", self.orchestrator_name, self.cluster_id)
    }

    pub fn external_master_hostname(&self) -> String {
        format!("{}.{}.cloudapp.azure.com", self.dns_prefix, self.location)
    }

    /// Builds a fresh [`Config`] for one generation run.
    pub fn to_config(&self) -> Result<Config> {
        self.validate()?;
        let master = Master::new(self.master_hostname(), vec![self.master_ip()?], DEFAULT_MASTER_PORT);

        let mut config = Config::new(master, self.external_master_hostname());
        config.cluster_username = self.cluster_username.clone();
        config.cluster_password = self.cluster_password.clone();
        config.enable_aad_authentication = self.enable_aad_authentication;
        config.azure_config = AzureConfig {
            tenant_id: self.tenant_id.clone(),
            subscription_id: self.subscription_id.clone(),
            aad_client_id: self.aad_client_id.clone(),
            aad_client_secret: self.aad_client_secret.clone(),
            resource_group: self.resource_group.clone(),
            location: self.location.clone(),
            security_group_name: format!(
                "{}-master-{}-nsg",
                self.orchestrator_name, self.cluster_id
            ),
            primary_availability_set_name: format!("compute-availabilityset-{}", self.cluster_id),
        };
        Ok(config)
    }
}
