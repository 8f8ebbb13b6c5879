// config/cluster.rs
use crate::cert::openssl::load_cert_and_key;
use crate::cert::{CertificateStore, SerialAllocator, ROOT_CA};
use crate::error::{self, Result};
use crate::kubeconfig::KubeConfig;
use chrono::{DateTime, Utc};
use openssl::pkey::{PKey, Private};
use serde::{Deserialize, Serialize};
use snafu::OptionExt;
use std::collections::BTreeMap;
use std::net::IpAddr;

/// Everything one bundle-generation run knows about the cluster, plus the
/// material it accumulates while preparing.
#[derive(Debug)]
pub struct Config {
    pub external_master_hostname: String,
    pub(crate) serial: SerialAllocator,
    pub(crate) cas: CertificateStore,
    pub auth_secret: String,
    pub enc_secret: String,
    pub master: Master,
    pub(crate) bootstrap: Option<KubeConfig>,
    pub cluster_username: String,
    pub cluster_password: String,
    pub enable_aad_authentication: bool,
    pub azure_config: AzureConfig,
    created_at: DateTime<Utc>,
}

/// Cloud-provider identity. Only ever copied into rendered files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzureConfig {
    pub tenant_id: String,
    pub subscription_id: String,
    pub aad_client_id: String,
    pub aad_client_secret: String,
    pub resource_group: String,
    pub location: String,
    pub security_group_name: String,
    pub primary_availability_set_name: String,
}

#[derive(Debug)]
pub struct Master {
    pub hostname: String,
    pub ips: Vec<IpAddr>,
    pub port: u16,

    pub(crate) certs: CertificateStore,
    pub(crate) etcd_certs: CertificateStore,
    pub(crate) kubeconfigs: BTreeMap<String, KubeConfig>,
    pub(crate) service_account_key: Option<PKey<Private>>,
}

impl Master {
    pub fn new(hostname: impl Into<String>, ips: Vec<IpAddr>, port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            ips,
            port,
            certs: CertificateStore::new(),
            etcd_certs: CertificateStore::new(),
            kubeconfigs: BTreeMap::new(),
            service_account_key: None,
        }
    }

    pub fn certs(&self) -> &CertificateStore {
        &self.certs
    }

    pub fn etcd_certs(&self) -> &CertificateStore {
        &self.etcd_certs
    }

    pub fn kubeconfigs(&self) -> &BTreeMap<String, KubeConfig> {
        &self.kubeconfigs
    }

    /// The address used as the server certificate common name.
    pub fn first_ip(&self) -> Result<IpAddr> {
        self.ips
            .first()
            .copied()
            .context(error::InvalidConfigSnafu {
                reason: format!("master '{}' has no IP addresses", self.hostname),
            })
    }
}

impl Config {
    pub fn new(master: Master, external_master_hostname: impl Into<String>) -> Self {
        Self {
            external_master_hostname: external_master_hostname.into(),
            serial: SerialAllocator::new(),
            cas: CertificateStore::new(),
            auth_secret: String::new(),
            enc_secret: String::new(),
            master,
            bootstrap: None,
            cluster_username: String::new(),
            cluster_password: String::new(),
            enable_aad_authentication: false,
            azure_config: AzureConfig::default(),
            created_at: Utc::now(),
        }
    }

    /// Pins the capture time used for certificate validity and archive timestamps.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Uses an existing root CA instead of generating one.
    pub fn with_root_ca(mut self, cert_pem: &[u8], key_pem: &[u8]) -> Result<Self> {
        let ca = load_cert_and_key(ROOT_CA, cert_pem, key_pem)?;
        self.cas.insert(ROOT_CA, ca);
        Ok(self)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn cas(&self) -> &CertificateStore {
        &self.cas
    }

    pub fn serial(&self) -> &SerialAllocator {
        &self.serial
    }

    pub fn bootstrap(&self) -> Option<&KubeConfig> {
        self.bootstrap.as_ref()
    }
}
