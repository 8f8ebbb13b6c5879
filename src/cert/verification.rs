// src/cert/verification.rs
use super::ca::ca_certificates;
use super::master::{etcd_certificates, master_certificates, signer_name};
use super::node::bootstrap_certificate;
use super::types::CertificateConfig;
use super::CertificateStore;
use crate::config::Config;
use crate::error::{self, Result};
use log::debug;
use snafu::{ensure, OptionExt, ResultExt};

impl Config {
    /// Checks that every prepared CA is self-signed and every prepared leaf
    /// was signed by the CA it names.
    pub fn verify_certificates(&self) -> Result<()> {
        for config in ca_certificates(self.created_at()) {
            if let Some(ca) = self.cas.get(&config.name) {
                let ok = ca
                    .cert()
                    .verify(ca.key())
                    .context(error::CertificateBuildSnafu { name: &config.name })?;
                ensure!(
                    ok,
                    error::CertificateVerifySnafu {
                        name: &config.name,
                        signer: &config.name,
                    }
                );
            }
        }

        let mut leaves = master_certificates(&self.master, &self.external_master_hostname)?;
        leaves.push(bootstrap_certificate());
        self.verify_leaves(&leaves, &self.master.certs)?;
        self.verify_leaves(&etcd_certificates(&self.master)?, &self.master.etcd_certs)?;

        debug!("All prepared certificates verified");
        Ok(())
    }

    fn verify_leaves(&self, configs: &[CertificateConfig], store: &CertificateStore) -> Result<()> {
        for config in configs {
            let leaf = match store.get(&config.name) {
                Some(leaf) => leaf,
                None => continue,
            };
            let signer = signer_name(config)?;
            let ca = self.cas.get(signer).context(error::MissingSignerSnafu {
                name: &config.name,
                signer,
            })?;
            let ok = leaf
                .cert()
                .verify(ca.key())
                .context(error::CertificateBuildSnafu { name: &config.name })?;
            ensure!(
                ok,
                error::CertificateVerifySnafu {
                    name: &config.name,
                    signer,
                }
            );
        }
        Ok(())
    }
}
