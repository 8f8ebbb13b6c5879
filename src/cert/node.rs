// src/cert/node.rs
use super::ca::ROOT_CA;
use super::master::NODE_BOOTSTRAPPER;
use super::openssl::{issue_certificate, private_key_to_pem};
use super::types::{CertificateConfig, CertificateUsage};
use super::write_cert;
use crate::config::Config;
use crate::error::Result;
use crate::filesystem::PolicySink;
use log::debug;

pub const NODE_CA_CERT: &str = "etc/origin/node/ca.crt";
pub const NODE_BOOTSTRAPPER_CERT: &str = "etc/origin/node/node-bootstrapper.crt";
pub const NODE_BOOTSTRAPPER_KEY: &str = "etc/origin/node/node-bootstrapper.key";

/// Client identity a node presents while it registers itself with the master.
pub fn bootstrap_certificate() -> CertificateConfig {
    CertificateConfig::leaf(
        NODE_BOOTSTRAPPER,
        "system:serviceaccount:openshift-infra:node-bootstrapper",
        CertificateUsage::ClientAuth,
        ROOT_CA,
    )
}

impl Config {
    /// Issues the node bootstrap client certificate, signed by the root CA.
    pub fn prepare_bootstrap_certs(&mut self) -> Result<()> {
        let now = self.created_at();
        let config = bootstrap_certificate();
        let signer = self.cas.require(ROOT_CA)?;
        let serial = &self.serial;
        self.master.certs.get_or_issue(NODE_BOOTSTRAPPER, || {
            issue_certificate(&config, serial.next(), now, Some(signer))
        })?;
        Ok(())
    }

    pub fn write_bootstrap_certs(&self, sink: &mut PolicySink<'_>) -> Result<()> {
        let root = self.cas.require(ROOT_CA)?;
        let bootstrapper = self.master.certs.require(NODE_BOOTSTRAPPER)?;

        write_cert(NODE_CA_CERT, ROOT_CA, root, sink)?;
        write_cert(NODE_BOOTSTRAPPER_CERT, NODE_BOOTSTRAPPER, bootstrapper, sink)?;
        let key = private_key_to_pem(NODE_BOOTSTRAPPER, bootstrapper.key())?;
        sink.write(NODE_BOOTSTRAPPER_KEY, &key)?;
        debug!("Wrote node bootstrap certificates");
        Ok(())
    }
}
