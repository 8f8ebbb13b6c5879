// src/cert/master.rs
use super::ca::{FRONTPROXY_CA, FRONT_PROXY_CA, ROOT_CA, SERVICE_CATALOG_CA};
use super::openssl::issue_certificate;
use super::types::{AltName, AuthorityKeyId, CertificateConfig, CertificateUsage};
use super::{crt_path, write_cert, write_store};
use crate::config::{Config, Master};
use crate::error::{self, Result};
use crate::filesystem::PolicySink;
use log::info;
use snafu::OptionExt;
use std::net::{IpAddr, Ipv4Addr};

pub const ETCD_CA: &str = "etc/origin/master/master.etcd-ca";
pub const ETCD_CLIENT: &str = "etc/origin/master/master.etcd-client";
pub const ADMIN: &str = "etc/origin/master/admin";
pub const AGGREGATOR_FRONT_PROXY: &str = "etc/origin/master/aggregator-front-proxy";
pub const OPENSHIFT_MASTER: &str = "etc/origin/master/openshift-master";
pub const NODE_BOOTSTRAPPER: &str = "etc/origin/master/node-bootstrapper";

/// First address of the cluster service network; the API service answers on it.
pub const SERVICE_IP: IpAddr = IpAddr::V4(Ipv4Addr::new(172, 30, 0, 1));

/// Names the API server answers to, inside and outside the cluster.
fn server_alt_names(master: &Master, external_hostname: &str) -> Vec<AltName> {
    let mut ips = master.ips.clone();
    ips.push(SERVICE_IP);

    let mut names: Vec<AltName> = [
        external_hostname,
        "kubernetes",
        "kubernetes.default",
        "kubernetes.default.svc",
        "kubernetes.default.svc.cluster.local",
        master.hostname.as_str(),
        "openshift",
        "openshift.default",
        "openshift.default.svc",
        "openshift.default.svc.cluster.local",
    ]
    .iter()
    .map(|name| AltName::dns(*name))
    .collect();
    names.extend(ips.iter().map(|ip| AltName::dns(ip.to_string())));
    names.extend(ips.into_iter().map(AltName::ip));
    names
}

fn master_alt_names(master: &Master, first_ip: IpAddr) -> Vec<AltName> {
    vec![AltName::dns(master.hostname.as_str()), AltName::ip(first_ip)]
}

/// Leaf certificates held by the master role, other than the node bootstrap client.
pub fn master_certificates(master: &Master, external_hostname: &str) -> Result<Vec<CertificateConfig>> {
    use CertificateUsage::{ClientAuth, ServerAuth};

    let first_ip = master.first_ip()?;
    let server_names = server_alt_names(master, external_hostname);

    let mut etcd_client =
        CertificateConfig::leaf(ETCD_CLIENT, master.hostname.as_str(), ClientAuth, ETCD_CA)
            .alt_names(master_alt_names(master, first_ip));
    etcd_client.authority_key_id = AuthorityKeyId::IssuerAndSerial;

    Ok(vec![
        CertificateConfig::leaf(ADMIN, "system:admin", ClientAuth, ROOT_CA)
            .organizations(&["system:cluster-admins", "system:masters"]),
        CertificateConfig::leaf(
            AGGREGATOR_FRONT_PROXY,
            "aggregator-front-proxy",
            ClientAuth,
            FRONT_PROXY_CA,
        ),
        CertificateConfig::leaf(
            "etc/origin/master/etcd.server",
            first_ip.to_string(),
            ServerAuth,
            ROOT_CA,
        )
        .alt_names(server_names.clone()),
        etcd_client,
        CertificateConfig::leaf(
            "etc/origin/master/master.kubelet-client",
            "system:openshift-node-admin",
            ClientAuth,
            ROOT_CA,
        )
        .organizations(&["system:node-admins"]),
        CertificateConfig::leaf(
            "etc/origin/master/master.proxy-client",
            "system:master-proxy",
            ClientAuth,
            ROOT_CA,
        ),
        CertificateConfig::leaf(
            "etc/origin/master/master.server",
            first_ip.to_string(),
            ServerAuth,
            ROOT_CA,
        )
        .alt_names(server_names),
        CertificateConfig::leaf(
            "etc/origin/master/openshift-aggregator",
            "system:openshift-aggregator",
            ClientAuth,
            FRONTPROXY_CA,
        ),
        CertificateConfig::leaf(
            OPENSHIFT_MASTER,
            "system:openshift-master",
            ClientAuth,
            ROOT_CA,
        )
        .organizations(&["system:masters", "system:openshift-master"]),
        CertificateConfig::leaf(
            "etc/origin/service-catalog/apiserver",
            "apiserver.kube-service-catalog",
            ServerAuth,
            SERVICE_CATALOG_CA,
        )
        .alt_names(vec![
            AltName::dns("apiserver.kube-service-catalog"),
            AltName::dns("apiserver.kube-service-catalog.svc"),
            AltName::dns("apiserver.kube-service-catalog.svc.cluster.local"),
        ]),
    ])
}

/// etcd's own peer and server certificates, valid as long as its CA.
pub fn etcd_certificates(master: &Master) -> Result<Vec<CertificateConfig>> {
    use CertificateUsage::{ClientAndServerAuth, ServerAuth};

    let first_ip = master.first_ip()?;
    Ok([("etc/etcd/peer", ClientAndServerAuth), ("etc/etcd/server", ServerAuth)]
        .into_iter()
        .map(|(name, usage)| {
            let mut config = CertificateConfig::leaf(name, master.hostname.as_str(), usage, ETCD_CA)
                .alt_names(master_alt_names(master, first_ip))
                .validity_years(5);
            config.authority_key_id = AuthorityKeyId::IssuerAndSerial;
            config
        })
        .collect())
}

impl Config {
    /// Issues the CA hierarchy, the master and etcd leaves, the node bootstrap
    /// client and the service-account key pair.
    ///
    /// Anything already present is kept, so calling this twice is a no-op.
    pub fn prepare_master_certs(&mut self) -> Result<()> {
        self.prepare_certificate_authorities()?;

        let now = self.created_at();
        let leaves = master_certificates(&self.master, &self.external_master_hostname)?;
        for config in &leaves {
            let signer = signer_name(config)?;
            let signer = self.cas.get(signer).context(error::MissingSignerSnafu {
                name: &config.name,
                signer,
            })?;
            let serial = &self.serial;
            self.master.certs.get_or_issue(&config.name, || {
                issue_certificate(config, serial.next(), now, Some(signer))
            })?;
        }

        for config in &etcd_certificates(&self.master)? {
            let signer = self.cas.require(ETCD_CA)?;
            let serial = &self.serial;
            self.master.etcd_certs.get_or_issue(&config.name, || {
                issue_certificate(config, serial.next(), now, Some(signer))
            })?;
        }

        self.prepare_bootstrap_certs()?;
        self.prepare_service_account_keypair()?;

        info!(
            "Prepared {} CAs, {} master and {} etcd certificates",
            self.cas.len(),
            self.master.certs.len(),
            self.master.etcd_certs.len()
        );
        Ok(())
    }

    /// Writes every CA, the CA bundles, and the master and etcd leaves.
    pub fn write_master_certs(&self, sink: &mut PolicySink<'_>) -> Result<()> {
        let root = self.cas.require(ROOT_CA)?;
        let etcd_ca = self.cas.require(ETCD_CA)?;
        for name in [NODE_BOOTSTRAPPER, ADMIN, OPENSHIFT_MASTER] {
            self.master.certs.require(name)?;
        }

        write_store(&self.cas, sink)?;
        write_cert("etc/origin/master/ca-bundle.crt", ROOT_CA, root, sink)?;
        write_cert("etc/origin/master/client-ca-bundle.crt", ROOT_CA, root, sink)?;
        write_cert("etc/etcd/ca.crt", ETCD_CA, etcd_ca, sink)?;
        write_store(&self.master.certs, sink)?;
        write_store(&self.master.etcd_certs, sink)?;

        info!("Wrote master certificates, CA at {}", crt_path(ROOT_CA));
        Ok(())
    }
}

pub(super) fn signer_name(config: &CertificateConfig) -> Result<&str> {
    config
        .signer
        .as_deref()
        .context(error::MissingSignerSnafu {
            name: &config.name,
            signer: "<none>",
        })
}
