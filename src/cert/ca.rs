// src/cert/ca.rs
use super::master::ETCD_CA;
use super::openssl::issue_certificate;
use super::types::{AuthorityKeyId, CertificateConfig};
use crate::config::Config;
use crate::error::Result;
use chrono::{DateTime, Utc};
use log::info;

/// Cluster root CA. Signs every master leaf that does not name another signer.
pub const ROOT_CA: &str = "etc/origin/master/ca";
pub const FRONT_PROXY_CA: &str = "etc/origin/master/front-proxy-ca";
pub const FRONTPROXY_CA: &str = "etc/origin/master/frontproxy-ca";
pub const SERVICE_SIGNER: &str = "etc/origin/master/service-signer";
pub const SERVICE_CATALOG_CA: &str = "etc/origin/service-catalog/ca";

/// The self-signed authorities of a cluster, in issuance order.
pub fn ca_certificates(now: DateTime<Utc>) -> Vec<CertificateConfig> {
    let stamp = now.timestamp();
    let mut etcd_ca = CertificateConfig::ca(ETCD_CA, format!("etcd-signer@{}", stamp));
    etcd_ca.key_size = 4096;
    etcd_ca.max_path_len_zero = true;
    etcd_ca.authority_key_id = AuthorityKeyId::IssuerAndSerial;

    vec![
        CertificateConfig::ca(ROOT_CA, format!("openshift-signer@{}", stamp)),
        CertificateConfig::ca(FRONT_PROXY_CA, format!("openshift-signer@{}", stamp)),
        CertificateConfig::ca(FRONTPROXY_CA, format!("aggregator-proxy-car@{}", stamp)),
        etcd_ca,
        CertificateConfig::ca(
            SERVICE_SIGNER,
            format!("openshift-service-serving-signer@{}", stamp),
        ),
        CertificateConfig::ca(SERVICE_CATALOG_CA, "service-catalog-signer"),
    ]
}

impl Config {
    /// Issues whichever cluster CAs are not already in the CA store.
    pub(crate) fn prepare_certificate_authorities(&mut self) -> Result<()> {
        let now = self.created_at();
        for config in ca_certificates(now) {
            if self.cas.contains(&config.name) {
                info!("Using existing certificate authority {}", config.name);
                continue;
            }
            let serial = &self.serial;
            self.cas.get_or_issue(&config.name, || {
                issue_certificate(&config, serial.next(), now, None)
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn etcd_ca_is_special() {
        let cas = ca_certificates(Utc::now());
        let etcd = cas.iter().find(|c| c.name == ETCD_CA).unwrap();
        assert_eq!(etcd.key_size, 4096);
        assert!(etcd.max_path_len_zero);
        assert_eq!(etcd.authority_key_id, AuthorityKeyId::IssuerAndSerial);

        for ca in cas.iter().filter(|c| c.name != ETCD_CA) {
            assert_eq!(ca.key_size, 2048);
            assert!(ca.usage.is_ca());
            assert!(ca.signer.is_none());
        }
    }

    #[test]
    fn common_names_carry_timestamp() {
        let now = Utc::now();
        let cas = ca_certificates(now);
        assert_eq!(cas[0].common_name, format!("openshift-signer@{}", now.timestamp()));
        assert_eq!(cas.last().unwrap().common_name, "service-catalog-signer");
    }
}
