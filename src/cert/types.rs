// cert/types.rs
use openssl::pkey::{PKey, Private};
use openssl::x509::X509;
use std::fmt;
use std::net::IpAddr;

/// A certificate together with the private key it was issued for.
pub struct CertAndKey {
    cert: X509,
    key: PKey<Private>,
}

impl CertAndKey {
    pub fn new(cert: X509, key: PKey<Private>) -> Self {
        Self { cert, key }
    }

    pub fn cert(&self) -> &X509 {
        &self.cert
    }

    pub fn key(&self) -> &PKey<Private> {
        &self.key
    }
}

impl fmt::Debug for CertAndKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subject: Vec<String> = self
            .cert
            .subject_name()
            .entries()
            .filter_map(|e| e.data().as_utf8().ok().map(|s| s.to_string()))
            .collect();
        f.debug_struct("CertAndKey")
            .field("subject", &subject)
            .field("key_bits", &self.key.bits())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AltName {
    Dns(String),
    Ip(IpAddr),
}

impl AltName {
    pub fn dns(name: impl Into<String>) -> Self {
        AltName::Dns(name.into())
    }

    pub fn ip(addr: IpAddr) -> Self {
        AltName::Ip(addr)
    }
}

/// What a certificate is allowed to be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateUsage {
    CertificateAuthority,
    ClientAuth,
    ServerAuth,
    ClientAndServerAuth,
}

impl CertificateUsage {
    pub fn is_ca(self) -> bool {
        self == CertificateUsage::CertificateAuthority
    }
}

/// How the authority key identifier extension is filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorityKeyId {
    /// Key identifier of the signer, omitted on self-signed certificates.
    KeyId,
    /// Signer name and serial, plus its key identifier when there is a separate signer.
    /// etcd refuses peers whose chain lacks these.
    IssuerAndSerial,
}

#[derive(Debug, Clone)]
pub struct CertificateConfig {
    /// Logical name, also the output path without the `.crt`/`.key` suffix.
    pub name: String,
    pub common_name: String,
    pub organizations: Vec<String>,
    pub usage: CertificateUsage,
    pub alt_names: Vec<AltName>,
    pub validity_years: u32,
    pub key_size: u32,
    pub max_path_len_zero: bool,
    pub authority_key_id: AuthorityKeyId,
    /// Logical name of the signing CA; `None` for self-signed.
    pub signer: Option<String>,
}

impl CertificateConfig {
    pub fn ca(name: &str, common_name: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            common_name: common_name.into(),
            organizations: Vec::new(),
            usage: CertificateUsage::CertificateAuthority,
            alt_names: Vec::new(),
            validity_years: 5,
            key_size: 2048,
            max_path_len_zero: false,
            authority_key_id: AuthorityKeyId::KeyId,
            signer: None,
        }
    }

    pub fn leaf(name: &str, common_name: impl Into<String>, usage: CertificateUsage, signer: &str) -> Self {
        Self {
            name: name.to_string(),
            common_name: common_name.into(),
            organizations: Vec::new(),
            usage,
            alt_names: Vec::new(),
            validity_years: 2,
            key_size: 2048,
            max_path_len_zero: false,
            authority_key_id: AuthorityKeyId::KeyId,
            signer: Some(signer.to_string()),
        }
    }

    pub fn organizations(mut self, orgs: &[&str]) -> Self {
        self.organizations = orgs.iter().map(|o| o.to_string()).collect();
        self
    }

    pub fn alt_names(mut self, alt_names: Vec<AltName>) -> Self {
        self.alt_names = alt_names;
        self
    }

    pub fn validity_years(mut self, years: u32) -> Self {
        self.validity_years = years;
        self
    }
}
