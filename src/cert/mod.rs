// src/cert/mod.rs
mod ca;
mod master;
mod node;
pub mod openssl;
mod serial;
mod service_account;
mod store;
mod types;
mod verification;

pub use ca::{ca_certificates, ROOT_CA};
pub use node::bootstrap_certificate;
pub use master::{
    etcd_certificates, master_certificates, ADMIN, AGGREGATOR_FRONT_PROXY, ETCD_CA, NODE_BOOTSTRAPPER,
    OPENSHIFT_MASTER, SERVICE_IP,
};
pub use serial::SerialAllocator;
pub use service_account::{SERVICE_ACCOUNT_PRIVATE_KEY, SERVICE_ACCOUNT_PUBLIC_KEY};
pub use store::CertificateStore;
pub use types::{AltName, AuthorityKeyId, CertAndKey, CertificateConfig, CertificateUsage};

use crate::error::Result;
use crate::filesystem::PolicySink;

fn crt_path(name: &str) -> String {
    format!("{}.crt", name)
}

fn key_path(name: &str) -> String {
    format!("{}.key", name)
}

/// Writes `<name>.crt` and `<name>.key` for every entry in `store`.
fn write_store(store: &CertificateStore, sink: &mut PolicySink<'_>) -> Result<()> {
    for (name, entry) in store.iter() {
        write_pair(name, entry, sink)?;
    }
    Ok(())
}

fn write_pair(name: &str, entry: &CertAndKey, sink: &mut PolicySink<'_>) -> Result<()> {
    write_cert(&crt_path(name), name, entry, sink)?;
    let key = openssl::private_key_to_pem(name, entry.key())?;
    sink.write(&key_path(name), &key)
}

fn write_cert(path: &str, name: &str, entry: &CertAndKey, sink: &mut PolicySink<'_>) -> Result<()> {
    let pem = openssl::cert_to_pem(name, entry.cert())?;
    sink.write(path, &pem)
}
