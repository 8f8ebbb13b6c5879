// src/cert/service_account.rs
use super::openssl::{generate_private_key, private_key_to_pem, public_key_to_pem};
use crate::config::Config;
use crate::error::{self, Result};
use crate::filesystem::PolicySink;
use snafu::OptionExt;

pub const SERVICE_ACCOUNT_PRIVATE_KEY: &str = "etc/origin/master/serviceaccounts.private.key";
pub const SERVICE_ACCOUNT_PUBLIC_KEY: &str = "etc/origin/master/serviceaccounts.public.key";

const SERVICE_ACCOUNT_KEY_BITS: u32 = 2048;

impl Config {
    /// Generates the key pair the master signs service-account tokens with.
    pub(crate) fn prepare_service_account_keypair(&mut self) -> Result<()> {
        if self.master.service_account_key.is_none() {
            let key = generate_private_key(SERVICE_ACCOUNT_PRIVATE_KEY, SERVICE_ACCOUNT_KEY_BITS)?;
            self.master.service_account_key = Some(key);
        }
        Ok(())
    }

    pub fn write_master_keypair(&self, sink: &mut PolicySink<'_>) -> Result<()> {
        let key = self
            .master
            .service_account_key
            .as_ref()
            .context(error::MissingCertificateSnafu {
                name: SERVICE_ACCOUNT_PRIVATE_KEY,
            })?;

        let private = private_key_to_pem(SERVICE_ACCOUNT_PRIVATE_KEY, key)?;
        sink.write(SERVICE_ACCOUNT_PRIVATE_KEY, &private)?;
        let public = public_key_to_pem(SERVICE_ACCOUNT_PUBLIC_KEY, key)?;
        sink.write(SERVICE_ACCOUNT_PUBLIC_KEY, &public)
    }
}
