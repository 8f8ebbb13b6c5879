use super::Config;
use crate::error::{self, Result};
use base64::{engine::general_purpose, Engine as _};
use log::debug;
use snafu::ResultExt;

/// Length in bytes of the session authentication and encryption secrets.
pub const SECRET_LENGTH: usize = 24;

pub fn generate_random_key(what: &'static str, length: usize) -> Result<String> {
    let mut buf = vec![0u8; length];
    openssl::rand::rand_bytes(&mut buf).context(error::RandomnessSnafu { what })?;
    Ok(general_purpose::STANDARD.encode(&buf))
}

impl Config {
    /// Creates the shared session secrets the master config templates embed.
    ///
    /// Secrets that are already set are kept.
    pub fn prepare_master_files(&mut self) -> Result<()> {
        if self.auth_secret.is_empty() {
            self.auth_secret = generate_random_key("session authentication secret", SECRET_LENGTH)?;
        }
        if self.enc_secret.is_empty() {
            self.enc_secret = generate_random_key("session encryption secret", SECRET_LENGTH)?;
        }
        debug!("Session secrets ready");
        Ok(())
    }
}
