// src/cert/store.rs
use super::types::CertAndKey;
use crate::error::{self, Result};
use snafu::OptionExt;
use std::collections::BTreeMap;

/// Certificate material keyed by logical name.
///
/// Iteration is in name order so that everything written from a store
/// comes out in the same order on every run.
#[derive(Debug, Default)]
pub struct CertificateStore {
    entries: BTreeMap<String, CertAndKey>,
}

impl CertificateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&CertAndKey> {
        self.entries.get(name)
    }

    /// Like [`get`](Self::get), but a missing entry is an error.
    pub fn require(&self, name: &str) -> Result<&CertAndKey> {
        self.entries
            .get(name)
            .context(error::MissingCertificateSnafu { name })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Stores `entry` unless `name` is already present. Returns whether it was stored.
    pub fn insert(&mut self, name: &str, entry: CertAndKey) -> bool {
        if self.entries.contains_key(name) {
            return false;
        }
        self.entries.insert(name.to_string(), entry);
        true
    }

    /// Returns the entry for `name`, running `issue` only when it is absent.
    pub fn get_or_issue<F>(&mut self, name: &str, issue: F) -> Result<&CertAndKey>
    where
        F: FnOnce() -> Result<CertAndKey>,
    {
        if !self.entries.contains_key(name) {
            let entry = issue()?;
            self.entries.insert(name.to_string(), entry);
        }
        self.require(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CertAndKey)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
