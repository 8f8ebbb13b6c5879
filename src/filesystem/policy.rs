// src/filesystem/policy.rs
use super::Fileinfo;
use crate::error::{self, Result};
use regex::Regex;
use snafu::ResultExt;

/// Mode every private key is clamped to, whatever the table says.
pub const PRIVATE_KEY_MODE: u32 = 0o600;

/// Fields a rule sets; anything left `None` keeps the default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Override {
    pub user: Option<String>,
    pub group: Option<String>,
    pub mode: Option<u32>,
}

impl Override {
    pub fn mode(mode: u32) -> Self {
        Self {
            mode: Some(mode),
            ..Self::default()
        }
    }

    pub fn owner(user: &str, group: &str) -> Self {
        Self {
            user: Some(user.to_string()),
            group: Some(group.to_string()),
            mode: None,
        }
    }

    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }
}

#[derive(Debug, Clone)]
pub struct PolicyRule {
    pattern: Regex,
    apply: Override,
}

impl PolicyRule {
    pub fn new(pattern: &str, apply: Override) -> Result<Self> {
        let pattern = Regex::new(pattern).context(error::PolicyPatternSnafu { pattern })?;
        Ok(Self { pattern, apply })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

/// Maps a bundle-relative path to the owner, group and mode it is written with.
///
/// Rules are tried in order and the first match wins. Fields the matching
/// rule leaves unset fall back to `root:root 0644`.
#[derive(Debug, Clone)]
pub struct FilePermissionPolicy {
    rules: Vec<PolicyRule>,
}

impl FilePermissionPolicy {
    /// The ownership table for OpenShift master and node bundles.
    pub fn new() -> Result<Self> {
        Ok(Self::from_rules(vec![
            PolicyRule::new(r"^etc/etcd$", Override::owner("etcd", "etcd").with_mode(0o755))?,
            PolicyRule::new(r"^tmp$", Override::owner("root", "root").with_mode(0o1777))?,
            PolicyRule::new(r"^etc/etcd/.*\.key$", Override::owner("etcd", "etcd").with_mode(0o600))?,
            PolicyRule::new(r"^etc/etcd/.*$", Override::owner("etcd", "etcd"))?,
            PolicyRule::new(r".*\.key$", Override::mode(0o600))?,
            PolicyRule::new(r".*\.kubeconfig$", Override::mode(0o600))?,
            PolicyRule::new(r"^etc/origin/master/htpasswd$", Override::mode(0o600))?,
            PolicyRule::new(r"^etc/origin/master/session-secrets\.yaml$", Override::mode(0o600))?,
            PolicyRule::new(r"^etc/origin/cloudprovider/azure\.conf$", Override::mode(0o600))?,
        ]))
    }

    pub fn from_rules(rules: Vec<PolicyRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    pub fn resolve(&self, path: &str) -> Fileinfo {
        let mut info = Fileinfo::default();
        if let Some(rule) = self.rules.iter().find(|r| r.pattern.is_match(path)) {
            if let Some(user) = &rule.apply.user {
                info.user = user.clone();
            }
            if let Some(group) = &rule.apply.group {
                info.group = group.clone();
            }
            if let Some(mode) = rule.apply.mode {
                info.mode = mode;
            }
        }

        if path.ends_with(".key") {
            info.mode = PRIVATE_KEY_MODE;
        }
        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(path: &str) -> Fileinfo {
        FilePermissionPolicy::new().unwrap().resolve(path)
    }

    #[test]
    fn defaults_to_root_0644() {
        assert_eq!(resolve("etc/origin/master/master-config.yaml"), Fileinfo::default());
        assert_eq!(Fileinfo::default(), Fileinfo::new("root", "root", 0o644));
    }

    #[test]
    fn special_directories() {
        assert_eq!(resolve("tmp"), Fileinfo::new("root", "root", 0o1777));
        assert_eq!(resolve("etc/etcd"), Fileinfo::new("etcd", "etcd", 0o755));
    }

    #[test]
    fn etcd_files_owned_by_etcd() {
        assert_eq!(resolve("etc/etcd/peer.key"), Fileinfo::new("etcd", "etcd", 0o600));
        assert_eq!(resolve("etc/etcd/ca.crt"), Fileinfo::new("etcd", "etcd", 0o644));
    }

    #[test]
    fn secrets_are_owner_only() {
        for path in [
            "etc/origin/master/ca.key",
            "etc/origin/master/admin.kubeconfig",
            "etc/origin/node/bootstrap.kubeconfig",
            "etc/origin/master/htpasswd",
            "etc/origin/master/session-secrets.yaml",
            "etc/origin/cloudprovider/azure.conf",
        ] {
            let info = resolve(path);
            assert_eq!(info.mode & 0o077, 0, "{}", path);
            assert_eq!(info.user, "root", "{}", path);
        }
    }

    #[test]
    fn unset_fields_do_not_leak_between_rules() {
        // The etc/etcd rule sets an owner but the generic key rule does not.
        assert_eq!(resolve("etc/origin/master/master.etcd-ca.key").user, "root");
    }

    #[test]
    fn keys_clamped_even_when_a_rule_says_otherwise() {
        let policy = FilePermissionPolicy::from_rules(vec![PolicyRule::new(
            r"^etc/.*$",
            Override::mode(0o644),
        )
        .unwrap()]);
        assert_eq!(policy.resolve("etc/private.key").mode, PRIVATE_KEY_MODE);
        assert_eq!(policy.resolve("etc/public.crt").mode, 0o644);
    }

    #[test]
    fn rejects_bad_pattern() {
        let err = PolicyRule::new("(", Override::default()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
    }
}
