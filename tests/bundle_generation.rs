use chrono::{TimeZone, Utc};
use cluster_bundle::cert::ROOT_CA;
use cluster_bundle::filesystem::{archive_entries, read_archive_file, ArchiveEntry, PolicySink};
use cluster_bundle::template::{
    EmbeddedTemplates, MemoryTemplates, PasswordHashError, PasswordHasher, TemplateRenderer,
};
use cluster_bundle::{
    generate_bundles, ArchiveSink, BundleOrchestrator, Config, DirectorySink, ErrorKind,
    FilePermissionPolicy, Fileinfo, Master, Result, Sink,
};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};
use std::sync::Arc;
use x509_parser::extensions::GeneralName;
use x509_parser::prelude::{FromDer, ParsedExtension, X509Certificate};

/// Records entries in the order a sink receives them.
#[derive(Debug, Default)]
struct MemorySink {
    entries: Vec<(String, bool, Fileinfo, Vec<u8>)>,
    closed: bool,
}

impl MemorySink {
    fn get(&self, path: &str) -> Option<&(String, bool, Fileinfo, Vec<u8>)> {
        self.entries.iter().find(|(p, ..)| p == path)
    }
}

impl Sink for MemorySink {
    fn mkdir(&mut self, path: &str, info: &Fileinfo) -> Result<()> {
        self.entries.push((path.to_string(), true, info.clone(), Vec::new()));
        Ok(())
    }

    fn write_file(&mut self, path: &str, data: &[u8], info: &Fileinfo) -> Result<()> {
        self.entries.push((path.to_string(), false, info.clone(), data.to_vec()));
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

/// Accepts a fixed number of bytes, then reports a full device.
struct ShortWriter {
    remaining: usize,
}

impl Write for ShortWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Err(io::Error::new(io::ErrorKind::Other, "device full"));
        }
        let n = buf.len().min(self.remaining);
        self.remaining -= n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash(&self, password: &str) -> std::result::Result<String, PasswordHashError> {
        Ok(format!("plain:{}", password))
    }
}

fn demo_config() -> Config {
    let master = Master::new("test-master-demo-0", vec!["10.0.0.1".parse().unwrap()], 8443);
    let mut config = Config::new(master, "demo.eastus.cloudapp.azure.com")
        .with_created_at(Utc.with_ymd_and_hms(2018, 3, 1, 12, 0, 0).unwrap());
    config.cluster_username = "demo".to_string();
    config.cluster_password = "s3cret".to_string();
    config
}

fn deterministic_orchestrator() -> BundleOrchestrator {
    BundleOrchestrator::new(
        FilePermissionPolicy::new().unwrap(),
        TemplateRenderer::new(Arc::new(EmbeddedTemplates::new()), Arc::new(PlainHasher)),
    )
}

fn paths(entries: &[ArchiveEntry]) -> BTreeSet<String> {
    entries.iter().map(|e| e.path.clone()).collect()
}

#[test]
fn master_bundle_layout() {
    let mut config = demo_config();
    config.prepare_master_certs().unwrap();
    config.prepare_master_kubeconfigs().unwrap();
    config.prepare_master_files().unwrap();
    config.prepare_bootstrap_kubeconfig().unwrap();

    let orchestrator = deterministic_orchestrator();
    let mut sink = MemorySink::default();
    orchestrator.write_master(&config, &mut sink).unwrap();

    assert!(sink.entries.iter().any(|(path, dir, info, _)| {
        path.starts_with("etc/etcd/") && !dir && info.mode == 0o600 && info.user == "etcd"
    }));
    assert!(sink
        .entries
        .iter()
        .any(|(path, _, info, _)| path.ends_with(".kubeconfig") && info.mode == 0o600));

    let (_, is_dir, info, _) = sink.get("tmp").unwrap();
    assert!(is_dir);
    assert_eq!(info.mode, 0o1777);
    assert!(!sink.closed, "writing leaves closing to the caller");
}

#[test]
fn private_material_is_owner_only() {
    let mut config = demo_config();
    let bundles = deterministic_orchestrator().generate(&mut config).unwrap();

    for bytes in [&bundles.master, &bundles.node] {
        for entry in archive_entries(bytes).unwrap() {
            let secret = entry.path.ends_with(".key")
                || entry.path.ends_with(".kubeconfig")
                || entry.path == "etc/origin/master/htpasswd";
            if secret {
                assert_eq!(entry.info.mode & 0o077, 0, "{}", entry.path);
            }
        }
    }
}

#[test]
fn node_bundle_is_a_strict_subset_without_ca_key() {
    let mut config = demo_config();
    let bundles = deterministic_orchestrator().generate(&mut config).unwrap();

    let master = archive_entries(&bundles.master).unwrap();
    let node = archive_entries(&bundles.node).unwrap();
    let master_paths = paths(&master);
    let node_paths = paths(&node);
    assert!(node_paths.is_subset(&master_paths));
    assert!(node_paths.len() < master_paths.len());

    let ca_key = read_archive_file(&bundles.master, &format!("{}.key", ROOT_CA)).unwrap();
    assert!(!ca_key.is_empty());
    for entry in &node {
        assert!(!entry.path.contains("etc/etcd"), "{}", entry.path);
        assert!(entry.contents != ca_key, "{}", entry.path);
        assert!(
            !entry.contents.windows(ca_key.len()).any(|w| w == ca_key.as_slice()),
            "{} embeds the root CA key",
            entry.path
        );
    }
}

#[test]
fn directories_precede_their_files_once() {
    let mut config = demo_config();
    let bundles = deterministic_orchestrator().generate(&mut config).unwrap();

    for bytes in [&bundles.master, &bundles.node] {
        let mut seen_dirs = BTreeSet::new();
        for entry in archive_entries(bytes).unwrap() {
            if entry.directory {
                assert!(seen_dirs.insert(entry.path.clone()), "{} twice", entry.path);
                continue;
            }
            let parts: Vec<&str> = entry.path.split('/').collect();
            for end in 1..parts.len() {
                let dir = parts[..end].join("/");
                assert!(seen_dirs.contains(&dir), "{} before {}", entry.path, dir);
            }
        }
    }
}

#[test]
fn entries_share_the_capture_time() {
    let mut config = demo_config();
    let expected = config.created_at().timestamp() as u64;
    let bundles = deterministic_orchestrator().generate(&mut config).unwrap();
    assert!(archive_entries(&bundles.master)
        .unwrap()
        .iter()
        .all(|e| e.mtime == expected));
}

#[test]
#[cfg(unix)]
fn directory_and_archive_sinks_agree() {
    use std::os::unix::fs::PermissionsExt;

    let orchestrator = deterministic_orchestrator();
    let mut config = demo_config();
    orchestrator.prepare(&mut config).unwrap();

    let mut archive = ArchiveSink::in_memory(0);
    orchestrator.write_master(&config, &mut archive).unwrap();
    let entries = archive_entries(&archive.into_inner().unwrap()).unwrap();

    let tmp = tempfile::TempDir::new().unwrap();
    let root = tmp.path().join("master");
    let mut directory = DirectorySink::new(&root).unwrap();
    orchestrator.write_master(&config, &mut directory).unwrap();
    directory.close().unwrap();

    let mut on_disk = BTreeMap::new();
    for item in walkdir::WalkDir::new(&root).min_depth(1) {
        let item = item.unwrap();
        let rel = item.path().strip_prefix(&root).unwrap().to_string_lossy().to_string();
        let mode = item.metadata().unwrap().permissions().mode() & 0o7777;
        let contents = if item.file_type().is_dir() {
            Vec::new()
        } else {
            std::fs::read(item.path()).unwrap()
        };
        on_disk.insert(rel, (mode, contents));
    }

    let in_archive: BTreeMap<_, _> = entries
        .iter()
        .map(|e| (e.path.clone(), (e.info.mode, e.contents.clone())))
        .collect();
    assert_eq!(in_archive, on_disk);

    let owners: BTreeMap<_, _> = directory
        .deferred_ownership()
        .iter()
        .map(|o| (o.path.clone(), (o.user.clone(), o.group.clone())))
        .collect();
    let archive_owners: BTreeMap<_, _> = entries
        .iter()
        .map(|e| (e.path.clone(), (e.info.user.clone(), e.info.group.clone())))
        .collect();
    assert_eq!(owners, archive_owners);
}

#[test]
fn template_failure_yields_no_bundle() {
    let templates = MemoryTemplates::new()
        .with("master/etc/origin/master/a.yaml", "{{master.hostname}}")
        .with("master/etc/origin/master/b.yaml", "{{missing_field}}")
        .with("node/etc/origin/node/c.yaml", "{{master.hostname}}");
    let orchestrator = BundleOrchestrator::new(
        FilePermissionPolicy::new().unwrap(),
        TemplateRenderer::new(Arc::new(templates), Arc::new(PlainHasher)),
    );

    let mut config = demo_config();
    let err = orchestrator.generate(&mut config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Template);

    let mut sink = MemorySink::default();
    assert!(orchestrator.write_master(&config, &mut sink).is_err());
    assert!(sink.get("etc/origin/master/a.yaml").is_none());
}

#[test]
fn interrupted_archive_is_never_handed_back() {
    let orchestrator = deterministic_orchestrator();
    let mut config = demo_config();
    orchestrator.prepare(&mut config).unwrap();

    let mut sink = ArchiveSink::new(ShortWriter { remaining: 64 }, 0);
    let written = orchestrator.write_master(&config, &mut sink);
    if let Err(e) = &written {
        assert_eq!(e.kind(), ErrorKind::Sink);
        assert!(sink
            .write_file("etc/origin/extra", b"x", &Fileinfo::default())
            .is_err());
    }
    let err = sink.into_inner().err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Sink);
}

#[test]
fn prepare_is_idempotent() {
    let orchestrator = deterministic_orchestrator();
    let mut config = demo_config();
    orchestrator.prepare(&mut config).unwrap();
    let serial = config.serial().current();
    let secret = config.auth_secret.clone();

    let first = orchestrator.generate(&mut config).unwrap();
    let second = orchestrator.generate(&mut config).unwrap();
    assert_eq!(config.serial().current(), serial);
    assert_eq!(config.auth_secret, secret);
    assert_eq!(first, second);
}

#[test]
fn server_certificate_names_the_master() {
    let mut config = demo_config();
    let bundles = deterministic_orchestrator().generate(&mut config).unwrap();
    let pem = read_archive_file(&bundles.master, "etc/origin/master/master.server.crt").unwrap();
    let der = openssl::x509::X509::from_pem(&pem).unwrap().to_der().unwrap();
    let (_, cert) = X509Certificate::from_der(&der).unwrap();

    let cn = cert
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .unwrap();
    assert_eq!(cn, "10.0.0.1");

    let mut dns = Vec::new();
    let mut ips = Vec::new();
    for ext in cert.extensions() {
        if let ParsedExtension::SubjectAlternativeName(san) = ext.parsed_extension() {
            for name in &san.general_names {
                match name {
                    GeneralName::DNSName(n) => dns.push(n.to_string()),
                    GeneralName::IPAddress(ip) => ips.push(ip.to_vec()),
                    _ => {}
                }
            }
        }
    }
    assert!(dns.contains(&"test-master-demo-0".to_string()));
    assert!(dns.contains(&"demo.eastus.cloudapp.azure.com".to_string()));
    assert!(dns.contains(&"kubernetes.default.svc.cluster.local".to_string()));
    assert!(ips.contains(&vec![10, 0, 0, 1]));
    assert!(ips.contains(&vec![172, 30, 0, 1]));
}

#[test]
fn policy_sink_applies_table_to_custom_writes() {
    let policy = FilePermissionPolicy::new().unwrap();
    let mut sink = MemorySink::default();
    let mut writer = PolicySink::new(&mut sink, &policy);
    writer.write("etc/etcd/extra.key", b"k").unwrap();
    drop(writer);
    assert_eq!(
        sink.get("etc/etcd/extra.key").unwrap().2,
        Fileinfo::new("etcd", "etcd", 0o600)
    );
}

#[test]
fn unsupported_version_is_a_config_error() {
    let mut config = demo_config();
    let err = generate_bundles(&mut config, "3.10.0").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);

    let bundles = generate_bundles(&mut config, "3.9.0").unwrap();
    let htpasswd = read_archive_file(&bundles.master, "etc/origin/master/htpasswd").unwrap();
    assert!(String::from_utf8(htpasswd).unwrap().starts_with("demo:$2"));
}
