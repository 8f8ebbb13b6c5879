/*!
Generates the bootstrap bundles for an OpenShift cluster.

A [`Config`] describes the master. The [`BundleOrchestrator`] issues the CA
hierarchy, leaf certificates, kubeconfigs and session secrets, renders the
role templates, and writes two bundles: one for the master and a smaller one
for nodes. Bundles go to any [`filesystem::Sink`], either a `.tar.gz` stream
or a directory tree, with ownership and modes taken from the
[`FilePermissionPolicy`].

```no_run
use cluster_bundle::{generate_bundles, ClusterSpec};

let mut spec = ClusterSpec::default();
spec.ensure_cluster_id();
let mut config = spec.to_config()?;
let bundles = generate_bundles(&mut config, &spec.orchestrator_version)?;
assert!(!bundles.node.is_empty());
# Ok::<(), cluster_bundle::Error>(())
```
*/

pub mod bundle;
pub mod cert;
pub mod config;
pub mod error;
pub mod filesystem;
pub mod kubeconfig;
pub mod template;
pub mod utils;

pub use bundle::{generate_bundles, BundleOrchestrator, Bundles};
pub use config::{ClusterSpec, Config, Master};
pub use error::{Error, ErrorKind, Result};
pub use filesystem::{ArchiveSink, DirectorySink, FilePermissionPolicy, Fileinfo, Sink};
pub use template::TemplateRenderer;
