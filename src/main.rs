// src/main.rs
use clap::{Parser, ValueEnum};
use cluster_bundle::bundle::OrchestratorVersion;
use cluster_bundle::utils::init_logging;
use cluster_bundle::{generate_bundles, BundleOrchestrator, ClusterSpec, DirectorySink, Sink};
use log::{info, warn};
use snafu::ResultExt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

mod error {
    use snafu::Snafu;
    use std::path::PathBuf;

    #[derive(Debug, Snafu)]
    #[snafu(visibility(pub(super)))]
    pub(super) enum Error {
        #[snafu(display("Failed to set up logging: {}", source))]
        Logger { source: std::io::Error },

        #[snafu(display("{}", source))]
        Bundle { source: cluster_bundle::Error },

        #[snafu(display(
            "Config file {} not found, create one with --init",
            path.display()
        ))]
        ConfigMissing { path: PathBuf },

        #[snafu(display("Failed to create output directory {}: {}", path.display(), source))]
        OutputDir {
            path: PathBuf,
            source: std::io::Error,
        },

        #[snafu(display("Failed to write bundle {}: {}", path.display(), source))]
        WriteBundle {
            path: PathBuf,
            source: std::io::Error,
        },
    }
}

type Result<T> = std::result::Result<T, error::Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// master.tar.gz and node.tar.gz
    Tgz,
    /// master/ and node/ directory trees
    Dir,
}

/// Generate OpenShift master and node bootstrap bundles.
#[derive(Parser)]
pub struct Args {
    #[arg(short, long, default_value = "cluster_config.json")]
    pub config: String,
    /// Write a default config file and exit
    #[arg(long)]
    pub init: bool,
    #[arg(short, long, default_value = "_output")]
    pub output: String,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Tgz)]
    pub format: OutputFormat,
    #[arg(short, long)]
    pub debug: bool,
    #[arg(long)]
    pub log_file: Option<String>,
}

fn load_spec(path: &Path, init: bool) -> Result<Option<ClusterSpec>> {
    if init {
        let mut spec = ClusterSpec::default();
        spec.ensure_cluster_id();
        spec.save_to_file(path).context(error::BundleSnafu)?;
        info!("Wrote default config to {}", path.display());
        return Ok(None);
    }
    snafu::ensure!(path.exists(), error::ConfigMissingSnafu { path });

    let mut spec = ClusterSpec::load_from_file(path).context(error::BundleSnafu)?;
    if spec.cluster_id.is_empty() {
        // Persist the generated id so later runs name the master the same way.
        spec.ensure_cluster_id();
        spec.save_to_file(path).context(error::BundleSnafu)?;
    }
    Ok(Some(spec))
}

fn write_archives(spec: &ClusterSpec, output: &Path) -> Result<()> {
    let mut config = spec.to_config().context(error::BundleSnafu)?;
    let bundles =
        generate_bundles(&mut config, &spec.orchestrator_version).context(error::BundleSnafu)?;

    for (name, bytes) in [("master.tar.gz", &bundles.master), ("node.tar.gz", &bundles.node)] {
        let path = output.join(name);
        fs::write(&path, bytes).context(error::WriteBundleSnafu { path: &path })?;
        info!("Wrote {} ({} bytes)", path.display(), bytes.len());
    }
    Ok(())
}

/// Writes one bundle tree, removing it again if any write fails.
fn write_tree<F>(root: &Path, write: F) -> Result<DirectorySink>
where
    F: FnOnce(&mut DirectorySink) -> cluster_bundle::Result<()>,
{
    let mut sink = DirectorySink::new(root).context(error::BundleSnafu)?;
    if let Err(e) = write(&mut sink).and_then(|()| sink.close()) {
        if let Err(cleanup) = sink.discard() {
            warn!("Could not remove partial bundle {}: {}", root.display(), cleanup);
        }
        return Err(e).context(error::BundleSnafu);
    }
    Ok(sink)
}

fn write_directories(spec: &ClusterSpec, output: &Path) -> Result<()> {
    spec.orchestrator_version
        .parse::<OrchestratorVersion>()
        .context(error::BundleSnafu)?;
    let mut config = spec.to_config().context(error::BundleSnafu)?;
    let orchestrator = BundleOrchestrator::with_defaults().context(error::BundleSnafu)?;
    orchestrator.prepare(&mut config).context(error::BundleSnafu)?;

    let master = write_tree(&output.join("master"), |sink| {
        orchestrator.write_master(&config, sink)
    })?;
    let node = write_tree(&output.join("node"), |sink| orchestrator.write_node(&config, sink))?;

    for sink in [&master, &node] {
        warn!(
            "{} entries under {} still need their owner applied",
            sink.deferred_ownership().len(),
            sink.root().display()
        );
        info!("Wrote {}", sink.root().display());
    }
    Ok(())
}

fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug, args.log_file.as_deref()).context(error::LoggerSnafu)?;

    let config_path = PathBuf::from(shellexpand::tilde(&args.config).into_owned());
    let spec = match load_spec(&config_path, args.init)? {
        Some(spec) => spec,
        None => return Ok(()),
    };

    let output = PathBuf::from(shellexpand::tilde(&args.output).into_owned());
    fs::create_dir_all(&output).context(error::OutputDirSnafu { path: &output })?;

    match args.format {
        OutputFormat::Tgz => write_archives(&spec, &output),
        OutputFormat::Dir => write_directories(&spec, &output),
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{}", e);
        process::exit(1);
    }
}
