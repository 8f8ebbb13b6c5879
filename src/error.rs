use snafu::Snafu;
use std::io;
use std::path::PathBuf;

/// Potential errors while preparing or writing cluster bundles.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Failed to gather random bytes for {}: {}", what, source))]
    Randomness {
        what: &'static str,
        source: openssl::error::ErrorStack,
    },

    #[snafu(display("Failed to generate {}-bit RSA key for '{}': {}", bits, name, source))]
    KeyGeneration {
        name: String,
        bits: u32,
        source: openssl::error::ErrorStack,
    },

    #[snafu(display("Failed to build certificate '{}': {}", name, source))]
    CertificateBuild {
        name: String,
        source: openssl::error::ErrorStack,
    },

    #[snafu(display("Certificate '{}' is signed by '{}', which has not been prepared", name, signer))]
    MissingSigner { name: String, signer: String },

    #[snafu(display("Certificate '{}' has not been prepared", name))]
    MissingCertificate { name: String },

    #[snafu(display("Kubeconfig '{}' has not been prepared", name))]
    MissingKubeConfig { name: String },

    #[snafu(display("Failed to PEM-encode '{}': {}", name, source))]
    PemEncode {
        name: String,
        source: openssl::error::ErrorStack,
    },

    #[snafu(display("Failed to load PEM material for '{}': {}", name, source))]
    PemDecode {
        name: String,
        source: openssl::error::ErrorStack,
    },

    #[snafu(display("Certificate '{}' failed verification against '{}'", name, signer))]
    CertificateVerify { name: String, signer: String },

    #[snafu(display("Failed to serialize kubeconfig '{}': {}", path, source))]
    KubeConfigSerialize {
        path: String,
        source: serde_yaml::Error,
    },

    #[snafu(display("Template '{}' not found in assets", name))]
    TemplateMissing { name: String },

    #[snafu(display("Template '{}' is not valid UTF-8: {}", name, source))]
    TemplateEncoding {
        name: String,
        source: std::str::Utf8Error,
    },

    #[snafu(display("Failed to parse template '{}': {}", name, source))]
    TemplateParse {
        name: String,
        source: handlebars::TemplateError,
    },

    #[snafu(display("Template '{}' failed to render: {}", name, source))]
    TemplateRender {
        name: String,
        source: handlebars::RenderError,
    },

    #[snafu(display("Failed to build template data: {}", source))]
    TemplateData { source: serde_json::Error },

    #[snafu(display("Failed to prepare output directory {}: {}", path.display(), source))]
    SinkSetup { path: PathBuf, source: io::Error },

    #[snafu(display("Failed to create directory '{}': {}", path, source))]
    SinkMkdir { path: String, source: io::Error },

    #[snafu(display("Directory '{}' was already created", path))]
    DirectoryExists { path: String },

    #[snafu(display("Failed to write '{}': {}", path, source))]
    SinkWrite { path: String, source: io::Error },

    #[snafu(display("Failed to finish {}: {}", what, source))]
    SinkClose {
        what: &'static str,
        source: io::Error,
    },

    #[snafu(display("Sink was already closed, cannot write '{}'", path))]
    SinkClosed { path: String },

    #[snafu(display("Archive writer failed earlier and cannot be used"))]
    ArchiveAborted,

    #[snafu(display("Failed to read '{}' from archive: {}", path, source))]
    ArchiveRead { path: String, source: io::Error },

    #[snafu(display("File '{}' not found in archive", path))]
    ArchiveEntryMissing { path: String },

    #[snafu(display("Failed to read config file {}: {}", path.display(), source))]
    ConfigRead { path: PathBuf, source: io::Error },

    #[snafu(display("Failed to write config file {}: {}", path.display(), source))]
    ConfigWrite { path: PathBuf, source: io::Error },

    #[snafu(display("Failed to serialize config for {}: {}", path.display(), source))]
    ConfigSerialize {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[snafu(display("Invalid JSON in config file {}: {}", path.display(), source))]
    ConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[snafu(display("Invalid permission policy pattern '{}': {}", pattern, source))]
    PolicyPattern {
        pattern: String,
        source: regex::Error,
    },

    #[snafu(display("Invalid cluster configuration: {}", reason))]
    InvalidConfig { reason: String },

    #[snafu(display("Unsupported orchestrator version '{}'", version))]
    UnsupportedVersion { version: String },
}

/// Coarse classification of [`Error`] values. None of these are retryable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Randomness,
    CertificateGeneration,
    Template,
    Sink,
    Config,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Randomness { .. } => ErrorKind::Randomness,
            Error::KeyGeneration { .. }
            | Error::CertificateBuild { .. }
            | Error::MissingSigner { .. }
            | Error::MissingCertificate { .. }
            | Error::MissingKubeConfig { .. }
            | Error::PemEncode { .. }
            | Error::PemDecode { .. }
            | Error::CertificateVerify { .. }
            | Error::KubeConfigSerialize { .. } => ErrorKind::CertificateGeneration,
            Error::TemplateMissing { .. }
            | Error::TemplateEncoding { .. }
            | Error::TemplateParse { .. }
            | Error::TemplateRender { .. }
            | Error::TemplateData { .. } => ErrorKind::Template,
            Error::SinkSetup { .. }
            | Error::SinkMkdir { .. }
            | Error::DirectoryExists { .. }
            | Error::SinkWrite { .. }
            | Error::SinkClose { .. }
            | Error::SinkClosed { .. }
            | Error::ArchiveAborted
            | Error::ArchiveRead { .. }
            | Error::ArchiveEntryMissing { .. } => ErrorKind::Sink,
            Error::ConfigRead { .. }
            | Error::ConfigWrite { .. }
            | Error::ConfigParse { .. }
            | Error::ConfigSerialize { .. }
            | Error::PolicyPattern { .. }
            | Error::InvalidConfig { .. }
            | Error::UnsupportedVersion { .. } => ErrorKind::Config,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
