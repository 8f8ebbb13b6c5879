// src/filesystem/mod.rs
mod archive;
mod directory;
mod policy;

pub use archive::{archive_entries, read_archive_file, ArchiveEntry, ArchiveSink};
pub use directory::{DirectorySink, Ownership};
pub use policy::{FilePermissionPolicy, Override, PolicyRule, PRIVATE_KEY_MODE};

use crate::error::Result;
use log::trace;

/// Mode given to directories a sink creates on its own for a nested path.
pub const IMPLICIT_DIR_MODE: u32 = 0o755;

/// Ownership and permission bits attached to one bundle entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fileinfo {
    pub user: String,
    pub group: String,
    pub mode: u32,
}

impl Fileinfo {
    pub fn new(user: &str, group: &str, mode: u32) -> Self {
        Self {
            user: user.to_string(),
            group: group.to_string(),
            mode,
        }
    }

    pub(crate) fn implicit_dir() -> Self {
        Self::new("root", "root", IMPLICIT_DIR_MODE)
    }
}

impl Default for Fileinfo {
    fn default() -> Self {
        Self::new("root", "root", 0o644)
    }
}

/// Destination for generated bundle entries.
///
/// Paths are relative and `/`-separated. Parent directories of a file are
/// created on demand; `mkdir` is only needed for directories that carry
/// their own ownership or mode. Creating the same directory explicitly
/// twice is an error.
pub trait Sink {
    fn mkdir(&mut self, path: &str, info: &Fileinfo) -> Result<()>;

    fn write_file(&mut self, path: &str, data: &[u8], info: &Fileinfo) -> Result<()>;

    /// Flushes and finalizes the sink. Nothing may be written afterwards.
    fn close(&mut self) -> Result<()>;
}

/// A sink paired with the permission policy every entry is resolved against.
pub struct PolicySink<'a> {
    sink: &'a mut dyn Sink,
    policy: &'a FilePermissionPolicy,
}

impl<'a> PolicySink<'a> {
    pub fn new(sink: &'a mut dyn Sink, policy: &'a FilePermissionPolicy) -> Self {
        Self { sink, policy }
    }

    pub fn write(&mut self, path: &str, data: &[u8]) -> Result<()> {
        let info = self.policy.resolve(path);
        trace!("Writing {} ({}:{} {:o})", path, info.user, info.group, info.mode);
        self.sink.write_file(path, data, &info)
    }

    pub fn mkdir(&mut self, path: &str) -> Result<()> {
        let info = self.policy.resolve(path);
        trace!("Creating {} ({}:{} {:o})", path, info.user, info.group, info.mode);
        self.sink.mkdir(path, &info)
    }
}

/// Every proper ancestor of `path`, outermost first: `a/b/c` gives `a`, `a/b`.
pub(crate) fn ancestors(path: &str) -> Vec<&str> {
    path.match_indices('/')
        .map(|(idx, _)| &path[..idx])
        .filter(|dir| !dir.is_empty())
        .collect()
}
