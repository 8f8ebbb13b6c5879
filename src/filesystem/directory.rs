// src/filesystem/directory.rs
use super::{ancestors, Fileinfo, Sink};
use crate::error::{self, Result};
use log::debug;
use snafu::{ensure, ResultExt};
use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Owner and group a path should have but was written without.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ownership {
    pub path: String,
    pub user: String,
    pub group: String,
}

/// A [`Sink`] that materializes the bundle as a directory tree.
///
/// Modes are applied exactly. Changing ownership to a named user needs
/// privileges this process usually lacks, so ownership is not applied here:
/// every entry is recorded in [`DirectorySink::deferred_ownership`] for a
/// privileged caller to apply.
#[derive(Debug)]
pub struct DirectorySink {
    root: PathBuf,
    dirs: BTreeSet<String>,
    ownership: Vec<Ownership>,
    closed: bool,
}

impl DirectorySink {
    /// Removes whatever is at `root` and starts from an empty directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        match fs::remove_dir_all(&root) {
            Ok(()) => debug!("Removed existing output directory {}", root.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e).context(error::SinkSetupSnafu { path: root }),
        }
        fs::create_dir_all(&root).context(error::SinkSetupSnafu { path: &root })?;

        Ok(Self {
            root,
            dirs: BTreeSet::new(),
            ownership: Vec::new(),
            closed: false,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn deferred_ownership(&self) -> &[Ownership] {
        &self.ownership
    }

    /// Removes everything written so far, including the root itself. Used
    /// when a bundle could not be completed.
    pub fn discard(mut self) -> Result<()> {
        self.closed = true;
        debug!("Discarding partial output at {}", self.root.display());
        match fs::remove_dir_all(&self.root) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => {
                Err(e).context(error::SinkSetupSnafu { path: &self.root })
            }
            _ => Ok(()),
        }
    }

    fn ensure_open(&self, path: &str) -> Result<()> {
        ensure!(!self.closed, error::SinkClosedSnafu { path });
        Ok(())
    }

    fn defer_ownership(&mut self, path: &str, info: &Fileinfo) {
        debug!("Deferring ownership {}:{} of {}", info.user, info.group, path);
        self.ownership.push(Ownership {
            path: path.to_string(),
            user: info.user.clone(),
            group: info.group.clone(),
        });
    }

    fn create_dir(&mut self, path: &str, info: &Fileinfo) -> Result<()> {
        let full = self.root.join(path);
        fs::create_dir(&full).context(error::SinkMkdirSnafu { path })?;
        set_mode(&full, info.mode).context(error::SinkMkdirSnafu { path })?;
        self.defer_ownership(path, info);
        self.dirs.insert(path.to_string());
        Ok(())
    }

    fn ensure_parents(&mut self, path: &str) -> Result<()> {
        for dir in ancestors(path) {
            if !self.dirs.contains(dir) {
                self.create_dir(dir, &Fileinfo::implicit_dir())?;
            }
        }
        Ok(())
    }
}

impl Sink for DirectorySink {
    fn mkdir(&mut self, path: &str, info: &Fileinfo) -> Result<()> {
        self.ensure_open(path)?;
        ensure!(
            !self.dirs.contains(path),
            error::DirectoryExistsSnafu { path }
        );
        self.ensure_parents(path)?;
        self.create_dir(path, info)
    }

    fn write_file(&mut self, path: &str, data: &[u8], info: &Fileinfo) -> Result<()> {
        self.ensure_open(path)?;
        self.ensure_parents(path)?;
        let full = self.root.join(path);
        let mut file = create_file(&full, info.mode).context(error::SinkWriteSnafu { path })?;
        file.write_all(data).context(error::SinkWriteSnafu { path })?;
        self.defer_ownership(path, info);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            debug!(
                "Closed {} with {} entries awaiting ownership",
                self.root.display(),
                self.ownership.len()
            );
        }
        self.closed = true;
        Ok(())
    }
}

/// Opens `path` for writing with `mode` already in place, so contents never
/// sit in a file with broader permissions.
#[cfg(unix)]
fn create_file(path: &Path, mode: u32) -> io::Result<fs::File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
    let file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode & 0o777)
        .open(path)?;
    // The open mode is filtered by the umask and skipped for existing files.
    file.set_permissions(fs::Permissions::from_mode(mode))?;
    Ok(file)
}

#[cfg(not(unix))]
fn create_file(path: &Path, _mode: u32) -> io::Result<fs::File> {
    fs::File::create(path)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}
