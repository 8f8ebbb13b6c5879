//! Streams bundle entries into a gzip-compressed tar archive, and reads them back.

use super::{ancestors, Fileinfo, Sink};
use crate::error::{self, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::debug;
use snafu::{ensure, ResultExt};
use std::collections::BTreeSet;
use std::io::{self, Read, Write};
use std::mem;

enum State<W: Write> {
    Open(tar::Builder<GzEncoder<W>>),
    Closed(W),
    Failed,
}

/// A [`Sink`] producing a `.tar.gz` stream.
///
/// Every entry carries the resolved mode, owner and group names (numeric ids
/// are always 0), and the same modification time. Directories a file needs
/// are emitted once, before the file.
pub struct ArchiveSink<W: Write> {
    state: State<W>,
    mtime: u64,
    dirs: BTreeSet<String>,
}

impl ArchiveSink<Vec<u8>> {
    pub fn in_memory(mtime: u64) -> Self {
        Self::new(Vec::new(), mtime)
    }
}

impl<W: Write> ArchiveSink<W> {
    pub fn new(writer: W, mtime: u64) -> Self {
        let encoder = GzEncoder::new(writer, Compression::default());
        Self {
            state: State::Open(tar::Builder::new(encoder)),
            mtime,
            dirs: BTreeSet::new(),
        }
    }

    /// Closes the archive if needed and hands back the underlying writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.close()?;
        match self.state {
            State::Closed(writer) => Ok(writer),
            _ => error::ArchiveAbortedSnafu.fail(),
        }
    }

    fn builder(&mut self, path: &str) -> Result<&mut tar::Builder<GzEncoder<W>>> {
        match &mut self.state {
            State::Open(builder) => Ok(builder),
            State::Closed(_) => error::SinkClosedSnafu { path }.fail(),
            State::Failed => error::ArchiveAbortedSnafu.fail(),
        }
    }

    fn header(&self, info: &Fileinfo, entry_type: tar::EntryType, size: u64) -> io::Result<tar::Header> {
        let mut header = tar::Header::new_ustar();
        header.set_entry_type(entry_type);
        header.set_size(size);
        header.set_mode(info.mode);
        header.set_mtime(self.mtime);
        header.set_uid(0);
        header.set_gid(0);
        header.set_username(&info.user)?;
        header.set_groupname(&info.group)?;
        Ok(header)
    }

    fn append_dir(&mut self, path: &str, info: &Fileinfo) -> Result<()> {
        let mut header = self
            .header(info, tar::EntryType::Directory, 0)
            .context(error::SinkMkdirSnafu { path })?;
        self.append(path, &mut header, io::empty())?
            .context(error::SinkMkdirSnafu { path })?;
        self.dirs.insert(path.to_string());
        Ok(())
    }

    /// Appends one entry. A failed append leaves a truncated stream, so the
    /// sink refuses every later write and close.
    fn append<R: Read>(
        &mut self,
        path: &str,
        header: &mut tar::Header,
        data: R,
    ) -> Result<io::Result<()>> {
        let result = self.builder(path)?.append_data(header, path, data);
        if result.is_err() {
            debug!("Abandoning archive after failed write of {}", path);
            self.state = State::Failed;
        }
        Ok(result)
    }

    fn ensure_parents(&mut self, path: &str) -> Result<()> {
        for dir in ancestors(path) {
            if !self.dirs.contains(dir) {
                self.append_dir(dir, &Fileinfo::implicit_dir())?;
            }
        }
        Ok(())
    }
}

impl<W: Write> Sink for ArchiveSink<W> {
    fn mkdir(&mut self, path: &str, info: &Fileinfo) -> Result<()> {
        self.builder(path)?;
        ensure!(
            !self.dirs.contains(path),
            error::DirectoryExistsSnafu { path }
        );
        self.ensure_parents(path)?;
        self.append_dir(path, info)
    }

    fn write_file(&mut self, path: &str, data: &[u8], info: &Fileinfo) -> Result<()> {
        self.builder(path)?;
        self.ensure_parents(path)?;
        let mut header = self
            .header(info, tar::EntryType::Regular, data.len() as u64)
            .context(error::SinkWriteSnafu { path })?;
        self.append(path, &mut header, data)?
            .context(error::SinkWriteSnafu { path })
    }

    fn close(&mut self) -> Result<()> {
        match mem::replace(&mut self.state, State::Failed) {
            State::Open(builder) => {
                // The tar trailer has to be in the gzip stream before gzip finishes.
                let encoder = builder
                    .into_inner()
                    .context(error::SinkCloseSnafu { what: "tar stream" })?;
                let writer = encoder
                    .finish()
                    .context(error::SinkCloseSnafu { what: "gzip stream" })?;
                debug!("Closed archive with {} directories", self.dirs.len());
                self.state = State::Closed(writer);
                Ok(())
            }
            State::Closed(writer) => {
                self.state = State::Closed(writer);
                Ok(())
            }
            State::Failed => error::ArchiveAbortedSnafu.fail(),
        }
    }
}

/// One entry read back from a bundle archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: String,
    pub directory: bool,
    pub info: Fileinfo,
    pub mtime: u64,
    pub contents: Vec<u8>,
}

/// Every entry of a `.tar.gz` bundle, in stream order.
pub fn archive_entries(bytes: &[u8]) -> Result<Vec<ArchiveEntry>> {
    let what = "<archive>";
    let mut archive = tar::Archive::new(GzDecoder::new(bytes));
    let mut result = Vec::new();
    for entry in archive.entries().context(error::ArchiveReadSnafu { path: what })? {
        let mut entry = entry.context(error::ArchiveReadSnafu { path: what })?;
        let path = entry
            .path()
            .context(error::ArchiveReadSnafu { path: what })?
            .to_string_lossy()
            .trim_end_matches('/')
            .to_string();

        let header = entry.header();
        let directory = header.entry_type().is_dir();
        let mode = header
            .mode()
            .context(error::ArchiveReadSnafu { path: path.as_str() })?;
        let mtime = header
            .mtime()
            .context(error::ArchiveReadSnafu { path: path.as_str() })?;
        let user = header.username().ok().flatten().unwrap_or_default().to_string();
        let group = header.groupname().ok().flatten().unwrap_or_default().to_string();

        let mut contents = Vec::new();
        entry
            .read_to_end(&mut contents)
            .context(error::ArchiveReadSnafu { path: path.as_str() })?;

        result.push(ArchiveEntry {
            info: Fileinfo { user, group, mode },
            path,
            directory,
            mtime,
            contents,
        });
    }
    Ok(result)
}

/// Extracts the contents of the regular file at `path` from a `.tar.gz` bundle.
pub fn read_archive_file(bytes: &[u8], path: &str) -> Result<Vec<u8>> {
    archive_entries(bytes)?
        .into_iter()
        .find(|entry| !entry.directory && entry.path == path)
        .map(|entry| entry.contents)
        .ok_or_else(|| error::ArchiveEntryMissingSnafu { path }.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn sample() -> Vec<u8> {
        let mut sink = ArchiveSink::in_memory(1_500_000_000);
        sink.write_file("a/b/c", b"hello", &Fileinfo::new("etcd", "etcd", 0o600))
            .unwrap();
        sink.write_file("a/b/d", b"world", &Fileinfo::default()).unwrap();
        sink.write_file("a/e", b"", &Fileinfo::default()).unwrap();
        sink.into_inner().unwrap()
    }

    #[test]
    fn directories_precede_files_once() {
        let entries = archive_entries(&sample()).unwrap();
        let paths: Vec<_> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["a", "a/b", "a/b/c", "a/b/d", "a/e"]);
        assert!(entries[0].directory && entries[1].directory);
        assert_eq!(entries[0].info, Fileinfo::new("root", "root", 0o755));
    }

    #[test]
    fn entries_carry_names_mode_and_time() {
        let entries = archive_entries(&sample()).unwrap();
        let c = entries.iter().find(|e| e.path == "a/b/c").unwrap();
        assert_eq!(c.info, Fileinfo::new("etcd", "etcd", 0o600));
        assert_eq!(c.contents, b"hello");
        assert!(entries.iter().all(|e| e.mtime == 1_500_000_000));
    }

    #[test]
    fn reads_back_one_file() {
        let bytes = sample();
        assert_eq!(read_archive_file(&bytes, "a/b/d").unwrap(), b"world");
        let err = read_archive_file(&bytes, "a/b").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Sink);
    }

    #[test]
    fn readable_with_plain_tar_tooling() {
        let bytes = sample();
        let mut archive = tar::Archive::new(GzDecoder::new(&bytes[..]));
        let count = archive.entries().unwrap().count();
        assert_eq!(count, 5);
    }

    #[test]
    fn close_is_idempotent() {
        let mut sink = ArchiveSink::in_memory(0);
        sink.close().unwrap();
        sink.close().unwrap();
        assert!(archive_entries(&sink.into_inner().unwrap()).unwrap().is_empty());
    }

    /// Accepts a fixed number of bytes, then fails every write.
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

    fn noise(len: usize) -> Vec<u8> {
        let mut state = 0x2545_f491_u32;
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                state as u8
            })
            .collect()
    }

    #[test]
    fn failed_write_aborts_the_archive() {
        let mut sink = ArchiveSink::new(ShortWriter { remaining: 1024 }, 0);
        let err = sink
            .write_file("etc/big.bin", &noise(256 * 1024), &Fileinfo::default())
            .unwrap_err();
        assert!(matches!(err, error::Error::SinkWrite { ref path, .. } if path == "etc/big.bin"));

        let err = sink.write_file("etc/next", b"x", &Fileinfo::default()).unwrap_err();
        assert!(matches!(err, error::Error::ArchiveAborted));
        assert!(sink.mkdir("var", &Fileinfo::default()).is_err());
        assert!(sink.close().is_err());
        assert_eq!(sink.into_inner().err().map(|e| e.kind()), Some(ErrorKind::Sink));
    }
}
