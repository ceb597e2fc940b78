//! File storage
//!
//! Crash-safe whole-file replacement.
//!
//! ## Replace Sequence
//! 1. Stream new contents into a uniquely named temporary file, fsync
//! 2. Remove any stale backup
//! 3. Rename primary → backup (absent on first write)
//! 4. Rename temporary → primary
//! 5. Remove backup
//!
//! At every instant either the old or the new contents are reachable at the
//! primary or backup path, and reads fall back to the backup when the
//! primary is missing.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;

use crate::config::DEFAULT_READ_BLOCK_SIZE;
use crate::error::Result;

use super::Storage;

/// Suffix of the backup file
pub const BACKUP_SUFFIX: &str = ".backup";

/// Marker in temporary file names, followed by `{millis}-{random}` in base 36
pub const TEMPORARY_INFIX: &str = ".temporary-";

/// Archive stored in a single file at `path`
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
    backup_path: PathBuf,
    block_size: usize,
}

impl FileStorage {
    /// Storage at `path` with the default read block size
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_block_size(path, DEFAULT_READ_BLOCK_SIZE)
    }

    pub fn with_block_size(path: impl Into<PathBuf>, block_size: usize) -> Self {
        let path = path.into();
        let backup_path = suffixed(&path, BACKUP_SUFFIX);
        Self {
            path,
            backup_path,
            block_size: block_size.max(1),
        }
    }

    /// Path of the primary file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the transient backup file
    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    /// Fresh temporary path next to the primary
    fn temporary_path(&self) -> PathBuf {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let random: u32 = rand::random();
        suffixed(
            &self.path,
            &format!(
                "{}{}-{}",
                TEMPORARY_INFIX,
                to_base36(millis),
                to_base36(random as u64)
            ),
        )
    }

    /// Primary if present, else backup, else nothing
    fn open_current(&self) -> Result<Option<File>> {
        match File::open(&self.path) {
            Ok(file) => return Ok(Some(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        match File::open(&self.backup_path) {
            Ok(file) => {
                tracing::debug!(path = %self.backup_path.display(), "primary missing, reading backup");
                Ok(Some(file))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no archive file, reading as empty");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write every chunk and fsync
    fn stream_into<I>(file: &mut File, chunks: I) -> Result<u64>
    where
        I: Iterator<Item = Result<Bytes>>,
    {
        let mut written = 0u64;
        for chunk in chunks {
            let chunk = chunk?;
            file.write_all(&chunk)?;
            written += chunk.len() as u64;
        }
        file.flush()?;
        file.sync_all()?;
        Ok(written)
    }

    /// Rotate the finished temporary file into place
    fn commit(&self, tmp_path: &Path) -> Result<()> {
        if let Err(e) = remove_if_exists(&self.backup_path) {
            remove_quietly(tmp_path);
            return Err(e.into());
        }

        match fs::rename(&self.path, &self.backup_path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {} // first write
            Err(e) => {
                remove_quietly(tmp_path);
                return Err(e.into());
            }
        }

        if let Err(e) = fs::rename(tmp_path, &self.path) {
            // put the old primary back; readers fall back to the backup anyway
            if let Err(restore) = fs::rename(&self.backup_path, &self.path) {
                if restore.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(error = %restore, "failed to restore backup after aborted replace");
                }
            }
            remove_quietly(tmp_path);
            return Err(e.into());
        }

        if let Err(e) = remove_if_exists(&self.backup_path) {
            tracing::warn!(
                path = %self.backup_path.display(),
                error = %e,
                "replace committed but backup could not be removed"
            );
        }

        Ok(())
    }
}

impl Storage for FileStorage {
    type Chunks = FileChunks;

    fn read(&self) -> Result<FileChunks> {
        Ok(FileChunks {
            file: self.open_current()?,
            block_size: self.block_size,
        })
    }

    fn write<I>(&self, chunks: I) -> Result<()>
    where
        I: Iterator<Item = Result<Bytes>>,
    {
        let tmp_path = self.temporary_path();
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)?;

        let written = match Self::stream_into(&mut file, chunks) {
            Ok(n) => n,
            Err(e) => {
                drop(file);
                remove_quietly(&tmp_path);
                return Err(e);
            }
        };
        drop(file);

        self.commit(&tmp_path)?;
        tracing::debug!(path = %self.path.display(), bytes = written, "archive replaced");
        Ok(())
    }
}

/// Fixed-size block reader over an open archive file
///
/// A block shorter than the block size marks end of file; the handle is
/// closed as soon as it is seen.
pub struct FileChunks {
    file: Option<File>,
    block_size: usize,
}

impl FileChunks {
    /// Fill `buf` as far as the file allows
    fn read_block(file: &mut File, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

impl Iterator for FileChunks {
    type Item = Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        let file = self.file.as_mut()?;
        let mut buf = vec![0u8; self.block_size];

        match Self::read_block(file, &mut buf) {
            Ok(n) => {
                if n < self.block_size {
                    self.file = None;
                }
                if n == 0 {
                    return None;
                }
                buf.truncate(n);
                Some(Ok(Bytes::from(buf)))
            }
            Err(e) => {
                self.file = None;
                Some(Err(e.into()))
            }
        }
    }
}

// =============================================================================
// Private Helpers
// =============================================================================

fn suffixed(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn remove_quietly(path: &Path) {
    if let Err(e) = remove_if_exists(path) {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove temporary file");
    }
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}
