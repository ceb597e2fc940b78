//! In-memory storage
//!
//! Keeps the chunk list in RAM. Used by tests and throwaway archives.

use bytes::Bytes;
use parking_lot::RwLock;

use crate::error::Result;

use super::Storage;

/// Storage that never touches the filesystem
#[derive(Debug, Default)]
pub struct MemoryStorage {
    chunks: RwLock<Vec<Bytes>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total stored (compressed) bytes
    pub fn len(&self) -> usize {
        self.chunks.read().iter().map(|c| c.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the stored chunks
    pub fn chunks(&self) -> Vec<Bytes> {
        self.chunks.read().clone()
    }
}

impl Storage for MemoryStorage {
    type Chunks = std::iter::Map<std::vec::IntoIter<Bytes>, fn(Bytes) -> Result<Bytes>>;

    fn read(&self) -> Result<Self::Chunks> {
        let snapshot = self.chunks.read().clone();
        Ok(snapshot.into_iter().map(Ok as fn(Bytes) -> Result<Bytes>))
    }

    fn write<I>(&self, chunks: I) -> Result<()>
    where
        I: Iterator<Item = Result<Bytes>>,
    {
        // collect first so a failing source leaves the old contents alone
        let new_chunks = chunks.collect::<Result<Vec<_>>>()?;
        *self.chunks.write() = new_chunks;
        Ok(())
    }
}
