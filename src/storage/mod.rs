//! Storage Module
//!
//! Where the compressed archive bytes live.
//!
//! ## Responsibilities
//! - Hand out the current contents as a lazy sequence of chunks
//! - Replace the contents wholesale from a lazy sequence of chunks
//! - Treat "nothing stored yet" as an empty archive, never an error
//!
//! ## File Layout (FileStorage)
//! ```text
//!   {path}                              primary, the committed archive
//!   {path}.backup                       previous primary, only during a replace
//!   {path}.temporary-{millis}-{random}  new contents being streamed
//! ```

mod file;
mod memory;

pub use file::{FileChunks, FileStorage, BACKUP_SUFFIX, TEMPORARY_INFIX};
pub use memory::MemoryStorage;

use bytes::Bytes;

use crate::error::Result;

/// Byte-level backend of an archive
///
/// Implementations must make `write` atomic from the point of view of
/// `read`: a reader observes either the old or the new contents in full.
pub trait Storage {
    /// Chunk sequence returned by `read`
    type Chunks: Iterator<Item = Result<Bytes>>;

    /// Open the current contents for reading
    fn read(&self) -> Result<Self::Chunks>;

    /// Replace the contents with everything `chunks` yields
    ///
    /// If `chunks` yields an error the previous contents stay in place and
    /// the error is returned.
    fn write<I>(&self, chunks: I) -> Result<()>
    where
        I: Iterator<Item = Result<Bytes>>;
}

impl<S: Storage + ?Sized> Storage for &S {
    type Chunks = S::Chunks;

    fn read(&self) -> Result<Self::Chunks> {
        (**self).read()
    }

    fn write<I>(&self, chunks: I) -> Result<()>
    where
        I: Iterator<Item = Result<Bytes>>,
    {
        (**self).write(chunks)
    }
}
