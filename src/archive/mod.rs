//! Archive Module
//!
//! The archive engine: ordered key-value operations over one compressed
//! stream.
//!
//! ## Responsibilities
//! - Read entries lazily (decoded or raw)
//! - Rewrite the whole archive for every mutation
//! - Keep keys unique on write, first occurrence wins
//! - Enforce the entry size limit on keys and values
//!
//! ## Pipelines
//! ```text
//!   read:  storage ─▶ decompress ─▶ de-frame ─▶ pair ─▶ decode
//!   write: encode ─▶ dedup/limit ─▶ frame ─▶ compress ─▶ storage (atomic replace)
//! ```
//!
//! No state is kept between calls. Mutations against one archive must be
//! serialized by the caller; reads may run alongside each other.

mod reader;
mod writer;

pub use reader::{Entries, Include, RawEntries, RawEntry, Select};

use std::collections::HashSet;
use std::path::PathBuf;

use crate::codec::{encode_key, Codec, Value};
use crate::compress::CompressedChunks;
use crate::config::ArchiveConfig;
use crate::error::Result;
use crate::storage::{FileStorage, Storage};

use reader::test_entry;
use writer::{EntryFramer, Incoming, MergeSource};

/// Size summary of an archive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveStats {
    /// Entries in the stored stream
    pub entries: u64,
    /// Encoded key and value bytes, before framing and compression
    pub raw_bytes: u64,
    /// Bytes held by storage
    pub stored_bytes: u64,
}

/// Handle to a key-value archive held by a `Storage`
pub struct Archive<S = FileStorage> {
    storage: S,
    config: ArchiveConfig,
}

impl Archive<FileStorage> {
    /// Archive in a file at `path`
    pub fn open_path(path: impl Into<PathBuf>, config: ArchiveConfig) -> Result<Self> {
        let storage = FileStorage::with_block_size(path, config.read_block_size);
        Self::new(storage, config)
    }
}

impl<S: Storage> Archive<S> {
    /// Create an archive handle over `storage`
    ///
    /// Nothing is read or written until an operation is called.
    pub fn new(storage: S, config: ArchiveConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { storage, config })
    }

    /// Create an archive handle with the default configuration
    pub fn with_storage(storage: S) -> Self {
        Self {
            storage,
            config: ArchiveConfig::default(),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Iterate decoded `(key, value)` pairs in stored order
    pub fn read(&self) -> Result<Entries<S::Chunks>> {
        Ok(Entries::new(self.raw_entries()?, self.config.codec))
    }

    /// Iterate entries without decoding anything
    pub fn raw_entries(&self) -> Result<RawEntries<S::Chunks>> {
        RawEntries::open(self.storage.read()?, self.config.entry_size_limit)
    }

    /// Iterate keys in stored order
    pub fn keys(&self) -> Result<impl Iterator<Item = Result<String>>> {
        Ok(self
            .raw_entries()?
            .map(|entry| entry.and_then(|e| e.key_str())))
    }

    /// Lazily yield decoded entries accepted by `predicate`
    ///
    /// With `Include::Key` the predicate gets `None` for the value, and only
    /// matching values are decoded.
    pub fn select<F>(&self, include: Include, predicate: F) -> Result<Select<S::Chunks, F>>
    where
        F: FnMut(&str, Option<&Value>) -> bool,
    {
        Ok(Select::new(
            self.raw_entries()?,
            self.config.codec,
            include,
            predicate,
        ))
    }

    /// Value of the first entry whose encoded key equals `key`'s
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        let needle = encode_key(key);
        for entry in self.raw_entries()? {
            let entry = entry?;
            if entry.key[..] == needle[..] {
                return self.config.codec.decode(&entry.value).map(Some);
            }
        }
        Ok(None)
    }

    /// Count entries and bytes
    pub fn stats(&self) -> Result<ArchiveStats> {
        let mut stats = ArchiveStats::default();
        for chunk in self.storage.read()? {
            stats.stored_bytes += chunk?.len() as u64;
        }
        for entry in self.raw_entries()? {
            let entry = entry?;
            stats.entries += 1;
            stats.raw_bytes += (entry.key.len() + entry.value.len()) as u64;
        }
        Ok(stats)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Replace the archive contents with `pairs`
    ///
    /// Later pairs with an already written key are skipped. Returns the
    /// stored keys.
    pub fn write<I, K, V>(&self, pairs: I) -> Result<HashSet<String>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let source = pairs
            .into_iter()
            .map(|(k, v)| Ok(Incoming::Decoded(k.into(), v.into())));
        self.write_incoming(source)
    }

    /// Replace the archive contents with already encoded entries
    ///
    /// Keys must be UTF-8 text; anything else is `MalformedInput`.
    pub fn write_raw<I>(&self, entries: I) -> Result<HashSet<String>>
    where
        I: IntoIterator<Item = Result<RawEntry>>,
    {
        self.write_incoming(entries.into_iter().map(|e| e.map(Incoming::Raw)))
    }

    /// Rewrite the archive keeping only entries accepted by `predicate`
    pub fn filter<F>(&self, include: Include, mut predicate: F) -> Result<()>
    where
        F: FnMut(&str, Option<&Value>) -> bool,
    {
        let codec = self.config.codec;
        let kept = self.raw_entries()?.filter_map(move |entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => return Some(Err(e)),
            };
            match test_entry(codec, include, &entry, &mut predicate) {
                Ok(Some(_)) => Some(Ok(Incoming::Raw(entry))),
                Ok(None) => None,
                Err(e) => Some(Err(e)),
            }
        });
        self.write_incoming(kept)?;
        Ok(())
    }

    /// Rewrite the archive without the given keys
    pub fn delete<I, K>(&self, keys: I) -> Result<()>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let keys: HashSet<String> = keys.into_iter().map(Into::into).collect();
        self.filter(Include::Key, |key, _| !keys.contains(key))
    }

    /// Rewrite the archive keeping only the given keys
    pub fn retain<I, K>(&self, keys: I) -> Result<()>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let keys: HashSet<String> = keys.into_iter().map(Into::into).collect();
        self.filter(Include::Key, |key, _| keys.contains(key))
    }

    /// Merge `pairs` over the current contents
    ///
    /// For each key, its first incoming pair wins: `Some(value)` replaces the
    /// stored value, `None` removes the key. Entries whose key never appears
    /// in `pairs` are carried over unchanged, after the incoming ones.
    /// Returns every key present after the merge.
    pub fn merge<I, K>(&self, pairs: I) -> Result<HashSet<String>>
    where
        I: IntoIterator<Item = (K, Option<Value>)>,
        K: Into<String>,
    {
        let incoming = pairs.into_iter().map(|(k, v)| (k.into(), v));
        let source = MergeSource::new(incoming, self.raw_entries()?);
        self.write_incoming(source)
    }

    /// Set one key; `None` deletes it
    pub fn set(&self, key: impl Into<String>, value: Option<Value>) -> Result<()> {
        self.merge([(key.into(), value)])?;
        Ok(())
    }

    /// Run the write pipeline over `source`
    fn write_incoming<I>(&self, source: I) -> Result<HashSet<String>>
    where
        I: Iterator<Item = Result<Incoming>>,
    {
        let mut stored = HashSet::new();
        {
            let framed = EntryFramer::new(
                source,
                self.config.codec,
                self.config.entry_size_limit,
                &mut stored,
            );
            let compressed = CompressedChunks::new(framed, &self.config.compression)?;
            self.storage.write(compressed)?;
        }
        tracing::debug!(entries = stored.len(), "archive rewritten");
        Ok(stored)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    pub fn codec(&self) -> Codec {
        self.config.codec
    }
}

/// `for entry in &archive` reads decoded entries
impl<'a, S: Storage> IntoIterator for &'a Archive<S> {
    type Item = Result<(String, Value)>;
    type IntoIter = Entries<S::Chunks>;

    fn into_iter(self) -> Self::IntoIter {
        let raw = self.raw_entries().unwrap_or_else(RawEntries::failed);
        Entries::new(raw, self.config.codec)
    }
}
