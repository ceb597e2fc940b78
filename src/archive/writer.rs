//! Archive Writers
//!
//! Turns incoming entries into framed buffers for the compressor, enforcing
//! unique keys and the entry size limit on the way.

use std::collections::HashSet;

use bytes::{Bytes, BytesMut};

use crate::codec::{encode_key, Codec, Value};
use crate::error::{ArchiveError, Result};
use crate::frame::encode_frame;

use super::reader::RawEntry;

/// An entry on its way into an archive
pub(crate) enum Incoming {
    /// Needs encoding
    Decoded(String, Value),
    /// Already encoded, copied through as-is
    Raw(RawEntry),
}

/// Iterator adapter: incoming entries in, framed key+value buffers out
///
/// Entries whose key was already written are skipped, so the first
/// occurrence wins. Every written key is recorded in `stored`.
pub(crate) struct EntryFramer<'a, I> {
    source: I,
    codec: Codec,
    limit: Option<usize>,
    stored: &'a mut HashSet<String>,
    buf: BytesMut,
}

impl<'a, I> EntryFramer<'a, I>
where
    I: Iterator<Item = Result<Incoming>>,
{
    pub(crate) fn new(
        source: I,
        codec: Codec,
        limit: Option<usize>,
        stored: &'a mut HashSet<String>,
    ) -> Self {
        Self {
            source,
            codec,
            limit,
            stored,
            buf: BytesMut::new(),
        }
    }

    /// Frame one entry, or `None` for a duplicate key
    fn frame(&mut self, incoming: Incoming) -> Result<Option<Bytes>> {
        let (key, key_bytes, value_bytes) = match incoming {
            Incoming::Decoded(key, value) => {
                if self.stored.contains(&key) {
                    return Ok(None);
                }
                let key_bytes = Bytes::from(encode_key(&key));
                let value_bytes = Bytes::from(self.codec.encode(&value)?);
                (key, key_bytes, value_bytes)
            }
            Incoming::Raw(entry) => {
                let key = entry.key_str().map_err(|_| {
                    ArchiveError::MalformedInput("raw entry key is not valid UTF-8".to_string())
                })?;
                if self.stored.contains(&key) {
                    return Ok(None);
                }
                (key, entry.key, entry.value)
            }
        };

        check_size(self.limit, key_bytes.len())?;
        check_size(self.limit, value_bytes.len())?;

        self.stored.insert(key);
        encode_frame(&mut self.buf, &key_bytes);
        encode_frame(&mut self.buf, &value_bytes);
        Ok(Some(self.buf.split().freeze()))
    }
}

impl<'a, I> Iterator for EntryFramer<'a, I>
where
    I: Iterator<Item = Result<Incoming>>,
{
    type Item = Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let incoming = match self.source.next()? {
                Ok(incoming) => incoming,
                Err(e) => return Some(Err(e)),
            };

            match self.frame(incoming) {
                Ok(Some(framed)) => return Some(Ok(framed)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

fn check_size(limit: Option<usize>, size: usize) -> Result<()> {
    match limit {
        Some(limit) if size > limit => Err(ArchiveError::EntryTooLarge { limit, size }),
        _ => Ok(()),
    }
}

// =============================================================================
// Merge
// =============================================================================

/// Incoming pairs first, then the untouched remainder of the archive
///
/// The first occurrence of a key decides its fate: `Some` replaces, `None`
/// deletes. Existing entries are only carried over when their key never
/// appeared in the incoming pairs.
pub(crate) struct MergeSource<P, R> {
    incoming: P,
    existing: R,
    seen: HashSet<String>,
}

impl<P, R> MergeSource<P, R>
where
    P: Iterator<Item = (String, Option<Value>)>,
    R: Iterator<Item = Result<RawEntry>>,
{
    pub(crate) fn new(incoming: P, existing: R) -> Self {
        Self {
            incoming,
            existing,
            seen: HashSet::new(),
        }
    }
}

impl<P, R> Iterator for MergeSource<P, R>
where
    P: Iterator<Item = (String, Option<Value>)>,
    R: Iterator<Item = Result<RawEntry>>,
{
    type Item = Result<Incoming>;

    fn next(&mut self) -> Option<Self::Item> {
        for (key, value) in self.incoming.by_ref() {
            if !self.seen.insert(key.clone()) {
                continue;
            }
            if let Some(value) = value {
                return Some(Ok(Incoming::Decoded(key, value)));
            }
        }

        loop {
            let entry = match self.existing.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(e)),
            };
            let key = match entry.key_str() {
                Ok(key) => key,
                Err(e) => return Some(Err(e)),
            };
            if self.seen.insert(key) {
                return Some(Ok(Incoming::Raw(entry)));
            }
        }
    }
}
