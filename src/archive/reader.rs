//! Archive Readers
//!
//! Lazy iterators over the entries of an archive:
//! storage chunks → decompress → de-frame → (key, value) pairs.

use bytes::Bytes;

use crate::codec::{decode_key, Codec, Value};
use crate::compress::{decompress, ChunkReader, Decompressed};
use crate::error::{ArchiveError, Result};
use crate::frame::FrameReader;

/// Which parts of an entry a filter/select predicate receives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Include {
    /// Only the key; the value is never decoded for the test
    Key,
    /// The key and the decoded value
    KeyAndValue,
}

/// One entry exactly as stored: encoded key and encoded value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub key: Bytes,
    pub value: Bytes,
}

impl RawEntry {
    pub fn new(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Decode the key as text
    pub fn key_str(&self) -> Result<String> {
        decode_key(&self.key)
    }
}

// =============================================================================
// Raw Entries
// =============================================================================

/// Iterator over undecoded entries
///
/// Frames alternate key, value. A trailing key without a value is dropped.
/// After the first error the iterator is fused.
pub struct RawEntries<I>
where
    I: Iterator<Item = Result<Bytes>>,
{
    frames: Option<FrameReader<Decompressed<I>>>,
    error: Option<ArchiveError>,
}

impl<I> RawEntries<I>
where
    I: Iterator<Item = Result<Bytes>>,
{
    /// Build the pipeline over storage chunks
    ///
    /// `max_len` bounds each frame (the entry size limit). A source with no
    /// bytes at all is an empty archive and skips the decompressor.
    pub fn open(mut chunks: I, max_len: Option<usize>) -> Result<Self> {
        let first = loop {
            match chunks.next() {
                Some(Ok(chunk)) if chunk.is_empty() => continue,
                Some(Ok(chunk)) => break Some(chunk),
                Some(Err(e)) => return Err(e),
                None => break None,
            }
        };

        let frames = match first {
            Some(first) => {
                let body = decompress(ChunkReader::with_first(first, chunks))?;
                Some(FrameReader::new(body, max_len))
            }
            None => None,
        };

        Ok(Self {
            frames,
            error: None,
        })
    }

    /// An iterator that yields `error` once and then ends
    pub fn failed(error: ArchiveError) -> Self {
        Self {
            frames: None,
            error: Some(error),
        }
    }

    fn fail(&mut self, error: ArchiveError) -> Option<Result<RawEntry>> {
        self.frames = None;
        Some(Err(error))
    }

    /// End the stream early; later calls to `next` return `None`
    pub(crate) fn close(&mut self) {
        self.frames = None;
        self.error = None;
    }
}

impl<I> Iterator for RawEntries<I>
where
    I: Iterator<Item = Result<Bytes>>,
{
    type Item = Result<RawEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(error) = self.error.take() {
            return Some(Err(error));
        }

        let frames = self.frames.as_mut()?;
        let key = match frames.next() {
            Some(Ok(key)) => key,
            Some(Err(e)) => return self.fail(e),
            None => {
                self.frames = None;
                return None;
            }
        };

        match frames.next() {
            Some(Ok(value)) => Some(Ok(RawEntry { key, value })),
            Some(Err(e)) => self.fail(e),
            None => {
                tracing::debug!("archive ends with a key frame and no value, ignoring it");
                self.frames = None;
                None
            }
        }
    }
}

// =============================================================================
// Decoded Entries
// =============================================================================

/// Iterator over decoded `(key, value)` pairs
///
/// A value that fails to decode ends the iteration after its error.
pub struct Entries<I>
where
    I: Iterator<Item = Result<Bytes>>,
{
    raw: RawEntries<I>,
    codec: Codec,
}

impl<I> Entries<I>
where
    I: Iterator<Item = Result<Bytes>>,
{
    pub(crate) fn new(raw: RawEntries<I>, codec: Codec) -> Self {
        Self { raw, codec }
    }
}

impl<I> Iterator for Entries<I>
where
    I: Iterator<Item = Result<Bytes>>,
{
    type Item = Result<(String, Value)>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = match self.raw.next()? {
            Ok(entry) => entry,
            Err(e) => return Some(Err(e)),
        };
        let decoded = decode_entry(self.codec, &entry);
        if decoded.is_err() {
            self.raw.close();
        }
        Some(decoded)
    }
}

fn decode_entry(codec: Codec, entry: &RawEntry) -> Result<(String, Value)> {
    Ok((entry.key_str()?, codec.decode(&entry.value)?))
}

// =============================================================================
// Select
// =============================================================================

/// Iterator over decoded entries accepted by a predicate
///
/// Fused after the first error, like `Entries`.
pub struct Select<I, F>
where
    I: Iterator<Item = Result<Bytes>>,
{
    raw: RawEntries<I>,
    codec: Codec,
    include: Include,
    predicate: F,
}

impl<I, F> Select<I, F>
where
    I: Iterator<Item = Result<Bytes>>,
    F: FnMut(&str, Option<&Value>) -> bool,
{
    pub(crate) fn new(raw: RawEntries<I>, codec: Codec, include: Include, predicate: F) -> Self {
        Self {
            raw,
            codec,
            include,
            predicate,
        }
    }
}

impl<I, F> Iterator for Select<I, F>
where
    I: Iterator<Item = Result<Bytes>>,
    F: FnMut(&str, Option<&Value>) -> bool,
{
    type Item = Result<(String, Value)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.raw.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(e)),
            };

            let selected = match test_entry(self.codec, self.include, &entry, &mut self.predicate) {
                Ok(Some((key, Some(value)))) => Ok((key, value)),
                Ok(Some((key, None))) => self.codec.decode(&entry.value).map(|value| (key, value)),
                Ok(None) => continue,
                Err(e) => Err(e),
            };
            if selected.is_err() {
                self.raw.close();
            }
            return Some(selected);
        }
    }
}

/// Run a predicate against one entry
///
/// Returns the decoded key (and the value, when it had to be decoded for
/// the test) if the entry is accepted.
pub(crate) fn test_entry<F>(
    codec: Codec,
    include: Include,
    entry: &RawEntry,
    predicate: &mut F,
) -> Result<Option<(String, Option<Value>)>>
where
    F: FnMut(&str, Option<&Value>) -> bool,
{
    let key = entry.key_str()?;
    match include {
        Include::Key => {
            if predicate(&key, None) {
                Ok(Some((key, None)))
            } else {
                Ok(None)
            }
        }
        Include::KeyAndValue => {
            let value = codec.decode(&entry.value)?;
            if predicate(&key, Some(&value)) {
                Ok(Some((key, Some(value))))
            } else {
                Ok(None)
            }
        }
    }
}
