//! Block compressor
//!
//! Streaming zstd over the whole framed archive body. The body is compressed
//! as one unit so redundancy between values (shared markup, repeated field
//! names) is exploited across entries.
//!
//! Both directions are pull-based: the compressor is an iterator adapter
//! over framed buffers, the decompressor is an `io::Read` over storage
//! chunks.

use std::io::{self, BufReader, Read, Write};

use bytes::Bytes;
use zstd::stream::read::Decoder;
use zstd::stream::write::Encoder;

use crate::config::CompressionConfig;
use crate::error::{ArchiveError, Result};

// =============================================================================
// Compression
// =============================================================================

/// Iterator adapter: framed buffers in, compressed chunks out
///
/// Compressed output accumulates until at least `chunk_size` bytes are
/// available, then is yielded as one chunk. The trailing chunk carries the
/// zstd frame epilogue.
pub struct CompressedChunks<I> {
    source: I,
    encoder: Option<Encoder<'static, Vec<u8>>>,
    chunk_size: usize,
    bytes_in: u64,
    bytes_out: u64,
}

impl<I> CompressedChunks<I>
where
    I: Iterator<Item = Result<Bytes>>,
{
    pub fn new(source: I, config: &CompressionConfig) -> Result<Self> {
        let encoder = Encoder::new(Vec::with_capacity(config.chunk_size), config.level)?;
        Ok(Self {
            source,
            encoder: Some(encoder),
            chunk_size: config.chunk_size,
            bytes_in: 0,
            bytes_out: 0,
        })
    }

    fn emit(&mut self, chunk: Vec<u8>) -> Option<Result<Bytes>> {
        self.bytes_out += chunk.len() as u64;
        Some(Ok(Bytes::from(chunk)))
    }
}

impl<I> Iterator for CompressedChunks<I>
where
    I: Iterator<Item = Result<Bytes>>,
{
    type Item = Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            // None once finished or failed
            let mut encoder = self.encoder.take()?;

            if encoder.get_ref().len() >= self.chunk_size {
                let chunk = std::mem::take(encoder.get_mut());
                self.encoder = Some(encoder);
                return self.emit(chunk);
            }

            match self.source.next() {
                Some(Ok(buf)) => {
                    if let Err(e) = encoder.write_all(&buf) {
                        return Some(Err(e.into()));
                    }
                    self.bytes_in += buf.len() as u64;
                    self.encoder = Some(encoder);
                }
                Some(Err(e)) => return Some(Err(e)),
                None => {
                    let tail = match encoder.finish() {
                        Ok(tail) => tail,
                        Err(e) => return Some(Err(e.into())),
                    };
                    self.bytes_out += tail.len() as u64;
                    tracing::debug!(
                        bytes_in = self.bytes_in,
                        bytes_out = self.bytes_out,
                        "compressed archive body"
                    );
                    if tail.is_empty() {
                        return None;
                    }
                    return Some(Ok(Bytes::from(tail)));
                }
            }
        }
    }
}

// =============================================================================
// Decompression
// =============================================================================

/// `io::Read` over a fallible chunk iterator
pub struct ChunkReader<I> {
    chunks: I,
    current: Bytes,
}

impl<I> ChunkReader<I>
where
    I: Iterator<Item = Result<Bytes>>,
{
    pub fn new(chunks: I) -> Self {
        Self {
            chunks,
            current: Bytes::new(),
        }
    }

    /// Start with `first` already buffered
    pub fn with_first(first: Bytes, chunks: I) -> Self {
        Self {
            chunks,
            current: first,
        }
    }
}

impl<I> Read for ChunkReader<I>
where
    I: Iterator<Item = Result<Bytes>>,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.current.is_empty() {
            match self.chunks.next() {
                Some(Ok(chunk)) => self.current = chunk,
                Some(Err(ArchiveError::Io(e))) => return Err(e),
                Some(Err(e)) => return Err(io::Error::new(io::ErrorKind::Other, e)),
                None => return Ok(0),
            }
        }

        let n = buf.len().min(self.current.len());
        buf[..n].copy_from_slice(&self.current.split_to(n));
        Ok(n)
    }
}

/// Decompressed view of a compressed chunk stream
pub type Decompressed<I> = BufReader<Decoder<'static, BufReader<ChunkReader<I>>>>;

/// Wrap a compressed byte source in a streaming decoder
pub fn decompress<I>(reader: ChunkReader<I>) -> Result<Decompressed<I>>
where
    I: Iterator<Item = Result<Bytes>>,
{
    let decoder = Decoder::new(reader)?;
    Ok(BufReader::new(decoder))
}
