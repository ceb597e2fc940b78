//! Frame codec
//!
//! Length-prefixed framing of the decompressed archive body.
//!
//! ## Wire Format
//! ```text
//! ┌──────────────────┬─────────────────────────────┐
//! │ Len (varint 1-10)│         Payload             │
//! └──────────────────┴─────────────────────────────┘
//! ```
//!
//! The length is an unsigned LEB128 varint: 7 data bits per byte, high bit
//! set on every byte except the last. Frames alternate key, value, key,
//! value.

use std::io::{self, Read};

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{ArchiveError, Result};

/// Longest possible u64 varint
pub const MAX_VARINT_LEN: usize = 10;

// =============================================================================
// Encoding
// =============================================================================

/// Append an unsigned varint
pub fn encode_varint_u64(buf: &mut impl BufMut, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;

        if value != 0 {
            byte |= 0x80; // continuation
        }

        buf.put_u8(byte);

        if value == 0 {
            break;
        }
    }
}

/// Append one frame (length prefix + payload)
pub fn encode_frame(buf: &mut BytesMut, payload: &[u8]) {
    buf.reserve(MAX_VARINT_LEN + payload.len());
    encode_varint_u64(buf, payload.len() as u64);
    buf.put_slice(payload);
}

// =============================================================================
// Decoding
// =============================================================================

/// Pulls frames off a byte stream
///
/// Yields `Err` for truncated or oversized frames, after which it is fused.
pub struct FrameReader<R> {
    inner: R,
    /// Declared lengths above this are rejected before allocating
    max_len: Option<usize>,
    done: bool,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R, max_len: Option<usize>) -> Self {
        Self {
            inner,
            max_len,
            done: false,
        }
    }

    /// Read the next frame; `Ok(None)` on a clean end of stream
    pub fn next_frame(&mut self) -> Result<Option<Bytes>> {
        let len = match self.read_len()? {
            Some(len) => len,
            None => return Ok(None),
        };

        if let Some(limit) = self.max_len {
            if len > limit as u64 {
                return Err(ArchiveError::EntryTooLarge {
                    limit,
                    size: usize::try_from(len).unwrap_or(usize::MAX),
                });
            }
        }
        let len = usize::try_from(len)
            .map_err(|_| ArchiveError::Codec(format!("frame length {} too large", len)))?;

        let mut payload = Vec::with_capacity(len.min(64 * 1024));
        let read = (&mut self.inner).take(len as u64).read_to_end(&mut payload)?;
        if read < len {
            return Err(ArchiveError::Codec(format!(
                "truncated frame: expected {} bytes, got {}",
                len, read
            )));
        }

        Ok(Some(Bytes::from(payload)))
    }

    /// Read a varint length. `None` only when the stream ends before the
    /// first byte.
    fn read_len(&mut self) -> Result<Option<u64>> {
        let mut value: u64 = 0;
        let mut shift = 0;

        for i in 0..MAX_VARINT_LEN {
            let byte = match self.read_byte()? {
                Some(b) => b,
                None if i == 0 => return Ok(None),
                None => {
                    return Err(ArchiveError::Codec(
                        "truncated frame length prefix".to_string(),
                    ))
                }
            };

            value |= ((byte & 0x7F) as u64) << shift;
            if byte & 0x80 == 0 {
                return Ok(Some(value));
            }
            shift += 7;
        }

        Err(ArchiveError::Codec("varint length prefix too long".to_string()))
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl<R: Read> Iterator for FrameReader<R> {
    type Item = Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
