//! # archivekv
//!
//! A single-file key-value archive for bulk datasets with:
//! - Whole-stream zstd compression, so redundancy *between* values
//!   (pages scraped from one site, records sharing field names) compresses
//!   away
//! - Ordered entries with unique keys, first occurrence wins
//! - Crash-safe rewrites (temporary file + backup rotation)
//! - Pluggable value codecs: text, JSON, structured binary
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Archive                              │
//! │   read / select / get          write / merge / filter / set  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │    Codec    │          │    Frame    │
//!   │ (values)    │          │ (varint len)│
//!   └─────────────┘          └──────┬──────┘
//!                                   ▼
//!                           ┌─────────────┐
//!                           │  Compress   │
//!                           │   (zstd)    │
//!                           └──────┬──────┘
//!                                  ▼
//!                           ┌─────────────┐
//!                           │   Storage   │
//!                           │(file/memory)│
//!                           └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use archivekv::{Archive, ArchiveConfig, Value};
//!
//! # fn main() -> archivekv::Result<()> {
//! let archive = Archive::open_path("pages.archive", ArchiveConfig::default())?;
//! archive.write([("index.html", "<html>...</html>")])?;
//! archive.set("about.html", Some(Value::from("<html>about</html>")))?;
//! assert_eq!(archive.get("index.html")?, Some(Value::from("<html>...</html>")));
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod frame;
pub mod compress;
pub mod storage;
pub mod archive;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ArchiveError, Result};
pub use config::{ArchiveConfig, CompressionConfig};
pub use codec::{Codec, Value};
pub use archive::{Archive, ArchiveStats, Include, RawEntry};
pub use storage::{FileStorage, MemoryStorage, Storage};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of archivekv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
