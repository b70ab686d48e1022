//! Linkpress: pluggable per-link payload compression for a datagram
//! transport.
//!
//! The crate provides:
//! - A static table of compression models with fixed wire ids (`registry`)
//! - Adapters over zlib/deflate, LZ4, LZMA and Zstandard (`backend`)
//! - Per-handle configuration, lazy backend lifecycle and packet dispatch
//!   (`handle`)
//! - Traffic counters (`stats`)
//! - An optional operator CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```no_run
//! use linkpress::{CompressHandle, CompressOutcome, CompressionConfig};
//!
//! let sender = CompressHandle::new();
//! sender.configure(&CompressionConfig::new(1, 6)).unwrap();
//!
//! let payload = b"heartbeat heartbeat heartbeat heartbeat heartbeat".repeat(4);
//! let mut wire = vec![0u8; payload.len()];
//! let receiver = CompressHandle::new();
//! if let CompressOutcome::Compressed { model, len } = sender.compress(&payload, &mut wire).unwrap() {
//!     let mut plain = vec![0u8; payload.len()];
//!     let n = receiver.decompress(model, &wire[..len], &mut plain).unwrap();
//!     assert_eq!(&plain[..n], &payload[..]);
//! }
//! ```

pub mod backend;
pub mod buffer;
pub mod config;
pub mod error;
pub mod handle;
pub mod registry;
pub mod stats;

#[cfg(feature = "cli")]
pub mod cli;

pub use config::{CompressionConfig, DEFAULT_COMPRESS_THRESHOLD, MAX_PAYLOAD_SIZE};
pub use error::CompressError;
pub use handle::{CompressHandle, CompressOutcome, ConfiguredModel, ModelStatus, PassThrough};
pub use registry::{MODEL_NONE, ModelDescriptor, Registry};
pub use stats::{CompressStats, TimeStats};
