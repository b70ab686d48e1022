// Compression backends.
//
// Every compression library is wrapped in the same two-level contract:
//   - `CompressBackend`: process-wide, stateless (availability, level
//     validation, init/teardown of per-handle state)
//   - `BackendContext`: per-handle private state, created by `init`
//     (compress/decompress)
//
// Adapters:
//   - `zlib`  zlib and raw deflate via flate2 (feature `zlib`)
//   - `lz4`   LZ4 fast and LZ4HC via lz4 (feature `lz4`)
//   - `lzma`  LZMA via lzma-rs (feature `lzma`)
//   - `zstd`  Zstandard via zstd (feature `zstd`)

use std::ops::RangeInclusive;

use crate::buffer::OutputBuffer;
use crate::error::CompressError;

#[cfg(feature = "lz4")]
pub mod lz4;
#[cfg(feature = "lzma")]
pub mod lzma;
#[cfg(feature = "zlib")]
pub mod zlib;
#[cfg(feature = "zstd")]
pub mod zstd;

// ---------------------------------------------------------------------------
// Backend traits
// ---------------------------------------------------------------------------

/// A compression library, as seen by the registry.
///
/// Implementations are zero-sized or otherwise immutable so they can sit in
/// a `static` model table. Anything a library needs per handle lives in the
/// [`BackendContext`] returned by [`init`](Self::init).
///
/// # Implementing a custom backend
///
/// ```no_run
/// use std::ops::RangeInclusive;
/// use linkpress::backend::{BackendContext, CompressBackend};
/// use linkpress::buffer::OutputBuffer;
/// use linkpress::error::CompressError;
///
/// struct Identity;
/// struct IdentityContext;
///
/// impl CompressBackend for Identity {
///     fn name(&self) -> &'static str { "identity" }
///     fn levels(&self) -> RangeInclusive<i32> { 0..=0 }
///     fn init(&self) -> Result<Box<dyn BackendContext>, CompressError> {
///         Ok(Box::new(IdentityContext))
///     }
/// }
///
/// impl BackendContext for IdentityContext {
///     fn compress(&mut self, _level: i32, input: &[u8], out: &mut OutputBuffer<'_>)
///         -> Result<(), CompressError> {
///         out.put(input)
///     }
///     fn decompress(&mut self, input: &[u8], out: &mut OutputBuffer<'_>)
///         -> Result<(), CompressError> {
///         out.put(input)
///     }
/// }
/// ```
pub trait CompressBackend: Send + Sync {
    /// Library name used in log and error messages.
    fn name(&self) -> &'static str;

    /// Whether the library is usable in this process.
    fn is_available(&self) -> bool {
        true
    }

    /// Levels accepted by [`validate_level`](Self::validate_level).
    fn levels(&self) -> RangeInclusive<i32>;

    /// Check a level before it is persisted in a handle's configuration.
    fn validate_level(&self, level: i32) -> bool {
        self.levels().contains(&level)
    }

    /// Allocate per-handle state.
    fn init(&self) -> Result<Box<dyn BackendContext>, CompressError>;

    /// Release per-handle state.
    fn teardown(&self, context: Box<dyn BackendContext>) {
        drop(context);
    }
}

/// Per-handle state of one backend.
///
/// Calls are independent of each other: any library context kept here is
/// reset before use. Both operations write only through `out` and fail with
/// `BufferTooSmall` instead of truncating.
pub trait BackendContext: Send {
    /// Compress `input` at `level` (already validated) into `out`.
    fn compress(
        &mut self,
        level: i32,
        input: &[u8],
        out: &mut OutputBuffer<'_>,
    ) -> Result<(), CompressError>;

    /// Decompress `input` into `out`. Invalid streams fail with `CorruptData`.
    fn decompress(&mut self, input: &[u8], out: &mut OutputBuffer<'_>)
    -> Result<(), CompressError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Repetitive text large enough for every backend to shrink.
    pub(crate) fn sample() -> Vec<u8> {
        b"Hello, cluster! This is heartbeat payload. "
            .iter()
            .copied()
            .cycle()
            .take(1024)
            .collect()
    }

    /// Compress then decompress through a fresh context.
    pub(crate) fn roundtrip(backend: &dyn CompressBackend, level: i32, data: &[u8]) -> usize {
        let mut ctx = backend.init().unwrap();
        let mut packed = vec![0u8; data.len() + 64];
        let mut out = OutputBuffer::new(&mut packed);
        ctx.compress(level, data, &mut out).unwrap();
        let packed_len = out.len();

        let mut unpacked = vec![0u8; data.len()];
        let mut out = OutputBuffer::new(&mut unpacked);
        ctx.decompress(&packed[..packed_len], &mut out).unwrap();
        assert_eq!(out.filled(), data, "{} roundtrip mismatch", backend.name());
        backend.teardown(ctx);
        packed_len
    }

    struct Reverse;
    struct ReverseContext;

    impl CompressBackend for Reverse {
        fn name(&self) -> &'static str {
            "reverse"
        }
        fn levels(&self) -> RangeInclusive<i32> {
            1..=3
        }
        fn init(&self) -> Result<Box<dyn BackendContext>, CompressError> {
            Ok(Box::new(ReverseContext))
        }
    }

    impl BackendContext for ReverseContext {
        fn compress(
            &mut self,
            _level: i32,
            input: &[u8],
            out: &mut OutputBuffer<'_>,
        ) -> Result<(), CompressError> {
            let reversed: Vec<u8> = input.iter().rev().copied().collect();
            out.put(&reversed)
        }
        fn decompress(
            &mut self,
            input: &[u8],
            out: &mut OutputBuffer<'_>,
        ) -> Result<(), CompressError> {
            let reversed: Vec<u8> = input.iter().rev().copied().collect();
            out.put(&reversed)
        }
    }

    #[test]
    fn default_level_validation_uses_range() {
        assert!(Reverse.validate_level(1));
        assert!(Reverse.validate_level(3));
        assert!(!Reverse.validate_level(0));
        assert!(!Reverse.validate_level(4));
        assert!(Reverse.is_available());
    }

    #[test]
    fn custom_backend_roundtrip() {
        roundtrip(&Reverse, 2, b"hello world");
    }
}
