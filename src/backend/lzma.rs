// LZMA backend (lzma-rs).
//
// lzma-rs is a streaming coder with no per-handle state and a single
// encoder profile. Levels 0-9 are accepted so configurations written for
// other LZMA builds stay valid.
//
// The decoder keeps its dictionary in memory and only flushes into the
// output when the dictionary fills or the stream ends, so it runs with a
// memory limit equal to the free output space. Packets record their
// unpacked size in the header, and a header that declares more output than
// the buffer holds is refused before any decoding.

use std::io;
use std::ops::RangeInclusive;

use super::{BackendContext, CompressBackend};
use crate::buffer::OutputBuffer;
use crate::config::MAX_PAYLOAD_SIZE;
use crate::error::CompressError;

const NAME: &str = "lzma";

/// LZMA preset levels. All of them select the same encoder.
const LEVELS: RangeInclusive<i32> = 0..=9;

/// Properties byte, dictionary size and unpacked size.
const HEADER_LEN: usize = 13;

/// Unpacked size field value for streams ending in an end marker.
const SIZE_UNKNOWN: u64 = u64::MAX;

/// LZMA model.
pub static LZMA: LzmaBackend = LzmaBackend;

/// The `lzma` model over `lzma-rs`.
///
/// `lzma-rs` has one encoder profile, so every level in [`levels`] produces
/// byte-identical output. The range is kept wide so that configurations
/// naming a preset level are accepted.
///
/// [`levels`]: CompressBackend::levels
#[derive(Debug, Clone, Copy, Default)]
pub struct LzmaBackend;

impl CompressBackend for LzmaBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    /// 0 to 9, all equivalent.
    fn levels(&self) -> RangeInclusive<i32> {
        LEVELS
    }

    fn init(&self) -> Result<Box<dyn BackendContext>, CompressError> {
        Ok(Box::new(LzmaContext))
    }
}

struct LzmaContext;

/// The unpacked size recorded in a `.lzma` header, when there is one.
fn declared_size(input: &[u8]) -> Option<u64> {
    let field = input.get(5..HEADER_LEN)?;
    let size = u64::from_le_bytes(field.try_into().ok()?);
    (size != SIZE_UNKNOWN).then_some(size)
}

/// lzma-rs reports a hit memory limit only as an `LzmaError` message.
fn is_memlimit_error(msg: &str) -> bool {
    msg.starts_with("exceeded memory limit")
}

impl BackendContext for LzmaContext {
    fn compress(
        &mut self,
        _level: i32,
        input: &[u8],
        out: &mut OutputBuffer<'_>,
    ) -> Result<(), CompressError> {
        let options = lzma_rs::compress::Options {
            unpacked_size: lzma_rs::compress::UnpackedSize::WriteToHeader(Some(
                input.len() as u64,
            )),
        };
        let mut reader = io::Cursor::new(input);
        let result = lzma_rs::lzma_compress_with_options(&mut reader, out, &options);
        result.map_err(|e| out.map_io_error(e, |e| CompressError::backend(NAME, e)))
    }

    fn decompress(
        &mut self,
        input: &[u8],
        out: &mut OutputBuffer<'_>,
    ) -> Result<(), CompressError> {
        match declared_size(input) {
            Some(size) if size > MAX_PAYLOAD_SIZE as u64 => {
                return Err(CompressError::corrupt(
                    NAME,
                    format!("declared unpacked size {size} exceeds max payload size"),
                ));
            }
            Some(size) if size > out.remaining() as u64 => return Err(out.too_small()),
            _ => {}
        }

        let capacity = out.capacity();
        let options = lzma_rs::decompress::Options {
            memlimit: Some(out.remaining()),
            ..Default::default()
        };
        let mut reader = io::BufReader::new(io::Cursor::new(input));
        let result = lzma_rs::lzma_decompress_with_options(&mut reader, out, &options);
        result.map_err(|e| match e {
            lzma_rs::error::Error::IoError(io) => {
                out.map_io_error(io, |io| CompressError::corrupt(NAME, io))
            }
            lzma_rs::error::Error::LzmaError(msg) if is_memlimit_error(&msg) => {
                CompressError::BufferTooSmall { capacity }
            }
            other => CompressError::corrupt(NAME, other),
        })
    }
}
