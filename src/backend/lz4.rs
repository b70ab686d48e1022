// LZ4 backends (lz4).
//
// `lz4` uses the fast compressor, where the level is the acceleration
// factor; `lz4hc` uses the high-compression compressor. Both emit the lz4
// crate's size-prepended block: a little-endian u32 original length
// followed by one LZ4 block. The length lets decompression tell a short
// output buffer apart from a corrupt block.

use std::ops::RangeInclusive;

use lz4::block::{self, CompressionMode};

use super::{BackendContext, CompressBackend};
use crate::buffer::OutputBuffer;
use crate::config::MAX_PAYLOAD_SIZE;
use crate::error::CompressError;

/// Size of the original-length prefix.
const SIZE_PREFIX: usize = 4;

/// Fast mode: acceleration factor (1 = default, larger = faster, weaker).
const ACCELERATION: RangeInclusive<i32> = 1..=65537;

/// High-compression levels.
const HC_LEVELS: RangeInclusive<i32> = 1..=12;

/// LZ4 fast mode.
pub static LZ4: Lz4Backend = Lz4Backend { high: false };

/// LZ4 high-compression mode.
pub static LZ4HC: Lz4Backend = Lz4Backend { high: true };

#[derive(Debug)]
pub struct Lz4Backend {
    high: bool,
}

impl CompressBackend for Lz4Backend {
    fn name(&self) -> &'static str {
        if self.high { "lz4hc" } else { "lz4" }
    }

    fn levels(&self) -> RangeInclusive<i32> {
        if self.high { HC_LEVELS } else { ACCELERATION }
    }

    fn init(&self) -> Result<Box<dyn BackendContext>, CompressError> {
        // liblz4 block calls keep their state on the stack.
        Ok(Box::new(Lz4Context {
            name: self.name(),
            high: self.high,
        }))
    }
}

struct Lz4Context {
    name: &'static str,
    high: bool,
}

impl BackendContext for Lz4Context {
    fn compress(
        &mut self,
        level: i32,
        input: &[u8],
        out: &mut OutputBuffer<'_>,
    ) -> Result<(), CompressError> {
        let len = u32::try_from(input.len())
            .map_err(|_| CompressError::backend(self.name, "input too long"))?;
        let mode = if self.high {
            CompressionMode::HIGHCOMPRESSION(level)
        } else {
            CompressionMode::FAST(level)
        };

        let capacity = out.capacity();
        out.put(&len.to_le_bytes())?;
        // liblz4 returns 0 only when the destination is too small.
        let written = block::compress_to_buffer(input, Some(mode), false, out.unfilled_mut())
            .map_err(|_| CompressError::BufferTooSmall { capacity })?;
        out.advance(written)
    }

    fn decompress(
        &mut self,
        input: &[u8],
        out: &mut OutputBuffer<'_>,
    ) -> Result<(), CompressError> {
        let Some((prefix, body)) = input.split_first_chunk::<SIZE_PREFIX>() else {
            return Err(CompressError::corrupt(self.name, "missing length prefix"));
        };
        let original = u32::from_le_bytes(*prefix) as usize;
        if original > MAX_PAYLOAD_SIZE {
            return Err(CompressError::corrupt(
                self.name,
                format!("declared length {original} exceeds max payload size"),
            ));
        }
        if original > out.remaining() {
            return Err(out.too_small());
        }

        let written = block::decompress_to_buffer(body, Some(original as i32), out.unfilled_mut())
            .map_err(|e| CompressError::corrupt(self.name, e))?;
        if written != original {
            return Err(CompressError::corrupt(
                self.name,
                format!("decoded {written} bytes, expected {original}"),
            ));
        }
        out.advance(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::tests::{roundtrip, sample};

    #[test]
    fn fast_roundtrip() {
        let data = sample();
        for level in [1, 8, 100] {
            assert!(roundtrip(&LZ4, level, &data) < data.len());
        }
    }

    #[test]
    fn hc_roundtrip_all_levels() {
        let data = sample();
        for level in HC_LEVELS {
            assert!(roundtrip(&LZ4HC, level, &data) < data.len());
        }
    }

    #[test]
    fn level_ranges() {
        assert!(!LZ4.validate_level(0));
        assert!(LZ4.validate_level(1));
        assert!(!LZ4HC.validate_level(13));
        assert!(LZ4HC.validate_level(12));
    }

    #[test]
    fn short_output_is_buffer_too_small() {
        let data = sample();
        let mut ctx = LZ4.init().unwrap();
        let mut packed = vec![0u8; data.len()];
        let mut out = OutputBuffer::new(&mut packed);
        ctx.compress(1, &data, &mut out).unwrap();
        let packed_len = out.len();

        let mut small = vec![0u8; 100];
        let mut out = OutputBuffer::new(&mut small);
        let err = ctx.decompress(&packed[..packed_len], &mut out).unwrap_err();
        assert!(matches!(err, CompressError::BufferTooSmall { capacity: 100 }));

        let mut tiny = [0u8; 2];
        let mut out = OutputBuffer::new(&mut tiny);
        let err = ctx.compress(1, &data, &mut out).unwrap_err();
        assert!(matches!(err, CompressError::BufferTooSmall { capacity: 2 }));
    }

    #[test]
    fn garbage_is_corrupt() {
        let mut ctx = LZ4.init().unwrap();
        let mut storage = [0u8; 256];
        let cases: [&[u8]; 3] = [&[0xFF; 24], b"\x10\x00\x00\x00\xff\xff\xff\xff\xff", b"ab"];
        for garbage in cases {
            let mut out = OutputBuffer::new(&mut storage);
            let err = ctx.decompress(garbage, &mut out).unwrap_err();
            assert!(
                matches!(err, CompressError::CorruptData { model: "lz4", .. }),
                "{garbage:?} gave {err:?}"
            );
        }
    }
}
