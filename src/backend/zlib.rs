// Zlib and raw deflate backends (flate2).
//
// Both models share one adapter; they differ only in whether the stream
// carries the zlib header and Adler-32 trailer. The per-handle context owns
// a reusable deflate/inflate state, reset before every call, and works
// directly on the caller's output slice.

use std::ops::RangeInclusive;

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

use super::{BackendContext, CompressBackend};
use crate::buffer::OutputBuffer;
use crate::error::CompressError;

/// Zlib/deflate levels (0 = store, 9 = best).
const LEVELS: RangeInclusive<i32> = 0..=9;

/// Zlib (deflate + zlib header + Adler-32).
pub static ZLIB: ZlibBackend = ZlibBackend {
    name: "zlib",
    zlib_header: true,
};

/// Raw deflate: a fast LZ77 coder with no framing overhead.
pub static DEFLATE: ZlibBackend = ZlibBackend {
    name: "deflate",
    zlib_header: false,
};

/// flate2-backed model, with or without the zlib wrapper.
#[derive(Debug)]
pub struct ZlibBackend {
    name: &'static str,
    zlib_header: bool,
}

impl CompressBackend for ZlibBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    fn levels(&self) -> RangeInclusive<i32> {
        LEVELS
    }

    fn init(&self) -> Result<Box<dyn BackendContext>, CompressError> {
        Ok(Box::new(ZlibContext {
            name: self.name,
            zlib_header: self.zlib_header,
            deflate: None,
            inflate: Decompress::new(self.zlib_header),
        }))
    }
}

struct ZlibContext {
    name: &'static str,
    zlib_header: bool,
    /// Deflate state and the level it was built for.
    deflate: Option<(i32, Compress)>,
    inflate: Decompress,
}

fn new_deflate(level: i32, zlib_header: bool) -> Compress {
    // Levels are validated against 0..=9 before they get here.
    Compress::new(Compression::new(level.clamp(0, 9) as u32), zlib_header)
}

impl ZlibContext {
    fn deflate_for(&mut self, level: i32) -> &mut Compress {
        let zlib_header = self.zlib_header;
        let (current, deflate) = self
            .deflate
            .get_or_insert_with(|| (level, new_deflate(level, zlib_header)));
        if *current == level {
            deflate.reset();
        } else {
            *current = level;
            *deflate = new_deflate(level, zlib_header);
        }
        deflate
    }
}

impl BackendContext for ZlibContext {
    fn compress(
        &mut self,
        level: i32,
        input: &[u8],
        out: &mut OutputBuffer<'_>,
    ) -> Result<(), CompressError> {
        let name = self.name;
        let deflate = self.deflate_for(level);
        let capacity = out.capacity();
        let dst_len = out.remaining();
        let dst = out.unfilled_mut();
        let (mut consumed, mut produced) = (0usize, 0usize);

        loop {
            let (in_before, out_before) = (deflate.total_in(), deflate.total_out());
            let status = deflate
                .compress(&input[consumed..], &mut dst[produced..], FlushCompress::Finish)
                .map_err(|e| CompressError::backend(name, e))?;
            let read = (deflate.total_in() - in_before) as usize;
            let written = (deflate.total_out() - out_before) as usize;
            consumed += read;
            produced += written;

            match status {
                Status::StreamEnd => break,
                _ if produced == dst_len => {
                    return Err(CompressError::BufferTooSmall { capacity });
                }
                _ if read == 0 && written == 0 => {
                    return Err(CompressError::backend(name, "deflate made no progress"));
                }
                _ => {}
            }
        }

        out.advance(produced)
    }

    fn decompress(
        &mut self,
        input: &[u8],
        out: &mut OutputBuffer<'_>,
    ) -> Result<(), CompressError> {
        let name = self.name;
        self.inflate.reset(self.zlib_header);
        let inflate = &mut self.inflate;
        let capacity = out.capacity();
        let dst_len = out.remaining();
        let dst = out.unfilled_mut();
        let (mut consumed, mut produced) = (0usize, 0usize);

        loop {
            let (in_before, out_before) = (inflate.total_in(), inflate.total_out());
            let status = inflate
                .decompress(&input[consumed..], &mut dst[produced..], FlushDecompress::Finish)
                .map_err(|e| CompressError::corrupt(name, e))?;
            let read = (inflate.total_in() - in_before) as usize;
            let written = (inflate.total_out() - out_before) as usize;
            consumed += read;
            produced += written;

            match status {
                Status::StreamEnd => break,
                _ if produced == dst_len => {
                    return Err(CompressError::BufferTooSmall { capacity });
                }
                _ if consumed == input.len() || (read == 0 && written == 0) => {
                    return Err(CompressError::corrupt(name, "truncated stream"));
                }
                _ => {}
            }
        }

        out.advance(produced)
    }
}
