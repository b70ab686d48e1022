// Zstandard backend (zstd).
//
// The per-handle context owns one compression and one decompression
// context from libzstd; both are reused across packets. Frames carry their
// content size, which is checked against the output buffer before decoding.
// Frames without one are decoded straight into the buffer and a full buffer
// is recognised by libzstd's error code.

use std::ops::RangeInclusive;

use zstd::bulk::Compressor;
use zstd::zstd_safe::{self, DCtx, ErrorCode};
use zstd::zstd_safe::zstd_sys::{self, ZSTD_ErrorCode};

use super::{BackendContext, CompressBackend};
use crate::buffer::OutputBuffer;
use crate::config::MAX_PAYLOAD_SIZE;
use crate::error::CompressError;

const NAME: &str = "zstd";

/// Zstandard model.
pub static ZSTD: ZstdBackend = ZstdBackend;

#[derive(Debug, Clone, Copy, Default)]
pub struct ZstdBackend;

impl CompressBackend for ZstdBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn levels(&self) -> RangeInclusive<i32> {
        zstd::compression_level_range()
    }

    fn init(&self) -> Result<Box<dyn BackendContext>, CompressError> {
        let level = zstd::DEFAULT_COMPRESSION_LEVEL;
        let cctx = Compressor::new(level).map_err(|e| CompressError::InitFailure {
            model: NAME,
            reason: e.to_string(),
        })?;
        let dctx = DCtx::try_create().ok_or(CompressError::InitFailure {
            model: NAME,
            reason: "ZSTD_createDCtx failed".to_string(),
        })?;
        Ok(Box::new(ZstdContext { level, cctx, dctx }))
    }
}

struct ZstdContext {
    /// Level `cctx` was built for.
    level: i32,
    cctx: Compressor<'static>,
    dctx: DCtx<'static>,
}

fn is_dst_too_small(code: ErrorCode) -> bool {
    // SAFETY: ZSTD_getErrorCode only inspects the integer it is given.
    let kind = unsafe { zstd_sys::ZSTD_getErrorCode(code) };
    kind == ZSTD_ErrorCode::ZSTD_error_dstSize_tooSmall
}

impl BackendContext for ZstdContext {
    fn compress(
        &mut self,
        level: i32,
        input: &[u8],
        out: &mut OutputBuffer<'_>,
    ) -> Result<(), CompressError> {
        if level != self.level {
            self.cctx = Compressor::new(level).map_err(|e| CompressError::backend(NAME, e))?;
            self.level = level;
        }

        let capacity = out.capacity();
        let fits_worst_case = out.remaining() >= zstd_safe::compress_bound(input.len());
        let written = self
            .cctx
            .compress_to_buffer(input, out.unfilled_mut())
            .map_err(|e| {
                if fits_worst_case {
                    CompressError::backend(NAME, e)
                } else {
                    CompressError::BufferTooSmall { capacity }
                }
            })?;
        out.advance(written)
    }

    fn decompress(
        &mut self,
        input: &[u8],
        out: &mut OutputBuffer<'_>,
    ) -> Result<(), CompressError> {
        match zstd_safe::get_frame_content_size(input) {
            Ok(Some(size)) if size > MAX_PAYLOAD_SIZE as u64 => {
                return Err(CompressError::corrupt(
                    NAME,
                    format!("declared content size {size} exceeds max payload size"),
                ));
            }
            Ok(Some(size)) if size > out.remaining() as u64 => return Err(out.too_small()),
            Ok(_) => {}
            Err(_) => return Err(CompressError::corrupt(NAME, "not a zstd frame")),
        }

        let capacity = out.capacity();
        let written = self
            .dctx
            .decompress(out.unfilled_mut(), input)
            .map_err(|code| {
                if is_dst_too_small(code) {
                    CompressError::BufferTooSmall { capacity }
                } else {
                    CompressError::corrupt(NAME, zstd_safe::get_error_name(code))
                }
            })?;
        out.advance(written)
    }
}
