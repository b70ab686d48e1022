// Capacity-checked output buffer.
//
// Backends never receive a raw `&mut [u8]` plus a length to trust. They
// write through `OutputBuffer`, which refuses (rather than truncates) any
// write that would pass the end of the caller's slice.

use std::io;

use crate::error::CompressError;

/// A caller-owned output slice with a write cursor.
#[derive(Debug)]
pub struct OutputBuffer<'a> {
    buf: &'a mut [u8],
    filled: usize,
}

impl<'a> OutputBuffer<'a> {
    /// Wrap `buf`. Nothing is written yet.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, filled: 0 }
    }

    /// Total capacity of the underlying slice.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Bytes still available.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.filled
    }

    /// The written prefix.
    pub fn filled(&self) -> &[u8] {
        &self.buf[..self.filled]
    }

    /// Append `bytes` entirely, or fail without writing anything.
    pub fn put(&mut self, bytes: &[u8]) -> Result<(), CompressError> {
        if bytes.len() > self.remaining() {
            return Err(self.too_small());
        }
        self.buf[self.filled..self.filled + bytes.len()].copy_from_slice(bytes);
        self.filled += bytes.len();
        Ok(())
    }

    /// The unwritten tail, for libraries that fill a slice directly.
    /// Follow with [`advance`](Self::advance).
    pub fn unfilled_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.filled..]
    }

    /// Mark `n` bytes of the unwritten tail as written.
    pub fn advance(&mut self, n: usize) -> Result<(), CompressError> {
        if n > self.remaining() {
            return Err(self.too_small());
        }
        self.filled += n;
        Ok(())
    }

    /// Discard everything written so far.
    pub fn clear(&mut self) {
        self.filled = 0;
    }

    pub(crate) fn too_small(&self) -> CompressError {
        CompressError::BufferTooSmall {
            capacity: self.capacity(),
        }
    }

    /// Map an I/O error raised while a streaming codec wrote into this
    /// buffer. A full buffer becomes `BufferTooSmall`; anything else is
    /// handed to `other`.
    pub(crate) fn map_io_error(
        &self,
        err: io::Error,
        other: impl FnOnce(io::Error) -> CompressError,
    ) -> CompressError {
        if err.kind() == io::ErrorKind::WriteZero {
            self.too_small()
        } else {
            other(err)
        }
    }
}

impl io::Write for OutputBuffer<'_> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }
        let n = data.len().min(self.remaining());
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "output buffer capacity exhausted",
            ));
        }
        self.buf[self.filled..self.filled + n].copy_from_slice(&data[..n]);
        self.filled += n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
