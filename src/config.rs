// Compression configuration input and transport limits.

use crate::error::CompressError;
use crate::registry::Registry;

/// Largest datagram payload the transport carries.
pub const MAX_PAYLOAD_SIZE: usize = 1 << 16;

/// Payload size at or below which compression is skipped, as used by
/// transports that do not pick their own value.
pub const DEFAULT_COMPRESS_THRESHOLD: usize = 100;

/// Operator request for a handle's outgoing compression.
///
/// This is transient input: [`CompressHandle::configure`](crate::handle::CompressHandle::configure)
/// validates it and copies what it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionConfig {
    /// Model id, or `None` to send everything uncompressed.
    pub model: Option<u8>,
    /// Backend-specific level.
    pub level: i32,
    /// Payloads of this many bytes or fewer are sent uncompressed.
    /// 0 compresses every non-empty payload.
    pub threshold: usize,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self::none()
    }
}

impl CompressionConfig {
    /// Compress with `model` at `level`, no threshold.
    pub fn new(model: u8, level: i32) -> Self {
        Self {
            model: Some(model),
            level,
            threshold: 0,
        }
    }

    /// Disable compression.
    pub fn none() -> Self {
        Self {
            model: None,
            level: 0,
            threshold: 0,
        }
    }

    /// Resolve `name` (or `"none"`) against `registry`.
    pub fn by_name(registry: &Registry, name: &str, level: i32) -> Result<Self, CompressError> {
        Ok(Self {
            model: registry.resolve(name)?,
            level,
            threshold: 0,
        })
    }

    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    /// Transport-level checks that do not depend on the model.
    pub(crate) fn validate_limits(&self) -> Result<(), CompressError> {
        if self.threshold > MAX_PAYLOAD_SIZE {
            return Err(CompressError::InvalidThreshold {
                threshold: self.threshold,
                max: MAX_PAYLOAD_SIZE,
            });
        }
        Ok(())
    }
}
