// Error taxonomy shared by the registry, the backends and the handle.
//
// Configuration errors (UnknownModel, UnknownModelName, ModelNotBuiltIn,
// InvalidLevel, InvalidThreshold) are returned by `configure` and never
// mutate handle state. Runtime errors are per packet.

use thiserror::Error;

/// Errors returned by the compression subsystem.
#[derive(Debug, Error)]
pub enum CompressError {
    /// No model with this id is registered.
    #[error("unknown compression model id {0}")]
    UnknownModel(u8),

    /// No model with this name is registered.
    #[error("unknown compression model '{0}'")]
    UnknownModelName(String),

    /// The model is registered but its library is not part of this binary.
    #[error("compression model '{name}' (id {id}) is not built into this binary")]
    ModelNotBuiltIn { id: u8, name: &'static str },

    /// The level is outside the range the backend accepts.
    #[error("invalid level {level} for compression model '{model}' (accepted {min}..={max})")]
    InvalidLevel {
        model: &'static str,
        level: i32,
        min: i32,
        max: i32,
    },

    /// The compression threshold exceeds the largest possible payload.
    #[error("compression threshold {threshold} exceeds max payload size {max}")]
    InvalidThreshold { threshold: usize, max: usize },

    /// The backend could not allocate its per-handle state.
    #[error("failed to initialize compression model '{model}': {reason}")]
    InitFailure { model: &'static str, reason: String },

    /// The output would not fit in the caller's buffer.
    #[error("output buffer too small ({capacity} bytes)")]
    BufferTooSmall { capacity: usize },

    /// The input is not a valid stream for the model.
    #[error("corrupt '{model}' payload: {reason}")]
    CorruptData { model: &'static str, reason: String },

    /// The payload is larger than any datagram the transport carries.
    #[error("payload of {len} bytes exceeds max payload size {max}")]
    PayloadTooLarge { len: usize, max: usize },

    /// The backend library failed for a reason unrelated to the input.
    #[error("compression model '{model}' failed: {reason}")]
    Backend { model: &'static str, reason: String },
}

impl CompressError {
    /// Whether this error can only come from `configure`.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownModelName(_) | Self::InvalidLevel { .. } | Self::InvalidThreshold { .. }
        ) || self.is_compatibility_error()
    }

    /// Whether the error means "this binary cannot handle that model",
    /// as opposed to a bad payload.
    pub fn is_compatibility_error(&self) -> bool {
        matches!(self, Self::UnknownModel(_) | Self::ModelNotBuiltIn { .. })
    }

    pub(crate) fn corrupt(model: &'static str, reason: impl ToString) -> Self {
        Self::CorruptData {
            model,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn backend(model: &'static str, reason: impl ToString) -> Self {
        Self::Backend {
            model,
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compatibility_errors_are_distinct_from_corruption() {
        assert!(CompressError::UnknownModel(42).is_compatibility_error());
        let not_built = CompressError::ModelNotBuiltIn { id: 5, name: "lzo2" };
        assert!(not_built.is_compatibility_error());
        assert!(!CompressError::corrupt("zlib", "bad header").is_compatibility_error());
    }

    #[test]
    fn config_classification() {
        let level = CompressError::InvalidLevel {
            model: "zlib",
            level: 12,
            min: 0,
            max: 9,
        };
        assert!(level.is_config_error());
        assert!(!CompressError::BufferTooSmall { capacity: 4 }.is_config_error());
    }

    #[test]
    fn messages_name_the_model() {
        let err = CompressError::ModelNotBuiltIn { id: 7, name: "bzip2" };
        assert_eq!(
            err.to_string(),
            "compression model 'bzip2' (id 7) is not built into this binary"
        );
        let err = CompressError::corrupt("lz4", "truncated block");
        assert_eq!(err.to_string(), "corrupt 'lz4' payload: truncated block");
    }
}
