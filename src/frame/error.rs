use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Unsupported signal/codec combination: {kind}/{codec}")]
    UnsupportedCombination { kind: String, codec: String },

    #[error("Unknown signal kind: {0}")]
    UnknownKind(String),

    #[error("Unknown codec: {0}")]
    UnknownCodec(String),

    #[error("Invalid frame dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Encoder for {expected} frames was given a {actual} frame")]
    FrameMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Encoding failed: {0}")]
    EncodeFailed(String),
}

impl FrameError {
    /// Errors raised while building a source or encoder, before any frame exists
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            FrameError::UnsupportedCombination { .. }
                | FrameError::UnknownKind(_)
                | FrameError::UnknownCodec(_)
                | FrameError::InvalidDimensions { .. }
        )
    }
}

pub type FrameResult<T> = Result<T, FrameError>;
