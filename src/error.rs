//! Error types for trajectory encoding, decoding, and scanning.

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TrajectoryError>;

/// Errors surfaced by the trajectory codec.
///
/// All failures are reported immediately to the caller; nothing is retried
/// or silently recovered. After a decode error the handle's read cursor is
/// undefined relative to frame boundaries and the caller must re-seek
/// (e.g. via a [`FrameIndex`](crate::FrameIndex)) before reading again.
#[derive(Debug, thiserror::Error)]
pub enum TrajectoryError {
    /// Bad magic or a structurally inconsistent frame header.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// A frame declares more bytes than the file holds.
    #[error("truncated frame: {0}")]
    TruncatedFrame(String),

    /// Bit-unpacking ran past the end of the compressed payload.
    #[error("bit buffer exhausted: needed {needed} bits, {available} available")]
    BufferExhausted { needed: usize, available: usize },

    /// A frame's atom count disagrees with the expected count.
    #[error("atom count mismatch: expected {expected}, frame declares {actual}")]
    AtomCountMismatch { expected: u32, actual: u32 },

    /// Encode was asked for a precision that cannot quantize the input.
    #[error("invalid precision {precision}: {reason}")]
    InvalidPrecision { precision: f32, reason: &'static str },

    /// Underlying stream failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
