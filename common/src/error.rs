use thiserror::Error;

/// A complete frame that could not be turned into a message.
/// The frame is dropped; the connection it arrived on stays usable.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLong { len: usize, max: usize },
}
