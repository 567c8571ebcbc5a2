//! Error types for the transport layer.

use std::io;

/// Errors that can occur while encoding or decoding wire frames.
///
/// Note that *content* problems on the wire (malformed JSON, unknown message
/// shapes) are not errors: they decode to [`crate::Frame::Unrecognized`] so
/// that noise on the socket never tears the session down.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// An I/O error occurred while reading or writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An inbound line exceeds the configured maximum length.
    #[error("line length {length} exceeds maximum allowed {max}")]
    LineTooLong {
        /// Length of the offending line so far.
        length: usize,
        /// The maximum allowed length.
        max: usize,
    },

    /// An outgoing line contains an embedded newline.
    #[error("outgoing line contains an embedded newline")]
    EmbeddedNewline,
}
