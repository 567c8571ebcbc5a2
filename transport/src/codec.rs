//! Line-frame codec implementation using tokio-util.
//!
//! This module provides [`WireCodec`], which implements both the `Encoder`
//! and `Decoder` traits from tokio-util for the peer's line protocol.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::CodecError;
use crate::message::Frame;

/// Default maximum line length (1 MB).
const DEFAULT_MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Codec for encoding and decoding wire frames.
///
/// Frames are newline-delimited UTF-8 text; a trailing carriage return is
/// tolerated. Inbound lines are classified into [`Frame`]s; content that
/// decodes to neither known shape becomes [`Frame::Unrecognized`] rather
/// than an error, so wire noise never kills the read loop.
#[derive(Debug, Clone)]
pub struct WireCodec {
    /// Maximum allowed line length in bytes.
    max_line_length: usize,
}

impl WireCodec {
    /// Create a new codec with default settings.
    pub fn new() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }

    /// Create a new codec with a custom maximum line length.
    ///
    /// Lines longer than this are rejected with [`CodecError::LineTooLong`].
    pub fn with_max_length(max_line_length: usize) -> Self {
        Self { max_line_length }
    }

    fn classify_line(&self, line: &[u8]) -> Frame {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        let frame = match std::str::from_utf8(line) {
            Ok(text) => Frame::classify(text),
            // invalid UTF-8 degrades to an unrecognized frame
            Err(_) => Frame::Unrecognized(String::from_utf8_lossy(line).into_owned()),
        };
        if let Frame::Unrecognized(raw) = &frame {
            tracing::debug!(raw, "line matches no known frame shape");
        }
        frame
    }
}

impl Default for WireCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for WireCodec {
    type Item = Frame;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(newline) = src.iter().position(|b| *b == b'\n') else {
            if src.len() > self.max_line_length {
                return Err(CodecError::LineTooLong {
                    length: src.len(),
                    max: self.max_line_length,
                });
            }
            // need more data
            return Ok(None);
        };

        if newline > self.max_line_length {
            return Err(CodecError::LineTooLong {
                length: newline,
                max: self.max_line_length,
            });
        }

        let line = src.split_to(newline + 1);
        Ok(Some(self.classify_line(&line[..newline])))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => {
                // the peer closed mid-line; flush the remainder as a frame
                let line = src.split();
                Ok(Some(self.classify_line(&line)))
            }
        }
    }
}

impl Encoder<String> for WireCodec {
    type Error = CodecError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.contains('\n') {
            return Err(CodecError::EmbeddedNewline);
        }
        dst.reserve(item.len() + 1);
        dst.put_slice(item.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}
