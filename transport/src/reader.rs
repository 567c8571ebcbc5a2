//! Wire frame reader.
//!
//! This module provides [`WireReader`], a typed wrapper around a framed
//! async reader that produces a stream of classified [`Frame`]s.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use pin_project_lite::pin_project;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;

use crate::codec::WireCodec;
use crate::error::CodecError;
use crate::message::Frame;

pin_project! {
    /// An async stream of incoming wire frames.
    ///
    /// `WireReader` wraps an [`AsyncRead`] source and decodes newline-framed
    /// messages from the byte stream. It implements [`Stream`], allowing it
    /// to be used with async iteration patterns.
    pub struct WireReader<R> {
        #[pin]
        inner: FramedRead<R, WireCodec>,
    }
}

impl<R> WireReader<R>
where
    R: AsyncRead + Unpin,
{
    /// Create a new reader from an async read source.
    pub fn new(reader: R) -> Self {
        Self {
            inner: FramedRead::new(reader, WireCodec::new()),
        }
    }

    /// Create a new reader with a custom codec.
    ///
    /// This allows configuring options like the maximum line length.
    pub fn with_codec(reader: R, codec: WireCodec) -> Self {
        Self {
            inner: FramedRead::new(reader, codec),
        }
    }

    /// Consume the reader and return the underlying source.
    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}

impl<R> Stream for WireReader<R>
where
    R: AsyncRead + Unpin,
{
    type Item = Result<Frame, CodecError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.project().inner.poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::io::Cursor;

    #[tokio::test]
    async fn read_single_frame() {
        let cursor = Cursor::new(b"{\"type\":\"resume\",\"body\":{}}\n".to_vec());

        let mut reader = WireReader::new(cursor);
        let frame = reader.next().await.unwrap().unwrap();

        assert!(matches!(frame, Frame::Reply(r) if r.kind == "resume"));
    }

    #[tokio::test]
    async fn read_mixed_frames() {
        let data = b"ACK\n{\"type\":\"Breakpoint\",\"description\":\"\"}\nnoise\n".to_vec();
        let mut reader = WireReader::new(Cursor::new(data));

        assert!(matches!(reader.next().await.unwrap().unwrap(), Frame::Ack));
        assert!(matches!(
            reader.next().await.unwrap().unwrap(),
            Frame::Event(e) if e.kind == "Breakpoint"
        ));
        assert!(matches!(
            reader.next().await.unwrap().unwrap(),
            Frame::Unrecognized(_)
        ));
        assert!(reader.next().await.is_none());
    }

    #[tokio::test]
    async fn read_eof() {
        let mut reader = WireReader::new(Cursor::new(Vec::new()));
        assert!(reader.next().await.is_none());
    }
}
