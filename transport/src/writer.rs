//! Wire line writer.
//!
//! This module provides [`WireWriter`], a typed wrapper around a framed
//! async writer for sending command lines and acknowledgments.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Sink;
use pin_project_lite::pin_project;
use tokio::io::AsyncWrite;
use tokio_util::codec::FramedWrite;

use crate::codec::WireCodec;
use crate::command::Command;
use crate::error::CodecError;
use crate::message::ACK;

pin_project! {
    /// An async sink for outgoing wire lines.
    ///
    /// `WireWriter` wraps an [`AsyncWrite`] destination and frames each line
    /// with a trailing newline. It provides `send` / [`WireWriter::send_command`] /
    /// [`WireWriter::send_ack`] convenience methods for common usage.
    pub struct WireWriter<W> {
        #[pin]
        inner: FramedWrite<W, WireCodec>,
    }
}

impl<W> WireWriter<W>
where
    W: AsyncWrite + Unpin,
{
    /// Create a new writer from an async write destination.
    pub fn new(writer: W) -> Self {
        Self {
            inner: FramedWrite::new(writer, WireCodec::new()),
        }
    }

    /// Send one raw line to the peer.
    ///
    /// This is a convenience method that handles the full send cycle:
    /// feeding the line, flushing, and awaiting completion.
    pub async fn send(&mut self, line: String) -> Result<(), CodecError> {
        use futures::SinkExt;
        SinkExt::send(&mut self.inner, line).await
    }

    /// Render a command to its wire line and send it.
    pub async fn send_command(&mut self, command: &Command) -> Result<(), CodecError> {
        self.send(command.to_string()).await
    }

    /// Send the literal acknowledgment token.
    pub async fn send_ack(&mut self) -> Result<(), CodecError> {
        self.send(ACK.to_owned()).await
    }

    /// Get a mutable reference to the underlying writer.
    pub fn get_mut(&mut self) -> &mut W {
        self.inner.get_mut()
    }

    /// Consume the writer and return the underlying destination.
    pub fn into_inner(self) -> W {
        self.inner.into_inner()
    }
}

impl<W> Sink<String> for WireWriter<W>
where
    W: AsyncWrite + Unpin,
{
    type Error = CodecError;

    fn poll_ready(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.project().inner.poll_ready(cx)
    }

    fn start_send(self: Pin<&mut Self>, item: String) -> Result<(), Self::Error> {
        self.project().inner.start_send(item)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.project().inner.poll_flush(cx)
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.project().inner.poll_close(cx)
    }
}
