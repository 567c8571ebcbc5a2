//! Async transport layer for the debugger's line protocol.
//!
//! The peer debugger speaks a newline-delimited text protocol over a single
//! TCP socket: outbound commands are space-separated token lines, inbound
//! frames are JSON objects (or the literal `ACK` liveness token).
//!
//! # Architecture
//!
//! The crate is designed around the tokio-util codec pattern:
//!
//! - [`WireCodec`] implements both `Encoder` and `Decoder` for wire frames
//! - [`WireReader`] wraps an `AsyncRead` to produce a `Stream` of [`Frame`]s
//! - [`WireWriter`] wraps an `AsyncWrite` to provide a `Sink` for outgoing lines
//!
//! # Scope
//!
//! This crate intentionally handles only transport concerns: framing,
//! classification of inbound frames, and split reader/writer halves.
//! Reply correlation, event routing, and breakpoint state belong in the
//! `bridge` crate.

mod codec;
mod command;
mod error;
mod message;
mod reader;
mod transport;
mod writer;

pub mod testing;

pub use codec::WireCodec;
pub use command::Command;
pub use error::CodecError;
pub use message::{Event, Frame, Reply, ReplyKind, ACK};
pub use reader::WireReader;
pub use transport::{split, WireTransport};
pub use writer::WireWriter;

use std::io;
use tokio::net::{TcpStream, ToSocketAddrs};

/// Default port the peer debugger listens on.
pub const DEFAULT_PORT: u16 = 12345;

/// Connect to the peer debugger and return a reader/writer pair.
///
/// This is a convenience function for the common case of connecting to the
/// debugger over TCP. Note that opening the socket is not the same as the
/// session being ready: the handshake is the `bridge` crate's concern.
pub async fn connect(
    addr: impl ToSocketAddrs,
) -> io::Result<(
    WireReader<tokio::net::tcp::OwnedReadHalf>,
    WireWriter<tokio::net::tcp::OwnedWriteHalf>,
)> {
    let stream = TcpStream::connect(addr).await?;
    Ok(split(stream))
}
