//! In-memory transport for testing.

use tokio::io::{duplex, DuplexStream};

use crate::transport::WireTransport;

/// An in-memory transport for testing wire communication.
///
/// `MemoryTransport` uses tokio's [`DuplexStream`] to provide a bidirectional
/// in-memory channel that can be split into read and write halves.
///
/// # Example
///
/// ```
/// use transport::split;
/// use transport::testing::MemoryTransport;
///
/// // Create a connected pair of transports
/// let (bridge_side, peer_side) = MemoryTransport::pair();
///
/// // Split into reader/writer pairs
/// let (bridge_reader, bridge_writer) = split(bridge_side);
/// let (peer_reader, peer_writer) = split(peer_side);
///
/// // Now bridge_writer -> peer_reader and peer_writer -> bridge_reader
/// ```
pub struct MemoryTransport {
    read: DuplexStream,
    write: DuplexStream,
}

impl MemoryTransport {
    /// Create a connected pair of in-memory transports.
    ///
    /// Lines sent on one transport's writer will be received on the other
    /// transport's reader, simulating a bidirectional connection.
    ///
    /// Uses a default buffer size of 64KB for each direction.
    pub fn pair() -> (Self, Self) {
        Self::pair_with_buffer_size(64 * 1024)
    }

    /// Create a connected pair with a custom buffer size.
    ///
    /// Smaller buffers can be useful for testing backpressure behavior.
    pub fn pair_with_buffer_size(buffer_size: usize) -> (Self, Self) {
        let (a_to_b_write, a_to_b_read) = duplex(buffer_size);
        let (b_to_a_write, b_to_a_read) = duplex(buffer_size);

        let transport_a = MemoryTransport {
            read: b_to_a_read,
            write: a_to_b_write,
        };

        let transport_b = MemoryTransport {
            read: a_to_b_read,
            write: b_to_a_write,
        };

        (transport_a, transport_b)
    }
}

impl WireTransport for MemoryTransport {
    type Read = DuplexStream;
    type Write = DuplexStream;

    fn into_split(self) -> (Self::Read, Self::Write) {
        (self.read, self.write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Frame;
    use crate::split;
    use crate::Command;
    use futures::StreamExt;

    #[tokio::test]
    async fn memory_transport_roundtrip() {
        let (bridge_side, peer_side) = MemoryTransport::pair();

        let (mut bridge_reader, mut bridge_writer) = split(bridge_side);
        let (mut peer_reader, mut peer_writer) = split(peer_side);

        // bridge sends the handshake
        bridge_writer.send_ack().await.unwrap();
        assert!(matches!(peer_reader.next().await.unwrap().unwrap(), Frame::Ack));

        // bridge sends a command, peer answers with a reply frame
        bridge_writer.send_command(&Command::Stack).await.unwrap();
        assert!(matches!(
            peer_reader.next().await.unwrap().unwrap(),
            Frame::Unrecognized(line) if line == "stack"
        ));

        peer_writer
            .send(r#"{"type":"stack_trace","body":{"stack":[]}}"#.to_string())
            .await
            .unwrap();
        assert!(matches!(
            bridge_reader.next().await.unwrap().unwrap(),
            Frame::Reply(r) if r.kind == "stack_trace"
        ));
    }

    #[tokio::test]
    async fn memory_transport_close_signals_eof() {
        let (bridge_side, peer_side) = MemoryTransport::pair();

        let (_bridge_reader, bridge_writer) = split(bridge_side);
        let (mut peer_reader, _peer_writer) = split(peer_side);

        drop(bridge_writer);

        let result = peer_reader.next().await;
        assert!(result.is_none());
    }
}
