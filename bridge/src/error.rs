//! Error taxonomy for bridge operations.
//!
//! None of these crash the bridge: every failure is scoped to the operation
//! that triggered it, and the owning session decides what is user-visible.

use transport::ReplyKind;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Connection retries were exhausted before the peer acknowledged the
    /// handshake. Fatal to the connect attempt, not to the process.
    #[error("connection failed after {attempts} attempts")]
    ConnectionFailed { attempts: u32 },

    /// A command could not be sent because the connection is not ready.
    #[error("not connected to the peer debugger")]
    NotConnected,

    /// The peer answered with the bad-request reply, carrying its message.
    #[error("request rejected by the peer: {0}")]
    RequestRejected(String),

    /// A reply of an unexpected type arrived while awaiting a specific type.
    /// Scoped to that single await; not retried automatically.
    #[error("expected a `{expected}` reply but received `{got}`")]
    UnexpectedReply { expected: ReplyKind, got: String },

    /// The connection closed while a reply was being awaited.
    ///
    /// Surfacing this (rather than letting the await hang forever) is a
    /// deliberate policy; callers that need a bound on peer latency must
    /// still impose their own timeout.
    #[error("connection closed while awaiting a reply")]
    Disconnected,
}
