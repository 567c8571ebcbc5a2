//! Inbound frame types and classification.
//!
//! The peer sends two JSON shapes on the same channel: terminal replies to
//! commands (`{"type": ..., "body": {...}}`) and spontaneous events
//! (`{"type": ..., "description": ...}`). Replies are correlated to commands
//! purely by type token and strict ordering; events are fire-and-forget.

use std::fmt;

use serde::Deserialize;
use serde_json::{Map, Value};

/// Literal exchanged as handshake and liveness acknowledgment.
pub const ACK: &str = "ACK";

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Handshake acknowledgment or liveness probe.
    Ack,
    /// A terminal response to exactly one prior command.
    Reply(Reply),
    /// A spontaneous notification not tied to a specific command.
    Event(Event),
    /// Malformed JSON or neither known shape; dropped upstream, never fatal.
    Unrecognized(String),
}

impl Frame {
    /// Classify one raw text frame.
    ///
    /// Decoding tolerates arbitrary noise on the wire: anything that is not
    /// the `ACK` literal, a reply shape, or an event shape comes back as
    /// [`Frame::Unrecognized`] rather than an error.
    pub fn classify(raw: &str) -> Frame {
        let trimmed = raw.trim();
        if trimmed == ACK {
            return Frame::Ack;
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Decoded {
            // reply shape is checked first: a frame carrying both `body` and
            // `description` counts as a reply
            Reply(Reply),
            Event(Event),
        }

        match serde_json::from_str(trimmed) {
            Ok(Decoded::Reply(reply)) => Frame::Reply(reply),
            Ok(Decoded::Event(event)) => Frame::Event(event),
            Err(_) => Frame::Unrecognized(raw.to_owned()),
        }
    }
}

/// A terminal reply from the peer debugger.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Reply {
    /// Reply-type token, see [`ReplyKind`] for the recognized vocabulary.
    #[serde(rename = "type")]
    pub kind: String,
    /// Reply payload; keys are command-specific.
    pub body: Map<String, Value>,
}

impl Reply {
    /// Does this reply carry the given type token?
    pub fn is(&self, kind: ReplyKind) -> bool {
        self.kind == kind.as_wire()
    }
}

/// A spontaneous event from the peer debugger.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Event {
    /// Event-type token (`started`, `StepInto`, `Breakpoint`, `end`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Free-form description; empty for most events.
    pub description: String,
}

/// The recognized reply-type tokens.
///
/// Replies carry no request identifier, so the bridge awaits a reply *of a
/// given kind* and relies on strict one-command-in-flight ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    FileSet,
    /// The peer answers the run commands with a reply-shaped `started`
    /// message, even though `started` also exists as an event token.
    Started,
    Resume,
    Frame,
    StackTrace,
    Breakpoints,
    BreakpointSet,
    BreakpointRemoved,
    AllBreakpointsRemoved,
    BadRequest,
}

impl ReplyKind {
    /// The token spelling used on the wire.
    pub const fn as_wire(self) -> &'static str {
        match self {
            ReplyKind::FileSet => "file_set",
            ReplyKind::Started => "started",
            ReplyKind::Resume => "resume",
            ReplyKind::Frame => "frame",
            ReplyKind::StackTrace => "stack_trace",
            ReplyKind::Breakpoints => "breakpoints",
            ReplyKind::BreakpointSet => "breakpoint_set",
            ReplyKind::BreakpointRemoved => "breakpoint_removed",
            ReplyKind::AllBreakpointsRemoved => "all_breakpoints_removed",
            ReplyKind::BadRequest => "bad_request",
        }
    }
}

impl fmt::Display for ReplyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}
