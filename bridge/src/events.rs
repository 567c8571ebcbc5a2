//! Routing of peer events to session notifications.

use tokio::sync::mpsc;
use transport::Event;

use crate::types::Breakpoint;

/// A notification published to the owning session.
///
/// Subscription is explicit: [`crate::Bridge::notifications`] hands out a
/// typed receiver instead of a generic emitter interface.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// Stopped at the first statement after starting with stop-on-entry.
    EntryStop,
    /// Stopped after a step.
    StepStop,
    /// Stopped on a breakpoint.
    BreakpointStop,
    /// Stopped on an explicit pause request.
    PauseStop,
    /// Stopped on an exception, with the peer's description.
    ///
    /// Part of the notification vocabulary for the session adapter; no
    /// current peer event token maps to it.
    ExceptionStop(String),
    /// The program died; the description carries the post-mortem report.
    PostMortem(String),
    /// The connection closed, peer- or network-initiated.
    SessionEnd,
    /// A breakpoint was verified by the peer.
    BreakpointChanged(Breakpoint),
}

/// Map a peer event token to its notification.
///
/// Unknown tokens are no-ops, and the peer's "all breakpoints removed"
/// broadcast is intentionally swallowed. The `end` token is handled by the
/// connection manager (it answers with a graceful exit command; the
/// resulting socket close publishes [`Notification::SessionEnd`]).
pub(crate) fn route(event: &Event) -> Option<Notification> {
    match event.kind.as_str() {
        "StepInto" => Some(Notification::EntryStop),
        "StepOver" => Some(Notification::StepStop),
        "Breakpoint" => Some(Notification::BreakpointStop),
        "Pause" => Some(Notification::PauseStop),
        "post_mortem" => Some(Notification::PostMortem(event.description.clone())),
        // lifecycle acknowledgments; the reply path covers these
        "started" | "resumed" => None,
        // intentionally swallowed with no outward notification
        "all_breakpoints_removed" => None,
        "end" => None,
        other => {
            tracing::debug!(kind = other, "ignoring unknown event token");
            None
        }
    }
}

/// Typed receiver for [`Notification`]s.
pub struct NotificationReceiver {
    rx: mpsc::UnboundedReceiver<Notification>,
}

impl NotificationReceiver {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<Notification>) -> Self {
        Self { rx }
    }

    /// Receive the next notification; `None` once the bridge is gone.
    pub async fn recv(&mut self) -> Option<Notification> {
        self.rx.recv().await
    }

    /// Convert to a `Stream` for use with `StreamExt`.
    pub fn into_stream(self) -> impl futures::Stream<Item = Notification> {
        tokio_stream::wrappers::UnboundedReceiverStream::new(self.rx)
    }
}
