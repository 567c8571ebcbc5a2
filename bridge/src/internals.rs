//! Shared bridge state: the writer half, reply correlation, breakpoint
//! records, and the connection state watch.

use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{mpsc, watch};
use transport::{Command, Frame, Reply, ReplyKind, WireWriter};

use crate::breakpoints::BreakpointStore;
use crate::error::Error;
use crate::events::{self, Notification};
use crate::pending::ReplySlot;
use crate::state::{self, ConnectionState};

pub(crate) struct BridgeInternals {
    writer: tokio::sync::Mutex<WireWriter<OwnedWriteHalf>>,
    pub(crate) state: watch::Sender<ConnectionState>,
    pending: ReplySlot,
    pub(crate) breakpoints: Mutex<BreakpointStore>,
    pub(crate) notifications: mpsc::UnboundedSender<Notification>,
    pub(crate) source_file: Mutex<Option<String>>,
}

impl BridgeInternals {
    pub(crate) fn new(
        writer: WireWriter<OwnedWriteHalf>,
        state: watch::Sender<ConnectionState>,
        notifications: mpsc::UnboundedSender<Notification>,
    ) -> Self {
        Self {
            writer: tokio::sync::Mutex::new(writer),
            state,
            pending: ReplySlot::new(),
            breakpoints: Mutex::new(BreakpointStore::new()),
            notifications,
            source_file: Mutex::new(None),
        }
    }

    pub(crate) fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub(crate) fn set_state(&self, next: ConnectionState) {
        state::transition(&self.state, next);
    }

    /// Write one line if and only if the connection is ready.
    ///
    /// Returns `false` otherwise without raising an error; callers must
    /// check the result.
    pub(crate) async fn send(&self, line: String) -> bool {
        if self.connection_state() != ConnectionState::Ready {
            tracing::debug!(line, "dropping send, connection not ready");
            return false;
        }
        let mut writer = self.writer.lock().await;
        match writer.send(line).await {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(%error, "failed to write to the peer");
                false
            }
        }
    }

    pub(crate) async fn send_command(&self, command: &Command) -> bool {
        tracing::debug!(%command, "sending command");
        self.send(command.to_string()).await
    }

    /// Issue a command and await the reply of the expected kind.
    ///
    /// One-in-flight discipline applies: arming the reply slot here discards
    /// any not-yet-consumed reply context, so a stale reply can never
    /// satisfy this await.
    pub(crate) async fn send_and_wait(
        &self,
        command: Command,
        expected: ReplyKind,
    ) -> Result<Reply, Error> {
        let rx = self.pending.arm();
        if !self.send_command(&command).await {
            self.pending.cancel();
            return Err(Error::NotConnected);
        }

        // the sender is dropped when the socket closes
        let reply = rx.await.map_err(|_| Error::Disconnected)?;
        tracing::debug!(kind = %reply.kind, "received reply");

        if reply.is(ReplyKind::BadRequest) {
            let message = reply
                .body
                .get("msg")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned();
            return Err(Error::RequestRejected(message));
        }
        if reply.is(expected) {
            Ok(reply)
        } else {
            Err(Error::UnexpectedReply {
                expected,
                got: reply.kind,
            })
        }
    }

    /// Handle one inbound frame from the reader task.
    pub(crate) async fn handle_frame(self: &Arc<Self>, frame: Frame) {
        // every inbound frame is answered with the liveness acknowledgment
        self.acknowledge().await;

        match frame {
            Frame::Ack => {
                // liveness probe; the acknowledgment above is the answer
            }
            Frame::Reply(reply) => self.pending.settle(reply),
            Frame::Event(event) => {
                if event.kind == "end" {
                    // the program finished; ask the peer to shut down. The
                    // session-end notification follows the actual close.
                    let _ = self.send_command(&Command::Exit).await;
                    return;
                }
                if let Some(notification) = events::route(&event) {
                    let _ = self.notifications.send(notification);
                }
            }
            Frame::Unrecognized(raw) => {
                tracing::debug!(raw, "dropping unrecognized frame");
            }
        }
    }

    async fn acknowledge(&self) {
        let mut writer = self.writer.lock().await;
        if let Err(error) = writer.send_ack().await {
            tracing::debug!(%error, "failed to acknowledge inbound frame");
        }
    }

    /// Tear down after the socket closed, for whatever reason.
    ///
    /// Any in-flight reply await is failed with a disconnect rather than
    /// left to hang, and the session-end notification is raised exactly
    /// once.
    pub(crate) fn mark_disconnected(&self) {
        if self.connection_state() == ConnectionState::Disconnected {
            return;
        }
        self.set_state(ConnectionState::Disconnected);
        self.pending.cancel();
        let _ = self.notifications.send(Notification::SessionEnd);
    }
}
