//! The public bridge handle and its connection manager.

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use serde_json::Value;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use transport::{Command, Frame, Reply, ReplyKind, WireReader, WireWriter};

use crate::error::Error;
use crate::events::{Notification, NotificationReceiver};
use crate::internals::BridgeInternals;
use crate::state::{self, ConnectionState};
use crate::types::{Breakpoint, StackFrame, StackSnapshot, Variable};
use crate::utils::normalise_path;

/// Bounded connect policy: attempts spaced one second apart, the handshake
/// acknowledgment must arrive within the same window.
const CONNECT_ATTEMPTS: u32 = 10;
const RETRY_SPACING: Duration = Duration::from_secs(1);

/// How long a graceful exit may take before the peer process gets killed.
const TERMINATE_GRACE: Duration = Duration::from_secs(5);

/// Handle to the peer debugger process, supplied by the host collaborator
/// that spawned it. The bridge itself never spawns processes.
pub trait PeerHandle: Send {
    /// Kill the peer debugger process.
    fn kill(&mut self);
}

/// Async bridge to the peer debugger.
///
/// Obtained via [`Bridge::connect`]. All operations map to at most one
/// command and one awaited reply; the owning session must serialize its
/// calls (issue one operation, await it, then issue the next) because
/// replies are correlated by ordering alone.
pub struct Bridge {
    internals: Arc<BridgeInternals>,
    notifications: NotificationReceiver,
    cancel_token: CancellationToken,
    reader_handle: Option<JoinHandle<()>>,
    peer: Mutex<Option<Box<dyn PeerHandle>>>,
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge").finish_non_exhaustive()
    }
}

impl Bridge {
    /// Connect to the peer debugger on the default port.
    pub async fn connect_default() -> Result<Self, Error> {
        Self::connect(transport::DEFAULT_PORT).await
    }

    /// Connect to the peer debugger on the loopback interface.
    ///
    /// The peer process may not have finished starting yet, so this retries
    /// a bounded number of times. Success means the peer acknowledged the
    /// handshake, not merely that the socket opened.
    #[tracing::instrument]
    pub async fn connect(port: u16) -> Result<Self, Error> {
        let addr = format!("127.0.0.1:{port}");
        let (state_tx, _state_keepalive) = watch::channel(ConnectionState::Disconnected);
        state::transition(&state_tx, ConnectionState::Connecting);

        let mut attempts = 0;
        let (reader, writer) = loop {
            attempts += 1;
            let window_end = Instant::now() + RETRY_SPACING;
            match time::timeout_at(window_end, Self::attempt(&addr)).await {
                Ok(Ok(pair)) => break pair,
                Ok(Err(error)) => {
                    tracing::debug!(attempts, %error, "connection attempt failed");
                }
                Err(_) => {
                    tracing::debug!(attempts, "no handshake acknowledgment within the window");
                }
            }
            if attempts >= CONNECT_ATTEMPTS {
                state::transition(&state_tx, ConnectionState::Disconnected);
                return Err(Error::ConnectionFailed { attempts });
            }
            time::sleep_until(window_end).await;
        };

        let (notification_tx, notification_rx) = mpsc::unbounded_channel();
        let internals = Arc::new(BridgeInternals::new(writer, state_tx, notification_tx));
        internals.set_state(ConnectionState::Ready);

        let cancel_token = CancellationToken::new();
        let reader_handle =
            Self::spawn_reader_task(reader, Arc::clone(&internals), cancel_token.clone());

        Ok(Self {
            internals,
            notifications: NotificationReceiver::new(notification_rx),
            cancel_token,
            reader_handle: Some(reader_handle),
            peer: Mutex::new(None),
        })
    }

    /// One connect attempt: open the socket, send the handshake, and wait
    /// for the peer's acknowledgment.
    async fn attempt(
        addr: &str,
    ) -> io::Result<(WireReader<OwnedReadHalf>, WireWriter<OwnedWriteHalf>)> {
        let (mut reader, mut writer) = transport::connect(addr).await?;
        writer.send_ack().await.map_err(io::Error::other)?;

        loop {
            match reader.next().await {
                Some(Ok(Frame::Ack)) => return Ok((reader, writer)),
                Some(Ok(frame)) => {
                    tracing::trace!(?frame, "frame before handshake acknowledgment");
                }
                Some(Err(error)) => return Err(io::Error::other(error)),
                None => return Err(io::ErrorKind::UnexpectedEof.into()),
            }
        }
    }

    /// Background task delivering inbound frames into the bridge.
    fn spawn_reader_task(
        mut reader: WireReader<OwnedReadHalf>,
        internals: Arc<BridgeInternals>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("reader task cancelled");
                        break;
                    }
                    frame = reader.next() => {
                        match frame {
                            Some(Ok(frame)) => {
                                tracing::trace!(?frame, "received frame");
                                internals.handle_frame(frame).await;
                            }
                            Some(Err(error)) => {
                                tracing::warn!(%error, "transport error");
                                break;
                            }
                            None => {
                                tracing::debug!("peer closed the connection");
                                break;
                            }
                        }
                    }
                }
            }
            internals.mark_disconnected();
        })
    }

    /// Register the handle of the peer process so [`Bridge::force_terminate`]
    /// can escalate to killing it.
    pub fn set_peer_handle(&self, handle: Box<dyn PeerHandle>) {
        *self.peer.lock().unwrap() = Some(handle);
    }

    /// The current connection health.
    pub fn connection_state(&self) -> ConnectionState {
        self.internals.connection_state()
    }

    /// Typed receiver for session notifications.
    ///
    /// There is exactly one receiver, owned by the bridge and borrowed by
    /// the session that drives it; dropping interest in a notification kind
    /// means ignoring it. Per-kind subscription is not part of the contract.
    pub fn notifications(&mut self) -> &mut NotificationReceiver {
        &mut self.notifications
    }

    /// Select the program file to debug.
    #[tracing::instrument(skip(self))]
    pub async fn prepare(&self, program: &str) -> Result<(), Error> {
        let program = normalise_path(program).into_owned();
        *self.internals.source_file.lock().unwrap() = Some(program.clone());
        self.run_command(Command::SetFile(program), ReplyKind::FileSet)
            .await
            .map(drop)
    }

    /// Start executing the prepared program.
    // `skip(debug)`: tracing's `instrument` expansion shadows a parameter
    // named `debug` with `tracing::field::debug`, which fails to compile.
    #[tracing::instrument(skip(self, debug))]
    pub async fn start(&self, stop_on_entry: bool, debug: bool) -> Result<(), Error> {
        let command = if debug {
            if stop_on_entry {
                Command::StepInto
            } else {
                Command::Run
            }
        } else {
            Command::RunNoDebug
        };
        self.run_command(command, ReplyKind::Started).await.map(drop)
    }

    /// Continue execution to the end or the next breakpoint.
    #[tracing::instrument(skip(self))]
    pub async fn continue_(&self) -> Result<(), Error> {
        self.run_command(Command::Continue, ReplyKind::Resume)
            .await
            .map(drop)
    }

    /// Step into the next statement.
    #[tracing::instrument(skip(self))]
    pub async fn step_in(&self) -> Result<(), Error> {
        self.run_command(Command::StepInto, ReplyKind::Resume)
            .await
            .map(drop)
    }

    /// Step over to the next non-empty line.
    #[tracing::instrument(skip(self))]
    pub async fn step_over(&self) -> Result<(), Error> {
        self.run_command(Command::StepOver, ReplyKind::Resume)
            .await
            .map(drop)
    }

    /// Ask the peer to pause; the stop arrives as a notification.
    #[tracing::instrument(skip(self))]
    pub async fn pause(&self) -> bool {
        self.internals.send_command(&Command::Pause).await
    }

    /// Fetch a stack snapshot, sliced to the requested frame window.
    ///
    /// Protocol failures are logged and produce an empty snapshot.
    #[tracing::instrument(skip(self))]
    pub async fn stack(&self, start_frame: usize, end_frame: usize) -> StackSnapshot {
        match self.run_command(Command::Stack, ReplyKind::StackTrace).await {
            Ok(reply) => {
                let source = self
                    .internals
                    .source_file
                    .lock()
                    .unwrap()
                    .clone()
                    .unwrap_or_default();
                let frames = stack_frames_from_reply(&reply, &source, start_frame, end_frame);
                StackSnapshot {
                    count: frames.len(),
                    frames,
                }
            }
            Err(_) => StackSnapshot::default(),
        }
    }

    /// Fetch the local variables of the innermost frame, values rendered to
    /// canonical text.
    ///
    /// Protocol failures are logged and produce an empty sequence.
    #[tracing::instrument(skip(self))]
    pub async fn local_variables(&self) -> Vec<Variable> {
        match self.run_command(Command::Frame(0), ReplyKind::Frame).await {
            Ok(reply) => variables_from_reply(&reply),
            Err(_) => Vec::new(),
        }
    }

    /// Set a breakpoint and verify it through a round trip to the peer.
    ///
    /// The record is created unverified and returned in either outcome: it
    /// flips to verified only when the peer reports the identical line, and
    /// a mismatch or wire failure leaves it unverified without an error.
    #[tracing::instrument(skip(self))]
    pub async fn set_breakpoint(
        &self,
        path: &str,
        line: u64,
        condition: Option<&str>,
    ) -> Breakpoint {
        let path = normalise_path(path).into_owned();
        let breakpoint = self.internals.breakpoints.lock().unwrap().add(
            &path,
            line,
            condition.map(str::to_owned),
        );

        let command = match &breakpoint.condition {
            Some(condition) => Command::ExprBreakpoint {
                path: path.clone(),
                line,
                condition: condition.clone(),
            },
            None => Command::Breakpoint {
                path: path.clone(),
                line,
            },
        };

        match self
            .internals
            .send_and_wait(command, ReplyKind::BreakpointSet)
            .await
        {
            Ok(reply) => {
                let reported = reply.body.get("line").and_then(Value::as_u64);
                if reported == Some(line) {
                    let verified = self
                        .internals
                        .breakpoints
                        .lock()
                        .unwrap()
                        .mark_verified(&path, breakpoint.id);
                    if let Some(verified) = verified {
                        let _ = self
                            .internals
                            .notifications
                            .send(Notification::BreakpointChanged(verified.clone()));
                        return verified;
                    }
                } else {
                    tracing::debug!(?reported, requested = line, "breakpoint not verified");
                }
            }
            Err(error) => {
                tracing::warn!(%error, "breakpoint verification failed");
            }
        }
        breakpoint
    }

    /// Pure local lookup with no wire traffic.
    pub fn breakpoint_exists(&self, path: &str, line: u64) -> bool {
        let path = normalise_path(path);
        self.internals
            .breakpoints
            .lock()
            .unwrap()
            .exists(&path, line)
    }

    /// Clear the first breakpoint matching the line.
    ///
    /// The wire round trip only happens when a match existed; its failure
    /// is logged but the local removal stands.
    #[tracing::instrument(skip(self))]
    pub async fn clear_breakpoint(&self, path: &str, line: u64) -> Option<Breakpoint> {
        let path = normalise_path(path).into_owned();
        let removed = self
            .internals
            .breakpoints
            .lock()
            .unwrap()
            .remove(&path, line)?;

        let command = Command::Clear {
            path,
            line: Some(line),
        };
        if let Err(error) = self
            .internals
            .send_and_wait(command, ReplyKind::BreakpointRemoved)
            .await
        {
            tracing::warn!(%error, "clearing breakpoint on the peer failed");
        }
        Some(removed)
    }

    /// Drop every breakpoint in the file, with one unconditional clear-all
    /// round trip.
    #[tracing::instrument(skip(self))]
    pub async fn clear_all_breakpoints(&self, path: &str) {
        let path = normalise_path(path).into_owned();
        self.internals
            .breakpoints
            .lock()
            .unwrap()
            .remove_file(&path);

        let command = Command::Clear { path, line: None };
        if let Err(error) = self
            .internals
            .send_and_wait(command, ReplyKind::AllBreakpointsRemoved)
            .await
        {
            tracing::warn!(%error, "clearing all breakpoints on the peer failed");
        }
    }

    /// Request a graceful shutdown of the peer.
    ///
    /// Returns whether the exit command could be sent.
    #[tracing::instrument(skip(self))]
    pub async fn terminate(&self) -> bool {
        self.internals.send_command(&Command::Exit).await
    }

    /// Escalating shutdown: send the exit command, then kill the peer
    /// process and tear the socket down if the peer has not closed the
    /// connection within the grace period.
    #[tracing::instrument(skip(self))]
    pub async fn force_terminate(&self) {
        if self.connection_state() == ConnectionState::Ready {
            let _ = self.internals.send_command(&Command::Exit).await;

            let mut state_rx = self.internals.state.subscribe();
            let closed = time::timeout(
                TERMINATE_GRACE,
                state_rx.wait_for(|state| *state == ConnectionState::Disconnected),
            )
            .await
            .is_ok();

            if !closed {
                tracing::warn!("peer did not close within the grace period, killing it");
                if let Some(peer) = self.peer.lock().unwrap().as_mut() {
                    peer.kill();
                }
            }
        }
        // tear the socket down regardless of how far the peer got
        self.cancel_token.cancel();
    }

    async fn run_command(&self, command: Command, expected: ReplyKind) -> Result<Reply, Error> {
        match self.internals.send_and_wait(command, expected).await {
            Ok(reply) => Ok(reply),
            Err(error) => {
                tracing::warn!(%error, "operation failed");
                Err(error)
            }
        }
    }

    /// Wait for the reader task to finish, for orderly test shutdown.
    pub async fn shutdown(mut self) {
        self.cancel_token.cancel();
        if let Some(handle) = self.reader_handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

/// Slice the peer-reported frame list to the requested window, clamped to
/// the list's actual length.
fn stack_frames_from_reply(
    reply: &Reply,
    source: &str,
    start_frame: usize,
    end_frame: usize,
) -> Vec<StackFrame> {
    let Some(stack) = reply.body.get("stack").and_then(Value::as_array) else {
        tracing::debug!("stack reply carried no frame list");
        return Vec::new();
    };

    let end = end_frame.min(stack.len());
    let mut frames = Vec::new();
    for (index, entry) in stack.iter().enumerate().take(end).skip(start_frame) {
        frames.push(StackFrame {
            index,
            name: entry
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned(),
            file: source.to_owned(),
            line: entry.get("lineno").and_then(Value::as_u64).unwrap_or_default(),
        });
    }
    frames
}

fn variables_from_reply(reply: &Reply) -> Vec<Variable> {
    let locals = reply
        .body
        .get("frame")
        .and_then(|frame| frame.get("locals"))
        .and_then(Value::as_object);
    let Some(locals) = locals else {
        tracing::debug!("frame reply carried no locals");
        return Vec::new();
    };

    locals
        .iter()
        .map(|(name, value)| Variable {
            name: name.clone(),
            value: render_value(value),
        })
        .collect()
}

/// Canonical text form of a local's value: strings directly, absent values
/// as empty text, everything else as compact JSON.
fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
