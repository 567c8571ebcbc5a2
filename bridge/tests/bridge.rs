use std::io::IsTerminal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bridge::{Bridge, ConnectionState, Error, Notification, PeerHandle};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::time::{timeout, Instant};
use tracing_subscriber::EnvFilter;

// test suite "constructor"
#[ctor::ctor]
fn init() {
    let in_ci = std::env::var("CI")
        .map(|val| val == "true")
        .unwrap_or(false);

    if std::io::stderr().is_terminal() || in_ci {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .json()
            .try_init();
    }

    // error traces
    let _ = color_eyre::install();
}

/// What the scripted peer does in response to one inbound line.
enum Action {
    Line(String),
    Close,
}

fn reply(kind: &str, body: serde_json::Value) -> Action {
    Action::Line(json!({"type": kind, "body": body}).to_string())
}

fn event(kind: &str, description: &str) -> Action {
    Action::Line(json!({"type": kind, "description": description}).to_string())
}

/// Spawn a scripted peer debugger on an OS-assigned port.
///
/// The peer completes the handshake, then feeds every non-acknowledgment
/// line to the script and writes back whatever it returns. Acknowledgments
/// from the bridge are ignored.
async fn spawn_peer<F>(mut script: F) -> u16
where
    F: FnMut(&str) -> Vec<Action> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (read, mut write) = stream.into_split();
        let mut lines = BufReader::new(read).lines();
        let mut handshaken = false;

        while let Ok(Some(line)) = lines.next_line().await {
            if line == "ACK" {
                if !handshaken {
                    handshaken = true;
                    write.write_all(b"ACK\n").await.unwrap();
                }
                continue;
            }
            for action in script(&line) {
                match action {
                    Action::Line(text) => {
                        write.write_all(text.as_bytes()).await.unwrap();
                        write.write_all(b"\n").await.unwrap();
                    }
                    Action::Close => return,
                }
            }
        }
    });

    port
}

async fn next_notification(bridge: &mut Bridge) -> Notification {
    timeout(Duration::from_secs(10), bridge.notifications().recv())
        .await
        .expect("timeout waiting for notification")
        .expect("notification channel closed")
}

#[tokio::test(start_paused = true)]
async fn connection_gives_up_after_bounded_retries() {
    // bind then drop to get a port with nothing listening on it
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let before = Instant::now();
    let result = Bridge::connect(port).await;
    let elapsed = before.elapsed();

    match result {
        Err(Error::ConnectionFailed { attempts }) => assert_eq!(attempts, 10),
        other => panic!("expected connection failure, got {other:?}"),
    }
    // attempts are spaced a second apart
    assert!(elapsed >= Duration::from_secs(9), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn an_open_socket_without_acknowledgment_is_not_a_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    // accept connections but never speak
    tokio::spawn(async move {
        let mut sockets = Vec::new();
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            sockets.push(stream);
        }
    });

    match Bridge::connect(port).await {
        Err(Error::ConnectionFailed { attempts }) => assert_eq!(attempts, 10),
        other => panic!("expected connection failure, got {other:?}"),
    }
}

#[tokio::test]
async fn breakpoints_round_trip_with_verification() -> eyre::Result<()> {
    let port = spawn_peer(|line| match line {
        "file run.tt" => vec![reply("file_set", json!({}))],
        "break run.tt 5" => vec![reply("breakpoint_set", json!({"line": 5}))],
        // peer moves the second one to a different line: not verified
        "break run.tt 7" => vec![
            reply("breakpoint_set", json!({"line": 6})),
            event("Breakpoint", "stopped"),
        ],
        other => panic!("unexpected line: {other}"),
    })
    .await;

    let mut bridge = Bridge::connect(port).await?;
    assert_eq!(bridge.connection_state(), ConnectionState::Ready);
    bridge.prepare("run.tt").await?;

    let first = bridge.set_breakpoint("run.tt", 5, None).await;
    assert_eq!(first.id, 1);
    assert!(first.verified);

    let second = bridge.set_breakpoint("run.tt", 7, None).await;
    assert_eq!(second.id, 2);
    assert!(!second.verified);

    assert!(bridge.breakpoint_exists("run.tt", 5));
    assert!(bridge.breakpoint_exists("run.tt", 7));
    assert!(!bridge.breakpoint_exists("run.tt", 9));

    assert_eq!(
        next_notification(&mut bridge).await,
        Notification::BreakpointChanged(first)
    );
    assert_eq!(
        next_notification(&mut bridge).await,
        Notification::BreakpointStop
    );
    Ok(())
}

#[tokio::test]
async fn control_flow_commands_await_their_replies() -> eyre::Result<()> {
    let port = spawn_peer(|line| match line {
        "file run.tt" => vec![reply("file_set", json!({}))],
        "step_into" => vec![reply("started", json!({}))],
        "step_over" => vec![reply("resume", json!({}))],
        "continue" => vec![reply("resume", json!({}))],
        other => panic!("unexpected line: {other}"),
    })
    .await;

    let bridge = Bridge::connect(port).await?;
    bridge.prepare("run.tt").await?;
    bridge.start(true, true).await?;
    bridge.step_over().await?;
    bridge.continue_().await?;
    Ok(())
}

#[tokio::test]
async fn rejections_carry_the_peer_message() -> eyre::Result<()> {
    let port = spawn_peer(|line| match line {
        "continue" => vec![reply("bad_request", json!({"msg": "not running"}))],
        "step_over" => vec![reply("frame", json!({}))],
        other => panic!("unexpected line: {other}"),
    })
    .await;

    let bridge = Bridge::connect(port).await?;

    match bridge.continue_().await {
        Err(Error::RequestRejected(message)) => assert_eq!(message, "not running"),
        other => panic!("expected rejection, got {other:?}"),
    }

    match bridge.step_over().await {
        Err(Error::UnexpectedReply { got, .. }) => assert_eq!(got, "frame"),
        other => panic!("expected mismatch, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn stack_and_locals_parse_the_peer_shapes() -> eyre::Result<()> {
    let port = spawn_peer(|line| match line {
        "file run.tt" => vec![reply("file_set", json!({}))],
        "stack" => vec![reply(
            "stack_trace",
            json!({"stack": [
                {"name": "main", "lineno": 12},
                {"name": "draw", "lineno": 4},
            ]}),
        )],
        "frame 0" => vec![reply(
            "frame",
            json!({"frame": {"name": "main", "lineno": 12, "locals": {
                "angle": 90,
                "label": "north",
                "pen": null,
            }}}),
        )],
        other => panic!("unexpected line: {other}"),
    })
    .await;

    let bridge = Bridge::connect(port).await?;
    bridge.prepare("run.tt").await?;

    let snapshot = bridge.stack(0, 20).await;
    assert_eq!(snapshot.count, 2);
    assert_eq!(snapshot.frames[0].name, "main");
    assert_eq!(snapshot.frames[0].file, "run.tt");
    assert_eq!(snapshot.frames[0].line, 12);
    assert_eq!(snapshot.frames[1].index, 1);

    // window past the end clamps to nothing
    let empty = bridge.stack(5, 20).await;
    assert_eq!(empty.count, 0);

    let mut variables = bridge.local_variables().await;
    variables.sort_by(|a, b| a.name.cmp(&b.name));
    assert_eq!(variables.len(), 3);
    assert_eq!(variables[0].name, "angle");
    assert_eq!(variables[0].value, "90");
    assert_eq!(variables[1].value, "north");
    assert_eq!(variables[2].value, "");
    Ok(())
}

#[tokio::test]
async fn clearing_breakpoints_updates_local_state_first() -> eyre::Result<()> {
    let port = spawn_peer(|line| match line {
        "break run.tt 5" => vec![reply("breakpoint_set", json!({"line": 5}))],
        "break run.tt 8" => vec![reply("breakpoint_set", json!({"line": 8}))],
        "clear run.tt 5" => vec![reply("breakpoint_removed", json!({}))],
        "clear run.tt" => vec![reply("all_breakpoints_removed", json!({}))],
        other => panic!("unexpected line: {other}"),
    })
    .await;

    let bridge = Bridge::connect(port).await?;
    bridge.set_breakpoint("run.tt", 5, None).await;
    bridge.set_breakpoint("run.tt", 8, None).await;

    let removed = bridge.clear_breakpoint("run.tt", 5).await.unwrap();
    assert_eq!(removed.line, 5);
    assert!(!bridge.breakpoint_exists("run.tt", 5));

    // no local match means no wire traffic either
    assert!(bridge.clear_breakpoint("run.tt", 99).await.is_none());

    bridge.clear_all_breakpoints("run.tt").await;
    assert!(!bridge.breakpoint_exists("run.tt", 8));
    Ok(())
}

#[tokio::test]
async fn peer_disconnect_fails_the_pending_operation() -> eyre::Result<()> {
    let port = spawn_peer(|line| match line {
        "continue" => vec![Action::Close],
        other => panic!("unexpected line: {other}"),
    })
    .await;

    let mut bridge = Bridge::connect(port).await?;

    match bridge.continue_().await {
        Err(Error::Disconnected) => {}
        other => panic!("expected disconnect, got {other:?}"),
    }

    assert_eq!(next_notification(&mut bridge).await, Notification::SessionEnd);
    assert_eq!(bridge.connection_state(), ConnectionState::Disconnected);

    // operations after the disconnect fail fast
    match bridge.step_over().await {
        Err(Error::NotConnected) => {}
        other => panic!("expected not-connected, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn program_end_triggers_a_graceful_exit() -> eyre::Result<()> {
    let port = spawn_peer(|line| match line {
        "continue" => vec![reply("resume", json!({})), event("end", "")],
        "exit" => vec![Action::Close],
        other => panic!("unexpected line: {other}"),
    })
    .await;

    let mut bridge = Bridge::connect(port).await?;
    bridge.continue_().await?;

    // the end event is answered with an exit command; the notification
    // follows the actual close, not the event
    assert_eq!(next_notification(&mut bridge).await, Notification::SessionEnd);
    Ok(())
}

#[tokio::test]
async fn post_mortem_reports_are_forwarded() -> eyre::Result<()> {
    let port = spawn_peer(|line| match line {
        "continue" => vec![
            reply("resume", json!({})),
            event("post_mortem", "division by zero"),
            event("Pause", ""),
        ],
        other => panic!("unexpected line: {other}"),
    })
    .await;

    let mut bridge = Bridge::connect(port).await?;
    bridge.continue_().await?;

    assert_eq!(
        next_notification(&mut bridge).await,
        Notification::PostMortem("division by zero".to_string())
    );
    assert_eq!(next_notification(&mut bridge).await, Notification::PauseStop);
    Ok(())
}

struct RecordingPeerHandle(Arc<AtomicBool>);

impl PeerHandle for RecordingPeerHandle {
    fn kill(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn force_terminate_escalates_after_the_grace_period() -> eyre::Result<()> {
    // a peer that ignores the exit command and keeps the socket open
    let port = spawn_peer(|line| match line {
        "exit" => vec![],
        other => panic!("unexpected line: {other}"),
    })
    .await;

    let bridge = Bridge::connect(port).await?;
    let killed = Arc::new(AtomicBool::new(false));
    bridge.set_peer_handle(Box::new(RecordingPeerHandle(Arc::clone(&killed))));

    // connect in real time, then drive the grace period on the test clock
    tokio::time::pause();
    let before = Instant::now();
    bridge.force_terminate().await;

    assert!(killed.load(Ordering::SeqCst));
    assert!(before.elapsed() >= Duration::from_secs(5));
    Ok(())
}

#[tokio::test]
async fn force_terminate_spares_a_cooperative_peer() -> eyre::Result<()> {
    let port = spawn_peer(|line| match line {
        "exit" => vec![Action::Close],
        other => panic!("unexpected line: {other}"),
    })
    .await;

    let bridge = Bridge::connect(port).await?;
    let killed = Arc::new(AtomicBool::new(false));
    bridge.set_peer_handle(Box::new(RecordingPeerHandle(Arc::clone(&killed))));

    bridge.force_terminate().await;

    assert!(!killed.load(Ordering::SeqCst));
    assert_eq!(bridge.connection_state(), ConnectionState::Disconnected);
    Ok(())
}
