//! High level bridge to the peer debugger.
//!
//! The bridge turns the peer's line protocol (send a command, await a
//! correlated reply, separately receive fire-and-forget events) into a clean
//! async API, while keeping a consistent view of breakpoints and connection
//! health across retries and disconnects.
//!
//! Replies carry no request identifier, so correlation relies on strict
//! ordering: **at most one command may be in flight at a time**. The owning
//! session must issue one operation, await its completion, then issue the
//! next. This is a hard precondition of the wire protocol, not an
//! implementation shortcut.

mod breakpoints;
mod bridge;
mod error;
mod events;
mod internals;
mod pending;
mod state;
mod types;
pub mod utils;

pub use bridge::{Bridge, PeerHandle};
pub use error::Error;
pub use events::{Notification, NotificationReceiver};
pub use state::ConnectionState;
pub use types::{Breakpoint, StackFrame, StackSnapshot, Variable};
