//! Connection lifecycle state.

use tokio::sync::watch;

/// Health of the connection to the peer debugger.
///
/// Owned exclusively by the connection manager; every other component only
/// reads it to gate sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket, or the socket has closed.
    Disconnected,
    /// A connect attempt is underway; the handshake has not completed.
    Connecting,
    /// The peer acknowledged the handshake; commands may be sent.
    Ready,
}

impl ConnectionState {
    /// Legal transitions only advance Disconnected→Connecting→Ready or
    /// regress straight to Disconnected.
    pub fn may_become(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Disconnected, Connecting)
                | (Connecting, Connecting)
                | (Connecting, Ready)
                | (_, Disconnected)
        )
    }
}

/// Apply a state transition through the watch channel, ignoring no-ops and
/// refusing illegal transitions.
pub(crate) fn transition(tx: &watch::Sender<ConnectionState>, next: ConnectionState) {
    let current = *tx.borrow();
    if current == next {
        return;
    }
    if !current.may_become(next) {
        tracing::warn!(?current, ?next, "refusing illegal connection state transition");
        return;
    }
    tracing::debug!(?current, ?next, "connection state change");
    tx.send_replace(next);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectionState::*;

    #[test]
    fn legal_transitions() {
        assert!(Disconnected.may_become(Connecting));
        assert!(Connecting.may_become(Ready));
        assert!(Connecting.may_become(Connecting));
        assert!(Ready.may_become(Disconnected));
        assert!(Connecting.may_become(Disconnected));
    }

    #[test]
    fn illegal_transitions() {
        assert!(!Disconnected.may_become(Ready));
        assert!(!Ready.may_become(Connecting));
        assert!(!Ready.may_become(Ready));
    }

    #[test]
    fn transition_refuses_skipping_connecting() {
        let (tx, _rx) = watch::channel(Disconnected);
        transition(&tx, Ready);
        assert_eq!(*tx.borrow(), Disconnected);

        transition(&tx, Connecting);
        transition(&tx, Ready);
        assert_eq!(*tx.borrow(), Ready);
    }
}
