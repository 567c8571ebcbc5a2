//! The one-slot pending reply store.
//!
//! Replies carry no correlation token, so at most one "awaited reply"
//! context exists at a time. Arming the slot for a new command drops any
//! previous sender, which both enforces settle-once semantics and guarantees
//! that a stale, unread reply can never satisfy a later await.

use std::sync::Mutex;

use tokio::sync::oneshot;
use transport::Reply;

pub(crate) struct ReplySlot {
    inner: Mutex<Option<oneshot::Sender<Reply>>>,
}

impl ReplySlot {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    /// Arm the slot for the next reply, invalidating any previous context.
    ///
    /// A receiver abandoned this way resolves as closed, which surfaces to
    /// the superseded awaiter as a disconnect-style failure. Under the
    /// one-command-in-flight discipline that only happens on caller error.
    pub(crate) fn arm(&self) -> oneshot::Receiver<Reply> {
        let (tx, rx) = oneshot::channel();
        let stale = self.inner.lock().unwrap().replace(tx);
        if stale.is_some() {
            tracing::debug!("discarding previously armed reply slot");
        }
        rx
    }

    /// Settle the armed context with an arrived reply.
    ///
    /// Replies arriving with nothing armed are unsolicited and dropped.
    pub(crate) fn settle(&self, reply: Reply) {
        match self.inner.lock().unwrap().take() {
            Some(tx) => {
                if tx.send(reply).is_err() {
                    tracing::debug!("reply receiver dropped before settling");
                }
            }
            None => {
                tracing::debug!(kind = %reply.kind, "dropping unsolicited reply");
            }
        }
    }

    /// Drop any armed context, failing its awaiter.
    pub(crate) fn cancel(&self) {
        if self.inner.lock().unwrap().take().is_some() {
            tracing::debug!("cancelled pending reply await");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(kind: &str) -> Reply {
        Reply {
            kind: kind.to_string(),
            body: serde_json::Map::new(),
        }
    }

    #[tokio::test]
    async fn settle_resolves_armed_receiver() {
        let slot = ReplySlot::new();
        let rx = slot.arm();

        slot.settle(reply("resume"));
        assert_eq!(rx.await.unwrap().kind, "resume");
    }

    #[tokio::test]
    async fn rearming_drops_previous_context() {
        let slot = ReplySlot::new();
        let stale = slot.arm();
        let fresh = slot.arm();

        slot.settle(reply("resume"));
        assert!(stale.await.is_err());
        assert_eq!(fresh.await.unwrap().kind, "resume");
    }

    #[tokio::test]
    async fn unsolicited_reply_is_dropped() {
        let slot = ReplySlot::new();
        // nothing armed; must not panic
        slot.settle(reply("resume"));

        let rx = slot.arm();
        slot.cancel();
        assert!(rx.await.is_err());
    }
}
