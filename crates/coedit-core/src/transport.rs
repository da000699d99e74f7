//! Transport abstraction for document channels
//!
//! The [`DocumentChannel`] trait is the narrow interface the sync engine
//! consumes. Inbound events arrive through [`Subscription`]s, one per event
//! kind, so each payload shape is statically known. Outbound requests are
//! plain method calls.
//!
//! ## Implementations
//!
//! - [`MockChannel`](crate::MockChannel): In-memory hub for testing (in this crate)

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::message::{
    CursorBroadcast, CursorUpdate, RevisionBroadcast, RevisionSubmission, Snapshot,
    SnapshotRequest,
};

/// Duplex publish/subscribe channel shared by every participant of a document.
///
/// No ordering or delivery guarantee is assumed: broadcasts may arrive out
/// of order or more than once. The channel may be shared with other
/// consumers, so implementations must support any number of concurrent
/// subscriptions.
#[async_trait]
pub trait DocumentChannel: Send + Sync {
    /// Listen for revision broadcasts (for every document on this channel)
    fn subscribe_revisions(&self) -> Subscription<RevisionBroadcast>;

    /// Listen for cursor broadcasts
    fn subscribe_cursors(&self) -> Subscription<CursorBroadcast>;

    /// Fetch the ordered history of a document and, optionally, current cursors
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be answered.
    async fn request_snapshot(&self, request: SnapshotRequest) -> Result<Snapshot, TransportError>;

    /// Submit a revision for a slot
    ///
    /// Returns whether the channel committed it. Losing the slot to another
    /// writer is not an error; the engine learns the outcome from the
    /// broadcast of whichever revision won.
    ///
    /// # Errors
    ///
    /// Returns an error on catastrophic failures such as an authorization
    /// rejection.
    async fn send_revision(&self, submission: RevisionSubmission) -> Result<bool, TransportError>;

    /// Publish a cursor update (best effort)
    fn send_cursor(&self, update: CursorUpdate) -> Result<(), TransportError>;
}

/// An owned listener registration.
///
/// Messages are queued per subscriber until read. Dropping the subscription
/// runs its release action, which deregisters the listener from the channel,
/// so a holder cannot leak a registration by forgetting to unsubscribe.
pub struct Subscription<T> {
    receiver: mpsc::UnboundedReceiver<T>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl<T> Subscription<T> {
    /// Wrap a receiver together with the action that deregisters it
    pub fn new(receiver: mpsc::UnboundedReceiver<T>, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            receiver,
            release: Some(Box::new(release)),
        }
    }

    /// Wrap a receiver that needs no deregistration
    pub fn detached(receiver: mpsc::UnboundedReceiver<T>) -> Self {
        Self {
            receiver,
            release: None,
        }
    }

    /// Wait for the next message. Returns `None` once the channel side is gone.
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    /// Take the next queued message without waiting
    pub fn try_recv(&mut self) -> Option<T> {
        self.receiver.try_recv().ok()
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}
