//! Events raised to the host editor

use coedit_core::{Color, Cursor, ParticipantId};
use tokio::sync::mpsc;

use crate::revision::RevisionError;
use crate::revision_id::RevisionId;

/// Something the host editor should react to
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent<O> {
    /// History is applied and the engine is live. Raised exactly once.
    Ready,

    /// Another participant's cursor moved
    Cursor {
        participant: ParticipantId,
        cursor: Cursor,
        color: Option<Color>,
    },

    /// A remote change, or the change that beat ours to a slot. Apply it locally.
    Operation(O),

    /// Our last sent operation was accepted
    Ack,

    /// Our last sent operation was not accepted; resend it against the current document
    Retry,

    /// A malformed revision consumed slot `id` without changing the document.
    /// Only raised when skipped revisions are reported.
    RevisionSkipped { id: RevisionId, reason: RevisionError },
}

impl<O> SyncEvent<O> {
    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            SyncEvent::Ready => "ready",
            SyncEvent::Cursor { .. } => "cursor",
            SyncEvent::Operation(_) => "operation",
            SyncEvent::Ack => "ack",
            SyncEvent::Retry => "retry",
            SyncEvent::RevisionSkipped { .. } => "revision_skipped",
        }
    }
}

/// The host's end of an engine's event stream.
///
/// The stream ends once the engine is disposed and every queued event has
/// been read.
#[derive(Debug)]
pub struct EngineEvents<O> {
    receiver: mpsc::UnboundedReceiver<SyncEvent<O>>,
}

impl<O> EngineEvents<O> {
    pub(crate) fn new(receiver: mpsc::UnboundedReceiver<SyncEvent<O>>) -> Self {
        Self { receiver }
    }

    /// Wait for the next event
    pub async fn recv(&mut self) -> Option<SyncEvent<O>> {
        self.receiver.recv().await
    }

    /// Take the next queued event without waiting
    pub fn try_recv(&mut self) -> Option<SyncEvent<O>> {
        self.receiver.try_recv().ok()
    }
}
