//! Mock channel implementation for testing
//!
//! Provides an in-memory [`DocumentChannel`] for exercising sync logic
//! without a real network. A single [`MockChannel`] is a shared hub: clone
//! it and hand one clone to every engine that should see the same
//! broadcasts.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use coedit_core::{CommitPolicy, MockChannel};
//!
//! let channel = MockChannel::new();
//!
//! // Engines on this hub share history; the first submission for a slot wins.
//! let (alice, alice_events) = SyncEngine::start(Arc::new(channel.clone()), ...);
//! let (bob, bob_events) = SyncEngine::start(Arc::new(channel.clone()), ...);
//!
//! // Or record submissions and script the broadcasts by hand.
//! channel.set_commit_policy(CommitPolicy::RecordOnly);
//! channel.inject_revision(broadcast);
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{Notify, mpsc};

use crate::error::TransportError;
use crate::identity::{DocId, ParticipantId};
use crate::message::{
    CursorBroadcast, CursorUpdate, RevisionBroadcast, RevisionSubmission, Snapshot, SnapshotEntry,
    SnapshotRequest, raw_revision,
};
use crate::transport::{DocumentChannel, Subscription};

/// How the mock answers revision submissions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitPolicy {
    /// Commit the first submission for each slot and broadcast it to every
    /// revision subscriber; later submissions for the same slot are refused.
    #[default]
    FirstWriteWins,
    /// Record submissions without committing or broadcasting them
    RecordOnly,
}

#[derive(Default)]
struct MockHub {
    revision_listeners: DashMap<u64, mpsc::UnboundedSender<RevisionBroadcast>>,
    cursor_listeners: DashMap<u64, mpsc::UnboundedSender<CursorBroadcast>>,
    next_listener: AtomicU64,
    /// Committed raw revisions per document, keyed by revision id
    history: Mutex<HashMap<DocId, BTreeMap<String, Value>>>,
    /// Last cursor seen per participant
    cursors: Mutex<HashMap<ParticipantId, CursorBroadcast>>,
    submissions: Mutex<Vec<RevisionSubmission>>,
    cursor_updates: Mutex<Vec<CursorUpdate>>,
    snapshot_requests: AtomicUsize,
    snapshot_gate: Mutex<Option<Arc<Notify>>>,
    send_failure: Mutex<Option<String>>,
    policy: Mutex<CommitPolicy>,
}

/// A shared in-memory document channel
///
/// Clones share the same hub.
#[derive(Clone, Default)]
pub struct MockChannel {
    hub: Arc<MockHub>,
}

impl MockChannel {
    /// Create a new hub with [`CommitPolicy::FirstWriteWins`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Change how submissions are answered
    pub fn set_commit_policy(&self, policy: CommitPolicy) {
        *self.hub.policy.lock() = policy;
    }

    /// Store a raw revision record in a document's history without broadcasting it
    pub fn seed_revision(&self, doc_id: &DocId, id: impl Into<String>, raw: Value) {
        self.hub
            .history
            .lock()
            .entry(doc_id.clone())
            .or_default()
            .insert(id.into(), raw);
    }

    /// Store a cursor that will be reported by the next snapshot
    pub fn seed_cursor(&self, cursor: CursorBroadcast) {
        self.hub.cursors.lock().insert(cursor.id.clone(), cursor);
    }

    /// Deliver a revision broadcast to every current revision subscriber
    pub fn inject_revision(&self, broadcast: RevisionBroadcast) {
        self.hub
            .revision_listeners
            .retain(|_, tx| tx.send(broadcast.clone()).is_ok());
    }

    /// Deliver a cursor broadcast to every current cursor subscriber
    pub fn inject_cursor(&self, broadcast: CursorBroadcast) {
        self.hub
            .cursor_listeners
            .retain(|_, tx| tx.send(broadcast.clone()).is_ok());
    }

    /// Make snapshot requests wait until the returned notify is signalled
    pub fn hold_snapshots(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.hub.snapshot_gate.lock() = Some(gate.clone());
        gate
    }

    /// Fail every following submission with [`TransportError::Unauthorized`]
    pub fn fail_sends(&self, reason: impl Into<String>) {
        *self.hub.send_failure.lock() = Some(reason.into());
    }

    /// Number of live revision subscriptions
    pub fn revision_subscribers(&self) -> usize {
        self.hub.revision_listeners.len()
    }

    /// Number of live cursor subscriptions
    pub fn cursor_subscribers(&self) -> usize {
        self.hub.cursor_listeners.len()
    }

    /// Number of snapshot requests answered or in flight
    pub fn snapshot_requests(&self) -> usize {
        self.hub.snapshot_requests.load(Ordering::SeqCst)
    }

    /// Every revision submission received so far
    pub fn submissions(&self) -> Vec<RevisionSubmission> {
        self.hub.submissions.lock().clone()
    }

    /// Every cursor update received so far
    pub fn cursor_updates(&self) -> Vec<CursorUpdate> {
        self.hub.cursor_updates.lock().clone()
    }

    /// Committed history of a document, in revision id order
    pub fn history(&self, doc_id: &DocId) -> Vec<(String, Value)> {
        self.hub
            .history
            .lock()
            .get(doc_id)
            .map(|revisions| {
                revisions
                    .iter()
                    .map(|(id, raw)| (id.clone(), raw.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn listener_id(&self) -> u64 {
        self.hub.next_listener.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentChannel for MockChannel {
    fn subscribe_revisions(&self) -> Subscription<RevisionBroadcast> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.listener_id();
        self.hub.revision_listeners.insert(id, tx);

        let hub = Arc::downgrade(&self.hub);
        Subscription::new(rx, move || {
            if let Some(hub) = hub.upgrade() {
                hub.revision_listeners.remove(&id);
            }
        })
    }

    fn subscribe_cursors(&self) -> Subscription<CursorBroadcast> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.listener_id();
        self.hub.cursor_listeners.insert(id, tx);

        let hub = Arc::downgrade(&self.hub);
        Subscription::new(rx, move || {
            if let Some(hub) = hub.upgrade() {
                hub.cursor_listeners.remove(&id);
            }
        })
    }

    async fn request_snapshot(&self, request: SnapshotRequest) -> Result<Snapshot, TransportError> {
        self.hub.snapshot_requests.fetch_add(1, Ordering::SeqCst);

        let gate = self.hub.snapshot_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let revisions = self
            .history(&request.doc_id)
            .into_iter()
            .map(|(id, revision)| SnapshotEntry { id, revision })
            .collect();

        let cursors = if request.with_cursors {
            self.hub.cursors.lock().values().cloned().collect()
        } else {
            Vec::new()
        };

        Ok(Snapshot { revisions, cursors })
    }

    async fn send_revision(&self, submission: RevisionSubmission) -> Result<bool, TransportError> {
        if let Some(reason) = self.hub.send_failure.lock().clone() {
            return Err(TransportError::Unauthorized(reason));
        }
        self.hub.submissions.lock().push(submission.clone());

        if *self.hub.policy.lock() == CommitPolicy::RecordOnly {
            return Ok(false);
        }

        let RevisionSubmission { doc_id, revision } = submission;
        let committed = {
            let mut history = self.hub.history.lock();
            let revisions = history.entry(doc_id.clone()).or_default();
            if revisions.contains_key(&revision.id) {
                false
            } else {
                revisions.insert(
                    revision.id.clone(),
                    raw_revision(&revision.author, revision.op.clone()),
                );
                true
            }
        };

        if committed {
            tracing::trace!(doc_id = %doc_id, id = %revision.id, "mock channel committed revision");
            self.inject_revision(RevisionBroadcast {
                doc_id,
                doc_op_id: revision.id,
                ops: revision.op,
                author: revision.author,
            });
        }
        Ok(committed)
    }

    fn send_cursor(&self, update: CursorUpdate) -> Result<(), TransportError> {
        let broadcast = CursorBroadcast::from(&update);
        self.hub.cursor_updates.lock().push(update);
        self.hub
            .cursors
            .lock()
            .insert(broadcast.id.clone(), broadcast.clone());
        self.inject_cursor(broadcast);
        Ok(())
    }
}
