//! Sequencing of revisions into the replica
//!
//! [`RevisionLog`] owns the pending buffer, the replica, the revision counter
//! and the outbound tracker. Revisions are applied strictly in id order: the
//! drain pulls the entry for the next expected id until it hits a gap, so
//! out-of-order and duplicate deliveries are absorbed without ever
//! reordering history. A malformed revision still consumes its slot.

use coedit_core::ParticipantId;
use coedit_ot::Operation;
use serde_json::Value;
use tracing::{debug, warn};

use crate::events::SyncEvent;
use crate::outbound::{OutboundTracker, Resolution};
use crate::pending::PendingRevisions;
use crate::replica::DocumentReplica;
use crate::revision::{RevisionError, parse_revision};
use crate::revision_id::{RevisionId, encode, try_decode};

#[derive(Debug)]
pub struct RevisionLog<O> {
    pending: PendingRevisions,
    replica: DocumentReplica<O>,
    outbound: OutboundTracker<O>,
    /// Index of the next revision expected in `pending`
    counter: u64,
}

impl<O: Operation> RevisionLog<O> {
    pub fn new(participant: ParticipantId) -> Self {
        Self {
            pending: PendingRevisions::new(),
            replica: DocumentReplica::new(),
            outbound: OutboundTracker::new(participant),
            counter: 0,
        }
    }

    /// Set the first expected revision index and drop anything buffered below it
    pub fn start_at(&mut self, index: u64) {
        self.counter = index;
        self.pending.prune_below(index);
    }

    /// Index of the next revision to apply
    pub fn counter(&self) -> u64 {
        self.counter
    }

    pub fn replica(&self) -> &DocumentReplica<O> {
        &self.replica
    }

    pub fn outbound(&self) -> &OutboundTracker<O> {
        &self.outbound
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Buffer a raw revision received for slot `id`.
    ///
    /// Returns false when the id can never be drained: it is not a canonical
    /// revision id, or its slot has already been consumed.
    pub fn insert(&mut self, id: &str, raw: Value) -> bool {
        match try_decode(id) {
            Ok(index) if index >= self.counter && encode(index) == id => {
                if self.pending.insert(id, raw) {
                    debug!(id, "duplicate delivery replaced buffered revision");
                }
                true
            }
            _ => false,
        }
    }

    /// Apply every contiguous buffered revision starting at the counter.
    ///
    /// Returns the events to raise, in slot order, followed by a single
    /// `Retry` if any slot went to a conflicting write. `RevisionSkipped`
    /// is only included when `report_skipped` is set.
    pub fn drain(&mut self, report_skipped: bool) -> Vec<SyncEvent<O>> {
        let mut events = Vec::new();

        loop {
            let id = RevisionId::from_index(self.counter);
            let Some(raw) = self.pending.take(&id) else {
                break;
            };
            self.counter += 1;

            match self.apply_slot(&id, &raw) {
                Ok(event) => {
                    debug!(id = %id, event = event.kind(), "applied revision");
                    events.push(event);
                }
                Err(reason) => {
                    warn!(id = %id, %reason, "skipping invalid revision");
                    if report_skipped {
                        events.push(SyncEvent::RevisionSkipped { id, reason });
                    }
                }
            }
        }

        if self.outbound.take_retry() {
            events.push(SyncEvent::Retry);
        }
        events
    }

    fn apply_slot(&mut self, id: &RevisionId, raw: &Value) -> Result<SyncEvent<O>, RevisionError> {
        let record = parse_revision::<O>(raw, self.replica.target_len())?;
        self.replica
            .apply(&record.operation)
            .map_err(|e| RevisionError::MalformedOperation(e.to_string()))?;

        Ok(match self.outbound.classify(id, &record) {
            Resolution::OwnSuccess => SyncEvent::Ack,
            Resolution::Foreign | Resolution::OwnLost => SyncEvent::Operation(record.operation),
        })
    }

    /// Claim the next slot for a local operation and remember it as sent.
    ///
    /// # Panics
    ///
    /// Panics if `operation` does not apply to the current document.
    pub fn prepare_send(&mut self, operation: O) -> RevisionId {
        assert_eq!(
            operation.base_len(),
            self.replica.target_len(),
            "precondition violated: operation base length must match the document length"
        );
        if let Some(previous) = self.outbound.outstanding() {
            warn!(id = %previous.id, "sending while a previous operation is unresolved");
        }

        let id = RevisionId::from_index(self.counter);
        self.outbound.track(id.clone(), operation);
        id
    }

    /// Forget the send for `id` after the channel refused it
    pub fn abandon(&mut self, id: &RevisionId) {
        self.outbound.abandon(id);
    }
}
