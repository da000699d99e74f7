//! Tracking of the single locally sent, unresolved operation

use coedit_core::ParticipantId;
use coedit_ot::Operation;

use crate::revision::RevisionRecord;
use crate::revision_id::RevisionId;

/// A local operation transmitted for slot `id` and not yet resolved
#[derive(Debug, Clone, PartialEq)]
pub struct SentOperation<O> {
    pub id: RevisionId,
    pub operation: O,
}

/// How a drained revision relates to the outstanding send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Not our slot, or nothing outstanding
    Foreign,
    /// Our operation won the slot
    OwnSuccess,
    /// Another write won the slot we sent for
    OwnLost,
}

/// Remembers at most one outstanding send and classifies drained slots against it
#[derive(Debug)]
pub struct OutboundTracker<O> {
    participant: ParticipantId,
    sent: Option<SentOperation<O>>,
    retry_owed: bool,
}

impl<O: Operation> OutboundTracker<O> {
    pub fn new(participant: ParticipantId) -> Self {
        Self {
            participant,
            sent: None,
            retry_owed: false,
        }
    }

    /// Record `operation` as sent for slot `id`, replacing any earlier record
    pub fn track(&mut self, id: RevisionId, operation: O) {
        self.sent = Some(SentOperation { id, operation });
    }

    pub fn outstanding(&self) -> Option<&SentOperation<O>> {
        self.sent.as_ref()
    }

    /// Classify the revision drained at slot `id`.
    ///
    /// Own-success clears the outstanding send immediately. Own-lost marks
    /// a retry as owed; the send itself is cleared by [`take_retry`](Self::take_retry)
    /// once the drain completes.
    pub fn classify(&mut self, id: &RevisionId, record: &RevisionRecord<O>) -> Resolution {
        let Some(sent) = self.sent.as_ref().filter(|sent| &sent.id == id) else {
            return Resolution::Foreign;
        };

        if record.operation == sent.operation && record.author == self.participant.as_str() {
            self.sent = None;
            Resolution::OwnSuccess
        } else {
            self.retry_owed = true;
            Resolution::OwnLost
        }
    }

    /// Whether a retry is owed. Resets the flag and clears the outstanding send.
    pub fn take_retry(&mut self) -> bool {
        if !std::mem::take(&mut self.retry_owed) {
            return false;
        }
        self.sent = None;
        true
    }

    /// Forget the outstanding send if it is still the one for `id`
    pub fn abandon(&mut self, id: &RevisionId) {
        if self.sent.as_ref().is_some_and(|sent| &sent.id == id) {
            self.sent = None;
        }
    }
}
