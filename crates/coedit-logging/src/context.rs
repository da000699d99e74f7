//! Participant context for multi-participant logging
//!
//! Several engines often run in one process (tests, demos, a host editing
//! several documents). A [`ParticipantContextGuard`] records which
//! participant the current thread is acting for, and
//! [`ParticipantContextLayer`](crate::layers::ParticipantContextLayer) copies
//! it onto every span opened while the guard is alive.

use std::cell::RefCell;

use coedit_core::ParticipantId;
use uuid::Uuid;

/// Participant context stored in thread-local storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantContextData {
    /// Short form of the participant id
    pub participant: String,
    /// Unique id of this editing session
    pub session_id: Uuid,
}

thread_local! {
    static PARTICIPANT_CONTEXT: RefCell<Option<ParticipantContextData>> = const { RefCell::new(None) };
}

/// Scoped participant context.
///
/// Sets the context for the current thread on creation and restores the
/// previous one on drop, so guards nest.
pub struct ParticipantContextGuard {
    previous: Option<ParticipantContextData>,
}

impl ParticipantContextGuard {
    /// Act as `participant` in a fresh session
    pub fn new(participant: &ParticipantId) -> Self {
        Self::with_session_id(participant, Uuid::new_v4())
    }

    /// Act as `participant` in a known session
    pub fn with_session_id(participant: &ParticipantId, session_id: Uuid) -> Self {
        let context = ParticipantContextData {
            participant: participant.short_id().to_string(),
            session_id,
        };
        let previous = PARTICIPANT_CONTEXT.with(|ctx| ctx.borrow_mut().replace(context));
        Self { previous }
    }

    /// The current context, if any
    pub fn current() -> Option<ParticipantContextData> {
        PARTICIPANT_CONTEXT.with(|ctx| ctx.borrow().clone())
    }

    pub fn current_participant() -> Option<String> {
        Self::current().map(|ctx| ctx.participant)
    }
}

impl Drop for ParticipantContextGuard {
    fn drop(&mut self) {
        PARTICIPANT_CONTEXT.with(|ctx| *ctx.borrow_mut() = self.previous.take());
    }
}
