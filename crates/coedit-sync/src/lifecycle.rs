//! Engine lifecycle
//!
//! `Initializing -> Active -> Disposed`, one way. `Initializing -> Disposed`
//! is only taken when the initial snapshot cannot be fetched.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lifecycle {
    /// Fetching and applying history; sends are deferred
    Initializing,
    /// Caught up and relaying live revisions and cursors
    Active,
    /// Torn down; terminal
    Disposed,
}

impl Lifecycle {
    /// Whether `self -> next` is a valid transition
    pub fn can_transition_to(self, next: Lifecycle) -> bool {
        matches!(
            (self, next),
            (Lifecycle::Initializing, Lifecycle::Active)
                | (Lifecycle::Initializing, Lifecycle::Disposed)
                | (Lifecycle::Active, Lifecycle::Disposed)
        )
    }

    /// Move to `next`, rejecting transitions that go backwards or leave `Disposed`
    pub fn transition(&mut self, next: Lifecycle) -> SyncResult<()> {
        if !self.can_transition_to(next) {
            return Err(SyncError::InvalidTransition {
                from: *self,
                to: next,
            });
        }
        *self = next;
        Ok(())
    }

    pub fn is_active(self) -> bool {
        self == Lifecycle::Active
    }

    pub fn is_disposed(self) -> bool {
        self == Lifecycle::Disposed
    }
}

impl Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::Initializing => write!(f, "initializing"),
            Lifecycle::Active => write!(f, "active"),
            Lifecycle::Disposed => write!(f, "disposed"),
        }
    }
}
