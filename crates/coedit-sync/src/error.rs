//! Error types for coedit-sync

use coedit_core::TransportError;
use coedit_ot::OtError;
use thiserror::Error;

use crate::lifecycle::Lifecycle;

/// Errors returned by the engine's public operations
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Engine has been disposed")]
    Disposed,

    #[error("Engine is not ready yet")]
    NotReady,

    #[error("Invalid lifecycle transition: {from} -> {to}")]
    InvalidTransition { from: Lifecycle, to: Lifecycle },

    #[error("Operation error: {0}")]
    Operation(#[from] OtError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Engine stopped before the send completed")]
    SendAbandoned,
}

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_error_display() {
        assert!(format!("{}", SyncError::Disposed).contains("disposed"));
        assert!(format!("{}", SyncError::NotReady).contains("not ready"));

        let err = SyncError::InvalidTransition {
            from: Lifecycle::Disposed,
            to: Lifecycle::Active,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("disposed"));
        assert!(msg.contains("active"));

        let err = SyncError::from(TransportError::Unauthorized("denied".to_string()));
        assert!(format!("{}", err).contains("Transport error"));
        assert!(format!("{}", err).contains("denied"));

        let err = SyncError::from(OtError::Incompatible("too short"));
        assert!(format!("{}", err).contains("Operation error"));
    }
}
