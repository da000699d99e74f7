//! Error types for coedit-core

use thiserror::Error;

/// Errors reported by a [`DocumentChannel`](crate::DocumentChannel)
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

/// Errors related to identifiers
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Identifier must not be empty")]
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display() {
        assert!(format!("{}", TransportError::ConnectionClosed).contains("closed"));

        let err = TransportError::SendFailed("socket reset".to_string());
        assert!(format!("{}", err).contains("Send failed"));
        assert!(format!("{}", err).contains("socket reset"));

        let err = TransportError::Unauthorized("permission denied".to_string());
        assert!(format!("{}", err).contains("Unauthorized"));
    }

    #[test]
    fn test_identity_error_display() {
        assert!(format!("{}", IdentityError::Empty).contains("empty"));
    }
}
