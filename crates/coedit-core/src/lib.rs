//! # Coedit Core
//!
//! Identifiers, wire messages and the transport abstraction shared by the
//! coedit crates.
//!
//! The sync engine never talks to a socket directly. It consumes a
//! [`DocumentChannel`]: a duplex publish/subscribe primitive with no
//! ordering or delivery guarantees beyond "eventually delivered, possibly
//! out of order, possibly duplicated". [`MockChannel`] is an in-memory
//! implementation used by tests and demos.
//!
//! ## Key Types
//!
//! - [`ParticipantId`], [`DocId`], [`Color`]: identifiers carried on the wire
//! - [`RevisionBroadcast`], [`CursorBroadcast`]: inbound channel events
//! - [`RevisionSubmission`], [`CursorUpdate`], [`SnapshotRequest`]: outbound requests
//! - [`Subscription`]: an owned listener registration, released on drop

pub mod error;
pub mod identity;
pub mod message;
pub mod mock_transport;
pub mod transport;

// Re-export main types
pub use error::*;
pub use identity::*;
pub use message::*;
pub use mock_transport::*;
pub use transport::*;
