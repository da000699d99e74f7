//! # Coedit Sync
//!
//! Client-side synchronization engine for a collaboratively edited document.
//!
//! One [`SyncEngine`] keeps one participant's replica convergent with the
//! shared revision history broadcast over a [`DocumentChannel`](coedit_core::DocumentChannel).
//! The channel gives no ordering guarantees, so revisions are buffered by id
//! and applied strictly in sequence. Conflicts are settled by whichever write
//! claims a slot first; the engine only detects whether its own write won.
//!
//! ## Features
//!
//! - **Order-preserving revision ids**: [`revision_id`] ids sort like the indices they encode
//! - **Contiguous drain**: out-of-order and duplicate delivery never reorders history
//! - **Ack / retry**: at most one local send in flight, resolved by the history itself
//! - **Presence**: best-effort cursor relay with repeated clears suppressed
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use coedit_core::{Color, DocId, MockChannel, ParticipantId};
//! use coedit_ot::{Operation, TextOperation};
//! use coedit_sync::{SyncConfig, SyncEngine, SyncEvent};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let channel = Arc::new(MockChannel::new());
//! let (engine, mut events) = SyncEngine::<TextOperation>::start(
//!     channel,
//!     ParticipantId::new("alice")?,
//!     Color::new("#e06c75"),
//!     DocId::new("notes")?,
//!     SyncConfig::default(),
//! );
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         SyncEvent::Ready => {
//!             let len = engine.document()?.target_len();
//!             engine.send_operation(TextOperation::new().retain(len).insert("!"))?;
//!         }
//!         SyncEvent::Ack => break,
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod outbound;
pub mod pending;
pub mod presence;
pub mod replica;
pub mod revision;
pub mod revision_id;
pub mod revision_log;

// Re-exports
pub use config::{HistoryReplay, SyncConfig};
pub use engine::{PendingSend, SendOutcome, SyncEngine};
pub use error::{SyncError, SyncResult};
pub use events::{EngineEvents, SyncEvent};
pub use lifecycle::Lifecycle;
pub use outbound::{OutboundTracker, Resolution, SentOperation};
pub use pending::PendingRevisions;
pub use presence::PresenceRelay;
pub use replica::DocumentReplica;
pub use revision::{RevisionError, RevisionRecord, parse_revision};
pub use revision_id::{RevisionId, RevisionIdError};
pub use revision_log::RevisionLog;
