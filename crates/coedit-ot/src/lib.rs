//! # Coedit OT
//!
//! The operational-transform contract consumed by the coedit sync engine,
//! plus one concrete implementation for plain text.
//!
//! The engine only relies on the [`Operation`] trait: base/target lengths,
//! composition, structural equality and a transport-neutral JSON form.
//! [`TextOperation`] is the retain/insert/delete operation used by the text
//! editors that host the engine.
//!
//! ## Example
//!
//! ```rust
//! use coedit_ot::{Operation, TextOperation};
//!
//! let first = TextOperation::new().insert("hello");
//! let second = TextOperation::new().retain(5).insert(" world");
//!
//! let both = first.compose(&second).unwrap();
//! assert_eq!(both.apply("").unwrap(), "hello world");
//! assert_eq!(both.to_json().unwrap(), serde_json::json!(["hello world"]));
//! ```

pub mod error;
pub mod operation;
pub mod text;

// Re-exports
pub use error::{OtError, OtResult};
pub use operation::Operation;
pub use text::{Component, TextOperation};
