//! The operation contract
//!
//! Everything the sync engine needs from an operational-transform library.
//! Diffing and transforming concurrent operations are not part of it.

use std::fmt::Debug;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::OtError;

/// An edit that turns a document of `base_len` into one of `target_len`.
///
/// Operations are immutable values: composition produces a new operation.
/// Equality must be structural so that two peers holding the same edit
/// compare equal after a round-trip through the wire form.
pub trait Operation:
    Clone + PartialEq + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Length of the document this operation applies to
    fn base_len(&self) -> usize;

    /// Length of the document after applying this operation
    fn target_len(&self) -> usize;

    /// Compose `self` followed by `next` into a single operation.
    ///
    /// # Errors
    ///
    /// Fails when `next.base_len()` differs from `self.target_len()`.
    fn compose(&self, next: &Self) -> Result<Self, OtError>;

    /// The no-op over a document of `len`
    fn identity(len: usize) -> Self;

    /// Encode to the transport-neutral JSON form
    fn to_json(&self) -> Result<Value, OtError> {
        serde_json::to_value(self).map_err(|e| OtError::Serialization(e.to_string()))
    }

    /// Decode from the transport-neutral JSON form
    fn from_json(value: &Value) -> Result<Self, OtError> {
        serde_json::from_value(value.clone()).map_err(|e| OtError::Deserialization(e.to_string()))
    }
}
