//! The local document replica

use coedit_ot::{OtError, Operation};

/// Composition of every revision applied so far, starting from the empty document
#[derive(Debug, Clone)]
pub struct DocumentReplica<O> {
    document: O,
}

impl<O: Operation> DocumentReplica<O> {
    pub fn new() -> Self {
        Self {
            document: O::identity(0),
        }
    }

    /// Length of the document as it stands
    pub fn target_len(&self) -> usize {
        self.document.target_len()
    }

    /// The composed document operation
    pub fn document(&self) -> &O {
        &self.document
    }

    /// Compose `operation` onto the replica.
    ///
    /// On error the replica is left unchanged.
    pub fn apply(&mut self, operation: &O) -> Result<(), OtError> {
        self.document = self.document.compose(operation)?;
        Ok(())
    }
}

impl<O: Operation> Default for DocumentReplica<O> {
    fn default() -> Self {
        Self::new()
    }
}
