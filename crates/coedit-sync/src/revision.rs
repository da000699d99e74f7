//! Validation of raw revision records
//!
//! A raw record is `{ "a": author, "o": serialized operation }`. Validation
//! failures are ordinary data outcomes: the drain logs them and moves on.

use coedit_ot::Operation;
use serde_json::Value;
use thiserror::Error;

/// A validated revision
///
/// The author is kept as the raw string from the wire. Any string is a valid
/// author; it is only ever compared against this participant's own id.
#[derive(Debug, Clone, PartialEq)]
pub struct RevisionRecord<O> {
    pub author: String,
    pub operation: O,
}

/// Why a raw record was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RevisionError {
    #[error("Revision is not a record")]
    NotARecord,

    #[error("Revision author is missing or not a string")]
    InvalidAuthor,

    #[error("Revision operation is malformed: {0}")]
    MalformedOperation(String),

    #[error("Revision applies to length {actual}, document has length {expected}")]
    BaseLengthMismatch { expected: usize, actual: usize },
}

/// Validate `raw` against a replica whose current length is `expected_base`
pub fn parse_revision<O: Operation>(
    raw: &Value,
    expected_base: usize,
) -> Result<RevisionRecord<O>, RevisionError> {
    let record = raw.as_object().ok_or(RevisionError::NotARecord)?;

    let author = record
        .get("a")
        .and_then(Value::as_str)
        .ok_or(RevisionError::InvalidAuthor)?
        .to_string();

    let op = record
        .get("o")
        .ok_or_else(|| RevisionError::MalformedOperation("missing".to_string()))?;
    let operation =
        O::from_json(op).map_err(|e| RevisionError::MalformedOperation(e.to_string()))?;

    if operation.base_len() != expected_base {
        return Err(RevisionError::BaseLengthMismatch {
            expected: expected_base,
            actual: operation.base_len(),
        });
    }

    Ok(RevisionRecord { author, operation })
}

#[cfg(test)]
mod tests {
    use super::*;
    use coedit_ot::TextOperation;
    use serde_json::json;

    #[test]
    fn test_parse_valid_revision() {
        let record: RevisionRecord<TextOperation> =
            parse_revision(&json!({ "a": "alice", "o": [3, "x"] }), 3).unwrap();
        assert_eq!(record.author, "alice");
        assert_eq!(record.operation, TextOperation::new().retain(3).insert("x"));
    }

    #[test]
    fn test_rejects_non_record() {
        for raw in [json!(null), json!([1, 2]), json!("A0")] {
            assert_eq!(
                parse_revision::<TextOperation>(&raw, 0),
                Err(RevisionError::NotARecord)
            );
        }
    }

    #[test]
    fn test_rejects_bad_author() {
        for raw in [
            json!({ "o": ["x"] }),
            json!({ "a": 7, "o": ["x"] }),
            json!({ "a": null, "o": ["x"] }),
        ] {
            assert_eq!(
                parse_revision::<TextOperation>(&raw, 0),
                Err(RevisionError::InvalidAuthor)
            );
        }
    }

    #[test]
    fn test_empty_author_is_still_an_author() {
        let record: RevisionRecord<TextOperation> =
            parse_revision(&json!({ "a": "", "o": ["x"] }), 0).unwrap();
        assert_eq!(record.author, "");
        assert_eq!(record.operation, TextOperation::new().insert("x"));
    }

    #[test]
    fn test_overflowing_lengths_are_malformed() {
        let max = i64::MAX;
        let result = parse_revision::<TextOperation>(
            &json!({ "a": "bob", "o": [max, max, max] }),
            0,
        );
        match result {
            Err(RevisionError::MalformedOperation(reason)) => {
                assert!(reason.contains("length overflow"), "{}", reason)
            }
            other => panic!("expected a malformed operation, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_malformed_operation() {
        for raw in [
            json!({ "a": "alice" }),
            json!({ "a": "alice", "o": "x" }),
            json!({ "a": "alice", "o": [0] }),
            json!({ "a": "alice", "o": [true] }),
        ] {
            let result = parse_revision::<TextOperation>(&raw, 0);
            assert!(
                matches!(result, Err(RevisionError::MalformedOperation(_))),
                "{:?} should be malformed, got {:?}",
                raw,
                result
            );
        }
    }

    #[test]
    fn test_rejects_wrong_base_length() {
        let result = parse_revision::<TextOperation>(&json!({ "a": "alice", "o": [2, "x"] }), 5);
        assert_eq!(
            result,
            Err(RevisionError::BaseLengthMismatch {
                expected: 5,
                actual: 2
            })
        );
    }
}
