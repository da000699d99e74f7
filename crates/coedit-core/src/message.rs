//! Wire payloads exchanged over a [`DocumentChannel`](crate::DocumentChannel)
//!
//! Field names follow the channel's JSON conventions (camelCase). Serialized
//! operations travel as raw [`serde_json::Value`]s: the engine validates them
//! itself, so a malformed payload from a peer never fails at this layer.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::identity::{Color, DocId, ParticipantId};

/// A cursor or selection. Both ends `None` means "no cursor".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    pub position: Option<usize>,
    pub selection_end: Option<usize>,
}

impl Cursor {
    /// The cleared cursor
    pub fn cleared() -> Self {
        Self::default()
    }

    /// A collapsed cursor at `position`
    pub fn at(position: usize) -> Self {
        Self {
            position: Some(position),
            selection_end: Some(position),
        }
    }

    /// A selection from `position` to `selection_end`
    pub fn selection(position: usize, selection_end: usize) -> Self {
        Self {
            position: Some(position),
            selection_end: Some(selection_end),
        }
    }

    pub fn is_cleared(&self) -> bool {
        self.position.is_none()
    }
}

/// Outbound: ask for the document's history to date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRequest {
    pub doc_id: DocId,
    pub with_cursors: bool,
}

/// One historical revision as stored by the channel.
///
/// `revision` is the raw `{ "a": author, "o": operation }` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub id: String,
    pub revision: Value,
}

impl SnapshotEntry {
    pub fn new(id: impl Into<String>, author: &ParticipantId, op: Value) -> Self {
        Self {
            id: id.into(),
            revision: raw_revision(author, op),
        }
    }
}

/// Reply to a [`SnapshotRequest`]: ordered history plus other participants' cursors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub revisions: Vec<SnapshotEntry>,
    pub cursors: Vec<CursorBroadcast>,
}

/// The revision part of a [`RevisionSubmission`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionPayload {
    pub id: String,
    pub author: ParticipantId,
    pub op: Value,
}

/// Outbound: claim a revision slot for a locally originated operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionSubmission {
    pub doc_id: DocId,
    pub revision: RevisionPayload,
}

/// Outbound: this participant's cursor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorUpdate {
    pub participant_id: ParticipantId,
    pub cursor: Cursor,
    pub color: Color,
}

/// Inbound: a revision accepted into some document's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionBroadcast {
    pub doc_id: DocId,
    pub doc_op_id: String,
    pub ops: Value,
    pub author: ParticipantId,
}

impl RevisionBroadcast {
    /// The raw `{ "a", "o" }` record this broadcast carries
    pub fn to_raw(&self) -> Value {
        raw_revision(&self.author, self.ops.clone())
    }
}

/// Inbound: another participant's cursor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorBroadcast {
    pub id: ParticipantId,
    pub position: Option<usize>,
    pub selection_end: Option<usize>,
    #[serde(default)]
    pub color: Option<Color>,
}

impl CursorBroadcast {
    pub fn cursor(&self) -> Cursor {
        Cursor {
            position: self.position,
            selection_end: self.selection_end,
        }
    }
}

impl From<&CursorUpdate> for CursorBroadcast {
    fn from(update: &CursorUpdate) -> Self {
        Self {
            id: update.participant_id.clone(),
            position: update.cursor.position,
            selection_end: update.cursor.selection_end,
            color: Some(update.color.clone()),
        }
    }
}

/// Build the raw `{ "a": author, "o": op }` revision record
pub fn raw_revision(author: &ParticipantId, op: Value) -> Value {
    json!({ "a": author.as_str(), "o": op })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> ParticipantId {
        ParticipantId::new("alice").unwrap()
    }

    #[test]
    fn test_cursor_constructors() {
        assert!(Cursor::cleared().is_cleared());
        assert_eq!(Cursor::at(4).selection_end, Some(4));
        assert!(!Cursor::selection(1, 3).is_cleared());
    }

    #[test]
    fn test_revision_broadcast_wire_names() {
        let value = json!({
            "docId": "doc",
            "docOpId": "A1",
            "ops": [1, "x"],
            "author": "alice"
        });
        let broadcast: RevisionBroadcast = serde_json::from_value(value).unwrap();
        assert_eq!(broadcast.doc_op_id, "A1");
        assert_eq!(broadcast.to_raw(), json!({ "a": "alice", "o": [1, "x"] }));
    }

    #[test]
    fn test_cursor_update_wire_names() {
        let update = CursorUpdate {
            participant_id: alice(),
            cursor: Cursor::selection(2, 5),
            color: Color::new("#123456"),
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({
                "participantId": "alice",
                "cursor": { "position": 2, "selectionEnd": 5 },
                "color": "#123456"
            })
        );
    }

    #[test]
    fn test_cursor_broadcast_color_optional() {
        let value = json!({ "id": "bob", "position": null, "selectionEnd": null });
        let broadcast: CursorBroadcast = serde_json::from_value(value).unwrap();
        assert!(broadcast.color.is_none());
        assert!(broadcast.cursor().is_cleared());
    }

    #[test]
    fn test_snapshot_entry_holds_raw_record() {
        let entry = SnapshotEntry::new("A0", &alice(), json!(["hi"]));
        assert_eq!(entry.revision, json!({ "a": "alice", "o": ["hi"] }));
    }
}
