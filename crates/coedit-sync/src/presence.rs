//! Best-effort relay for this participant's cursor
//!
//! Presence is ephemeral: nothing here touches document history. Repeated
//! "cleared" updates after the first are suppressed; anything with a
//! position is always sent.

use coedit_core::{Color, Cursor, CursorUpdate, ParticipantId};

#[derive(Debug)]
pub struct PresenceRelay {
    participant: ParticipantId,
    color: Color,
    last: Option<Cursor>,
}

impl PresenceRelay {
    pub fn new(participant: ParticipantId, color: Color) -> Self {
        Self {
            participant,
            color,
            last: None,
        }
    }

    /// Record `cursor` (`None` meaning cleared) and return the update to
    /// transmit, if any.
    pub fn update(&mut self, cursor: Option<Cursor>) -> Option<CursorUpdate> {
        let cursor = cursor.unwrap_or_default();
        let transmit = self.last.is_none() || !cursor.is_cleared();
        self.last = Some(cursor);

        transmit.then(|| CursorUpdate {
            participant_id: self.participant.clone(),
            cursor,
            color: self.color.clone(),
        })
    }

    /// The most recently recorded cursor
    pub fn last(&self) -> Option<Cursor> {
        self.last
    }

    pub fn color(&self) -> &Color {
        &self.color
    }

    /// Change the color carried by subsequent updates
    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relay() -> PresenceRelay {
        PresenceRelay::new(ParticipantId::new("alice").unwrap(), Color::new("#ff0000"))
    }

    #[test]
    fn test_first_clear_transmits() {
        let mut relay = relay();
        let update = relay.update(None).unwrap();
        assert!(update.cursor.is_cleared());
        assert_eq!(update.participant_id.as_str(), "alice");
        assert_eq!(relay.last(), Some(Cursor::cleared()));
    }

    #[test]
    fn test_repeated_clear_suppressed() {
        let mut relay = relay();
        assert!(relay.update(None).is_some());
        assert!(relay.update(None).is_none());
        assert!(relay.update(Some(Cursor::cleared())).is_none());
    }

    #[test]
    fn test_position_always_transmits() {
        let mut relay = relay();
        relay.update(None);
        assert!(relay.update(Some(Cursor::at(5))).is_some());
        assert!(relay.update(Some(Cursor::at(5))).is_some());
        assert_eq!(relay.last(), Some(Cursor::at(5)));
    }

    #[test]
    fn test_clear_after_position_suppressed_but_recorded() {
        let mut relay = relay();
        relay.update(Some(Cursor::at(2)));
        assert!(relay.update(None).is_none());
        assert_eq!(relay.last(), Some(Cursor::cleared()));
    }

    #[test]
    fn test_set_color() {
        let mut relay = relay();
        relay.set_color(Color::new("#00ff00"));
        let update = relay.update(Some(Cursor::at(1))).unwrap();
        assert_eq!(update.color.as_str(), "#00ff00");
        assert_eq!(relay.color().as_str(), "#00ff00");
    }
}
