use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::note::Note;

/// Messages exchanged between recorder and player, one JSON object per line,
/// discriminated by a `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    Notes { notes: Vec<Note> },
    /// Any well-formed object whose `type` this build does not know. Never sent.
    #[serde(other)]
    Unknown,
}

impl Message {
    pub fn notes(notes: Vec<Note>) -> Self {
        Message::Notes { notes }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Message::Notes { .. } => "notes",
            Message::Unknown => "unknown",
        }
    }

    /// Encodes the message as a single line including the trailing `\n`.
    pub fn to_line(&self) -> Result<String, ProtocolError> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    /// Decodes one frame without its delimiter. A trailing `\r` is tolerated.
    pub fn from_frame(frame: &[u8]) -> Result<Self, ProtocolError> {
        let frame = frame.strip_suffix(b"\r").unwrap_or(frame);
        Ok(serde_json::from_slice(frame)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::Lane;

    #[test]
    fn notes_message_matches_wire_shape() {
        let message = Message::notes(vec![
            Note::new(Lane::new(0).unwrap(), 0),
            Note::new(Lane::new(3).unwrap(), 1250),
        ]);
        assert_eq!(
            message.to_line().unwrap(),
            "{\"type\":\"notes\",\"notes\":[{\"lane\":0,\"timestamp\":0},{\"lane\":3,\"timestamp\":1250}]}\n"
        );
    }

    #[test]
    fn decodes_frame_written_by_other_implementations() {
        let frame = br#"{"type": "notes", "notes": [{"lane": 1, "timestamp": 300}]}"#;
        let message = Message::from_frame(frame).unwrap();
        assert_eq!(
            message,
            Message::notes(vec![Note::new(Lane::new(1).unwrap(), 300)])
        );
    }

    #[test]
    fn unknown_type_is_accepted() {
        let message = Message::from_frame(br#"{"type": "chat", "text": "hi"}"#).unwrap();
        assert_eq!(message, Message::Unknown);
        assert_eq!(message.kind(), "unknown");
    }

    #[test]
    fn tolerates_carriage_return() {
        let message = Message::from_frame(b"{\"type\":\"notes\",\"notes\":[]}\r").unwrap();
        assert_eq!(message, Message::notes(vec![]));
    }

    #[test]
    fn rejects_malformed_frames() {
        assert!(Message::from_frame(b"{\"type\":\"notes\"").is_err());
        assert!(Message::from_frame(b"not json").is_err());
        assert!(Message::from_frame(br#"{"notes": []}"#).is_err());
        assert!(Message::from_frame(br#"{"type":"notes","notes":[{"lane":9,"timestamp":1}]}"#).is_err());
        assert!(Message::from_frame(&[0xff, 0xfe]).is_err());
    }
}
