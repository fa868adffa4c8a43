use bytes::{BufMut, BytesMut};
use common::{MAX_FRAME_BYTES, Message, ProtocolError};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::error::TransportError;

/// One decoded line. Malformed lines are surfaced instead of failing the stream so
/// the connection survives them.
#[derive(Debug)]
pub enum Inbound {
    Message(Message),
    Malformed(ProtocolError),
}

/// Newline-delimited JSON framing for [`Message`].
#[derive(Debug)]
pub struct MessageCodec {
    max_frame: usize,
    /// Bytes already scanned for a newline, so partial reads are not rescanned.
    next_index: usize,
    /// Length of an oversized line being skipped, if any.
    discarding: Option<usize>,
}

impl MessageCodec {
    pub fn new() -> Self {
        Self::with_max_frame(MAX_FRAME_BYTES)
    }

    pub fn with_max_frame(max_frame: usize) -> Self {
        MessageCodec {
            max_frame,
            next_index: 0,
            discarding: None,
        }
    }

    fn decode_body(body: &[u8]) -> Inbound {
        match Message::from_frame(body) {
            Ok(message) => Inbound::Message(message),
            Err(err) => Inbound::Malformed(err),
        }
    }
}

impl Default for MessageCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for MessageCodec {
    type Item = Inbound;
    type Error = TransportError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Inbound>, TransportError> {
        loop {
            let newline = buf[self.next_index..]
                .iter()
                .position(|b| *b == b'\n')
                .map(|offset| self.next_index + offset);

            let Some(newline) = newline else {
                if buf.len() > self.max_frame {
                    let skipped = self.discarding.unwrap_or(0) + buf.len();
                    self.discarding = Some(skipped);
                    buf.clear();
                    self.next_index = 0;
                } else {
                    self.next_index = buf.len();
                }
                return Ok(None);
            };

            let line = buf.split_to(newline + 1);
            self.next_index = 0;
            let body = &line[..line.len() - 1];

            if let Some(skipped) = self.discarding.take() {
                return Ok(Some(Inbound::Malformed(ProtocolError::FrameTooLong {
                    len: skipped + body.len(),
                    max: self.max_frame,
                })));
            }
            if body.len() > self.max_frame {
                return Ok(Some(Inbound::Malformed(ProtocolError::FrameTooLong {
                    len: body.len(),
                    max: self.max_frame,
                })));
            }
            if body.is_empty() || body == b"\r" {
                continue;
            }
            return Ok(Some(Self::decode_body(body)));
        }
    }

    /// At end of stream an unterminated remainder is complete by definition, so it is
    /// decoded as a final line rather than rejected.
    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Inbound>, TransportError> {
        if let Some(frame) = self.decode(buf)? {
            return Ok(Some(frame));
        }
        if self.discarding.take().is_some() {
            warn!("Stream ended inside an oversized frame");
            buf.clear();
            return Ok(None);
        }
        if buf.iter().all(u8::is_ascii_whitespace) {
            buf.clear();
            return Ok(None);
        }
        let rest = buf.split();
        self.next_index = 0;
        Ok(Some(Self::decode_body(&rest)))
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = TransportError;

    fn encode(&mut self, message: Message, dst: &mut BytesMut) -> Result<(), TransportError> {
        let line = message.to_line()?;
        dst.reserve(line.len());
        dst.put_slice(line.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Lane, Note};

    fn notes(timestamps: &[u64]) -> Message {
        Message::notes(
            timestamps
                .iter()
                .enumerate()
                .map(|(i, &ts)| Note::new(Lane::new(i % 4).unwrap(), ts))
                .collect(),
        )
    }

    fn decode_all(codec: &mut MessageCodec, buf: &mut BytesMut) -> Vec<Inbound> {
        let mut out = Vec::new();
        while let Some(frame) = codec.decode(buf).unwrap() {
            out.push(frame);
        }
        out
    }

    fn expect_message(frame: Inbound) -> Message {
        match frame {
            Inbound::Message(message) => message,
            Inbound::Malformed(err) => panic!("unexpected malformed frame: {}", err),
        }
    }

    #[test]
    fn decodes_back_to_back_messages_in_order() {
        let messages = vec![notes(&[0, 100]), notes(&[]), notes(&[5, 6, 7])];
        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::new();
        for message in messages.clone() {
            codec.encode(message, &mut buf).unwrap();
        }

        let decoded: Vec<Message> = decode_all(&mut codec, &mut buf)
            .into_iter()
            .map(expect_message)
            .collect();
        assert_eq!(decoded, messages);
        assert!(buf.is_empty());
    }

    #[test]
    fn reassembles_messages_split_across_reads() {
        let messages = vec![notes(&[10, 20, 30]), notes(&[40])];
        let mut wire = BytesMut::new();
        let mut encoder = MessageCodec::new();
        for message in messages.clone() {
            encoder.encode(message, &mut wire).unwrap();
        }

        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::new();
        let mut decoded = Vec::new();
        for chunk in wire.chunks(7) {
            buf.extend_from_slice(chunk);
            decoded.extend(decode_all(&mut codec, &mut buf).into_iter().map(expect_message));
        }
        assert_eq!(decoded, messages);
    }

    #[test]
    fn retains_unterminated_remainder() {
        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::from(&b"{\"type\":\"notes\",\"notes\":[]}\n{\"type\":\"no"[..]);

        let frames = decode_all(&mut codec, &mut buf);
        assert_eq!(frames.len(), 1);
        assert_eq!(&buf[..], b"{\"type\":\"no");

        buf.extend_from_slice(b"tes\",\"notes\":[]}\n");
        let frames = decode_all(&mut codec, &mut buf);
        assert_eq!(frames.len(), 1);
        assert_eq!(expect_message(frames.into_iter().next().unwrap()), notes(&[]));
    }

    #[test]
    fn malformed_line_does_not_disturb_neighbours() {
        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::from(
            &b"{\"type\":\"notes\",\"notes\":[]}\n{garbage\n\n{\"type\":\"ping\"}\n{\"type\":\"notes\",\"notes\":[]}\n"[..],
        );

        let frames = decode_all(&mut codec, &mut buf);
        assert_eq!(frames.len(), 4);
        assert!(matches!(frames[0], Inbound::Message(Message::Notes { .. })));
        assert!(matches!(frames[1], Inbound::Malformed(ProtocolError::Malformed(_))));
        assert!(matches!(frames[2], Inbound::Message(Message::Unknown)));
        assert!(matches!(frames[3], Inbound::Message(Message::Notes { .. })));
    }

    #[test]
    fn oversized_line_is_skipped_up_to_its_newline() {
        let mut codec = MessageCodec::with_max_frame(16);
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[b'x'; 20]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert!(buf.is_empty());

        buf.extend_from_slice(b"yyy\n{\"type\":\"x\"}\n");
        let frames = decode_all(&mut codec, &mut buf);
        assert_eq!(frames.len(), 2);
        assert!(matches!(
            frames[0],
            Inbound::Malformed(ProtocolError::FrameTooLong { len: 23, max: 16 })
        ));
        assert!(matches!(frames[1], Inbound::Message(Message::Unknown)));
    }

    #[test]
    fn eof_decodes_unterminated_final_line() {
        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::from(&b"{\"type\":\"notes\",\"notes\":[]}"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        let frame = codec.decode_eof(&mut buf).unwrap().unwrap();
        assert_eq!(expect_message(frame), notes(&[]));
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
    }
}
