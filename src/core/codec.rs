//! Newline-delimited record framing.
//!
//! [`LineCodec`] splits the byte stream into one record per line and frames
//! outgoing records with a trailing `\n`. It deliberately yields *raw* lines
//! rather than parsed [`Message`](super::Message) values: a `Decoder` error
//! terminates a `Framed` stream, and a peer sending one malformed record
//! must not cost it the whole connection. The read loop parses JSON itself
//! and drops what it cannot parse.
//!
//! The only decoder errors are genuine transport faults: I/O errors and a
//! record growing past [`MAX_RECORD_SIZE`] without a line terminator.

use crate::config::MAX_RECORD_SIZE;
use crate::error::ProtocolError;
use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Codec for newline-delimited text records.
#[derive(Debug, Clone, Default)]
pub struct LineCodec {
    /// Index into the buffer up to which we have already scanned for `\n`.
    next_index: usize,
}

impl LineCodec {
    pub fn new() -> Self {
        Self { next_index: 0 }
    }

    fn take_line(buf: &mut BytesMut, newline_index: usize) -> String {
        let mut line = buf.split_to(newline_index + 1);
        // Strip the terminator, tolerating CRLF from foreign peers.
        line.truncate(line.len() - 1);
        if line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }
        // Invalid UTF-8 surfaces as a malformed record downstream, not as a
        // stream-fatal decode error.
        String::from_utf8_lossy(&line).into_owned()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, ProtocolError> {
        if let Some(offset) = buf[self.next_index..].iter().position(|b| *b == b'\n') {
            let newline_index = self.next_index + offset;
            self.next_index = 0;
            return Ok(Some(Self::take_line(buf, newline_index)));
        }

        if buf.len() > MAX_RECORD_SIZE {
            return Err(ProtocolError::OversizedRecord(buf.len()));
        }

        self.next_index = buf.len();
        Ok(None)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, ProtocolError> {
        match self.decode(buf)? {
            Some(line) => Ok(Some(line)),
            None if buf.is_empty() => Ok(None),
            None => {
                // Unterminated final record: deliver what we have.
                let line = String::from_utf8_lossy(buf).into_owned();
                buf.clear();
                self.next_index = 0;
                Ok(Some(line))
            }
        }
    }
}

impl<T: AsRef<str>> Encoder<T> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, record: T, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        let record = record.as_ref();
        buf.reserve(record.len() + 1);
        buf.put_slice(record.as_bytes());
        buf.put_u8(b'\n');
        Ok(())
    }
}
