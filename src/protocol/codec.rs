//! Newline-delimited JSON framing
//!
//! [`FrameDecoder`] splits a byte stream into frames and resynchronizes
//! after an oversized frame by discarding up to the next newline.
//! [`FrameReader`] drives a decoder from any `AsyncRead`.

use bytes::{BufMut, Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{ProtocolError, Result};

/// Default maximum frame length (64KB)
pub const DEFAULT_MAX_FRAME_LEN: usize = 64 * 1024;

const DELIMITER: u8 = b'\n';

/// Incremental frame splitter
#[derive(Debug)]
pub struct FrameDecoder {
    buf: BytesMut,
    max_frame_len: usize,
    /// Prefix of `buf` already known to hold no delimiter
    scanned: usize,
    /// Dropping the tail of an oversized frame
    discarding: bool,
}

impl FrameDecoder {
    pub fn new(max_frame_len: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(4096),
            max_frame_len,
            scanned: 0,
            discarding: false,
        }
    }

    /// Buffer that incoming bytes should be read into
    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }

    /// Append raw bytes
    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Next complete frame, without its line terminator
    ///
    /// Blank lines are skipped. An oversized frame yields one
    /// `FrameTooLarge` error; decoding resumes after its newline.
    pub fn next_frame(&mut self) -> std::result::Result<Option<Bytes>, ProtocolError> {
        loop {
            let newline = self.buf[self.scanned..]
                .iter()
                .position(|&b| b == DELIMITER)
                .map(|offset| self.scanned + offset);

            if self.discarding {
                self.scanned = 0;
                match newline {
                    Some(pos) => {
                        let _ = self.buf.split_to(pos + 1);
                        self.discarding = false;
                        continue;
                    }
                    None => {
                        self.buf.clear();
                        return Ok(None);
                    }
                }
            }

            let Some(pos) = newline else {
                if self.buf.len() > self.max_frame_len {
                    let len = self.buf.len();
                    self.buf.clear();
                    self.scanned = 0;
                    self.discarding = true;
                    return Err(ProtocolError::FrameTooLarge {
                        len,
                        max: self.max_frame_len,
                    });
                }
                self.scanned = self.buf.len();
                return Ok(None);
            };

            self.scanned = 0;
            let mut line = self.buf.split_to(pos + 1);
            line.truncate(pos);
            if line.last() == Some(&b'\r') {
                line.truncate(pos - 1);
            }

            if line.len() > self.max_frame_len {
                return Err(ProtocolError::FrameTooLarge {
                    len: line.len(),
                    max: self.max_frame_len,
                });
            }

            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            return Ok(Some(line.freeze()));
        }
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LEN)
    }
}

/// Reads frames from an async byte stream
pub struct FrameReader<R> {
    reader: R,
    decoder: FrameDecoder,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R, max_frame_len: usize) -> Self {
        Self {
            reader,
            decoder: FrameDecoder::new(max_frame_len),
        }
    }

    /// Read the next frame
    ///
    /// Returns `Ok(None)` at end of stream. A `FrameTooLarge` error leaves
    /// the reader usable.
    pub async fn read_frame(&mut self) -> Result<Option<Bytes>> {
        loop {
            if let Some(frame) = self.decoder.next_frame()? {
                return Ok(Some(frame));
            }

            let n = self.reader.read_buf(self.decoder.buffer_mut()).await?;
            if n == 0 {
                return Ok(None);
            }
        }
    }
}

/// Decode a frame into an event
pub fn decode<T: DeserializeOwned>(frame: &[u8]) -> std::result::Result<T, ProtocolError> {
    Ok(serde_json::from_slice(frame)?)
}

/// Encode an event as a newline-terminated frame
pub fn encode<T: Serialize>(event: &T) -> std::result::Result<Bytes, ProtocolError> {
    let mut buf = BytesMut::with_capacity(256).writer();
    serde_json::to_writer(&mut buf, event)?;
    let mut buf = buf.into_inner();
    buf.put_u8(DELIMITER);
    Ok(buf.freeze())
}
