//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Framing codecs for the command and notification connections

use crate::{CodecError, Notification, Request};
use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

/// Two-byte separator terminating every response and notification record
pub const RECORD_SEPARATOR: &[u8; 2] = b"\r\n";

/// Default upper bound for a single line or record
pub const DEFAULT_MAX_LENGTH: usize = 8 * 1024;

/// Append `payload` plus the record separator.
///
/// Embedded separators would split the record on the far side, so they are
/// folded to bare newlines first.
fn put_record(payload: &str, dst: &mut BytesMut) {
    dst.reserve(payload.len() + RECORD_SEPARATOR.len());
    if payload.contains("\r\n") {
        dst.put_slice(payload.replace("\r\n", "\n").as_bytes());
    } else {
        dst.put_slice(payload.as_bytes());
    }
    dst.put_slice(RECORD_SEPARATOR);
}

/// Server side codec.
///
/// Decodes newline terminated request lines (a trailing `\r` is dropped) and
/// encodes responses and notifications as `\r\n` terminated records. Partial
/// lines stay in the read buffer until their terminator arrives.
#[derive(Debug, Clone)]
pub struct CommandCodec {
    /// Where to resume scanning for `\n` in the read buffer
    next_index: usize,
    max_length: usize,
}

impl Default for CommandCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandCodec {
    /// Create a codec with the default maximum line length
    pub fn new() -> Self {
        Self::with_max_length(DEFAULT_MAX_LENGTH)
    }

    /// Create a codec that rejects lines longer than `max_length` bytes
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            next_index: 0,
            max_length,
        }
    }

    /// The configured maximum line length
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    fn finish_line(&self, raw: &[u8]) -> Result<Request, CodecError> {
        let line = raw.strip_suffix(b"\r").unwrap_or(raw);
        if line.len() > self.max_length {
            return Err(CodecError::LineTooLong {
                limit: self.max_length,
            });
        }
        let text = String::from_utf8_lossy(line);
        trace!(line = %text, "decoded request line");
        Ok(Request::decode(&text))
    }
}

impl Decoder for CommandCodec {
    type Item = Request;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Request>, Self::Error> {
        match src[self.next_index..].iter().position(|byte| *byte == b'\n') {
            Some(offset) => {
                let end = self.next_index + offset;
                self.next_index = 0;
                let line = src.split_to(end + 1);
                self.finish_line(&line[..end]).map(Some)
            }
            None if src.len() > self.max_length => Err(CodecError::LineTooLong {
                limit: self.max_length,
            }),
            None => {
                self.next_index = src.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Request>, Self::Error> {
        if let Some(request) = self.decode(src)? {
            return Ok(Some(request));
        }
        if src.is_empty() {
            return Ok(None);
        }
        self.next_index = 0;
        let line = src.split_to(src.len());
        self.finish_line(&line).map(Some)
    }
}

impl Encoder<&str> for CommandCodec {
    type Error = CodecError;

    fn encode(&mut self, item: &str, dst: &mut BytesMut) -> Result<(), Self::Error> {
        put_record(item, dst);
        Ok(())
    }
}

impl Encoder<String> for CommandCodec {
    type Error = CodecError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        put_record(&item, dst);
        Ok(())
    }
}

impl Encoder<Notification> for CommandCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Notification, dst: &mut BytesMut) -> Result<(), Self::Error> {
        put_record(&item.to_string(), dst);
        Ok(())
    }
}

/// Client side codec.
///
/// Encodes requests as `\r\n` terminated lines and decodes records split
/// strictly on the two-byte separator, so a record may carry embedded `\n`
/// (multi-line listings).
#[derive(Debug, Clone)]
pub struct ResponseCodec {
    next_index: usize,
    max_length: usize,
}

impl Default for ResponseCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseCodec {
    /// Create a codec with the default maximum record length
    pub fn new() -> Self {
        Self::with_max_length(DEFAULT_MAX_LENGTH)
    }

    /// Create a codec that rejects records longer than `max_length` bytes
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            next_index: 0,
            max_length,
        }
    }
}

impl Decoder for ResponseCodec {
    type Item = String;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, Self::Error> {
        // The `\r` of a separator may have been the last byte of the previous scan.
        let start = self.next_index.saturating_sub(1);
        let found = src[start..]
            .windows(RECORD_SEPARATOR.len())
            .position(|window| window == RECORD_SEPARATOR);
        match found {
            Some(offset) => {
                let end = start + offset;
                self.next_index = 0;
                let record = src.split_to(end + RECORD_SEPARATOR.len());
                if end > self.max_length {
                    return Err(CodecError::LineTooLong {
                        limit: self.max_length,
                    });
                }
                Ok(Some(String::from_utf8_lossy(&record[..end]).into_owned()))
            }
            None if src.len() > self.max_length => Err(CodecError::LineTooLong {
                limit: self.max_length,
            }),
            None => {
                self.next_index = src.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>, Self::Error> {
        if let Some(record) = self.decode(src)? {
            return Ok(Some(record));
        }
        if src.is_empty() {
            return Ok(None);
        }
        self.next_index = 0;
        let record = src.split_to(src.len());
        Ok(Some(String::from_utf8_lossy(&record).into_owned()))
    }
}

impl Encoder<&Request> for ResponseCodec {
    type Error = CodecError;

    fn encode(&mut self, item: &Request, dst: &mut BytesMut) -> Result<(), Self::Error> {
        put_record(&item.to_string(), dst);
        Ok(())
    }
}

impl Encoder<Request> for ResponseCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Request, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.encode(&item, dst)
    }
}
