//! Server-Sent-Events framing, in both directions.
//!
//! Upstream bytes arrive in arbitrary pieces. [`SseLineBuffer`] holds the
//! incomplete tail until its newline shows up and decodes UTF-8 per complete
//! line, so a character split across two reads survives.

use bytes::Bytes;
use serde::Serialize;

pub const DATA_PREFIX: &str = "data: ";

/// Literal end-of-stream record.
pub const DONE_RECORD: &[u8] = b"data: [DONE]\n\n";

/// Longest upstream line kept, in bytes. Longer lines are discarded whole.
pub const MAX_LINE_BYTES: usize = 4 * 1024 * 1024;

/// One complete upstream line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine {
    Text(String),
    /// A line longer than the buffer's limit was dropped; carries its length.
    Oversized(usize),
}

#[derive(Debug)]
pub struct SseLineBuffer {
    pending: Vec<u8>,
    /// Prefix of `pending` already known to hold no newline.
    scanned: usize,
    max_line: usize,
    /// Bytes thrown away so far from an oversized line still in progress.
    discarding: Option<usize>,
}

impl Default for SseLineBuffer {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            pending: Vec::new(),
            scanned: 0,
            max_line,
            discarding: None,
        }
    }

    /// Append bytes and return every line they complete, without the line
    /// terminator (`\n` or `\r\n`).
    pub fn push(&mut self, mut bytes: &[u8]) -> Vec<SseLine> {
        let mut lines = Vec::new();

        if let Some(discarded) = self.discarding {
            match bytes.iter().position(|&b| b == b'\n') {
                None => {
                    self.discarding = Some(discarded + bytes.len());
                    return lines;
                }
                Some(pos) => {
                    lines.push(SseLine::Oversized(discarded + pos));
                    self.discarding = None;
                    bytes = &bytes[pos + 1..];
                }
            }
        }

        self.pending.extend_from_slice(bytes);

        let mut start = 0;
        while let Some(offset) = self.pending[self.scanned..].iter().position(|&b| b == b'\n') {
            let end = self.scanned + offset;
            let line = &self.pending[start..end];
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.len() > self.max_line {
                lines.push(SseLine::Oversized(line.len()));
            } else {
                lines.push(SseLine::Text(String::from_utf8_lossy(line).into_owned()));
            }
            start = end + 1;
            self.scanned = start;
        }
        self.pending.drain(..start);
        self.scanned = self.pending.len();

        if self.pending.len() > self.max_line {
            self.discarding = Some(self.pending.len());
            self.pending = Vec::new();
            self.scanned = 0;
        }

        lines
    }
}

/// JSON payload of a `data: ` line, or `None` for any other or empty line.
pub fn data_payload(line: &str) -> Option<&str> {
    line.strip_prefix(DATA_PREFIX).filter(|payload| !payload.is_empty())
}

/// Encode one value as a `data: <json>\n\n` record.
pub fn encode_data<T: Serialize>(value: &T) -> serde_json::Result<Bytes> {
    let json = serde_json::to_string(value)?;
    Ok(Bytes::from(format!("{DATA_PREFIX}{json}\n\n")))
}
