//! Newline-delimited response framing.
//!
//! A response ends at the first read that carries a `\n`, or when the peer
//! closes the stream. Whatever arrived by then is the response.

/// Maximum bytes requested per socket read.
pub const READ_CHUNK_SIZE: usize = 1024;

/// What the reader should do after feeding a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// No newline yet; read again.
    Continue,
    /// The latest chunk carried a newline.
    Newline,
    /// The peer closed the stream (empty read).
    Closed,
}

impl ReadStatus {
    /// True if reading should stop.
    pub fn is_done(self) -> bool {
        !matches!(self, Self::Continue)
    }
}

/// Accumulates response bytes across partial reads.
#[derive(Debug, Default)]
pub struct ResponseAccumulator {
    buf: Vec<u8>,
    saw_newline: bool,
    closed: bool,
}

impl ResponseAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one read's worth of bytes. An empty chunk means end of stream.
    pub fn push(&mut self, chunk: &[u8]) -> ReadStatus {
        if chunk.is_empty() {
            self.closed = true;
            return ReadStatus::Closed;
        }
        self.buf.extend_from_slice(chunk);
        if chunk.contains(&b'\n') {
            self.saw_newline = true;
            ReadStatus::Newline
        } else {
            ReadStatus::Continue
        }
    }

    /// Bytes received so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True if nothing has been received.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// True if the stream ended before any newline arrived.
    ///
    /// The bytes are still returned as the response; this only lets the
    /// caller report that the reply may have been cut short.
    pub fn truncated(&self) -> bool {
        self.closed && !self.saw_newline
    }

    /// Drop everything received, ready for a new attempt.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.saw_newline = false;
        self.closed = false;
    }

    /// Decode (lossy UTF-8) and trim the accumulated response.
    pub fn finish(&self) -> String {
        trim_response(&String::from_utf8_lossy(&self.buf)).to_string()
    }
}

/// Strip surrounding whitespace and line terminators. Idempotent.
pub fn trim_response(raw: &str) -> &str {
    raw.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_chunk_with_newline() {
        let mut acc = ResponseAccumulator::new();
        assert_eq!(acc.push(b"OK\n"), ReadStatus::Newline);
        assert_eq!(acc.finish(), "OK");
        assert!(!acc.truncated());
    }

    #[test]
    fn accumulates_partial_reads() {
        let mut acc = ResponseAccumulator::new();
        assert_eq!(acc.push(b"val"), ReadStatus::Continue);
        assert_eq!(acc.push(b"ue\n"), ReadStatus::Newline);
        assert_eq!(acc.finish(), "value");
    }

    #[test]
    fn stops_at_newline_bearing_chunk_even_with_trailing_bytes() {
        let mut acc = ResponseAccumulator::new();
        let status = acc.push(b"first\nsecond");
        assert!(status.is_done());
        // The whole chunk is kept, then trimmed only at the edges.
        assert_eq!(acc.finish(), "first\nsecond");
    }

    #[test]
    fn peer_close_without_newline_returns_bytes_and_flags_truncation() {
        let mut acc = ResponseAccumulator::new();
        acc.push(b"partial");
        assert_eq!(acc.push(b""), ReadStatus::Closed);
        assert_eq!(acc.finish(), "partial");
        assert!(acc.truncated());
    }

    #[test]
    fn immediate_close_is_empty() {
        let mut acc = ResponseAccumulator::new();
        assert_eq!(acc.push(b""), ReadStatus::Closed);
        assert!(acc.is_empty());
        assert_eq!(acc.finish(), "");
    }

    #[test]
    fn clear_resets_for_next_attempt() {
        let mut acc = ResponseAccumulator::new();
        acc.push(b"stale");
        acc.push(b"");
        acc.clear();

        assert!(acc.is_empty());
        assert!(!acc.truncated());
        acc.push(b"fresh\n");
        assert_eq!(acc.finish(), "fresh");
        assert_eq!(acc.len(), 6);
    }

    #[test]
    fn trims_crlf_and_spaces() {
        let mut acc = ResponseAccumulator::new();
        acc.push(b"  OK \r\n");
        assert_eq!(acc.finish(), "OK");
    }

    #[test]
    fn multibyte_split_across_reads_decodes() {
        let bytes = "caf\u{e9}\n".as_bytes();
        let mut acc = ResponseAccumulator::new();
        acc.push(&bytes[..4]);
        acc.push(&bytes[4..]);
        assert_eq!(acc.finish(), "caf\u{e9}");
    }

    #[test]
    fn trim_is_idempotent() {
        for raw in ["OK\n", "  spaced  ", "\r\nvalue\r\n", "", "inner\nline\n"] {
            let once = trim_response(raw);
            assert_eq!(trim_response(once), once);
        }
    }
}
