//! Line framing over an undifferentiated byte stream
//!
//! The conversion process writes one JSON row per line, but the bytes arrive
//! in arbitrary chunks that do not align with line boundaries (a chunk can
//! even split a multi-byte UTF-8 sequence). [`LineFramer`] keeps the trailing
//! incomplete line as a raw byte carry-over between calls and yields only
//! complete lines.
//!
//! The framer knows nothing about record semantics; recognizing the
//! end-of-stream sentinel is the pipeline's job.

/// Sentinel line the conversion process emits after the last data row
pub const END_OF_STREAM_MARKER: &str = "__END__";

/// Incremental splitter of byte chunks into complete text lines
#[derive(Debug, Default)]
pub struct LineFramer {
    carry: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb one chunk and iterate the complete lines now available.
    ///
    /// Lines are trimmed of surrounding whitespace (including `\r`); the
    /// caller decides what to do with empty ones. Bytes after the last
    /// newline stay buffered for the next call.
    pub fn push<'a>(&'a mut self, chunk: &[u8]) -> Lines<'a> {
        self.carry.extend_from_slice(chunk);
        Lines { framer: self }
    }

    /// Flush the residual buffer as one final line at end of stream.
    pub fn finish(&mut self) -> Option<String> {
        if self.carry.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.carry).trim().to_string();
        self.carry.clear();
        if line.is_empty() {
            None
        } else {
            Some(line)
        }
    }
}

/// Lazy iterator over the complete lines buffered in a [`LineFramer`]
pub struct Lines<'a> {
    framer: &'a mut LineFramer,
}

impl Iterator for Lines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let carry = &mut self.framer.carry;
        let pos = carry.iter().position(|&b| b == b'\n')?;
        let rest = carry.split_off(pos + 1);
        let mut line_bytes = std::mem::replace(carry, rest);
        line_bytes.pop();
        Some(String::from_utf8_lossy(&line_bytes).trim().to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn collect_lines(framer: &mut LineFramer, chunks: &[&[u8]]) -> Vec<String> {
        let mut lines = Vec::new();
        for chunk in chunks {
            lines.extend(framer.push(chunk).filter(|l| !l.is_empty()));
        }
        lines.extend(framer.finish());
        lines
    }

    const STREAM: &[u8] = b"{\"a\":1}\n{\"b\":\"caf\xc3\xa9\"}\r\n{\"c\":3}\n__END__\n";

    fn reference_lines() -> Vec<String> {
        let mut framer = LineFramer::new();
        collect_lines(&mut framer, &[STREAM])
    }

    #[test]
    fn test_whole_stream_in_one_chunk() {
        let lines = reference_lines();
        assert_eq!(
            lines,
            vec!["{\"a\":1}", "{\"b\":\"café\"}", "{\"c\":3}", "__END__"]
        );
    }

    #[test]
    fn test_one_chunk_per_byte_matches_whole_stream() {
        let mut framer = LineFramer::new();
        let chunks: Vec<&[u8]> = STREAM.chunks(1).collect();
        assert_eq!(collect_lines(&mut framer, &chunks), reference_lines());
    }

    #[test]
    fn test_assorted_split_points_match_whole_stream() {
        for size in [2, 3, 5, 7, 11, 13] {
            let mut framer = LineFramer::new();
            let chunks: Vec<&[u8]> = STREAM.chunks(size).collect();
            assert_eq!(
                collect_lines(&mut framer, &chunks),
                reference_lines(),
                "split size {size}"
            );
        }
    }

    #[test]
    fn test_residual_without_trailing_newline_is_flushed() {
        let mut framer = LineFramer::new();
        let lines: Vec<String> = framer.push(b"first\nsecond-no-newline").collect();
        assert_eq!(lines, vec!["first"]);
        assert_eq!(framer.finish().as_deref(), Some("second-no-newline"));
        // flushing twice yields nothing
        assert_eq!(framer.finish(), None);
    }

    #[test]
    fn test_blank_lines_come_out_empty() {
        let mut framer = LineFramer::new();
        let lines: Vec<String> = framer.push(b"\n  \nx\n").collect();
        assert_eq!(lines, vec!["", "", "x"]);
    }
}
