//! Incremental SSE line/event reassembler (spec §4.1, component C1).
//!
//! Turns an append-only sequence of byte chunks into complete `(event?,
//! data)` records. This is the piece the rest of the pack reaches for the
//! `eventsource-stream` crate to do; it is written by hand here because the
//! core's chunk-boundary invariants (spec §8: "chunk-oblivious") are part of
//! what this crate is specified against, not an incidental detail of
//! whichever crate happens to implement SSE parsing.

/// One complete, reassembled SSE record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseRecord {
    /// The `event:` line's value, if any (absent for data-only records).
    pub event: Option<String>,
    /// The concatenation of all `data:` lines, joined with `\n` (SSE spec;
    /// cold path for the Chat dialect, which never emits multi-line data).
    pub data: String,
}

/// Accepts byte chunks and extracts complete SSE records one at a time.
///
/// Extraction is non-destructive on incomplete input: a record's lines are
/// folded into the in-progress `event`/`data` fields as soon as a complete
/// line is seen, but nothing is reported to the caller (and no information
/// is lost) until the terminating blank line arrives. Any trailing partial
/// line is retained verbatim across calls.
#[derive(Debug, Default)]
pub struct SseReassembler {
    buf: Vec<u8>,
    event: Option<String>,
    data_lines: Vec<String>,
    /// Whether the in-progress record has seen any `event:`/`data:` line
    /// since the last dispatch. Consecutive blank lines with nothing
    /// accumulated do not produce empty records.
    has_content: bool,
}

impl SseReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk of bytes delivered by the HTTP layer.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Extracts the next complete record, if one is available.
    ///
    /// Returns `None` when the buffered bytes don't yet contain a full
    /// record (more bytes are needed).
    pub fn next_record(&mut self) -> Option<SseRecord> {
        loop {
            let nl = self.buf.iter().position(|&b| b == b'\n')?;
            let line_with_terminator: Vec<u8> = self.buf.drain(..=nl).collect();
            let line = strip_line_terminator(&line_with_terminator);

            if line.is_empty() {
                if self.has_content {
                    let record = SseRecord {
                        event: self.event.take(),
                        data: self.data_lines.drain(..).collect::<Vec<_>>().join("\n"),
                    };
                    self.has_content = false;
                    return Some(record);
                }
                // Blank line with nothing accumulated yet: skip it.
                continue;
            }

            let text = String::from_utf8_lossy(line);
            if let Some(rest) = text.strip_prefix("data:") {
                self.data_lines.push(strip_one_leading_space(rest).to_string());
                self.has_content = true;
            } else if let Some(rest) = text.strip_prefix("event:") {
                self.event = Some(strip_one_leading_space(rest).to_string());
                self.has_content = true;
            } else {
                // `id:`, `retry:`, or an unrecognized field name: discarded.
            }
        }
    }
}

fn strip_line_terminator(line_with_nl: &[u8]) -> &[u8] {
    let without_lf = &line_with_nl[..line_with_nl.len() - 1];
    match without_lf.last() {
        Some(b'\r') => &without_lf[..without_lf.len() - 1],
        _ => without_lf,
    }
}

fn strip_one_leading_space(s: &str) -> &str {
    s.strip_prefix(' ').unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(input: &[u8]) -> Vec<SseRecord> {
        let mut r = SseReassembler::new();
        r.push(input);
        let mut out = Vec::new();
        while let Some(record) = r.next_record() {
            out.push(record);
        }
        out
    }

    #[test]
    fn single_data_only_record() {
        let recs = records(b"data: {\"a\":1}\n\n");
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].event, None);
        assert_eq!(recs[0].data, r#"{"a":1}"#);
    }

    #[test]
    fn named_event_record() {
        let recs = records(b"event: response.created\ndata: {\"x\":1}\n\n");
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].event.as_deref(), Some("response.created"));
        assert_eq!(recs[0].data, r#"{"x":1}"#);
    }

    #[test]
    fn crlf_terminators_accepted() {
        let recs = records(b"data: {\"a\":1}\r\n\r\n");
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].data, r#"{"a":1}"#);
    }

    #[test]
    fn multi_line_data_joined_with_newline() {
        let recs = records(b"data: line1\ndata: line2\n\n");
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].data, "line1\nline2");
    }

    #[test]
    fn unrecognized_fields_discarded() {
        let recs = records(b"id: 5\nretry: 1000\nfoo: bar\ndata: hi\n\n");
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].data, "hi");
    }

    #[test]
    fn whitespace_only_input_yields_nothing() {
        assert_eq!(records(b"\n\n\n").len(), 0);
        assert_eq!(records(b"").len(), 0);
    }

    #[test]
    fn incomplete_record_retained_until_more_bytes_arrive() {
        let mut r = SseReassembler::new();
        r.push(b"data: {\"a\":1}\n");
        assert_eq!(r.next_record(), None);
        r.push(b"\n");
        let rec = r.next_record().expect("record now complete");
        assert_eq!(rec.data, r#"{"a":1}"#);
    }

    #[test]
    fn chunk_boundary_mid_field_name() {
        // Splits right inside the word "data"
        let mut r = SseReassembler::new();
        r.push(b"da");
        assert_eq!(r.next_record(), None);
        r.push(b"ta: hello\n\n");
        let rec = r.next_record().unwrap();
        assert_eq!(rec.data, "hello");
    }

    #[test]
    fn byte_at_a_time_matches_single_chunk() {
        let input = b"event: e\ndata: {\"a\":1}\n\ndata: [DONE]\n\n";
        let mut one_shot = SseReassembler::new();
        one_shot.push(input);
        let mut expected = Vec::new();
        while let Some(r) = one_shot.next_record() {
            expected.push(r);
        }

        let mut incremental = SseReassembler::new();
        let mut actual = Vec::new();
        for &byte in input {
            incremental.push(&[byte]);
            while let Some(r) = incremental.next_record() {
                actual.push(r);
            }
        }

        assert_eq!(actual, expected);
    }

    #[test]
    fn multiple_records_in_one_push() {
        let recs = records(b"data: one\n\ndata: two\n\ndata: three\n\n");
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[0].data, "one");
        assert_eq!(recs[1].data, "two");
        assert_eq!(recs[2].data, "three");
    }

    #[test]
    fn leading_space_after_colon_is_optional() {
        let recs = records(b"data:nospace\n\ndata: withspace\n\n");
        assert_eq!(recs[0].data, "nospace");
        assert_eq!(recs[1].data, "withspace");
    }
}
