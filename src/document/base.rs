//! Position arithmetic over raw source, ignoring any cleaning. Every
//! concrete document kind embeds a `BaseDocument` and delegates the
//! source-space half of its coordinate API to it.

use line_index::LineIndex;
use lsp_types::{Position, Range};

use super::interval::Interval;
use super::position::{from_lsp_position, to_lsp_position};

pub struct BaseDocument {
    pub source: String,
    line_index: LineIndex,
}

impl BaseDocument {
    pub fn new(source: String) -> Self {
        let line_index = LineIndex::new(&source);
        BaseDocument { source, line_index }
    }

    pub fn set_source(&mut self, source: String) {
        self.line_index = LineIndex::new(&source);
        self.source = source;
    }

    pub fn position_at_offset(&self, offset: usize) -> Position {
        to_lsp_position(&self.line_index, offset.min(self.source.len()))
    }

    pub fn offset_at_position(&self, position: Position) -> usize {
        from_lsp_position(&self.line_index, position)
    }

    /// Inclusive range spanning `length` bytes from `offset`; degenerates to
    /// an empty range at `position_at_offset(offset)` when `length == 0`.
    pub fn range_at_offset(&self, offset: usize, length: usize) -> Range {
        let start = self.position_at_offset(offset);
        if length == 0 {
            return Range { start, end: start };
        }
        let end = self.position_at_offset((offset + length).min(self.source.len()));
        Range { start, end }
    }

    /// Grow symmetrically from `offset` until both sides lie just after a
    /// `[.!?]` followed by whitespace, or at document bounds; widen the
    /// right side until `min_length` bytes are covered.
    pub fn sentence_at_offset(&self, offset: usize, min_length: usize) -> Interval {
        let bytes = self.source.as_bytes();
        let len = bytes.len();
        let offset = offset.min(len.saturating_sub(1));

        let mut start = offset;
        loop {
            if start < 2 {
                start = 0;
                break;
            }
            if is_terminator(bytes[start - 2]) && is_sentence_space(bytes[start - 1]) {
                break;
            }
            start -= 1;
        }

        let mut end = offset;
        while end < len.saturating_sub(1) {
            if end >= 1
                && is_terminator(bytes[end - 1])
                && end < len
                && is_sentence_space(bytes[end])
                && end - start + 1 >= min_length
            {
                break;
            }
            end += 1;
        }

        Interval { start, length: end - start + 1 }
    }

    /// Grow until both sides see a blank-line boundary (two consecutive
    /// `\n`, or document start/end); widen until `min_length` bytes are
    /// covered.
    pub fn paragraph_at_offset(&self, offset: usize, min_length: usize) -> Interval {
        let bytes = self.source.as_bytes();
        let len = bytes.len();
        if len == 0 {
            return Interval { start: 0, length: 0 };
        }
        let offset = offset.min(len - 1);

        let mut start = offset;
        while start > 0 && !is_blank_line_boundary_before(bytes, start) {
            start -= 1;
        }

        let mut end = offset;
        loop {
            while end < len - 1 && !is_blank_line_boundary_after(bytes, end) {
                end += 1;
            }
            if end < len - 1 && end - start + 1 < min_length {
                end += 1;
            } else {
                break;
            }
        }

        Interval { start, length: end - start + 1 }
    }

    pub fn paragraph_at_position(&self, position: Position) -> Interval {
        self.paragraph_at_offset(self.offset_at_position(position), 0)
    }

    pub fn paragraphs_at_offset(&self, offset: usize, min_length: usize) -> Vec<Interval> {
        let mut result = Vec::new();
        let doc_length = self.source.len();
        let mut offset = offset;
        let mut covered = 0usize;

        while offset < doc_length && (covered < min_length || covered == 0) {
            let paragraph = self.paragraph_at_offset(offset, 0);
            offset = paragraph.start + paragraph.length;
            covered += paragraph.length;
            result.push(paragraph);
        }

        result
    }

    pub fn paragraphs_at_range(&self, range: Range) -> Vec<Interval> {
        let mut result = Vec::new();
        let mut position = range.start;

        while position < range.end {
            let paragraph = self.paragraph_at_position(position);
            let text = &self.source[paragraph.start..paragraph.start + paragraph.length];
            let consumed_lines = text.split('\n').count().saturating_sub(1).max(1);
            result.push(paragraph);
            position = Position { line: position.line + consumed_lines as u32, character: 0 };
        }

        result
    }

    /// One past the last character, i.e. the position a caret sits at when
    /// placed at the very end of the document.
    pub fn last_position(&self) -> Position {
        self.position_at_offset(self.source.len())
    }
}

fn is_terminator(b: u8) -> bool {
    matches!(b, b'.' | b'!' | b'?')
}

fn is_sentence_space(b: u8) -> bool {
    matches!(b, b' ' | b'\n')
}

/// True if the two bytes immediately before `idx` are both `\n` (a blank
/// line), or `idx` sits at the very start of the document.
fn is_blank_line_boundary_before(bytes: &[u8], idx: usize) -> bool {
    if idx == 0 {
        return true;
    }
    if idx == 1 {
        return bytes[0] == b'\n';
    }
    bytes[idx - 1] == b'\n' && bytes[idx - 2] == b'\n'
}

/// True if the two bytes immediately after `idx` are both `\n`, or `idx`
/// sits at the document's final byte.
fn is_blank_line_boundary_after(bytes: &[u8], idx: usize) -> bool {
    let len = bytes.len();
    if idx + 1 >= len {
        return true;
    }
    if idx + 2 >= len {
        return bytes[idx + 1] == b'\n';
    }
    bytes[idx + 1] == b'\n' && bytes[idx + 2] == b'\n'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_at_offset_end_of_document() {
        let doc = BaseDocument::new("hello\nworld\n".to_string());
        assert_eq!(doc.position_at_offset(12), Position { line: 2, character: 0 });
    }

    #[test]
    fn offset_at_position_roundtrip() {
        let doc = BaseDocument::new("hello\nworld\n".to_string());
        let pos = Position { line: 1, character: 3 };
        assert_eq!(doc.position_at_offset(doc.offset_at_position(pos)), pos);
    }

    #[test]
    fn range_at_offset_zero_length_is_empty() {
        let doc = BaseDocument::new("hello world".to_string());
        let range = doc.range_at_offset(3, 0);
        assert_eq!(range.start, range.end);
    }

    #[test]
    fn paragraph_at_offset_finds_blank_line_bounds() {
        let doc = BaseDocument::new("first paragraph.\n\nsecond paragraph.\n".to_string());
        let interval = doc.paragraph_at_offset(20, 0);
        let text = &doc.source[interval.start..interval.start + interval.length];
        assert!(text.contains("second paragraph"));
        assert!(!text.contains("first"));
    }

    #[test]
    fn paragraphs_at_offset_collects_until_min_length() {
        let doc = BaseDocument::new("a.\n\nb.\n\nc.\n".to_string());
        let paragraphs = doc.paragraphs_at_offset(0, 6);
        assert!(paragraphs.len() >= 2);
    }

    #[test]
    fn last_position_is_past_final_character() {
        let doc = BaseDocument::new("abc\n".to_string());
        assert_eq!(doc.last_position(), Position { line: 1, character: 0 });
    }

    #[test]
    fn empty_document_paragraph_is_zero_length() {
        let doc = BaseDocument::new(String::new());
        let interval = doc.paragraph_at_offset(0, 0);
        assert_eq!(interval, Interval { start: 0, length: 0 });
    }
}
