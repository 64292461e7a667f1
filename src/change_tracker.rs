//! Per-analyser dirty-span tracking (§4.5). Each tracker owns a snapshot of
//! the document text at its own construction time and an ordered
//! `(length, dirty)` sequence whose positive lengths sum to the snapshot's
//! byte length. `did_change` events update both in lock-step; a successful
//! re-check resets the tracker to a clean slate over the current document.

use lsp_types::Range;

use crate::document::{BaseDocument, Interval};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    length: i64,
    dirty: bool,
}

pub struct ChangeTracker {
    snapshot: BaseDocument,
    spans: Vec<Span>,
    full_document_change: bool,
}

impl ChangeTracker {
    pub fn new(snapshot_source: String) -> Self {
        let length = snapshot_source.len() as i64;
        ChangeTracker {
            snapshot: BaseDocument::new(snapshot_source),
            spans: vec![Span { length, dirty: false }],
            full_document_change: false,
        }
    }

    /// Record one LSP content-change event. `range` is `None` for a
    /// type-2 full-document replacement; `new_source` is the document's
    /// text *after* this change, which becomes the tracker's next snapshot.
    pub fn apply_change(&mut self, range: Option<Range>, text: &str, new_source: String) {
        match range {
            None => {
                self.spans = vec![Span { length: -1, dirty: true }];
                self.full_document_change = true;
            }
            Some(range) => {
                let start = self.snapshot.offset_at_position(range.start);
                let end = self.snapshot.offset_at_position(range.end);
                let old_len = end.saturating_sub(start);
                // DELETE (empty replacement text) still dirties at least one
                // character so analysers always re-check something.
                let dirty_len = if text.is_empty() { old_len.max(1) } else { text.len() };
                self.splice(start, old_len, dirty_len);
            }
        }
        self.snapshot = BaseDocument::new(new_source);
    }

    fn splice(&mut self, start: usize, old_len: usize, dirty_len: usize) {
        let end = start + old_len;
        let mut result = Vec::with_capacity(self.spans.len() + 2);
        let mut offset = 0usize;
        let mut dirty_inserted = false;

        for span in &self.spans {
            let span_len = span.length.max(0) as usize;
            let span_start = offset;
            let span_end = offset + span_len;

            if span_end <= start {
                result.push(*span);
            } else if span_start >= end {
                result.push(*span);
            } else {
                let before = start.saturating_sub(span_start);
                let after = span_end.saturating_sub(end);
                if before > 0 {
                    result.push(Span { length: before as i64, dirty: span.dirty });
                }
                if !dirty_inserted {
                    result.push(Span { length: dirty_len as i64, dirty: true });
                    dirty_inserted = true;
                }
                if after > 0 {
                    result.push(Span { length: after as i64, dirty: span.dirty });
                }
            }
            offset += span_len;
        }

        if !dirty_inserted {
            result.push(Span { length: dirty_len as i64, dirty: true });
        }

        self.spans = merge_adjacent(result);
        self.full_document_change = false;
    }

    /// Dirty spans clipped to `[0, len(current_document))`.
    pub fn get_changes(&self) -> Vec<Interval> {
        if self.full_document_change {
            return vec![Interval { start: 0, length: self.snapshot.source.len() }];
        }
        let mut result = Vec::new();
        let mut offset = 0usize;
        for span in &self.spans {
            let length = span.length.max(0) as usize;
            if span.dirty && length > 0 {
                result.push(Interval { start: offset, length });
            }
            offset += length;
        }
        result
    }

    pub fn len(&self) -> usize {
        if self.full_document_change {
            1
        } else {
            self.spans.iter().filter(|s| s.dirty).count()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Called once an analyser has re-checked every dirty span it reported;
    /// starts a fresh clean slate over the document's current text.
    pub fn reset(&mut self, current_source: String) {
        let length = current_source.len() as i64;
        self.snapshot = BaseDocument::new(current_source);
        self.spans = vec![Span { length, dirty: false }];
        self.full_document_change = false;
    }
}

fn merge_adjacent(spans: Vec<Span>) -> Vec<Span> {
    let mut merged: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        if span.length == 0 {
            continue;
        }
        if let Some(last) = merged.last_mut() {
            if last.dirty == span.dirty {
                last.length += span.length;
                continue;
            }
        }
        merged.push(span);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsp_types::Position;

    fn range(sl: u32, sc: u32, el: u32, ec: u32) -> Range {
        Range { start: Position { line: sl, character: sc }, end: Position { line: el, character: ec } }
    }

    #[test]
    fn insert_marks_a_dirty_span_of_the_inserted_length() {
        let mut tracker = ChangeTracker::new("hello world".to_string());
        tracker.apply_change(Some(range(0, 5, 0, 5)), " there", "hello there world".to_string());
        let changes = tracker.get_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].length, 6);
    }

    #[test]
    fn delete_marks_at_least_one_dirty_byte() {
        let mut tracker = ChangeTracker::new("hello world".to_string());
        tracker.apply_change(Some(range(0, 5, 0, 11)), "", "hello".to_string());
        let changes = tracker.get_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].length, 1);
    }

    #[test]
    fn adjacent_edits_merge_into_one_dirty_span() {
        // The second edit starts exactly where the first one's dirty span
        // ends (offset 4), so the two dirty spans abut with no clean gap
        // between them and `splice` merges them into one.
        let mut tracker = ChangeTracker::new("aaaa bbbb cccc".to_string());
        tracker.apply_change(Some(range(0, 0, 0, 4)), "xxxx", "xxxx bbbb cccc".to_string());
        tracker.apply_change(Some(range(0, 4, 0, 5)), "_", "xxxx_bbbb cccc".to_string());
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn full_document_change_covers_everything() {
        let mut tracker = ChangeTracker::new("short".to_string());
        tracker.apply_change(None, "much longer replacement", "much longer replacement".to_string());
        let changes = tracker.get_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].length, "much longer replacement".len());
    }

    #[test]
    fn reset_clears_all_dirty_spans() {
        let mut tracker = ChangeTracker::new("hello world".to_string());
        tracker.apply_change(Some(range(0, 5, 0, 5)), "!", "hello! world".to_string());
        assert!(!tracker.is_empty());
        tracker.reset("hello! world".to_string());
        assert!(tracker.is_empty());
    }
}
