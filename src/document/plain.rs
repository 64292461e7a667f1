//! Plain-text cleaning (§4.4.1.4, via §6's paragraph-break heuristic): no
//! grammar, no tree. Lines joined by a single `\n` collapse into one
//! paragraph with the newline replaced by a space; a run of two or more
//! `\n` is a paragraph break and is preserved verbatim. Since there is no
//! tree to reparse, every edit rebuilds the mapping from scratch — cheap
//! enough given there's no parsing involved.

use std::cell::RefCell;

use lsp_types::{Position, Range};
use tree_sitter::Point;

use crate::error::DocumentError;

use super::base::BaseDocument;
use super::cleanable::CleanableDocument;
use super::interval::OffsetPositionIntervalList;
use super::text_node::TextNode;
use super::tree_sitter::mapping_from_nodes;

pub struct PlainTextDocument {
    base: BaseDocument,
    mapping: OffsetPositionIntervalList,
    cleaned_cache: RefCell<Option<String>>,
}

impl PlainTextDocument {
    pub fn new(source: String) -> Self {
        let mut doc = PlainTextDocument {
            base: BaseDocument::new(source),
            mapping: OffsetPositionIntervalList::new(),
            cleaned_cache: RefCell::new(None),
        };
        doc.rebuild_mapping();
        doc
    }

    pub fn base(&self) -> &BaseDocument {
        &self.base
    }

    pub fn mapping(&self) -> &OffsetPositionIntervalList {
        &self.mapping
    }

    pub fn apply_full_change(&mut self, new_source: String) -> Result<(), DocumentError> {
        self.base.set_source(new_source);
        self.rebuild_mapping();
        self.invalidate_cleaned();
        Ok(())
    }

    pub fn apply_incremental_change(&mut self, range: Range, new_text: &str) -> Result<(), DocumentError> {
        let start = self.base.offset_at_position(range.start);
        let end = self.base.offset_at_position(range.end);
        let mut new_source = self.base.source.clone();
        new_source.replace_range(start..end, new_text);
        self.base.set_source(new_source);
        self.rebuild_mapping();
        self.invalidate_cleaned();
        Ok(())
    }

    fn rebuild_mapping(&mut self) {
        let nodes = split_into_nodes(&self.base.source);
        self.mapping = mapping_from_nodes(&nodes, 0);
    }

    pub fn position_at_offset_cleaned(&self, offset: usize) -> Position {
        match self.mapping.get_interval_at_offset(offset) {
            Some(interval) => {
                let diff = (offset - interval.offset_interval.start) as u32;
                Position {
                    line: interval.position_range.start.line,
                    character: interval.position_range.start.character + diff,
                }
            }
            None => self.base.last_position(),
        }
    }

    pub fn offset_at_position_cleaned(&self, position: Position) -> usize {
        match self.mapping.get_interval_at_position(position, false) {
            Some(interval) => {
                if interval.position_range.start.line == position.line
                    && interval.position_range.start.character <= position.character
                {
                    interval.offset_interval.start
                        + (position.character - interval.position_range.start.character) as usize
                } else {
                    interval.offset_interval.start
                }
            }
            None => self.cleaned_source().len(),
        }
    }
}

impl CleanableDocument for PlainTextDocument {
    fn compute_cleaned(&self) -> String {
        self.mapping.values().concat()
    }

    fn cleaned_cache(&self) -> &RefCell<Option<String>> {
        &self.cleaned_cache
    }
}

/// Walk the source line by line. Each line becomes one real `TextNode`; the
/// newline run between two lines becomes either a single synthetic space
/// (one `\n`) or a synthetic multi-newline node (two or more), exactly
/// mirroring the content/boundary split the tree-sitter formats use.
fn split_into_nodes(source: &str) -> Vec<TextNode> {
    let bytes = source.as_bytes();
    let len = bytes.len();
    let mut nodes = Vec::new();

    let mut i = 0usize;
    let mut row = 0u32;
    let mut col = 0u32;
    let mut line_start_byte = 0usize;
    let mut line_start_point = Point { row: 0, column: 0 };

    loop {
        if i == len || bytes[i] == b'\n' {
            if i > line_start_byte {
                let text = &source[line_start_byte..i];
                nodes.push(TextNode::real(text.to_string(), line_start_point, Point { row, column: col }));
            }
            if i == len {
                break;
            }

            let run_start_point = Point { row, column: col };
            let mut run_len = 0usize;
            while i < len && bytes[i] == b'\n' {
                run_len += 1;
                row += 1;
                col = 0;
                i += 1;
            }
            if run_len == 1 {
                nodes.push(TextNode::space(run_start_point));
            } else {
                nodes.push(TextNode::newlines(run_len, run_start_point));
            }
            line_start_byte = i;
            line_start_point = Point { row, column: col };
        } else {
            col += 1;
            i += 1;
        }
    }

    let ends_in_newline = nodes.last().map(|n| n.text.ends_with('\n')).unwrap_or(false);
    if !ends_in_newline {
        let at = nodes.last().map(|n| n.end_point).unwrap_or(Point { row: 0, column: 0 });
        nodes.push(TextNode::newlines(1, at));
    }

    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_newlines_become_spaces() {
        let doc = PlainTextDocument::new("first line\nsecond line\n".to_string());
        assert_eq!(&*doc.cleaned_source(), "first line second line\n");
    }

    #[test]
    fn blank_line_runs_are_preserved() {
        let doc = PlainTextDocument::new("first paragraph.\n\nsecond paragraph.\n".to_string());
        assert_eq!(&*doc.cleaned_source(), "first paragraph.\n\nsecond paragraph.\n");
    }

    #[test]
    fn missing_trailing_newline_is_added() {
        let doc = PlainTextDocument::new("no trailing newline".to_string());
        assert_eq!(&*doc.cleaned_source(), "no trailing newline\n");
    }

    #[test]
    fn incremental_edit_rebuilds_mapping() {
        let mut doc = PlainTextDocument::new("hello world\n".to_string());
        let range = Range {
            start: Position { line: 0, character: 5 },
            end: Position { line: 0, character: 5 },
        };
        doc.apply_incremental_change(range, " there").unwrap();
        assert_eq!(&*doc.cleaned_source(), "hello there world\n");
    }
}
