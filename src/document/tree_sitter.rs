//! The heart of the system: parses source with a per-format grammar,
//! produces the cleaned `TextNode` stream, and keeps an
//! `OffsetPositionIntervalList` mapping in sync with incremental edits.

use std::cell::RefCell;

use lsp_types::{Position, Range};
use tree_sitter::{InputEdit, Node, Parser, Tree};

use crate::error::DocumentError;

use super::base::BaseDocument;
use super::cleanable::CleanableDocument;
use super::grammar::{GrammarLanguage, GrammarProvider};
use super::interval::OffsetPositionIntervalList;
use super::position::byte_to_point;
use super::text_node::TextNode;

/// Per-format cleaning rules. Each prose format (LaTeX, Markdown, Org)
/// implements this to select its grammar and its node-walking strategy.
/// `clean_node` must be safe to call on any subtree, not just the document
/// root, so the incremental updater can re-clean a single paragraph;
/// `is_document_root` tells it whether to also emit the end-of-document
/// terminating newline (§4.4.1 rule 3).
pub trait FormatCleaner {
    fn grammar_language(&self) -> GrammarLanguage;
    fn clean_node(&self, node: Node, source: &str, is_document_root: bool) -> Vec<TextNode>;
}

pub struct TreeSitterDocument<F: FormatCleaner> {
    base: BaseDocument,
    tree: Tree,
    parser: Parser,
    mapping: OffsetPositionIntervalList,
    cleaned_cache: RefCell<Option<String>>,
    cleaner: F,
}

impl<F: FormatCleaner + Default> TreeSitterDocument<F> {
    pub fn new(source: String, provider: &dyn GrammarProvider) -> Result<Self, DocumentError> {
        Self::with_cleaner(source, provider, F::default())
    }
}

impl<F: FormatCleaner> TreeSitterDocument<F> {
    pub fn with_cleaner(source: String, provider: &dyn GrammarProvider, cleaner: F) -> Result<Self, DocumentError> {
        let language = provider.load(cleaner.grammar_language())?;
        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .map_err(|_| DocumentError::GrammarUnavailable(format!("{:?}", cleaner.grammar_language())))?;
        let tree = parser
            .parse(source.as_bytes(), None)
            .ok_or(DocumentError::ParseMismatch)?;

        let mut doc = TreeSitterDocument {
            base: BaseDocument::new(source),
            tree,
            parser,
            mapping: OffsetPositionIntervalList::new(),
            cleaned_cache: RefCell::new(None),
            cleaner,
        };
        doc.rebuild_mapping_full();
        Ok(doc)
    }

    pub fn base(&self) -> &BaseDocument {
        &self.base
    }

    pub fn mapping(&self) -> &OffsetPositionIntervalList {
        &self.mapping
    }

    fn rebuild_mapping_full(&mut self) {
        let nodes = self.cleaner.clean_node(self.tree.root_node(), &self.base.source, true);
        self.mapping = mapping_from_nodes(&nodes, 0);
        self.invalidate_cleaned();
    }

    /// Full-document replacement (LSP content-change type 2). Reparses from
    /// scratch and re-cleans everything.
    pub fn apply_full_change(&mut self, new_source: String) -> Result<(), DocumentError> {
        self.base.set_source(new_source);
        self.tree = self
            .parser
            .parse(self.base.source.as_bytes(), None)
            .ok_or(DocumentError::ParseMismatch)?;
        self.rebuild_mapping_full();
        Ok(())
    }

    /// Incremental edit per §4.4.2: edit the tree, reparse with the old tree
    /// as reuse hint, then rebuild the mapping only over the affected
    /// paragraph-aligned span.
    pub fn apply_incremental_change(&mut self, range: Range, new_text: &str) -> Result<(), DocumentError> {
        let start_byte = self.base.offset_at_position(range.start);
        let old_end_byte = self.base.offset_at_position(range.end);
        let start_point = byte_to_point(&self.base.source, start_byte);
        let old_end_point = byte_to_point(&self.base.source, old_end_byte);

        let mut new_source = self.base.source.clone();
        new_source.replace_range(start_byte..old_end_byte, new_text);
        let new_end_byte = start_byte + new_text.len();
        let new_end_point = byte_to_point(&new_source, new_end_byte);

        let edit = InputEdit {
            start_byte,
            old_end_byte,
            new_end_byte,
            start_position: start_point,
            old_end_position: old_end_point,
            new_end_position: new_end_point,
        };
        self.tree.edit(&edit);
        self.base.set_source(new_source);

        let new_tree = self
            .parser
            .parse(self.base.source.as_bytes(), Some(&self.tree))
            .ok_or(DocumentError::ParseMismatch)?;
        self.tree = new_tree;

        self.rebuild_mapping_incremental(start_point, old_end_point, new_end_point, new_text.len());
        self.invalidate_cleaned();
        Ok(())
    }

    fn rebuild_mapping_incremental(
        &mut self,
        start_point: tree_sitter::Point,
        old_end_point: tree_sitter::Point,
        new_end_point: tree_sitter::Point,
        text_bytes: usize,
    ) {
        let start_pos = Position { line: start_point.row as u32, character: start_point.column as u32 };
        let old_end_pos = Position { line: old_end_point.row as u32, character: old_end_point.column as u32 };

        // Paragraph-aligned affected span in the (already edited) new source,
        // per Design Note (b): unify top-of-file / past-end-of-tree / empty
        // subtree branches into one clamped range.
        let edit_start_byte = self.base.offset_at_position(start_pos);
        let edit_end_byte = self.base.offset_at_position(Position {
            line: new_end_point.row as u32,
            character: new_end_point.column as u32,
        });
        let left = self.base.paragraph_at_offset(edit_start_byte, 0);
        let right = self.base.paragraph_at_offset(edit_end_byte.max(left.start), 0);
        let clean_start = left.start;
        let clean_end = (right.start + right.length).max(left.start + left.length).min(self.base.source.len());

        let root = self.tree.root_node();
        let node = root
            .descendant_for_byte_range(clean_start, clean_end)
            .unwrap_or(root);
        let is_root = node.id() == root.id();
        let fresh_nodes = self.cleaner.clean_node(node, &self.base.source, is_root);

        let mut spliced = OffsetPositionIntervalList::new();
        let mut offset = 0usize;

        // Keep every old interval that ends strictly before the edit start.
        let mut after_start_idx = 0;
        for idx in 0..self.mapping.len() {
            let interval = self.mapping.get_interval(idx).expect("idx in range");
            if (interval.position_range.end.line, interval.position_range.end.character)
                >= (start_pos.line, start_pos.character)
            {
                after_start_idx = idx;
                break;
            }
            offset += interval.value.len();
            spliced.add_interval(interval);
            after_start_idx = idx + 1;
        }

        // Splice in the freshly cleaned nodes, skipping a duplicate leading
        // blank-newline node if the kept prefix already ends on one.
        let prefix_ends_blank = spliced
            .get_interval(spliced.len().wrapping_sub(1))
            .map(|iv| iv.value.chars().all(|c| c == '\n') && !iv.value.is_empty())
            .unwrap_or(false);

        for (i, node) in fresh_nodes.iter().enumerate() {
            if i == 0 && prefix_ends_blank && node.text.chars().all(|c| c == '\n') {
                continue;
            }
            spliced.add_interval_values(
                offset,
                offset + node.text.len(),
                node.start_point.row as u32,
                node.start_point.column as u32,
                node.end_point.row as u32,
                node.end_point.column as u32,
                node.text.clone(),
            );
            offset += node.text.len();
        }

        // Find the first old interval that starts at or past the old edit
        // end; everything from there on gets shifted and appended.
        let delta_row = new_end_point.row as i64 - old_end_point.row as i64;
        let delta_col = text_bytes as i64 - (old_end_point.column as i64 - start_point.column as i64);

        let mut tail_start_idx = self.mapping.len();
        for idx in after_start_idx..self.mapping.len() {
            let interval = self.mapping.get_interval(idx).expect("idx in range");
            if (interval.position_range.start.line, interval.position_range.start.character)
                >= (old_end_pos.line, old_end_pos.character)
            {
                tail_start_idx = idx;
                break;
            }
        }

        for idx in tail_start_idx..self.mapping.len() {
            let interval = self.mapping.get_interval(idx).expect("idx in range");
            let on_edit_row = interval.position_range.start.line == old_end_pos.line;

            let shift_col = |c: u32| -> u32 {
                if on_edit_row {
                    (c as i64 + delta_col).max(0) as u32
                } else {
                    c
                }
            };

            let start_line = (interval.position_range.start.line as i64 + delta_row).max(0) as u32;
            let end_line = (interval.position_range.end.line as i64 + delta_row).max(0) as u32;
            let start_char = shift_col(interval.position_range.start.character);
            let end_char = if interval.position_range.end.line == interval.position_range.start.line {
                shift_col(interval.position_range.end.character)
            } else {
                interval.position_range.end.character
            };

            spliced.add_interval_values(
                offset,
                offset + interval.value.len(),
                start_line,
                start_char,
                end_line,
                end_char,
                interval.value,
            );
            offset += interval.value.len();
        }

        self.mapping = spliced;
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

    pub fn range_at_offset_cleaned(&self, offset: usize, length: usize) -> Range {
        let start = self.position_at_offset_cleaned(offset);
        if length == 0 {
            return Range { start, end: start };
        }
        let end = self.position_at_offset_cleaned(offset + length);
        Range { start, end }
    }
}

impl<F: FormatCleaner> CleanableDocument for TreeSitterDocument<F> {
    fn compute_cleaned(&self) -> String {
        self.mapping.values().concat()
    }

    fn cleaned_cache(&self) -> &RefCell<Option<String>> {
        &self.cleaned_cache
    }
}

pub(crate) fn mapping_from_nodes(nodes: &[TextNode], start_offset: usize) -> OffsetPositionIntervalList {
    let mut list = OffsetPositionIntervalList::new();
    let mut offset = start_offset;
    for node in nodes {
        list.add_interval_values(
            offset,
            offset + node.text.len(),
            node.start_point.row as u32,
            node.start_point.column as u32,
            node.end_point.row as u32,
            node.end_point.column as u32,
            node.text.clone(),
        );
        offset += node.text.len();
    }
    list
}

#[cfg(test)]
pub(crate) fn test_mapping_from_nodes(nodes: &[TextNode]) -> OffsetPositionIntervalList {
    mapping_from_nodes(nodes, 0)
}
