//! Shared bookkeeping for the three-rule cleaning algorithm (§4.4.1), used
//! by every `FormatCleaner`. A "content" node is emitted immediately,
//! preceded by a synthetic space when adjacent on the same source line, or
//! by any queued newlines left over from a "boundary" node. Boundary
//! newlines are deferred rather than emitted eagerly: a boundary with no
//! following content node (e.g. the very last table cell) never
//! materializes its blank line, leaving rule 3's single terminator as the
//! only trailing newline.

use tree_sitter::Point;

use super::text_node::TextNode;

pub struct CleanWalk<'a> {
    source: &'a str,
    out: Vec<TextNode>,
    last_real_end_byte: Option<usize>,
    pending_newlines: Option<usize>,
}

impl<'a> CleanWalk<'a> {
    pub fn new(source: &'a str) -> Self {
        CleanWalk { source, out: Vec::new(), last_real_end_byte: None, pending_newlines: None }
    }

    /// Emit a content node's text, materializing any queued boundary
    /// newlines first, or a single synthetic space for same-line adjacency.
    pub fn push_content(&mut self, text: String, start: Point, end: Point, start_byte: usize, end_byte: usize) {
        if let Some(n) = self.pending_newlines.take() {
            let at = self.out.last().map(|l| l.end_point).unwrap_or(start);
            self.out.push(TextNode::newlines(n, at));
        } else if let Some(last) = self.out.last().cloned() {
            let needs_space = if last.end_point.row == start.row {
                match self.last_real_end_byte {
                    Some(last_byte) => self.source.as_bytes()[last_byte..start_byte].contains(&b' '),
                    None => false,
                }
            } else {
                last.text != "\n"
            };
            if needs_space {
                self.out.push(TextNode::space(last.end_point));
            }
        }

        self.out.push(TextNode::real(text, start, end));
        self.last_real_end_byte = Some(end_byte);
    }

    /// Queue a boundary's newline count; a second boundary before any
    /// content node widens the gap to the larger request rather than
    /// stacking them.
    pub fn queue_boundary(&mut self, count: usize) {
        self.pending_newlines = Some(self.pending_newlines.map_or(count, |c| c.max(count)));
    }

    /// Rule 3: always end with exactly one terminating newline, dropping
    /// any still-pending boundary marker. Only valid when cleaning the
    /// whole document, not a re-cleaned subtree.
    pub fn finish_document(mut self) -> Vec<TextNode> {
        let ends_in_newline = self.out.last().map(|n| n.text.ends_with('\n')).unwrap_or(false);
        if !ends_in_newline {
            let at = self.out.last().map(|n| n.end_point).unwrap_or(Point { row: 0, column: 0 });
            self.out.push(TextNode::newlines(1, at));
        }
        self.out
    }

    /// No rule-3 terminator: used when re-cleaning a single paragraph-aligned
    /// subtree for the incremental updater, where a dangling boundary marker
    /// correctly carries forward into the next unaffected old interval.
    pub fn finish_subtree(self) -> Vec<TextNode> {
        self.out
    }
}
