//! Shared UTF-16-column <-> UTF-8-byte conversion helpers. LSP positions
//! count UTF-16 code units; source is UTF-8. Every position arithmetic
//! method in this crate funnels through here rather than re-deriving it.

use line_index::{LineCol, LineIndex, WideEncoding, WideLineCol};
use lsp_types::Position;
use tree_sitter::Point;

#[inline]
pub fn to_lsp_position(index: &LineIndex, offset: usize) -> Position {
    let offset = line_index::TextSize::new(offset.min(u32::MAX as usize) as u32);
    let line_col = index.line_col(offset);
    let wide = index
        .to_wide(WideEncoding::Utf16, line_col)
        .unwrap_or(WideLineCol { line: line_col.line, col: line_col.col });
    Position { line: wide.line, character: wide.col }
}

#[inline]
pub fn from_lsp_position(index: &LineIndex, pos: Position) -> usize {
    let wide = WideLineCol { line: pos.line, col: pos.character };
    let line_col = index.to_utf8(WideEncoding::Utf16, wide).unwrap_or(LineCol { line: wide.line, col: wide.col });
    let offset = index.offset(line_col).unwrap_or(index.len());
    offset.into()
}

/// Convert a byte offset into a tree-sitter `Point` against `source`.
/// Walks lines once; acceptable because it's only used at edit boundaries,
/// never per-character.
pub fn byte_to_point(source: &str, byte: usize) -> Point {
    let byte = byte.min(source.len());
    let mut row = 0usize;
    let mut last_newline = None;
    for (i, b) in source.as_bytes()[..byte].iter().enumerate() {
        if *b == b'\n' {
            row += 1;
            last_newline = Some(i);
        }
    }
    let column = match last_newline {
        Some(nl) => byte - nl - 1,
        None => byte,
    };
    Point { row, column }
}

pub fn point_to_lsp_position(point: Point) -> Position {
    Position { line: point.row as u32, character: point.column as u32 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_roundtrip_single_line() {
        assert_eq!(byte_to_point("hello", 3), Point { row: 0, column: 3 });
    }

    #[test]
    fn point_roundtrip_after_newline() {
        let p = byte_to_point("ab\ncd", 4);
        assert_eq!(p, Point { row: 1, column: 1 });
    }

    #[test]
    fn lsp_position_roundtrip() {
        let index = LineIndex::new("hello\nworld\n");
        let pos = Position { line: 1, character: 3 };
        let offset = from_lsp_position(&index, pos);
        assert_eq!(offset, 9);
        assert_eq!(to_lsp_position(&index, offset), pos);
    }

    #[test]
    fn utf16_surrogate_pair_offset() {
        let index = LineIndex::new("a\u{1F600}b");
        let offset = from_lsp_position(&index, Position { line: 0, character: 3 });
        assert_eq!(offset, 5);
    }
}
