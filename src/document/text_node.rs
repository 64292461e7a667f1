//! The unit of the cleaned stream emitted while walking a parse tree.

use tree_sitter::Point;

/// A single emitted piece of cleaned text and the source span it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNode {
    pub text: String,
    pub start_point: Point,
    pub end_point: Point,
    pub kind: TextNodeKind,
}

/// The three shapes a [`TextNode`] can take. Only `Real` nodes copy source
/// text; `Space` and `Newline` are synthetic and zero-width in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextNodeKind {
    Real,
    Space,
    Newline,
}

impl TextNode {
    pub fn real(text: String, start_point: Point, end_point: Point) -> Self {
        TextNode { text, start_point, end_point, kind: TextNodeKind::Real }
    }

    /// Single synthetic space, zero-width, placed just past `at`.
    pub fn space(at: Point) -> Self {
        TextNode {
            text: " ".to_string(),
            start_point: at,
            end_point: at,
            kind: TextNodeKind::Space,
        }
    }

    /// `count` synthetic newlines, zero-width, placed just past `at`.
    pub fn newlines(count: usize, at: Point) -> Self {
        TextNode {
            text: "\n".repeat(count),
            start_point: at,
            end_point: at,
            kind: TextNodeKind::Newline,
        }
    }
}
