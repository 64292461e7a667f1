//! LaTeX cleaning (§4.4.1.1): a recursive cursor walk rather than a flat
//! query, because newline placement depends on a node's *ancestry*
//! (`curly_group` under a `section`/`subsection`/`paragraph` gets blank
//! lines around it; the same `curly_group` under, say, `\textbf` does not).

use tree_sitter::Node;

use super::clean_walk::CleanWalk;
use super::grammar::GrammarLanguage;
use super::text_node::TextNode;
use super::tree_sitter::FormatCleaner;

const TEXT_ROOTS: &[&str] =
    &["section", "subsection", "paragraph", "curly_group", "enum_item", "generic_environment"];
const NEWLINE_BEFORE_AFTER_CURLY_PARENT: &[&str] = &["section", "subsection", "paragraph"];
const NEWLINE_BEFORE_AFTER: &[&str] = &["enum_item"];

#[derive(Default)]
pub struct LatexCleaner;

impl FormatCleaner for LatexCleaner {
    fn grammar_language(&self) -> GrammarLanguage {
        GrammarLanguage::Latex
    }

    fn clean_node(&self, node: Node, source: &str, is_document_root: bool) -> Vec<TextNode> {
        let mut walk = CleanWalk::new(source);
        visit(node, source, &mut walk);
        if is_document_root {
            walk.finish_document()
        } else {
            walk.finish_subtree()
        }
    }
}

fn visit(node: Node, source: &str, walk: &mut CleanWalk) {
    let boundary = boundary_newline_count(node);
    if let Some(count) = boundary {
        walk.queue_boundary(count);
    }

    if node.kind() == "word" && is_valid_word_context(node) {
        let (text, end_byte) = absorb_trailing_punctuation(source, node);
        let absorbed = end_byte - node.end_byte();
        let mut end_point = node.end_position();
        end_point.column += absorbed;
        walk.push_content(text, node.start_position(), end_point, node.start_byte(), end_byte);
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        visit(child, source, walk);
    }

    if let Some(count) = boundary {
        walk.queue_boundary(count);
    }
}

/// `curly_group` wraps in blank lines only when its direct parent is a
/// section-like node; `enum_item` always does.
fn boundary_newline_count(node: Node) -> Option<usize> {
    let kind = node.kind();
    if kind == "curly_group" {
        let wraps = node
            .parent()
            .map(|p| NEWLINE_BEFORE_AFTER_CURLY_PARENT.contains(&p.kind()))
            .unwrap_or(false);
        return wraps.then_some(2);
    }
    NEWLINE_BEFORE_AFTER.contains(&kind).then_some(2)
}

fn is_valid_word_context(node: Node) -> bool {
    let parent = match node.parent() {
        Some(p) => p,
        None => return false,
    };
    if parent.kind() != "text" {
        return false;
    }
    let pparent = match parent.parent() {
        Some(p) => p,
        None => return false,
    };
    TEXT_ROOTS.contains(&pparent.kind())
}

/// LaTeX's tree-sitter grammar mis-tokenizes `,` and `-` as separate leaves;
/// absorb a trailing run of them into the word that precedes them so they
/// survive cleaning instead of being silently dropped.
fn absorb_trailing_punctuation(source: &str, node: Node) -> (String, usize) {
    let bytes = source.as_bytes();
    let mut end = node.end_byte();
    let mut text = node.utf8_text(bytes).unwrap_or_default().to_string();
    while end < bytes.len() && matches!(bytes[end], b',' | b'-') {
        text.push(bytes[end] as char);
        end += 1;
    }
    (text, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::cleanable::CleanableDocument;
    use crate::document::grammar::StaticGrammarProvider;
    use crate::document::tree_sitter::TreeSitterDocument;

    #[test]
    fn s1_section_and_bold_sentence() {
        let source = "\\section{Introduction}\n\nThis is a \\textbf{sentence}.\n".to_string();
        let provider = StaticGrammarProvider;
        let doc = TreeSitterDocument::<LatexCleaner>::new(source, &provider).expect("parses");
        assert_eq!(&*doc.cleaned_source(), "Introduction\n\nThis is a sentence.\n");
    }

    #[test]
    fn s4_incremental_insert_shifts_mapping() {
        let source = "\\section{Introduction}\n\nThis is a \\textbf{sentence}.\n".to_string();
        let provider = StaticGrammarProvider;
        let mut doc = TreeSitterDocument::<LatexCleaner>::new(source, &provider).expect("parses");

        let range = lsp_types::Range {
            start: lsp_types::Position { line: 2, character: 10 },
            end: lsp_types::Position { line: 2, character: 10 },
        };
        doc.apply_incremental_change(range, "good ").expect("edit applies");
        assert_eq!(&*doc.cleaned_source(), "Introduction\n\nThis is a good sentence.\n");
    }
}
