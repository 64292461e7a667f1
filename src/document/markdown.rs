//! Markdown cleaning (§4.4.1.2): a flat capture over `inline` nodes. Every
//! `inline` is both a content node and a boundary — each one is followed by
//! a blank line, which is what turns every table cell into its own
//! pseudo-paragraph. Table cells go further: they're split on whitespace so
//! each word becomes its own paragraph (S2).

use tree_sitter::{Node, Point};

use super::clean_walk::CleanWalk;
use super::grammar::GrammarLanguage;
use super::text_node::TextNode;
use super::tree_sitter::FormatCleaner;

#[derive(Default)]
pub struct MarkdownCleaner;

impl FormatCleaner for MarkdownCleaner {
    fn grammar_language(&self) -> GrammarLanguage {
        GrammarLanguage::Markdown
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
    if node.kind() == "inline" {
        if in_table_cell(node) {
            emit_table_cell_words(node, source, walk);
        } else {
            let text = node.utf8_text(source.as_bytes()).unwrap_or_default().to_string();
            walk.push_content(text, node.start_position(), node.end_position(), node.start_byte(), node.end_byte());
        }
        walk.queue_boundary(2);
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        visit(child, source, walk);
    }
}

fn in_table_cell(node: Node) -> bool {
    let mut current = node.parent();
    while let Some(p) = current {
        if p.kind().contains("table") {
            return true;
        }
        current = p.parent();
    }
    false
}

/// Pipe-table rows are single source lines, so token columns can be
/// computed relative to the cell's own start column.
fn emit_table_cell_words(node: Node, source: &str, walk: &mut CleanWalk) {
    let start_byte = node.start_byte();
    let start_point = node.start_position();
    let text = match node.utf8_text(source.as_bytes()) {
        Ok(t) => t,
        Err(_) => return,
    };

    let mut search_from = 0usize;
    for (i, token) in text.split_whitespace().enumerate() {
        let rel = match text[search_from..].find(token) {
            Some(r) => search_from + r,
            None => continue,
        };
        let token_start_byte = start_byte + rel;
        let token_end_byte = token_start_byte + token.len();
        let start = Point { row: start_point.row, column: start_point.column + rel };
        let end = Point { row: start_point.row, column: start_point.column + rel + token.len() };

        if i > 0 {
            walk.queue_boundary(2);
        }
        walk.push_content(token.to_string(), start, end, token_start_byte, token_end_byte);
        search_from = rel + token.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::cleanable::CleanableDocument;
    use crate::document::grammar::StaticGrammarProvider;
    use crate::document::tree_sitter::TreeSitterDocument;

    #[test]
    fn s2_table_cells_become_per_word_paragraphs() {
        let source = "| foo | bar |\n| --- | --- |\n| baz | bim |".to_string();
        let provider = StaticGrammarProvider;
        let doc = TreeSitterDocument::<MarkdownCleaner>::new(source, &provider).expect("parses");
        assert_eq!(&*doc.cleaned_source(), "foo\n\nbar\n\nbaz\n\nbim\n");
    }

    #[test]
    fn plain_paragraph_is_not_split_on_whitespace() {
        let source = "a plain paragraph with several words\n".to_string();
        let provider = StaticGrammarProvider;
        let doc = TreeSitterDocument::<MarkdownCleaner>::new(source, &provider).expect("parses");
        assert!(doc.cleaned_source().starts_with("a plain paragraph with several words"));
    }
}
