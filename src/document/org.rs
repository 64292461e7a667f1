//! Org-mode cleaning (§4.4.1.3): flat capture over `headline` and
//! `paragraph` nodes, single newline after each (`NEWLINE_AFTER_ONE`).
//! Headline titles have their stars, configured TODO keyword, and trailing
//! tag list stripped before emission (S3).

use std::collections::HashSet;

use regex::Regex;
use tree_sitter::{Node, Point};

use super::clean_walk::CleanWalk;
use super::grammar::GrammarLanguage;
use super::text_node::TextNode;
use super::tree_sitter::FormatCleaner;

const NEWLINE_AFTER_ONE: &[&str] = &["paragraph", "headline", "section"];

/// Org needs per-document configuration (the TODO keyword vocabulary), so it
/// can't be a zero-sized `FormatCleaner` like the other two formats; it
/// carries the configured set and is constructed per document instead.
pub struct OrgCleaner {
    pub todo_keywords: HashSet<String>,
}

impl Default for OrgCleaner {
    fn default() -> Self {
        OrgCleaner { todo_keywords: ["TODO", "DONE"].iter().map(|s| s.to_string()).collect() }
    }
}

impl OrgCleaner {
    pub fn clean(&self, node: Node, source: &str, is_document_root: bool) -> Vec<TextNode> {
        let mut walk = CleanWalk::new(source);
        self.visit(node, source, &mut walk);
        if is_document_root {
            walk.finish_document()
        } else {
            walk.finish_subtree()
        }
    }

    fn visit(&self, node: Node, source: &str, walk: &mut CleanWalk) {
        let kind = node.kind();
        if kind == "headline" {
            self.emit_headline(node, source, walk);
            walk.queue_boundary(1);
            return;
        }
        if kind == "paragraph" {
            let text = node.utf8_text(source.as_bytes()).unwrap_or_default().trim_end();
            if !text.is_empty() {
                walk.push_content(
                    text.to_string(),
                    node.start_position(),
                    node.end_position(),
                    node.start_byte(),
                    node.start_byte() + text.len(),
                );
            }
            walk.queue_boundary(1);
            return;
        }
        if NEWLINE_AFTER_ONE.contains(&kind) {
            walk.queue_boundary(1);
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child, source, walk);
        }
    }

    fn emit_headline(&self, node: Node, source: &str, walk: &mut CleanWalk) {
        let raw = match node.utf8_text(source.as_bytes()) {
            Ok(t) => t,
            Err(_) => return,
        };
        let title = strip_headline_decoration(raw, &self.todo_keywords);
        if title.is_empty() {
            return;
        }
        let rel = raw.find(title.as_str()).unwrap_or(0);
        let start = Point { row: node.start_position().row, column: node.start_position().column + rel };
        let end = Point { row: start.row, column: start.column + title.len() };
        let start_byte = node.start_byte() + rel;
        let end_byte = start_byte + title.len();
        walk.push_content(title, start, end, start_byte, end_byte);
    }
}

/// Strip `**` stars, a leading configured TODO keyword, and a trailing
/// `:TAG:TAG2:` tag list.
fn strip_headline_decoration(raw: &str, todo_keywords: &HashSet<String>) -> String {
    let after_stars = raw.trim_start_matches('*').trim_start();

    let mut rest = after_stars;
    if let Some(space_idx) = rest.find(char::is_whitespace) {
        let (first_word, remainder) = rest.split_at(space_idx);
        if todo_keywords.contains(first_word) {
            rest = remainder.trim_start();
        }
    }

    let tag_re = Regex::new(r"\s+:[A-Za-z0-9_@#%:]+:\s*$").unwrap();
    tag_re.replace(rest, "").trim().to_string()
}

impl FormatCleaner for OrgCleaner {
    fn grammar_language(&self) -> GrammarLanguage {
        GrammarLanguage::Org
    }

    fn clean_node(&self, node: Node, source: &str, is_document_root: bool) -> Vec<TextNode> {
        self.clean(node, source, is_document_root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::cleanable::CleanableDocument;
    use crate::document::grammar::StaticGrammarProvider;
    use crate::document::tree_sitter::TreeSitterDocument;

    #[test]
    fn s3_todo_keyword_and_tags_are_stripped() {
        let source = "** DONE Task 1                            :TAG:\n  - Level 1 list:\n    - Level 2 list 1\n".to_string();
        let provider = StaticGrammarProvider;
        let doc = TreeSitterDocument::<OrgCleaner>::new(source, &provider).expect("parses");
        assert!(doc.cleaned_source().starts_with("Task 1\nLevel 1 list:\nLevel 2 list 1\n"));
    }

    #[test]
    fn strip_headline_decoration_handles_no_todo_keyword() {
        let keywords: HashSet<String> = ["TODO", "DONE"].iter().map(|s| s.to_string()).collect();
        assert_eq!(strip_headline_decoration("* Just a title", &keywords), "Just a title");
    }
}
