//! Document model: per-format cleaning (§4.4) behind one dynamic type,
//! plus the store that keeps one open document per URI.

pub mod base;
pub mod clean_walk;
pub mod cleanable;
pub mod grammar;
pub mod interval;
pub mod latex;
pub mod markdown;
pub mod org;
pub mod plain;
pub mod position;
pub mod text_node;
pub mod tree_sitter;

pub use base::BaseDocument;
pub use cleanable::CleanableDocument;
pub use grammar::{GrammarLanguage, GrammarProvider, StaticGrammarProvider};
pub use interval::{Interval, OffsetPositionInterval, OffsetPositionIntervalList};
pub use latex::LatexCleaner;
pub use markdown::MarkdownCleaner;
pub use org::OrgCleaner;
pub use plain::PlainTextDocument;
pub use text_node::{TextNode, TextNodeKind};
pub use tree_sitter::{FormatCleaner, TreeSitterDocument};

use std::collections::{HashMap, HashSet};

use lsp_types::{Position, TextDocumentContentChangeEvent, Url};

use crate::error::DocumentError;

/// The four document kinds dispatched by `languageId`. A grammar build
/// failure at open time downgrades Latex/Markdown/Org to `Plain` rather
/// than failing the open (§7, "grammar build failure").
pub enum AnyDocument {
    Plain(PlainTextDocument),
    Latex(TreeSitterDocument<LatexCleaner>),
    Markdown(TreeSitterDocument<MarkdownCleaner>),
    Org(TreeSitterDocument<OrgCleaner>),
}

impl AnyDocument {
    pub fn open(
        language_id: &str,
        text: String,
        provider: &dyn GrammarProvider,
        todo_keywords: &HashSet<String>,
    ) -> Self {
        match GrammarLanguage::from_language_id(language_id) {
            Some(GrammarLanguage::Latex) => {
                match TreeSitterDocument::<LatexCleaner>::new(text.clone(), provider) {
                    Ok(doc) => AnyDocument::Latex(doc),
                    Err(err) => {
                        tracing::warn!(%err, "latex grammar unavailable, downgrading to plain text");
                        AnyDocument::Plain(PlainTextDocument::new(text))
                    }
                }
            }
            Some(GrammarLanguage::Markdown) => {
                match TreeSitterDocument::<MarkdownCleaner>::new(text.clone(), provider) {
                    Ok(doc) => AnyDocument::Markdown(doc),
                    Err(err) => {
                        tracing::warn!(%err, "markdown grammar unavailable, downgrading to plain text");
                        AnyDocument::Plain(PlainTextDocument::new(text))
                    }
                }
            }
            Some(GrammarLanguage::Org) => {
                let cleaner = OrgCleaner { todo_keywords: todo_keywords.clone() };
                match TreeSitterDocument::with_cleaner(text.clone(), provider, cleaner) {
                    Ok(doc) => AnyDocument::Org(doc),
                    Err(err) => {
                        tracing::warn!(%err, "org grammar unavailable, downgrading to plain text");
                        AnyDocument::Plain(PlainTextDocument::new(text))
                    }
                }
            }
            None => AnyDocument::Plain(PlainTextDocument::new(text)),
        }
    }

    pub fn base(&self) -> &BaseDocument {
        match self {
            AnyDocument::Plain(d) => d.base(),
            AnyDocument::Latex(d) => d.base(),
            AnyDocument::Markdown(d) => d.base(),
            AnyDocument::Org(d) => d.base(),
        }
    }

    pub fn cleaned_source(&self) -> String {
        match self {
            AnyDocument::Plain(d) => d.cleaned_source().to_string(),
            AnyDocument::Latex(d) => d.cleaned_source().to_string(),
            AnyDocument::Markdown(d) => d.cleaned_source().to_string(),
            AnyDocument::Org(d) => d.cleaned_source().to_string(),
        }
    }

    /// Dispatch an LSP content-change event: incremental when it carries a
    /// `range`, full-document replacement otherwise.
    pub fn apply_change(&mut self, change: &TextDocumentContentChangeEvent) -> Result<(), DocumentError> {
        match (change.range, self) {
            (Some(range), AnyDocument::Plain(d)) => d.apply_incremental_change(range, &change.text),
            (Some(range), AnyDocument::Latex(d)) => d.apply_incremental_change(range, &change.text),
            (Some(range), AnyDocument::Markdown(d)) => d.apply_incremental_change(range, &change.text),
            (Some(range), AnyDocument::Org(d)) => d.apply_incremental_change(range, &change.text),
            (None, AnyDocument::Plain(d)) => d.apply_full_change(change.text.clone()),
            (None, AnyDocument::Latex(d)) => d.apply_full_change(change.text.clone()),
            (None, AnyDocument::Markdown(d)) => d.apply_full_change(change.text.clone()),
            (None, AnyDocument::Org(d)) => d.apply_full_change(change.text.clone()),
        }
    }

    pub fn position_at_cleaned_offset(&self, offset: usize) -> Position {
        match self {
            AnyDocument::Plain(d) => d.position_at_offset_cleaned(offset),
            AnyDocument::Latex(d) => d.position_at_offset_cleaned(offset),
            AnyDocument::Markdown(d) => d.position_at_offset_cleaned(offset),
            AnyDocument::Org(d) => d.position_at_offset_cleaned(offset),
        }
    }

    pub fn offset_at_cleaned_position(&self, position: Position) -> usize {
        match self {
            AnyDocument::Plain(d) => d.offset_at_position_cleaned(position),
            AnyDocument::Latex(d) => d.offset_at_position_cleaned(position),
            AnyDocument::Markdown(d) => d.offset_at_position_cleaned(position),
            AnyDocument::Org(d) => d.offset_at_position_cleaned(position),
        }
    }
}

/// One open document per URI, the server's single source of truth for
/// `textDocument/*` notifications.
pub struct DocumentStore {
    documents: HashMap<Url, AnyDocument>,
    provider: Box<dyn GrammarProvider + Send + Sync>,
}

impl DocumentStore {
    pub fn new(provider: Box<dyn GrammarProvider + Send + Sync>) -> Self {
        DocumentStore { documents: HashMap::new(), provider }
    }

    pub fn open(&mut self, uri: Url, language_id: &str, text: String, todo_keywords: &HashSet<String>) {
        let doc = AnyDocument::open(language_id, text, self.provider.as_ref(), todo_keywords);
        self.documents.insert(uri, doc);
    }

    pub fn close(&mut self, uri: &Url) {
        self.documents.remove(uri);
    }

    pub fn get(&self, uri: &Url) -> Option<&AnyDocument> {
        self.documents.get(uri)
    }

    pub fn get_mut(&mut self, uri: &Url) -> Option<&mut AnyDocument> {
        self.documents.get_mut(uri)
    }

    pub fn contains(&self, uri: &Url) -> bool {
        self.documents.contains_key(uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_language_id_falls_back_to_plain_text() {
        let provider = StaticGrammarProvider;
        let doc = AnyDocument::open("python", "hello\nworld\n".to_string(), &provider, &HashSet::new());
        assert!(matches!(doc, AnyDocument::Plain(_)));
        assert_eq!(doc.cleaned_source(), "hello world\n");
    }

    #[test]
    fn store_tracks_open_and_close() {
        let mut store = DocumentStore::new(Box::new(StaticGrammarProvider));
        let uri = Url::parse("file:///tmp/a.txt").unwrap();
        store.open(uri.clone(), "text", "hello\n".to_string(), &HashSet::new());
        assert!(store.contains(&uri));
        store.close(&uri);
        assert!(!store.contains(&uri));
    }
}
