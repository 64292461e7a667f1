//! Opaque collaborator for obtaining tree-sitter grammars. Per the design
//! notes, grammar acquisition (cloning and compiling a grammar repo) is out
//! of scope for the core; this crate links the three prose grammars
//! statically and never performs network I/O.

use tree_sitter::Language;

use crate::error::DocumentError;

/// The document languages this crate understands at the tree-sitter level.
/// Plain text has no grammar and is handled entirely by `PlainTextDocument`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrammarLanguage {
    Latex,
    Markdown,
    Org,
}

impl GrammarLanguage {
    /// Map an LSP `languageId` to a grammar, per the language-id table:
    /// `tex`/`latex` -> LaTeX, `md`/`markdown` -> Markdown, `org` -> Org.
    /// Anything else (including `text`) has no grammar.
    pub fn from_language_id(language_id: &str) -> Option<Self> {
        match language_id {
            "tex" | "latex" => Some(GrammarLanguage::Latex),
            "md" | "markdown" => Some(GrammarLanguage::Markdown),
            "org" => Some(GrammarLanguage::Org),
            _ => None,
        }
    }
}

/// Loads a statically-linked grammar. The trait exists so the document
/// layer depends on an interface, not directly on the grammar crates; a
/// future build-on-demand provider can implement it without touching
/// `TreeSitterDocument`.
pub trait GrammarProvider {
    fn load(&self, language: GrammarLanguage) -> Result<Language, DocumentError>;
}

/// The only provider this crate ships: grammars compiled in at build time.
pub struct StaticGrammarProvider;

impl GrammarProvider for StaticGrammarProvider {
    fn load(&self, language: GrammarLanguage) -> Result<Language, DocumentError> {
        let lang = match language {
            GrammarLanguage::Latex => tree_sitter_latex::LANGUAGE.into(),
            GrammarLanguage::Markdown => tree_sitter_md::LANGUAGE.into(),
            GrammarLanguage::Org => tree_sitter_org::LANGUAGE.into(),
        };
        Ok(lang)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_id_mapping() {
        assert_eq!(GrammarLanguage::from_language_id("tex"), Some(GrammarLanguage::Latex));
        assert_eq!(GrammarLanguage::from_language_id("md"), Some(GrammarLanguage::Markdown));
        assert_eq!(GrammarLanguage::from_language_id("org"), Some(GrammarLanguage::Org));
        assert_eq!(GrammarLanguage::from_language_id("text"), None);
        assert_eq!(GrammarLanguage::from_language_id("python"), None);
    }

    #[test]
    fn static_provider_loads_all_grammars() {
        let provider = StaticGrammarProvider;
        assert!(provider.load(GrammarLanguage::Latex).is_ok());
        assert!(provider.load(GrammarLanguage::Markdown).is_ok());
        assert!(provider.load(GrammarLanguage::Org).is_ok());
    }
}
