//! `workspace/didChangeConfiguration` settings (§10.4). Deserialized once per
//! notification from the raw `serde_json::Value` LSP hands us; documents
//! already open are unaffected until their next edit or analysis pass.

use std::collections::{HashMap, HashSet};

use lsp_types::DiagnosticSeverity;
use serde::Deserialize;

use crate::analyser::AnalyserSettings;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrgSettings {
    pub todo_keywords: HashSet<String>,
}

impl Default for OrgSettings {
    fn default() -> Self {
        OrgSettings { todo_keywords: ["TODO".to_string(), "DONE".to_string()].into_iter().collect() }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AnalyserConfig {
    pub enabled_language_ids: Option<HashSet<String>>,
    pub severity_overrides: HashMap<String, SeverityName>,
    pub default_severity: Option<SeverityName>,
}

impl AnalyserConfig {
    pub fn into_settings(self) -> AnalyserSettings {
        AnalyserSettings {
            enabled_language_ids: self.enabled_language_ids,
            severity_overrides: self.severity_overrides.into_iter().map(|(k, v)| (k, v.into())).collect(),
            default_severity: self.default_severity.map(Into::into),
        }
    }
}

/// Mirrors `lsp_types::DiagnosticSeverity`'s four numeric variants as a
/// textual config value, since the wire type has no `Deserialize` impl that
/// accepts `"error"`/`"warning"`/... strings.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityName {
    Error,
    Warning,
    Information,
    Hint,
}

impl From<SeverityName> for DiagnosticSeverity {
    fn from(name: SeverityName) -> Self {
        match name {
            SeverityName::Error => DiagnosticSeverity::ERROR,
            SeverityName::Warning => DiagnosticSeverity::WARNING,
            SeverityName::Information => DiagnosticSeverity::INFORMATION,
            SeverityName::Hint => DiagnosticSeverity::HINT,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub org: OrgSettings,
    pub analysers: HashMap<String, AnalyserConfig>,
}

impl Settings {
    /// `did_change_configuration`'s `settings` payload is the whole
    /// workspace configuration tree; we only care about the `textLsp` key,
    /// matching the reference server's `json`-keyed settings lookup.
    pub fn from_value(value: &serde_json::Value) -> Settings {
        value
            .get("textLsp")
            .cloned()
            .map(|v| serde_json::from_value(v).unwrap_or_default())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_settings_key_yields_defaults() {
        let settings = Settings::from_value(&serde_json::json!({}));
        assert!(settings.org.todo_keywords.contains("TODO"));
    }

    #[test]
    fn org_todo_keywords_are_overridable() {
        let settings = Settings::from_value(&serde_json::json!({
            "textLsp": { "org": { "todo_keywords": ["NEXT", "WAITING"] } }
        }));
        assert!(settings.org.todo_keywords.contains("NEXT"));
        assert!(!settings.org.todo_keywords.contains("TODO"));
    }

    #[test]
    fn analyser_severity_overrides_parse_from_strings() {
        let settings = Settings::from_value(&serde_json::json!({
            "textLsp": {
                "analysers": {
                    "languagetool": { "severity_overrides": { "style": "hint" } }
                }
            }
        }));
        let cfg = settings.analysers.get("languagetool").unwrap().clone().into_settings();
        assert_eq!(cfg.get_severity("style"), DiagnosticSeverity::HINT);
    }
}
