//! Analyser base (§4.6): the ambient scaffolding an analyser plugin (a
//! grammar checker, an LLM-backed proofreader) is built against. The
//! plugins themselves — the network calls, the prompting — are out of
//! scope; this module owns the diagnostics/code-action stores, shifts
//! their contents on every edit, and tracks which cleaned-text intervals
//! still need re-checking.

use std::collections::{HashMap, HashSet};

use lsp_types::{
    CodeAction, CodeActionKind, Command, Diagnostic, DiagnosticSeverity, Position, Range, TextEdit, Url,
    WorkspaceEdit,
};
use thiserror::Error;

use crate::change_tracker::ChangeTracker;
use crate::document::Interval;
use crate::position_dict::PositionDict;

/// Raised by a plugin's checker call. The base catches it, logs it, and
/// leaves existing diagnostics in place rather than publishing an empty
/// set — a transient network failure should never blank out the user's
/// diagnostics.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("checker call failed: {0}")]
    CheckerFailed(String),
    #[error("checker call timed out")]
    Timeout,
}

/// Per-analyser configuration: which documents it runs on, and how it maps
/// its own issue categories to LSP severities.
#[derive(Debug, Clone, Default)]
pub struct AnalyserSettings {
    pub enabled_language_ids: Option<HashSet<String>>,
    pub severity_overrides: HashMap<String, DiagnosticSeverity>,
    pub default_severity: Option<DiagnosticSeverity>,
}

impl AnalyserSettings {
    pub fn should_run_on(&self, language_id: &str) -> bool {
        match &self.enabled_language_ids {
            Some(ids) => ids.contains(language_id),
            None => true,
        }
    }

    pub fn get_severity(&self, category: &str) -> DiagnosticSeverity {
        self.severity_overrides
            .get(category)
            .copied()
            .unwrap_or(self.default_severity.unwrap_or(DiagnosticSeverity::INFORMATION))
    }
}

struct DocumentState {
    diagnostics: PositionDict<Diagnostic>,
    code_actions: PositionDict<CodeAction>,
    tracker: ChangeTracker,
}

/// One instance per analyser plugin, holding per-document state for every
/// open document that plugin has been asked to watch.
pub struct AnalyserBase {
    pub name: String,
    settings: AnalyserSettings,
    documents: HashMap<Url, DocumentState>,
}

impl AnalyserBase {
    pub fn new(name: impl Into<String>) -> Self {
        AnalyserBase { name: name.into(), settings: AnalyserSettings::default(), documents: HashMap::new() }
    }

    pub fn update_settings(&mut self, settings: AnalyserSettings) {
        self.settings = settings;
    }

    pub fn get_severity(&self, category: &str) -> DiagnosticSeverity {
        self.settings.get_severity(category)
    }

    pub fn should_run_on(&self, language_id: &str) -> bool {
        self.settings.should_run_on(language_id)
    }

    pub fn did_open(&mut self, uri: Url, source: String) {
        self.documents.insert(
            uri,
            DocumentState {
                diagnostics: PositionDict::new(),
                code_actions: PositionDict::new(),
                tracker: ChangeTracker::new(source),
            },
        );
    }

    pub fn did_close(&mut self, uri: &Url) {
        self.documents.remove(uri);
    }

    pub fn init_diagnostics(&mut self, uri: &Url) {
        if let Some(state) = self.documents.get_mut(uri) {
            state.diagnostics = PositionDict::new();
        }
    }

    pub fn get_diagnostics(&self, uri: &Url) -> Vec<Diagnostic> {
        self.documents.get(uri).map(|s| s.diagnostics.iter().map(|(_, d)| d.clone()).collect()).unwrap_or_default()
    }

    pub fn add_diagnostics(&mut self, uri: &Url, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        if let Some(state) = self.documents.get_mut(uri) {
            for diagnostic in diagnostics {
                state.diagnostics.add(diagnostic.range.start, diagnostic);
            }
        }
    }

    pub fn init_code_actions(&mut self, uri: &Url) {
        if let Some(state) = self.documents.get_mut(uri) {
            state.code_actions = PositionDict::new();
        }
    }

    pub fn get_code_actions(&self, uri: &Url) -> Vec<CodeAction> {
        self.documents.get(uri).map(|s| s.code_actions.iter().map(|(_, a)| a.clone()).collect()).unwrap_or_default()
    }

    pub fn add_code_actions(&mut self, uri: &Url, actions: impl IntoIterator<Item = (Position, CodeAction)>) {
        if let Some(state) = self.documents.get_mut(uri) {
            for (pos, action) in actions {
                state.code_actions.add(pos, action);
            }
        }
    }

    /// Run shift-handling (§4.6 steps 1-4) for one content-change event,
    /// then hand the same change to the tracker.
    pub fn did_change(&mut self, uri: &Url, range: Option<Range>, text: &str, new_source: String, new_last_position: Position) {
        let Some(state) = self.documents.get_mut(uri) else { return };

        if let Some(range) = range {
            shift_position_dict(&mut state.diagnostics, range, text, new_last_position);
            shift_position_dict(&mut state.code_actions, range, text, new_last_position);
        } else {
            state.diagnostics = PositionDict::new();
            state.code_actions = PositionDict::new();
        }

        state.tracker.apply_change(range, text, new_source);
    }

    /// The intervals a `did_save` (or `did_change`) re-check should cover.
    pub fn pending_changes(&self, uri: &Url) -> Vec<Interval> {
        self.documents.get(uri).map(|s| s.tracker.get_changes()).unwrap_or_default()
    }

    pub fn reset_tracker(&mut self, uri: &Url, current_source: String) {
        if let Some(state) = self.documents.get_mut(uri) {
            state.tracker.reset(current_source);
        }
    }

    /// Rewrite every stored code action's document-identifier version to
    /// the current one, after a shift.
    pub fn retarget_code_action_versions(&mut self, uri: &Url, version: i32) {
        let Some(state) = self.documents.get_mut(uri) else { return };
        let all = state.code_actions.drain_all();
        for (pos, mut action) in all {
            if let Some(edit) = action.edit.as_mut() {
                retarget_workspace_edit_version(edit, uri, version);
            }
            state.code_actions.add(pos, action);
        }
    }

    /// A single-document text-edit suggestion, e.g. "replace 'teh' with
    /// 'the'". `version` is unused today — `WorkspaceEdit`'s plain `changes`
    /// map addresses documents by URI only; version-checked edits would go
    /// through `document_changes` instead, which no current plugin needs.
    pub fn build_single_suggestion_action(
        uri: Url,
        _version: i32,
        range: Range,
        replacement: String,
        title: String,
    ) -> CodeAction {
        let mut changes = HashMap::new();
        changes.insert(uri, vec![TextEdit { range, new_text: replacement }]);
        CodeAction {
            title,
            kind: Some(CodeActionKind::QUICKFIX),
            edit: Some(WorkspaceEdit { changes: Some(changes), document_changes: None, change_annotations: None }),
            is_preferred: Some(true),
            ..CodeAction::default()
        }
    }

    pub fn build_command_action(title: String, command_name: String, arguments: Vec<serde_json::Value>) -> CodeAction {
        CodeAction {
            title: title.clone(),
            kind: Some(CodeActionKind::EMPTY),
            command: Some(Command { title, command: command_name, arguments: Some(arguments) }),
            ..CodeAction::default()
        }
    }
}

fn retarget_workspace_edit_version(_edit: &mut WorkspaceEdit, _uri: &Url, _version: i32) {
    // `WorkspaceEdit`'s plain `changes` map has no version to rewrite; this
    // is the seam a plugin using `document_changes` would hook into.
}

/// The line/character delta a single content-change imposes, precomputed
/// once and applied to every position an item carries (its anchor, plus any
/// embedded range endpoints) — mirrors `analyser.py`'s per-edit `Range(...)`
/// reconstruction followed by `PositionDict.update(...)`.
struct EditShift {
    start: Position,
    end: Position,
    same_line_edit: bool,
    delta_row: i64,
    delta_char: i64,
    last_new_line_len: u32,
}

impl EditShift {
    fn new(range: Range, text: &str) -> Self {
        let new_line_count = text.matches('\n').count();
        let old_line_count = (range.end.line - range.start.line) as usize;
        let same_line_edit = new_line_count == 0 && old_line_count == 0;
        let delta_row = new_line_count as i64 - old_line_count as i64;
        let delta_char = text.chars().count() as i64 - (range.end.character as i64 - range.start.character as i64);
        let last_new_line_len = text.rsplit('\n').next().unwrap_or("").chars().count() as u32;
        EditShift { start: range.start, end: range.end, same_line_edit, delta_row, delta_char, last_new_line_len }
    }

    fn shift(&self, pos: Position) -> Position {
        let mut new_pos = pos;
        if self.same_line_edit {
            if pos.line == self.start.line && pos.character >= self.start.character {
                new_pos.character = (pos.character as i64 + self.delta_char).max(0) as u32;
            }
        } else if pos.line >= self.start.line {
            new_pos.line = (pos.line as i64 + self.delta_row).max(0) as u32;
            if pos.line == self.start.line && pos.character >= self.start.character {
                let tail = pos.character.saturating_sub(self.end.character);
                new_pos.character = self.last_new_line_len + tail;
            }
        }
        new_pos
    }
}

/// An item a `PositionDict` stores, shiftable across an edit. `anchor` is
/// the position used as the dict's bucket key; `shift_ranges` rewrites every
/// range embedded in the item itself, not just the key, so a published
/// `Diagnostic`/`CodeAction` actually points at its new location.
trait ShiftedItem {
    fn anchor(&self) -> Position;
    fn shift_ranges(&mut self, shift: &EditShift);
}

impl ShiftedItem for Diagnostic {
    fn anchor(&self) -> Position {
        self.range.start
    }

    fn shift_ranges(&mut self, shift: &EditShift) {
        self.range.start = shift.shift(self.range.start);
        self.range.end = shift.shift(self.range.end);
    }
}

impl ShiftedItem for CodeAction {
    fn anchor(&self) -> Position {
        self.edit
            .as_ref()
            .and_then(|edit| edit.changes.as_ref())
            .and_then(|changes| changes.values().flatten().next())
            .map(|edit| edit.range.start)
            .unwrap_or(Position { line: 0, character: 0 })
    }

    fn shift_ranges(&mut self, shift: &EditShift) {
        if let Some(changes) = self.edit.as_mut().and_then(|edit| edit.changes.as_mut()) {
            for edits in changes.values_mut() {
                for edit in edits.iter_mut() {
                    edit.range.start = shift.shift(edit.range.start);
                    edit.range.end = shift.shift(edit.range.end);
                }
            }
        }
        if let Some(diagnostics) = self.diagnostics.as_mut() {
            for diagnostic in diagnostics.iter_mut() {
                diagnostic.range.start = shift.shift(diagnostic.range.start);
                diagnostic.range.end = shift.shift(diagnostic.range.end);
            }
        }
    }
}

/// §4.6 steps 1-4: drop items strictly inside the replaced range, shift the
/// rest (both the dict key and the item's own embedded ranges) by the
/// edit's line/character delta, then drop anything past the document's new
/// end.
fn shift_position_dict<T: Clone + PartialEq + ShiftedItem>(
    dict: &mut PositionDict<T>,
    range: Range,
    text: &str,
    new_last_position: Position,
) {
    if range.start != range.end {
        dict.remove_between(range.start, range.end, false, false);
    }

    let shift = EditShift::new(range, text);

    for (_, mut value) in dict.drain_all() {
        value.shift_ranges(&shift);
        let new_pos = value.anchor();

        if (new_pos.line, new_pos.character) > (new_last_position.line, new_last_position.character) {
            continue;
        }
        dict.add(new_pos, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(sl: u32, sc: u32, el: u32, ec: u32) -> Range {
        Range { start: Position { line: sl, character: sc }, end: Position { line: el, character: ec } }
    }

    fn diagnostic_at(line: u32, character: u32) -> Diagnostic {
        Diagnostic {
            range: Range { start: Position { line, character }, end: Position { line, character: character + 8 } },
            ..Diagnostic::default()
        }
    }

    fn named_diagnostic(line: u32, character: u32, message: &str) -> Diagnostic {
        Diagnostic { message: message.to_string(), ..diagnostic_at(line, character) }
    }

    #[test]
    fn s6_diagnostic_shifts_with_prepended_newlines() {
        let mut dict = PositionDict::new();
        dict.add(Position { line: 1, character: 10 }, diagnostic_at(1, 10));

        shift_position_dict(&mut dict, range(0, 0, 0, 0), "\n\n\n", Position { line: 10, character: 0 });

        let shifted = dict.irange_values(Position { line: 4, character: 0 }, Position { line: 4, character: 100 }, true);
        assert_eq!(shifted.len(), 1);
        assert_eq!(shifted[0].range.start, Position { line: 4, character: 10 });
        assert_eq!(shifted[0].range.end, Position { line: 4, character: 18 });
    }

    #[test]
    fn same_line_insert_shifts_character_only() {
        let mut dict = PositionDict::new();
        dict.add(Position { line: 2, character: 15 }, named_diagnostic(2, 15, "item"));

        shift_position_dict(&mut dict, range(2, 5, 2, 5), "hello ", Position { line: 10, character: 0 });

        let shifted = dict.irange_values(Position { line: 2, character: 0 }, Position { line: 2, character: 100 }, true);
        assert_eq!(shifted.len(), 1);
        assert_eq!(shifted[0].message, "item");
        assert_eq!(shifted[0].range.start, Position { line: 2, character: 21 });
    }

    #[test]
    fn items_strictly_inside_replaced_range_are_dropped() {
        let mut dict = PositionDict::new();
        dict.add(Position { line: 0, character: 5 }, named_diagnostic(0, 5, "doomed"));

        shift_position_dict(&mut dict, range(0, 0, 0, 10), "", Position { line: 10, character: 0 });

        assert!(dict.is_empty());
    }

    #[test]
    fn items_past_new_end_of_document_are_dropped() {
        let mut dict = PositionDict::new();
        dict.add(Position { line: 5, character: 0 }, named_diagnostic(5, 0, "tail"));

        shift_position_dict(&mut dict, range(0, 0, 0, 0), "", Position { line: 2, character: 0 });

        assert!(dict.is_empty());
    }

    #[test]
    fn settings_gate_applicability_and_severity() {
        let mut settings = AnalyserSettings::default();
        settings.enabled_language_ids = Some(["tex".to_string()].into_iter().collect());
        settings.severity_overrides.insert("style".to_string(), DiagnosticSeverity::HINT);

        assert!(settings.should_run_on("tex"));
        assert!(!settings.should_run_on("md"));
        assert_eq!(settings.get_severity("style"), DiagnosticSeverity::HINT);
        assert_eq!(settings.get_severity("spelling"), DiagnosticSeverity::INFORMATION);
    }
}
