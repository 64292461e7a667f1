//! LSP server: wires the document model and analyser scaffolding together
//! over `lsp_server`'s stdio transport.

use std::sync::Mutex;

use lsp_server::{Connection, ErrorCode, Message, Request, RequestId, Response};
use lsp_types::notification::{
    DidChangeConfiguration, DidChangeTextDocument, DidCloseTextDocument, DidOpenTextDocument,
    DidSaveTextDocument, Notification as NotificationTrait, PublishDiagnostics,
};
use lsp_types::request::{CodeActionRequest, ExecuteCommand, HoverRequest, Request as RequestTrait};
use lsp_types::{
    CodeActionOptions, CodeActionParams, CodeActionProviderCapability, CodeActionResponse, CompletionOptions,
    DidChangeConfigurationParams, DidChangeTextDocumentParams, DidCloseTextDocumentParams,
    DidOpenTextDocumentParams, DidSaveTextDocumentParams, ExecuteCommandOptions, ExecuteCommandParams,
    Hover, HoverContents, HoverParams, HoverProviderCapability, InitializeParams, InitializeResult,
    MarkupContent, MarkupKind, PublishDiagnosticsParams, SaveOptions, ServerCapabilities, ServerInfo,
    TextDocumentSyncCapability, TextDocumentSyncKind, TextDocumentSyncOptions, TextDocumentSyncSaveOptions,
    Url,
};
use tracing::{debug, info, warn};

use crate::analyser::AnalyserBase;
use crate::config::Settings;
use crate::document::{DocumentStore, GrammarProvider, StaticGrammarProvider};

pub const RECHECK_PARAGRAPH_COMMAND: &str = "textLsp.recheckParagraph";
pub const RECHECK_SELECTION_COMMAND: &str = "textLsp.recheckSelection";
pub const RECHECK_DOCUMENT_COMMAND: &str = "textLsp.recheckDocument";

fn execute_command_names() -> Vec<String> {
    vec![RECHECK_PARAGRAPH_COMMAND.into(), RECHECK_SELECTION_COMMAND.into(), RECHECK_DOCUMENT_COMMAND.into()]
}

struct ServerState {
    documents: DocumentStore,
    settings: Settings,
    /// One `AnalyserBase` per registered plugin. No plugin ships with this
    /// crate (§1's non-goals) — the vector starts empty and is the seam a
    /// LanguageTool/LLM-backed checker would plug into.
    analysers: Vec<AnalyserBase>,
}

pub struct TextLanguageServer {
    connection: Connection,
    state: Mutex<ServerState>,
}

impl TextLanguageServer {
    pub fn new(connection: Connection) -> Self {
        TextLanguageServer {
            connection,
            state: Mutex::new(ServerState {
                documents: DocumentStore::new(Box::new(StaticGrammarProvider)),
                settings: Settings::default(),
                analysers: Vec::new(),
            }),
        }
    }

    pub fn run(self) -> anyhow::Result<()> {
        let (id, params) = self.connection.initialize_start()?;
        let init_params: InitializeParams = serde_json::from_value(params)?;
        info!(client = ?init_params.client_info, "text-language-server initializing");

        let result = InitializeResult {
            server_info: Some(ServerInfo {
                name: "text-language-server".into(),
                version: Some(env!("CARGO_PKG_VERSION").into()),
            }),
            capabilities: capabilities(),
        };
        self.connection.initialize_finish(id, serde_json::to_value(result)?)?;

        self.main_loop()
    }

    fn main_loop(&self) -> anyhow::Result<()> {
        for message in &self.connection.receiver {
            match message {
                Message::Request(req) => {
                    if self.connection.handle_shutdown(&req)? {
                        break;
                    }
                    self.handle_request(req)?;
                }
                Message::Notification(notif) => self.handle_notification(notif)?,
                Message::Response(resp) => debug!(?resp, "ignoring stray response"),
            }
        }
        Ok(())
    }

    fn send_response(&self, id: RequestId, result: serde_json::Value) -> anyhow::Result<()> {
        Ok(self.connection.sender.send(Message::Response(Response::new_ok(id, result)))?)
    }

    fn send_error(&self, id: RequestId, code: ErrorCode, message: impl Into<String>) -> anyhow::Result<()> {
        Ok(self.connection.sender.send(Message::Response(Response::new_err(id, code as i32, message.into())))?)
    }

    fn handle_request(&self, req: Request) -> anyhow::Result<()> {
        match req.method.as_str() {
            HoverRequest::METHOD => {
                let params: HoverParams = serde_json::from_value(req.params)?;
                let result = self.hover(params);
                self.send_response(req.id, serde_json::to_value(result)?)
            }
            CodeActionRequest::METHOD => {
                let params: CodeActionParams = serde_json::from_value(req.params)?;
                let result = self.code_action(params);
                self.send_response(req.id, serde_json::to_value(result)?)
            }
            ExecuteCommand::METHOD => {
                let params: ExecuteCommandParams = serde_json::from_value(req.params)?;
                match self.execute_command(params) {
                    Ok(value) => self.send_response(req.id, value),
                    Err(message) => self.send_error(req.id, ErrorCode::InvalidParams, message),
                }
            }
            other => self.send_error(req.id, ErrorCode::MethodNotFound, format!("method {other} is not implemented")),
        }
    }

    fn handle_notification(&self, notif: lsp_server::Notification) -> anyhow::Result<()> {
        match notif.method.as_str() {
            DidOpenTextDocument::METHOD => {
                let params: DidOpenTextDocumentParams = serde_json::from_value(notif.params)?;
                self.did_open(params);
            }
            DidChangeTextDocument::METHOD => {
                let params: DidChangeTextDocumentParams = serde_json::from_value(notif.params)?;
                self.did_change(params);
            }
            DidSaveTextDocument::METHOD => {
                let params: DidSaveTextDocumentParams = serde_json::from_value(notif.params)?;
                self.did_save(params);
            }
            DidCloseTextDocument::METHOD => {
                let params: DidCloseTextDocumentParams = serde_json::from_value(notif.params)?;
                self.did_close(params);
            }
            DidChangeConfiguration::METHOD => {
                let params: DidChangeConfigurationParams = serde_json::from_value(notif.params)?;
                self.did_change_configuration(params);
            }
            "exit" => {}
            other => debug!(method = other, "notification ignored"),
        }
        Ok(())
    }

    // -- Document sync --

    fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        let language_id = params.text_document.language_id;
        debug!(%uri, %language_id, "did_open");
        let mut state = self.state.lock().unwrap();
        let todo_keywords = state.settings.org.todo_keywords.clone();
        state.documents.open(uri.clone(), &language_id, params.text_document.text.clone(), &todo_keywords);
        for analyser in &mut state.analysers {
            if analyser.should_run_on(&language_id) {
                analyser.did_open(uri.clone(), params.text_document.text.clone());
            }
        }
    }

    fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        debug!(%uri, "did_change");
        let mut state = self.state.lock().unwrap();
        for change in &params.content_changes {
            let Some(doc) = state.documents.get_mut(&uri) else { break };
            if let Err(err) = doc.apply_change(change) {
                warn!(%uri, %err, "failed to apply change, leaving document unchanged");
                continue;
            }
            let raw_source = doc.base().source.clone();
            let last_position = doc.base().last_position();
            for analyser in &mut state.analysers {
                analyser.did_change(&uri, change.range, &change.text, raw_source.clone(), last_position);
            }
        }
    }

    fn did_save(&self, params: DidSaveTextDocumentParams) {
        debug!(uri = %params.text_document.uri, "did_save");
        // Re-checking dirty spans is the analyser plugin's job; the base
        // only exposes `pending_changes`/`reset_tracker` for it to call.
    }

    fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        debug!(%uri, "did_close");
        let mut state = self.state.lock().unwrap();
        state.documents.close(&uri);
        for analyser in &mut state.analysers {
            analyser.did_close(&uri);
        }
        let _ = self.connection.sender.send(Message::Notification(lsp_server::Notification::new(
            PublishDiagnostics::METHOD.to_string(),
            serde_json::to_value(PublishDiagnosticsParams { uri, diagnostics: Vec::new(), version: None }).unwrap(),
        )));
    }

    fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        debug!("did_change_configuration");
        let settings = Settings::from_value(&params.settings);
        let mut state = self.state.lock().unwrap();
        for (name, config) in settings.analysers.clone() {
            if let Some(analyser) = state.analysers.iter_mut().find(|a| a.name == name) {
                analyser.update_settings(config.into_settings());
            }
        }
        state.settings = settings;
    }

    // -- Requests --

    fn hover(&self, params: HoverParams) -> Option<Hover> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        let state = self.state.lock().unwrap();
        let doc = state.documents.get(&uri)?;
        let offset = doc.offset_at_cleaned_position(position);
        let cleaned = doc.cleaned_source();
        let preview: String = cleaned.chars().skip(offset.saturating_sub(20)).take(40).collect();
        Some(Hover {
            contents: HoverContents::Markup(MarkupContent {
                kind: MarkupKind::Markdown,
                value: format!("cleaned offset `{offset}`\n\n```\n{preview}\n```"),
            }),
            range: None,
        })
    }

    fn code_action(&self, params: CodeActionParams) -> CodeActionResponse {
        let uri = params.text_document.uri;
        let state = self.state.lock().unwrap();
        state
            .analysers
            .iter()
            .flat_map(|a| a.get_code_actions(&uri))
            .map(lsp_types::CodeActionOrCommand::CodeAction)
            .collect()
    }

    fn execute_command(&self, params: ExecuteCommandParams) -> Result<serde_json::Value, String> {
        let uri = params
            .arguments
            .first()
            .and_then(|v| v.as_str())
            .and_then(|s| Url::parse(s).ok())
            .ok_or_else(|| "first argument must be a document URI".to_string())?;

        let state = self.state.lock().unwrap();
        let Some(doc) = state.documents.get(&uri) else {
            return Err(format!("no open document for {uri}"));
        };
        let cleaned = doc.cleaned_source();

        let intervals = match params.command.as_str() {
            RECHECK_DOCUMENT_COMMAND => vec![crate::document::Interval { start: 0, length: cleaned.len() }],
            RECHECK_PARAGRAPH_COMMAND | RECHECK_SELECTION_COMMAND => {
                state.analysers.iter().flat_map(|a| a.pending_changes(&uri)).collect()
            }
            other => return Err(format!("unknown command {other}")),
        };

        info!(%uri, command = %params.command, count = intervals.len(), "recheck requested");
        Ok(serde_json::json!({ "intervals": intervals.iter().map(|i| serde_json::json!({
            "start": i.start, "length": i.length,
        })).collect::<Vec<_>>() }))
    }
}

fn capabilities() -> ServerCapabilities {
    ServerCapabilities {
        text_document_sync: Some(TextDocumentSyncCapability::Options(TextDocumentSyncOptions {
            open_close: Some(true),
            change: Some(TextDocumentSyncKind::INCREMENTAL),
            will_save: None,
            will_save_wait_until: None,
            save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions { include_text: Some(false) })),
        })),
        hover_provider: Some(HoverProviderCapability::Simple(true)),
        code_action_provider: Some(CodeActionProviderCapability::Options(CodeActionOptions {
            code_action_kinds: Some(vec![lsp_types::CodeActionKind::QUICKFIX]),
            work_done_progress_options: Default::default(),
            resolve_provider: Some(false),
        })),
        completion_provider: Some(CompletionOptions { resolve_provider: Some(false), ..Default::default() }),
        execute_command_provider: Some(ExecuteCommandOptions {
            commands: execute_command_names(),
            work_done_progress_options: Default::default(),
        }),
        ..ServerCapabilities::default()
    }
}
