//! LSP backend for cssmod
//!
//! Lifecycle handlers, document synchronization, and dispatch into the
//! feature adapters. Installation completes before the feature gate opens:
//! the runner slot stays empty until `ensure_installed` returns, and every
//! adapter checks the slot before spawning a subprocess.

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use cssmod::installer::Installer;
use cssmod::runner::ToolRunner;

use crate::settings::ServerSettings;
use crate::{actions, completion, diagnostics, hover, navigation, references, ServerArgs};

/// The user-invocable refactor command.
pub const EXTRACT_COMMAND: &str = "cssmod.extractInlineStyle";

/// Feeds the client's destination picker for the refactor command.
pub const LIST_IMPORTS_COMMAND: &str = "cssmod.listStyleImports";

/// cssmod LSP backend state
pub struct Backend {
    /// LSP client for sending notifications/responses
    client: Client,
    /// Document content cache (uri -> content)
    documents: DashMap<Url, String>,
    /// Diagnostics published by the previous lint run, per URI
    published: DashMap<Url, Vec<Diagnostic>>,
    /// Workspace root path
    workspace_root: RwLock<Option<PathBuf>>,
    /// Effective configuration (CLI flags merged over init options)
    settings: RwLock<ServerSettings>,
    /// CLI flags, kept for precedence when init options arrive
    args: ServerArgs,
    /// Ready-to-run tool handle; empty until installation completes
    runner: RwLock<Option<Arc<ToolRunner>>>,
}

impl Backend {
    /// Create a new Backend instance
    pub fn new(client: Client, args: ServerArgs) -> Self {
        let settings = ServerSettings::resolve(&args, None);
        Self {
            client,
            documents: DashMap::new(),
            published: DashMap::new(),
            workspace_root: RwLock::new(None),
            settings: RwLock::new(settings),
            args,
            runner: RwLock::new(None),
        }
    }

    /// Tool handle, once installation has finished. Features yield empty
    /// results while this is unset.
    pub(crate) async fn runner(&self) -> Option<Arc<ToolRunner>> {
        self.runner.read().await.clone()
    }

    pub(crate) async fn workspace_root(&self) -> Option<PathBuf> {
        self.workspace_root.read().await.clone()
    }

    pub(crate) fn document(&self, uri: &Url) -> Option<String> {
        self.documents.get(uri).map(|doc| doc.clone())
    }

    /// Publish one file's diagnostics and remember them for the next
    /// replace cycle and for code actions.
    pub(crate) async fn publish(&self, uri: Url, diagnostics: Vec<Diagnostic>) {
        if diagnostics.is_empty() {
            self.published.remove(&uri);
        } else {
            self.published.insert(uri.clone(), diagnostics.clone());
        }
        self.client.publish_diagnostics(uri, diagnostics, None).await;
    }

    pub(crate) fn published_uris(&self) -> Vec<Url> {
        self.published.iter().map(|entry| entry.key().clone()).collect()
    }

    pub(crate) fn published_for(&self, uri: &Url) -> Vec<Diagnostic> {
        self.published.get(uri).map(|d| d.clone()).unwrap_or_default()
    }

    pub(crate) async fn apply_edit(&self, edit: WorkspaceEdit) -> anyhow::Result<bool> {
        let response = self
            .client
            .apply_edit(edit)
            .await
            .map_err(|e| anyhow::anyhow!("workspace edit was not applied: {e}"))?;
        Ok(response.applied)
    }

    /// Install the tool and open the feature gate. Runs from `initialized`;
    /// the installer serializes concurrent triggers internally.
    async fn install_tool(&self) {
        let settings = self.settings.read().await.clone();
        let Some(root) = self.workspace_root.read().await.clone() else {
            tracing::warn!("no workspace root; css-linter features stay disabled");
            return;
        };

        let installer = match Installer::new(settings.installer_options()) {
            Ok(installer) => installer,
            Err(e) => {
                self.report_install_failure(&e).await;
                return;
            }
        };

        match installer.ensure_installed().await {
            Ok(tool) => {
                tracing::info!(version = %tool.version, path = %tool.path.display(), "css-linter ready");
                self.client
                    .log_message(MessageType::INFO, format!("css-linter {} ready", tool.version))
                    .await;
                let runner = Arc::new(ToolRunner::new(tool.path, root, settings.timeout()));
                *self.runner.write().await = Some(runner);
                diagnostics::refresh(self).await;
            }
            Err(e) => self.report_install_failure(&e).await,
        }
    }

    async fn report_install_failure(&self, error: &cssmod::ToolError) {
        tracing::error!("css-linter installation failed: {error}");
        // Surfaced once so the user knows the tool is non-functional.
        self.client
            .show_message(MessageType::ERROR, format!("css-linter is unavailable: {error}"))
            .await;
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        #[allow(deprecated)]
        if let Some(root) = params.root_uri {
            if let Ok(path) = root.to_file_path() {
                tracing::info!("Workspace root: {}", path.display());
                *self.workspace_root.write().await = Some(path);
            }
        }
        if params.initialization_options.is_some() {
            let resolved = ServerSettings::resolve(&self.args, params.initialization_options);
            *self.settings.write().await = resolved;
        }

        Ok(InitializeResult {
            server_info: Some(ServerInfo {
                name: "cssmod-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::FULL),
                        save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                            include_text: Some(true),
                        })),
                        ..Default::default()
                    },
                )),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec![".".to_string()]),
                    ..Default::default()
                }),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                definition_provider: Some(OneOf::Left(true)),
                references_provider: Some(OneOf::Left(true)),
                code_action_provider: Some(CodeActionProviderCapability::Simple(true)),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: vec![
                        EXTRACT_COMMAND.to_string(),
                        LIST_IMPORTS_COMMAND.to_string(),
                    ],
                    work_done_progress_options: WorkDoneProgressOptions::default(),
                }),
                ..Default::default()
            },
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        tracing::info!("cssmod-lsp server initialized");
        self.install_tool().await;
    }

    async fn shutdown(&self) -> Result<()> {
        tracing::info!("cssmod-lsp server shutting down");
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri.clone();
        tracing::debug!("did_open: {} ({} bytes)", uri, params.text_document.text.len());
        self.documents.insert(uri, params.text_document.text);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri.clone();
        tracing::debug!("did_change: {}", uri);

        // With FULL sync the entire content arrives in the first change.
        if let Some(change) = params.content_changes.into_iter().next() {
            self.documents.insert(uri, change.text);
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let uri = params.text_document.uri.clone();
        tracing::debug!("did_save: {}", uri);

        if let Some(text) = params.text {
            self.documents.insert(uri, text);
        }

        // The lint pass is workspace-wide; saving any file refreshes it all.
        diagnostics::refresh(self).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri.clone();
        tracing::debug!("did_close: {}", uri);

        // Lint findings are workspace-scoped and stay published; only the
        // content cache entry goes away.
        self.documents.remove(&uri);
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        tracing::debug!("goto_definition: {} at {:?}", uri, position);
        Ok(navigation::definition(self, &uri, position).await)
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        tracing::debug!("completion: {} at {:?}", uri, position);
        Ok(completion::completions(self, &uri, position).await)
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        tracing::debug!("hover: {} at {:?}", uri, position);
        Ok(hover::hover(self, &uri, position).await)
    }

    async fn references(&self, params: ReferenceParams) -> Result<Option<Vec<Location>>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        tracing::debug!("references: {} at {:?}", uri, position);
        Ok(references::references(self, &uri, position).await)
    }

    async fn code_action(&self, params: CodeActionParams) -> Result<Option<CodeActionResponse>> {
        Ok(actions::code_actions(self, params).await)
    }

    async fn execute_command(
        &self,
        params: ExecuteCommandParams,
    ) -> Result<Option<serde_json::Value>> {
        match params.command.as_str() {
            EXTRACT_COMMAND => match actions::extract::run(self, params.arguments).await {
                Ok(applied) => Ok(Some(serde_json::Value::Bool(applied))),
                Err(e) => {
                    tracing::warn!("{EXTRACT_COMMAND} failed: {e:#}");
                    self.client
                        .show_message(
                            MessageType::WARNING,
                            format!("Extract inline style failed: {e}"),
                        )
                        .await;
                    Ok(None)
                }
            },
            LIST_IMPORTS_COMMAND => {
                match actions::extract::list_imports(self, params.arguments).await {
                    Ok(value) => Ok(Some(value)),
                    Err(e) => {
                        tracing::warn!("{LIST_IMPORTS_COMMAND} failed: {e:#}");
                        Ok(None)
                    }
                }
            }
            other => {
                tracing::warn!("unknown command: {other}");
                Ok(None)
            }
        }
    }
}
