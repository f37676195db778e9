//! tower-lsp backend wiring the engine to an editor client
//!
//! Single-document reconciliation runs synchronously on open/change and
//! publishes diagnostics guarded by the document version. Project-wide
//! reconciliation (after a metadata change) is debounced: a request for a
//! project replaces any pending not-yet-started request for the same
//! project, and execution fans out over open documents on a bounded
//! worker pool so event handlers never block on it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use notify::{RecursiveMode, Watcher};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, Semaphore};
use tokio::time::{sleep, Duration};
use tower_lsp::jsonrpc;
use tower_lsp::lsp_types::{
    CodeAction, CodeActionKind, CodeActionOrCommand, CodeActionParams, CodeActionProviderCapability,
    CodeActionResponse, CompletionItem, CompletionItemKind, CompletionItemTag, CompletionOptions,
    CompletionParams, CompletionResponse, CompletionTextEdit, DidChangeTextDocumentParams,
    DidCloseTextDocumentParams, DidOpenTextDocumentParams, Documentation, Hover, HoverContents,
    HoverParams, HoverProviderCapability, InitializeParams, InitializeResult, InitializedParams,
    MarkupContent, MarkupKind, ServerCapabilities, ServerInfo, TextDocumentSyncCapability,
    TextDocumentSyncKind, TextEdit, Url, WorkspaceEdit,
};
use tower_lsp::{Client, LanguageServer};
use tracing::{debug, error, info, warn};

use dashmap::DashMap;

use crate::complete::{complete, hover as engine_hover, Proposal, ProposalKind};
use crate::metadata;
use crate::reconcile::{reconcile_text, ReconcileProblem};
use crate::session::ProjectSession;

use super::conversion::{position_to_offset, problem_to_diagnostic, span_to_range};
use super::documents::DocumentStore;

const DEBOUNCE: Duration = Duration::from_millis(300);
const RECONCILE_WORKERS: usize = 4;
/// Single-project server: one key in the debouncer map.
const WORKSPACE_PROJECT: &str = "workspace";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReconcileTrigger {
    /// Metadata changed: rebuild the session first, then revalidate.
    Metadata,
    /// Only documents need revalidation.
    Documents,
}

#[derive(Debug, Clone)]
struct ProjectReconcileRequest {
    project: String,
    trigger: ReconcileTrigger,
}

#[derive(Clone)]
pub struct Backend {
    client: Client,
    documents: Arc<DocumentStore>,
    session: Arc<RwLock<Arc<ProjectSession>>>,
    /// Last reconcile result per document, kept for code actions.
    problems: Arc<DashMap<Url, Vec<ReconcileProblem>>>,
    reconcile_tx: mpsc::Sender<ProjectReconcileRequest>,
    reconcile_pool: Arc<Semaphore>,
    metadata_path: Option<PathBuf>,
    _watcher: Arc<Mutex<Option<notify::RecommendedWatcher>>>,
}

impl Backend {
    pub fn new(
        client: Client,
        session: ProjectSession,
        metadata_path: Option<PathBuf>,
    ) -> Backend {
        let (reconcile_tx, reconcile_rx) = mpsc::channel::<ProjectReconcileRequest>(100);

        let backend = Backend {
            client,
            documents: Arc::new(DocumentStore::new()),
            session: Arc::new(RwLock::new(Arc::new(session))),
            problems: Arc::new(DashMap::new()),
            reconcile_tx,
            reconcile_pool: Arc::new(Semaphore::new(RECONCILE_WORKERS)),
            metadata_path: metadata_path.clone(),
            _watcher: Arc::new(Mutex::new(None)),
        };

        backend.spawn_project_debouncer(reconcile_rx);
        if let Some(path) = metadata_path {
            backend.spawn_metadata_watcher(path);
        }
        backend
    }

    fn current_session(&self) -> Arc<ProjectSession> {
        self.session.read().clone()
    }

    /// Debouncer task: pending requests are keyed by project, so a new
    /// request replaces a not-yet-started one for the same project
    /// (last-write-wins).
    fn spawn_project_debouncer(&self, mut rx: mpsc::Receiver<ProjectReconcileRequest>) {
        let backend = self.clone();
        tokio::spawn(async move {
            let mut pending: HashMap<String, ProjectReconcileRequest> = HashMap::new();
            loop {
                tokio::select! {
                    request = rx.recv() => {
                        match request {
                            Some(request) => {
                                pending.insert(request.project.clone(), request);
                            }
                            None => break,
                        }
                    }
                    _ = sleep(DEBOUNCE), if !pending.is_empty() => {
                        for (_, request) in pending.drain() {
                            let backend = backend.clone();
                            tokio::spawn(async move {
                                backend.run_project_reconcile(request).await;
                            });
                        }
                    }
                }
            }
            debug!("project reconcile debouncer terminated");
        });
    }

    async fn run_project_reconcile(&self, request: ProjectReconcileRequest) {
        info!(
            "project reconcile for `{}` ({:?})",
            request.project, request.trigger
        );
        if request.trigger == ReconcileTrigger::Metadata {
            self.reload_metadata().await;
        }
        for uri in self.documents.uris() {
            let permit = match self.reconcile_pool.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };
            let backend = self.clone();
            tokio::spawn(async move {
                let _permit = permit;
                backend.validate_and_publish(&uri).await;
            });
        }
    }

    async fn reload_metadata(&self) {
        let Some(path) = self.metadata_path.clone() else {
            return;
        };
        match tokio::task::spawn_blocking(move || metadata::load_file(&path)).await {
            Ok(Ok(session)) => {
                info!(
                    "metadata reloaded: {} properties indexed",
                    session.index.len()
                );
                *self.session.write() = Arc::new(session);
            }
            Ok(Err(err)) => warn!("metadata reload failed, keeping previous index: {}", err),
            Err(err) => error!("metadata reload task panicked: {}", err),
        }
    }

    fn spawn_metadata_watcher(&self, path: PathBuf) {
        let tx = self.reconcile_tx.clone();
        let watcher = notify::recommended_watcher(
            move |event: Result<notify::Event, notify::Error>| match event {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    let _ = tx.blocking_send(ProjectReconcileRequest {
                        project: WORKSPACE_PROJECT.to_string(),
                        trigger: ReconcileTrigger::Metadata,
                    });
                }
                Ok(_) => {}
                Err(err) => warn!("metadata watcher error: {}", err),
            },
        );
        match watcher {
            Ok(mut watcher) => match watcher.watch(&path, RecursiveMode::NonRecursive) {
                Ok(()) => {
                    info!("watching metadata at {}", path.display());
                    *self._watcher.lock() = Some(watcher);
                }
                Err(err) => warn!("cannot watch metadata at {}: {}", path.display(), err),
            },
            Err(err) => warn!("cannot create metadata watcher: {}", err),
        }
    }

    /// One reconcile pass for one document: exactly one diagnostics
    /// publish per pass, skipped when the document changed underneath.
    async fn validate_and_publish(&self, uri: &Url) {
        let Some(snapshot) = self.documents.snapshot(uri) else {
            return;
        };
        let session = self.current_session();
        let problems = reconcile_text(&session, uri, &snapshot.text, snapshot.dialect);
        let diagnostics = problems
            .iter()
            .map(|p| problem_to_diagnostic(&snapshot.text, p))
            .collect();
        self.problems.insert(uri.clone(), problems);

        if self.documents.version(uri) == Some(snapshot.version) {
            self.client
                .publish_diagnostics(uri.clone(), diagnostics, Some(snapshot.version))
                .await;
        }
    }

    fn proposal_to_item(&self, text: &str, rank: usize, proposal: &Proposal) -> CompletionItem {
        let kind = match proposal.kind {
            ProposalKind::Property => CompletionItemKind::PROPERTY,
            ProposalKind::Value => CompletionItemKind::VALUE,
        };
        CompletionItem {
            label: proposal.label.clone(),
            kind: Some(kind),
            detail: proposal.detail.clone(),
            documentation: proposal.documentation.as_ref().map(|value| {
                Documentation::MarkupContent(MarkupContent {
                    kind: MarkupKind::Markdown,
                    value: value.clone(),
                })
            }),
            filter_text: Some(proposal.filter_text.clone()),
            // Our ranking is already total; sort_text pins the client to
            // it.
            sort_text: Some(format!("{:06}", rank)),
            text_edit: Some(CompletionTextEdit::Edit(TextEdit {
                range: span_to_range(text, proposal.edit_span),
                new_text: proposal.new_text.clone(),
            })),
            tags: proposal
                .deprecated
                .then(|| vec![CompletionItemTag::DEPRECATED]),
            ..Default::default()
        }
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("open_documents", &self.documents.len())
            .field("metadata_path", &self.metadata_path)
            .finish()
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> jsonrpc::Result<InitializeResult> {
        info!("initialize: client={:?}", params.client_info);
        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec![
                        ".".to_string(),
                        ":".to_string(),
                        "-".to_string(),
                    ]),
                    resolve_provider: Some(false),
                    ..Default::default()
                }),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                code_action_provider: Some(CodeActionProviderCapability::Simple(true)),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "appconfig-language-server".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        info!("initialized");
        // Kick one project pass so documents opened before the handshake
        // finished get validated.
        let _ = self
            .reconcile_tx
            .send(ProjectReconcileRequest {
                project: WORKSPACE_PROJECT.to_string(),
                trigger: ReconcileTrigger::Documents,
            })
            .await;
    }

    async fn shutdown(&self) -> jsonrpc::Result<()> {
        info!("shutdown requested");
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;
        info!("didOpen: {} (version {})", uri, version);
        self.documents
            .open(uri.clone(), params.text_document.text, version);
        self.validate_and_publish(&uri).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;
        // Full sync: the last change carries the whole document.
        let Some(change) = params.content_changes.into_iter().last() else {
            return;
        };
        if !self.documents.update(&uri, change.text, version) {
            warn!("didChange for unknown document {}", uri);
            return;
        }
        self.validate_and_publish(&uri).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        info!("didClose: {}", uri);
        self.documents.close(&uri);
        self.problems.remove(&uri);
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }

    async fn completion(
        &self,
        params: CompletionParams,
    ) -> jsonrpc::Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        let Some(snapshot) = self.documents.snapshot(&uri) else {
            return Ok(None);
        };

        // Completion stays useful on structurally broken documents by
        // simply yielding nothing; the parser is already editor-tolerant
        // for the common mid-keystroke shapes.
        let Ok(root) = snapshot.dialect.parse(&snapshot.text) else {
            return Ok(None);
        };
        let offset = position_to_offset(&snapshot.text, position);
        let session = self.current_session();
        let proposals = complete(&session, &root, &snapshot.text, offset);
        if proposals.is_empty() {
            return Ok(None);
        }

        let items = proposals
            .iter()
            .enumerate()
            .map(|(rank, proposal)| self.proposal_to_item(&snapshot.text, rank, proposal))
            .collect();
        Ok(Some(CompletionResponse::Array(items)))
    }

    async fn hover(&self, params: HoverParams) -> jsonrpc::Result<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        let Some(snapshot) = self.documents.snapshot(&uri) else {
            return Ok(None);
        };
        let Ok(root) = snapshot.dialect.parse(&snapshot.text) else {
            return Ok(None);
        };
        let offset = position_to_offset(&snapshot.text, position);
        let session = self.current_session();

        Ok(
            engine_hover(&session, &root, &snapshot.text, offset).map(|doc| Hover {
                contents: HoverContents::Markup(MarkupContent {
                    kind: MarkupKind::Markdown,
                    value: doc.markdown,
                }),
                range: Some(span_to_range(&snapshot.text, doc.span)),
            }),
        )
    }

    async fn code_action(
        &self,
        params: CodeActionParams,
    ) -> jsonrpc::Result<Option<CodeActionResponse>> {
        let uri = params.text_document.uri;
        let Some(snapshot) = self.documents.snapshot(&uri) else {
            return Ok(None);
        };
        let Some(problems) = self.problems.get(&uri) else {
            return Ok(None);
        };

        let start = position_to_offset(&snapshot.text, params.range.start);
        let end = position_to_offset(&snapshot.text, params.range.end);

        let mut actions: Vec<CodeActionOrCommand> = Vec::new();
        for problem in problems.iter() {
            if problem.span.start > end || problem.span.end < start {
                continue;
            }
            for fix in &problem.quick_fixes {
                let mut changes = HashMap::new();
                changes.insert(
                    fix.uri.clone(),
                    vec![TextEdit {
                        range: span_to_range(&snapshot.text, fix.span),
                        new_text: fix.replacement.clone(),
                    }],
                );
                actions.push(CodeActionOrCommand::CodeAction(CodeAction {
                    title: fix.title.clone(),
                    kind: Some(CodeActionKind::QUICKFIX),
                    diagnostics: Some(vec![problem_to_diagnostic(&snapshot.text, problem)]),
                    edit: Some(WorkspaceEdit {
                        changes: Some(changes),
                        ..Default::default()
                    }),
                    ..Default::default()
                }));
            }
        }

        if actions.is_empty() {
            Ok(None)
        } else {
            Ok(Some(actions))
        }
    }
}
