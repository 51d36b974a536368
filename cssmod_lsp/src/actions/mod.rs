//! Code actions for cssmod LSP
//!
//! Quick fixes for lint findings and the inline-style extraction entry.

pub mod extract;
mod quickfix;

pub use quickfix::disable_rule_fixes;

use tower_lsp::lsp_types::*;

use crate::backend::Backend;

/// Collect actions for `textDocument/codeAction`.
pub async fn code_actions(backend: &Backend, params: CodeActionParams) -> Option<CodeActionResponse> {
    let uri = params.text_document.uri;
    let range = params.range;
    tracing::debug!("code_action: {} at {:?}", uri, range);

    let mut actions: Vec<CodeActionOrCommand> = Vec::new();

    let diagnostics_in_range: Vec<Diagnostic> = backend
        .published_for(&uri)
        .into_iter()
        .filter(|diagnostic| ranges_overlap(&diagnostic.range, &range))
        .collect();
    for action in disable_rule_fixes(&uri, &diagnostics_in_range) {
        actions.push(CodeActionOrCommand::CodeAction(action));
    }

    if let Some(content) = backend.document(&uri) {
        if let Some(action) = extract::refactor_entry(&uri, &content, range) {
            actions.push(CodeActionOrCommand::CodeAction(action));
        }
    }

    if actions.is_empty() { None } else { Some(actions) }
}

/// Check if two ranges overlap
pub(crate) fn ranges_overlap(a: &Range, b: &Range) -> bool {
    !(a.end.line < b.start.line
        || (a.end.line == b.start.line && a.end.character < b.start.character)
        || b.end.line < a.start.line
        || (b.end.line == a.start.line && b.end.character < a.start.character))
}
