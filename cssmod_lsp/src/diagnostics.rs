//! Workspace lint diagnostics for cssmod LSP
//!
//! Runs the linter over the whole workspace and publishes one diagnostic
//! set per affected file. Each run replaces the previous one entirely:
//! the tool only mentions files that still have findings, so files that
//! went quiet get an explicit empty publish.

use std::collections::HashMap;
use std::path::Path;

use tower_lsp::lsp_types::*;

use cssmod::protocol::{resolve_workspace_path, LintRecord};

use crate::backend::Backend;

/// Re-lint the workspace and republish every affected file.
pub async fn refresh(backend: &Backend) {
    let Some(runner) = backend.runner().await else {
        return;
    };
    let Some(root) = backend.workspace_root().await else {
        return;
    };

    let records = match runner.lint().await {
        Ok(records) => records,
        Err(e) => {
            // Contained: one failed lint pass keeps the previous set.
            tracing::warn!("lint failed: {e}");
            return;
        }
    };
    tracing::debug!("lint reported {} findings", records.len());

    let fresh = group_by_file(&root, records);

    let stale: Vec<Url> = backend
        .published_uris()
        .into_iter()
        .filter(|uri| !fresh.contains_key(uri))
        .collect();
    for uri in stale {
        backend.publish(uri, Vec::new()).await;
    }
    for (uri, diagnostics) in fresh {
        backend.publish(uri, diagnostics).await;
    }
}

/// Group lint records into per-file LSP diagnostics.
pub fn group_by_file(root: &Path, records: Vec<LintRecord>) -> HashMap<Url, Vec<Diagnostic>> {
    let mut map: HashMap<Url, Vec<Diagnostic>> = HashMap::new();
    for record in records {
        let path = resolve_workspace_path(root, &record.path);
        let Ok(uri) = Url::from_file_path(&path) else {
            tracing::debug!("skipping unmappable lint path: {}", path.display());
            continue;
        };
        map.entry(uri).or_default().push(to_diagnostic(&record));
    }
    map
}

/// One lint record as a positioned, severity-tagged LSP diagnostic.
fn to_diagnostic(record: &LintRecord) -> Diagnostic {
    let start = Position {
        line: record.line,
        character: record.column,
    };
    let end = Position {
        line: record.line,
        character: record.column + record.length,
    };
    Diagnostic {
        range: Range { start, end },
        severity: Some(DiagnosticSeverity::WARNING),
        code: None,
        code_description: None,
        source: Some("cssmod".to_string()),
        message: record.message.clone(),
        related_information: None,
        tags: None,
        data: None,
    }
}
