//! Class-name completion after `identifier.`

use std::collections::BTreeSet;
use std::path::Path;

use tower_lsp::lsp_types::*;

use cssmod::protocol::ClassRecord;

use crate::backend::Backend;
use crate::navigation::identifier_before_dot;

pub async fn completions(
    backend: &Backend,
    uri: &Url,
    position: Position,
) -> Option<CompletionResponse> {
    let runner = backend.runner().await?;
    let content = backend.document(uri)?;

    let identifier = identifier_before_dot(&content, position)?;
    let doc_path = uri.to_file_path().ok()?;

    let imports = match runner.imports(&doc_path).await {
        Ok(imports) => imports,
        Err(e) => {
            tracing::warn!("imports query failed: {e}");
            return None;
        }
    };
    let stylesheet = imports.source_for(&identifier)?.to_string();

    let records = match runner.classes(Path::new(&stylesheet)).await {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!("classes query failed: {e}");
            return None;
        }
    };

    let items = completion_items(records);
    if items.is_empty() {
        None
    } else {
        Some(CompletionResponse::Array(items))
    }
}

/// Deterministic candidate list: names de-duplicated and sorted.
pub fn completion_items(records: Vec<ClassRecord>) -> Vec<CompletionItem> {
    let names: BTreeSet<String> = records.into_iter().map(|record| record.name).collect();
    names
        .into_iter()
        .map(|name| CompletionItem {
            label: name.clone(),
            kind: Some(CompletionItemKind::VARIABLE),
            detail: Some(format!(".{name} CSS class")),
            insert_text: Some(name),
            ..Default::default()
        })
        .collect()
}
