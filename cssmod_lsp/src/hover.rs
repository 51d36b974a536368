//! Hover rendering for CSS-module classes
//!
//! Resolves `identifier.property` like definition does, then shows the raw
//! rule text from the tool's class-body mode as a fenced CSS block.

use std::path::Path;

use tower_lsp::lsp_types::*;

use crate::backend::Backend;
use crate::navigation::property_access_at;

pub async fn hover(backend: &Backend, uri: &Url, position: Position) -> Option<Hover> {
    let runner = backend.runner().await?;
    let content = backend.document(uri)?;

    let access = property_access_at(&content, position)?;
    let doc_path = uri.to_file_path().ok()?;

    let imports = match runner.imports(&doc_path).await {
        Ok(imports) => imports,
        Err(e) => {
            tracing::warn!("imports query failed: {e}");
            return None;
        }
    };
    let stylesheet = imports.source_for(&access.identifier)?.to_string();

    let body = match runner
        .class_body(Path::new(&stylesheet), &access.property)
        .await
    {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!("class-body query failed: {e}");
            return None;
        }
    };
    if body.trim().is_empty() {
        return None;
    }

    Some(render_class_hover(&body))
}

/// Raw rule text as a fenced CSS block.
pub fn render_class_hover(body: &str) -> Hover {
    Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: format!("CSS class\n```css\n{}\n```", body.trim_end()),
        }),
        range: None,
    }
}
