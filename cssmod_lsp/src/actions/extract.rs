//! Inline-style extraction command
//!
//! The client gathers the destination stylesheet and new class name with
//! its own prompting UI, then invokes `cssmod.extractInlineStyle`.
//! Everything is computed and validated first; a single WorkspaceEdit then
//! carries both the source rewrite and the stylesheet append, so no
//! failure can leave one file changed and the other untouched.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Context};
use serde::Deserialize;
use tower_lsp::lsp_types::*;

use cssmod::convert;
use cssmod::protocol::resolve_workspace_path;

use crate::backend::{Backend, EXTRACT_COMMAND};

/// Arguments of `cssmod.extractInlineStyle`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractArgs {
    pub uri: Url,
    pub range: Range,
    /// Destination stylesheet, as listed in the document's imports map.
    pub stylesheet: String,
    pub class_name: String,
}

/// Execute the command. Returns whether the client applied the edit.
pub async fn run(backend: &Backend, arguments: Vec<serde_json::Value>) -> anyhow::Result<bool> {
    let raw = arguments
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("missing command arguments"))?;
    let args: ExtractArgs =
        serde_json::from_value(raw).context("malformed command arguments")?;

    let runner = backend
        .runner()
        .await
        .ok_or_else(|| anyhow!("css-linter is not installed"))?;
    let root = backend
        .workspace_root()
        .await
        .ok_or_else(|| anyhow!("no workspace root"))?;
    let content = backend
        .document(&args.uri)
        .ok_or_else(|| anyhow!("document is not open"))?;

    let selection =
        slice_range(&content, args.range).ok_or_else(|| anyhow!("selection is out of bounds"))?;
    let (class_name, rule) = convert::convert_selection(&selection, &args.class_name)
        .ok_or_else(|| anyhow!("selection is not an inline style literal, or the class name is empty"))?;

    let doc_path = args
        .uri
        .to_file_path()
        .map_err(|_| anyhow!("unsupported document uri"))?;
    let imports = runner
        .imports(&doc_path)
        .await
        .context("imports query failed")?;
    // Reverse lookup: the destination arrived as a stylesheet path; the
    // rewritten source needs the identifier bound to it. Values are not
    // unique, the first binding wins.
    let identifier = imports
        .identifier_for(&args.stylesheet)
        .ok_or_else(|| anyhow!("{} is not imported by this document", args.stylesheet))?
        .to_string();

    let stylesheet_path = resolve_workspace_path(&root, &args.stylesheet);
    let stylesheet_uri = Url::from_file_path(&stylesheet_path)
        .map_err(|_| anyhow!("unmappable stylesheet path"))?;
    let stylesheet_text = tokio::fs::read_to_string(&stylesheet_path)
        .await
        .with_context(|| format!("failed to read {}", stylesheet_path.display()))?;

    // Both edits or neither.
    let source_edit = TextEdit {
        range: args.range,
        new_text: format!("className={{{identifier}.{class_name}}}"),
    };
    let append_edit = append_rule_edit(&stylesheet_text, &rule);

    let mut changes: HashMap<Url, Vec<TextEdit>> = HashMap::new();
    changes.entry(args.uri.clone()).or_default().push(source_edit);
    changes.entry(stylesheet_uri).or_default().push(append_edit);

    let applied = backend
        .apply_edit(WorkspaceEdit {
            changes: Some(changes),
            ..Default::default()
        })
        .await?;
    Ok(applied)
}

/// Arguments of `cssmod.listStyleImports`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListImportsArgs {
    pub uri: Url,
}

/// Destination candidates for the extraction picker: the document's
/// identifier -> stylesheet bindings as one JSON object.
pub async fn list_imports(
    backend: &Backend,
    arguments: Vec<serde_json::Value>,
) -> anyhow::Result<serde_json::Value> {
    let raw = arguments
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("missing command arguments"))?;
    let args: ListImportsArgs =
        serde_json::from_value(raw).context("malformed command arguments")?;

    let runner = backend
        .runner()
        .await
        .ok_or_else(|| anyhow!("css-linter is not installed"))?;
    let doc_path = args
        .uri
        .to_file_path()
        .map_err(|_| anyhow!("unsupported document uri"))?;
    let imports = runner
        .imports(&doc_path)
        .await
        .context("imports query failed")?;

    let map: serde_json::Map<String, serde_json::Value> = imports
        .entries()
        .map(|(identifier, path)| {
            (
                identifier.to_string(),
                serde_json::Value::String(path.to_string()),
            )
        })
        .collect();
    Ok(serde_json::Value::Object(map))
}

/// Offer the extraction as a refactor action when the selection looks like
/// an inline style literal. The command arguments are completed
/// client-side (destination prompt, class-name prompt).
pub fn refactor_entry(uri: &Url, content: &str, range: Range) -> Option<CodeAction> {
    let selection = slice_range(content, range)?;
    convert::extract_style_literal(&selection)?;
    Some(CodeAction {
        title: "Extract inline style to CSS module".to_string(),
        kind: Some(CodeActionKind::REFACTOR_EXTRACT),
        diagnostics: None,
        edit: None,
        command: Some(Command {
            title: "Extract inline style".to_string(),
            command: EXTRACT_COMMAND.to_string(),
            arguments: Some(vec![serde_json::json!({ "uri": uri, "range": range })]),
        }),
        is_preferred: None,
        disabled: None,
        data: None,
    })
}

/// Edit appending the rule after the stylesheet's last line.
fn append_rule_edit(stylesheet_text: &str, rule: &str) -> TextEdit {
    let at = Position {
        line: stylesheet_text.lines().count() as u32,
        character: 0,
    };
    let prefix = if stylesheet_text.is_empty() || stylesheet_text.ends_with('\n') {
        ""
    } else {
        "\n"
    };
    TextEdit {
        range: Range { start: at, end: at },
        new_text: format!("{prefix}{rule}"),
    }
}

/// Text inside a selection range, across lines if needed.
fn slice_range(text: &str, range: Range) -> Option<String> {
    let lines: Vec<&str> = text.lines().collect();
    let start_line = lines.get(range.start.line as usize)?;
    let end_line = lines.get(range.end.line as usize)?;

    if range.start.line == range.end.line {
        let chars: Vec<char> = start_line.chars().collect();
        let start = range.start.character as usize;
        let end = (range.end.character as usize).min(chars.len());
        if start > end {
            return None;
        }
        return Some(chars[start..end].iter().collect());
    }
    if range.start.line > range.end.line {
        return None;
    }

    let mut parts: Vec<String> = Vec::new();
    let start_chars: Vec<char> = start_line.chars().collect();
    parts.push(
        start_chars
            .get(range.start.character as usize..)?
            .iter()
            .collect(),
    );
    for line in lines.get(range.start.line as usize + 1..range.end.line as usize)? {
        parts.push((*line).to_string());
    }
    let end_chars: Vec<char> = end_line.chars().collect();
    parts.push(
        end_chars
            .get(..(range.end.character as usize).min(end_chars.len()))?
            .iter()
            .collect(),
    );
    Some(parts.join("\n"))
}
