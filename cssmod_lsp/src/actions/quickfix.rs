//! Quick fixes for lint findings

use std::collections::HashMap;

use tower_lsp::lsp_types::*;

const DISABLE_RULE: &str = "/* css-lint-disable-rule unused-class*/";

/// One preferred quick fix per finding: insert the disable comment on its
/// own line above the flagged one.
pub fn disable_rule_fixes(uri: &Url, diagnostics: &[Diagnostic]) -> Vec<CodeAction> {
    diagnostics
        .iter()
        .map(|diagnostic| {
            let insert_at = Position {
                line: diagnostic.range.start.line,
                character: 0,
            };
            let edit = TextEdit {
                range: Range {
                    start: insert_at,
                    end: insert_at,
                },
                new_text: format!("{DISABLE_RULE}\n"),
            };
            let mut changes = HashMap::new();
            changes.insert(uri.clone(), vec![edit]);
            CodeAction {
                title: format!("Add {DISABLE_RULE}"),
                kind: Some(CodeActionKind::QUICKFIX),
                diagnostics: Some(vec![diagnostic.clone()]),
                edit: Some(WorkspaceEdit {
                    changes: Some(changes),
                    ..Default::default()
                }),
                command: None,
                is_preferred: Some(true),
                disabled: None,
                data: None,
            }
        })
        .collect()
}
