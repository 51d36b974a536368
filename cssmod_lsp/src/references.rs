//! Find-references for CSS class names via the linter's usages mode

use std::path::Path;

use tower_lsp::lsp_types::*;

use cssmod::protocol::{resolve_workspace_path, UsageRecord};

use crate::backend::Backend;

pub async fn references(
    backend: &Backend,
    uri: &Url,
    position: Position,
) -> Option<Vec<Location>> {
    let runner = backend.runner().await?;
    let root = backend.workspace_root().await?;
    let content = backend.document(uri)?;

    let class_name = class_name_at(&content, position)?;
    let doc_path = uri.to_file_path().ok()?;

    let records = match runner.usages(&doc_path, &class_name).await {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!("usages query failed: {e}");
            return None;
        }
    };

    let locations = usages_to_locations(&root, records);
    if locations.is_empty() {
        None
    } else {
        Some(locations)
    }
}

/// Class-name token under the cursor. CSS class characters include `-`,
/// unlike source-side identifiers.
pub fn class_name_at(text: &str, position: Position) -> Option<String> {
    let line = text.lines().nth(position.line as usize)?;
    let chars: Vec<char> = line.chars().collect();
    let cursor = (position.character as usize).min(chars.len());

    if !chars.get(cursor).copied().map(is_class_char).unwrap_or(false)
        && !(cursor > 0 && is_class_char(chars[cursor - 1]))
    {
        return None;
    }

    let mut start = cursor;
    while start > 0 && is_class_char(chars[start - 1]) {
        start -= 1;
    }
    let mut end = cursor;
    while end < chars.len() && is_class_char(chars[end]) {
        end += 1;
    }
    if start == end {
        return None;
    }
    Some(chars[start..end].iter().collect())
}

fn is_class_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Usage records as LSP locations rooted at the workspace.
pub fn usages_to_locations(root: &Path, records: Vec<UsageRecord>) -> Vec<Location> {
    records
        .into_iter()
        .filter_map(|record| {
            let path = resolve_workspace_path(root, &record.path);
            let uri = Url::from_file_path(&path).ok()?;
            let start = Position {
                line: record.line,
                character: record.column,
            };
            let end = Position {
                line: record.line,
                character: record.column + record.length,
            };
            Some(Location {
                uri,
                range: Range { start, end },
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cssmod::protocol::parse_usages;

    fn pos(line: u32, character: u32) -> Position {
        Position { line, character }
    }

    #[test]
    fn class_names_include_hyphens() {
        assert_eq!(
            class_name_at(".btn-active {", pos(0, 3)).as_deref(),
            Some("btn-active")
        );
    }

    #[test]
    fn cursor_on_punctuation_yields_none() {
        assert_eq!(class_name_at(".btn {", pos(0, 5)), None);
    }

    #[test]
    fn usages_map_to_workspace_rooted_locations() {
        let records = parse_usages("./src/App.tsx:12:8:6");
        let locations = usages_to_locations(Path::new("/work"), records);
        assert_eq!(locations.len(), 1);
        assert!(locations[0].uri.path().ends_with("/work/src/App.tsx"));
        assert_eq!(locations[0].range.start, pos(11, 8));
        assert_eq!(locations[0].range.end, pos(11, 14));
    }
}
