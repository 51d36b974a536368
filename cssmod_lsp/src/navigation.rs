//! Go-to-definition for CSS-module property accesses
//!
//! Resolves `identifier.property` under the cursor through the document's
//! imports map, then jumps to the property's first declaration in the
//! stylesheet the identifier was imported from.

use std::path::Path;

use tower_lsp::lsp_types::*;

use cssmod::protocol::{dedupe_classes, resolve_workspace_path, ClassRecord};

use crate::backend::Backend;

/// An `identifier.property` access around the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyAccess {
    pub identifier: String,
    pub property: String,
}

pub async fn definition(
    backend: &Backend,
    uri: &Url,
    position: Position,
) -> Option<GotoDefinitionResponse> {
    let runner = backend.runner().await?;
    let root = backend.workspace_root().await?;
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

    let records = match runner.classes(Path::new(&stylesheet)).await {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!("classes query failed: {e}");
            return None;
        }
    };

    // Exact-name matches only, first declaration wins.
    let matches = dedupe_classes(
        records
            .into_iter()
            .filter(|record| record.name == access.property)
            .collect(),
    );

    let stylesheet_path = resolve_workspace_path(&root, &stylesheet);
    let mut locations: Vec<Location> = matches
        .iter()
        .filter_map(|record| class_location(&stylesheet_path, record))
        .collect();

    match locations.len() {
        0 => None,
        1 => Some(GotoDefinitionResponse::Scalar(locations.remove(0))),
        _ => Some(GotoDefinitionResponse::Array(locations)),
    }
}

/// Jump target for one class declaration. Classes-mode positions are
/// already editor coordinates.
fn class_location(stylesheet: &Path, record: &ClassRecord) -> Option<Location> {
    let uri = Url::from_file_path(stylesheet).ok()?;
    let position = Position {
        line: record.line,
        character: record.column,
    };
    Some(Location {
        uri,
        range: Range {
            start: position,
            end: position,
        },
    })
}

/// `identifier.property` with the cursor inside or at the edge of the
/// property word.
pub fn property_access_at(text: &str, position: Position) -> Option<PropertyAccess> {
    let line = text.lines().nth(position.line as usize)?;
    let chars: Vec<char> = line.chars().collect();
    let cursor = (position.character as usize).min(chars.len());

    // Property word boundaries around the cursor.
    let mut start = cursor;
    while start > 0 && is_word_char(chars[start - 1]) {
        start -= 1;
    }
    let mut end = cursor;
    while end < chars.len() && is_word_char(chars[end]) {
        end += 1;
    }
    if start == end {
        return None;
    }

    // The property must be preceded by `identifier.`
    if start == 0 || chars[start - 1] != '.' {
        return None;
    }
    let mut ident_start = start - 1;
    while ident_start > 0 && is_identifier_char(chars[ident_start - 1]) {
        ident_start -= 1;
    }
    if ident_start == start - 1 {
        return None;
    }

    Some(PropertyAccess {
        identifier: chars[ident_start..start - 1].iter().collect(),
        property: chars[start..end].iter().collect(),
    })
}

/// `identifier.` immediately before the cursor (completion trigger shape).
pub fn identifier_before_dot(text: &str, position: Position) -> Option<String> {
    let line = text.lines().nth(position.line as usize)?;
    let chars: Vec<char> = line.chars().collect();
    let cursor = (position.character as usize).min(chars.len());

    if cursor == 0 || chars[cursor - 1] != '.' {
        return None;
    }
    let mut start = cursor - 1;
    while start > 0 && is_identifier_char(chars[start - 1]) {
        start -= 1;
    }
    if start == cursor - 1 {
        return None;
    }
    Some(chars[start..cursor - 1].iter().collect())
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Import identifiers additionally allow `$`.
fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(line: u32, character: u32) -> Position {
        Position { line, character }
    }

    #[test]
    fn access_resolves_in_the_middle_of_the_property() {
        let text = "<div className={styles.header}>";
        let access = property_access_at(text, pos(0, 25)).expect("access");
        assert_eq!(access.identifier, "styles");
        assert_eq!(access.property, "header");
    }

    #[test]
    fn access_resolves_at_the_property_start() {
        let access = property_access_at("styles.btn", pos(0, 7)).expect("access");
        assert_eq!(access.identifier, "styles");
        assert_eq!(access.property, "btn");
    }

    #[test]
    fn dollar_identifiers_resolve() {
        let access = property_access_at("$style.active", pos(0, 9)).expect("access");
        assert_eq!(access.identifier, "$style");
        assert_eq!(access.property, "active");
    }

    #[test]
    fn bare_words_are_not_accesses() {
        assert_eq!(property_access_at("header", pos(0, 3)), None);
        assert_eq!(property_access_at(".header", pos(0, 3)), None);
    }

    #[test]
    fn cursor_off_any_word_yields_none() {
        assert_eq!(property_access_at("styles.btn  ", pos(0, 11)), None);
        assert_eq!(property_access_at("a", pos(5, 0)), None);
    }

    #[test]
    fn identifier_before_dot_matches_the_completion_shape() {
        assert_eq!(
            identifier_before_dot("styles.", pos(0, 7)).as_deref(),
            Some("styles")
        );
        assert_eq!(
            identifier_before_dot("  theme.", pos(0, 8)).as_deref(),
            Some("theme")
        );
        assert_eq!(identifier_before_dot("styles", pos(0, 6)), None);
        assert_eq!(identifier_before_dot(".", pos(0, 1)), None);
    }

    #[test]
    fn class_location_points_at_the_declaration() {
        let record = ClassRecord {
            name: "btn".to_string(),
            line: 1,
            column: 0,
        };
        let location =
            class_location(Path::new("/work/app.module.css"), &record).expect("location");
        assert!(location.uri.path().ends_with("/work/app.module.css"));
        assert_eq!(location.range.start, pos(1, 0));
    }
}
