//! Parsers for the linter's stdout protocol.
//!
//! The grammar is line-oriented: each non-empty line splits on `:` into
//! fragments whose count and meaning depend on the subprocess mode that
//! produced the output. Parsing is tolerant — a line with too few fragments
//! or non-numeric position fields is dropped rather than failing the batch.
//! The one exception is the imports mode, whose whole output is a single
//! JSON object and parses strictly.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use crate::error::ToolError;

/// One lint finding.
///
/// Lines and columns are 0-based editor coordinates; the wire format
/// carries 1-based lines, converted at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintRecord {
    pub path: String,
    pub line: u32,
    pub column: u32,
    pub length: u32,
    pub message: String,
}

/// A class declaration inside one stylesheet, positions as emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassRecord {
    pub name: String,
    pub line: u32,
    pub column: u32,
}

/// One occurrence of a class name somewhere in the workspace.
///
/// Same coordinate convention as [`LintRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageRecord {
    pub path: String,
    pub line: u32,
    pub column: u32,
    pub length: u32,
}

/// Identifier -> stylesheet path bindings for one source document.
///
/// Values are not unique: two identifiers may import the same stylesheet,
/// so reverse lookups scan entries instead of assuming a bijection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportsMap {
    entries: BTreeMap<String, String>,
}

impl ImportsMap {
    /// Strict parse of the imports-mode JSON object.
    pub fn parse(output: &str) -> Result<Self, ToolError> {
        let entries: BTreeMap<String, String> = serde_json::from_str(output.trim())
            .map_err(|e| ToolError::ImportsMap(e.to_string()))?;
        Ok(Self { entries })
    }

    /// Stylesheet path a local identifier was imported from.
    pub fn source_for(&self, identifier: &str) -> Option<&str> {
        self.entries.get(identifier).map(String::as_str)
    }

    /// First identifier bound to the given stylesheet path.
    pub fn identifier_for(&self, path: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, source)| source.as_str() == path)
            .map(|(identifier, _)| identifier.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lint mode: `path:line:col:len:message` per finding.
pub fn parse_lint(output: &str) -> Vec<LintRecord> {
    output.lines().filter_map(parse_lint_line).collect()
}

fn parse_lint_line(line: &str) -> Option<LintRecord> {
    let frags: Vec<&str> = line.split(':').collect();
    if frags.len() < 5 {
        return None;
    }
    let line_no: u32 = frags[1].parse().ok()?;
    let column = frags[2].parse().ok()?;
    let length = frags[3].parse().ok()?;
    Some(LintRecord {
        path: frags[0].to_string(),
        line: line_no.saturating_sub(1),
        column,
        length,
        // The message may itself contain `:`; everything after the length
        // fragment belongs to it.
        message: frags[4..].join(":"),
    })
}

/// Classes mode: `name:line:col` per declaration, order preserved.
pub fn parse_classes(output: &str) -> Vec<ClassRecord> {
    output
        .lines()
        .filter_map(|line| {
            let frags: Vec<&str> = line.split(':').collect();
            if frags.len() < 3 {
                return None;
            }
            Some(ClassRecord {
                name: frags[0].to_string(),
                line: frags[1].parse().ok()?,
                column: frags[2].parse().ok()?,
            })
        })
        .collect()
}

/// Usages mode: `path:line:col:len` per occurrence.
pub fn parse_usages(output: &str) -> Vec<UsageRecord> {
    output
        .lines()
        .filter_map(|line| {
            let frags: Vec<&str> = line.split(':').collect();
            if frags.len() < 4 {
                return None;
            }
            let line_no: u32 = frags[1].parse().ok()?;
            Some(UsageRecord {
                path: frags[0].to_string(),
                line: line_no.saturating_sub(1),
                column: frags[2].parse().ok()?,
                length: frags[3].parse().ok()?,
            })
        })
        .collect()
}

/// Drop repeat declarations of a class name, keeping the lowest
/// (line, column) per name. Output is sorted by position.
pub fn dedupe_classes(mut records: Vec<ClassRecord>) -> Vec<ClassRecord> {
    records.sort_by(|a, b| a.line.cmp(&b.line).then(a.column.cmp(&b.column)));
    let mut seen = HashSet::new();
    records.retain(|record| seen.insert(record.name.clone()));
    records
}

/// Join tool-reported paths onto the workspace root.
///
/// Dot-relative paths lose their leading `./` and join the root; any other
/// relative path joins too; absolute paths pass through.
pub fn resolve_workspace_path(root: &Path, raw: &str) -> PathBuf {
    let trimmed = raw.strip_prefix("./").unwrap_or(raw);
    let candidate = Path::new(trimmed);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    }
}
