//! Inline-style extraction: `style={{ ... }}` literals to CSS rule blocks.
//!
//! Pure conversion only; the editor adapter decides where the selection
//! comes from and applies the resulting edits. Every step returns `None`
//! on invalid input so callers can abort before touching any document.

use heck::ToKebabCase;

/// Pulls the object literal out of a `style={{ ... }}` selection,
/// returned in JSON5 object syntax.
pub fn extract_style_literal(selection: &str) -> Option<String> {
    let selection = selection.trim();
    let inner = selection
        .strip_prefix("style={{")?
        .strip_suffix("}}")?;
    Some(format!("{{{inner}}}"))
}

/// Parses the literal as JSON5 and flattens it to `(property, value)`
/// pairs. Only scalar values are valid; anything nested rejects the
/// whole literal.
pub fn style_properties(literal: &str) -> Option<Vec<(String, String)>> {
    let value: serde_json::Value = json_five::from_str(literal).ok()?;
    let object = value.as_object()?;
    let mut properties = Vec::with_capacity(object.len());
    for (key, value) in object {
        let rendered = match value {
            serde_json::Value::String(text) => text.clone(),
            serde_json::Value::Number(number) => number.to_string(),
            serde_json::Value::Bool(flag) => flag.to_string(),
            _ => return None,
        };
        properties.push((css_property_name(key), rendered));
    }
    Some(properties)
}

/// camelCase -> kebab-case. A leading capital marks a vendor prefix and
/// keeps its dash: `WebkitTransform` -> `-webkit-transform`.
pub fn css_property_name(key: &str) -> String {
    let kebab = key.to_kebab_case();
    if key.starts_with(|c: char| c.is_ascii_uppercase()) {
        format!("-{kebab}")
    } else {
        kebab
    }
}

/// Identifier-safe class names: keep ASCII alphanumerics and `_`, then
/// strip leading digits.
pub fn sanitize_class_name(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    kept.trim_start_matches(|c: char| c.is_ascii_digit())
        .to_string()
}

/// Renders the rule block appended to the destination stylesheet.
pub fn rule_block(class_name: &str, properties: &[(String, String)]) -> String {
    let body = properties
        .iter()
        .map(|(property, value)| format!("    {property}: {value}"))
        .collect::<Vec<_>>()
        .join(";\n");
    format!(".{class_name} {{\n{body};\n}}\n")
}

/// The whole pipeline: selection text and requested name to
/// (sanitized class name, rule block). `None` the moment any step fails;
/// callers apply no edits in that case.
pub fn convert_selection(selection: &str, class_name: &str) -> Option<(String, String)> {
    let literal = extract_style_literal(selection)?;
    let properties = style_properties(&literal)?;
    let name = sanitize_class_name(class_name);
    if name.is_empty() || properties.is_empty() {
        return None;
    }
    let rule = rule_block(&name, &properties);
    Some((name, rule))
}
