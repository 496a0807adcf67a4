//! Minimal `{{ field }}` template rendering.
//!
//! Campaign subject and body templates reference recipient-row fields by
//! name. Unknown fields render as the empty string, so a sparse row never
//! fails a send.

use ahash::AHashMap;

/// Render a template against a field map.
///
/// Placeholders are `{{ name }}` with optional inner whitespace. Anything
/// that does not parse as a placeholder is emitted verbatim, including a
/// lone `{{` with no closing braces.
#[must_use]
pub fn render(template: &str, fields: &AHashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let name = after[..end].trim();
                if let Some(value) = fields.get(name) {
                    out.push_str(value);
                }
                rest = &after[end + 2..];
            }
            None => {
                // Unterminated placeholder, emit as-is
                out.push_str(&rest[start..]);
                return out;
            }
        }
    }

    out.push_str(rest);
    out
}
