//! Record labels: template or function rendering, and the short text shown in form fields.

use crate::config::{LabelRenderer, Registry, ResourceConfig};
use crate::error::AppError;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<label[^>]*>(.*)</label>").expect("label regex"))
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("tag regex"))
}

/// Entities produced by the template escaper, decoded back to text. `&amp;` goes last.
const ENTITIES: &[(&str, &str)] = &[
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#x27;", "'"),
    ("&#39;", "'"),
    ("&#x60;", "`"),
    ("&#x3D;", "="),
    ("&nbsp;", " "),
    ("&amp;", "&"),
];

/// Full rendering of a record: template output as markup, or the label function's text.
/// None when the resource has no label renderer.
pub fn render_record(registry: &Registry, config: &ResourceConfig, record: &Value) -> Result<Option<String>, AppError> {
    match config.label() {
        None => Ok(None),
        Some(LabelRenderer::Function(f)) => Ok(Some(f(record))),
        Some(LabelRenderer::Template(name)) => registry
            .templates()
            .render(name, record)
            .map(Some)
            .map_err(|e| AppError::Template(format!("{}: {}", name, e))),
    }
}

/// Inner markup of the first `<label>` element, or the whole text when there is none.
pub fn extract_label(rendered: &str) -> &str {
    label_re()
        .captures(rendered)
        .and_then(|c| c.get(1))
        .map_or(rendered, |m| m.as_str())
}

/// Plain text of a markup snippet: tags dropped, escaped characters restored.
pub fn markup_text(markup: &str) -> String {
    let stripped = tag_re().replace_all(markup, "");
    ENTITIES
        .iter()
        .fold(stripped.into_owned(), |text, (entity, ch)| text.replace(entity, ch))
}

/// Short plain-text label for a form field showing `record`. Callers escape it for their context.
pub fn label_for_field(registry: &Registry, config: &ResourceConfig, record: &Value) -> Result<Option<String>, AppError> {
    Ok(match (config.label(), render_record(registry, config, record)?) {
        (Some(LabelRenderer::Template(_)), Some(rendered)) => Some(markup_text(extract_label(&rendered))),
        (_, rendered) => rendered,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, HookTable, PickerConfig};
    use serde_json::json;

    fn registry() -> Registry {
        let config: PickerConfig = serde_json::from_value(json!({
            "templates": {
                "user": "<li class=\"user\"><label for=\"x\">{{first_name}} {{last_name}}</label> <em>{{email}}</em></li>",
                "plain": "{{first_name}}"
            },
            "resources": [
                {
                    "controller": "users", "table": "users",
                    "columns": [{ "name": "id", "type": "integer" }],
                    "label": { "template": "user" }
                },
                {
                    "controller": "plain", "table": "users",
                    "columns": [{ "name": "id", "type": "integer" }],
                    "label": { "template": "plain" }
                },
                {
                    "controller": "named", "table": "users",
                    "columns": [{ "name": "id", "type": "integer" }],
                    "label": { "columns": ["last_name", "first_name"], "separator": ", " }
                },
                {
                    "controller": "bare", "table": "users",
                    "columns": [{ "name": "id", "type": "integer" }]
                }
            ]
        }))
        .unwrap();
        resolve(&config, &HookTable::new()).unwrap()
    }

    fn jo() -> Value {
        json!({ "id": 1, "first_name": "Jo", "last_name": "Smith", "email": "jo@example.com" })
    }

    #[test]
    fn template_label_is_the_label_element_text() {
        let reg = registry();
        let users = reg.resource("users").unwrap();
        assert_eq!(label_for_field(&reg, users, &jo()).unwrap().as_deref(), Some("Jo Smith"));
        let full = render_record(&reg, users, &jo()).unwrap().unwrap();
        assert!(full.starts_with("<li class=\"user\">"));
        assert!(full.contains("<em>jo@example.com</em>"));
    }

    #[test]
    fn template_without_label_element_is_used_whole() {
        let reg = registry();
        let plain = reg.resource("plain").unwrap();
        assert_eq!(label_for_field(&reg, plain, &jo()).unwrap().as_deref(), Some("Jo"));
    }

    #[test]
    fn function_label_is_returned_as_is() {
        let reg = registry();
        let named = reg.resource("named").unwrap();
        assert_eq!(label_for_field(&reg, named, &jo()).unwrap().as_deref(), Some("Smith, Jo"));
    }

    #[test]
    fn no_renderer_means_no_label() {
        let reg = registry();
        assert_eq!(label_for_field(&reg, reg.resource("bare").unwrap(), &jo()).unwrap(), None);
    }

    #[test]
    fn template_label_is_plain_text() {
        let reg = registry();
        let users = reg.resource("users").unwrap();
        let record = json!({ "first_name": "<b>Jo</b>", "last_name": "& \"Co\"" });
        assert_eq!(
            label_for_field(&reg, users, &record).unwrap().as_deref(),
            Some("<b>Jo</b> & \"Co\"")
        );
    }

    #[test]
    fn markup_text_drops_tags_and_decodes_once() {
        assert_eq!(markup_text("<i>a</i> &lt;3 &amp;lt;"), "a <3 &lt;");
        assert_eq!(markup_text("x&#x3D;1"), "x=1");
    }

    #[test]
    fn extracts_first_label_contents() {
        assert_eq!(extract_label("<div><label class=\"a\">Name</label></div>"), "Name");
        assert_eq!(extract_label("no markup"), "no markup");
    }
}
