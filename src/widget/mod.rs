//! Client widget protocol: the descriptor a page hands to the RecordSelect script, and its two
//! serializations (inline script or data attributes).

mod helpers;
mod label;

pub use helpers::{
    record_select_id, AutocompleteOptions, FieldOptions, LinkOptions, Widget, Widgets,
};
pub use label::{extract_label, label_for_field, markup_text, render_record};

use crate::error::AppError;
use handlebars::html_escape;
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum WidgetKind {
    Dialog,
    Single,
    Autocomplete,
    Multiple,
}

impl WidgetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            WidgetKind::Dialog => "Dialog",
            WidgetKind::Single => "Single",
            WidgetKind::Autocomplete => "Autocomplete",
            WidgetKind::Multiple => "Multiple",
        }
    }
}

/// How the descriptor reaches the browser.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderMode {
    /// Inline `<script>` that constructs the widget; used for responses inserted by script.
    Script,
    /// `data-rs-*` attributes picked up by the client on page load.
    #[default]
    Attributes,
}

/// Wire shape: `{type, id, url, options}`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WidgetDescriptor {
    #[serde(rename = "type")]
    pub kind: WidgetKind,
    /// DOM id of the element the widget attaches to.
    pub id: String,
    pub url: String,
    pub options: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WidgetMarkup {
    /// A complete `<script>` element, placed after the widget's element.
    Script(String),
    /// Attribute text (leading space included) for the widget's element.
    Attributes(String),
}

fn to_json<T: Serialize>(v: &T) -> Result<String, AppError> {
    serde_json::to_string(v).map_err(|e| AppError::Serialization(e.to_string()))
}

impl WidgetDescriptor {
    pub fn new(kind: WidgetKind, id: impl Into<String>, url: impl Into<String>, options: Map<String, Value>) -> Self {
        WidgetDescriptor {
            kind,
            id: id.into(),
            url: url.into(),
            options,
        }
    }

    pub fn serialize(&self, mode: RenderMode) -> Result<WidgetMarkup, AppError> {
        let options = to_json(&self.options)?;
        Ok(match mode {
            RenderMode::Script => {
                let js = format!(
                    "new RecordSelect.{}({}, {}, {});",
                    self.kind.as_str(),
                    to_json(&self.id)?,
                    to_json(&self.url)?,
                    options
                );
                // a literal "</" would close the script element early
                WidgetMarkup::Script(format!("<script>{}</script>", js.replace("</", "<\\/")))
            }
            RenderMode::Attributes => WidgetMarkup::Attributes(format!(
                " data-rs-type=\"{}\" data-rs-id=\"{}\" data-rs-url=\"{}\" data-rs-options=\"{}\"",
                self.kind.as_str(),
                html_escape(&self.id),
                html_escape(&self.url),
                html_escape(&options)
            )),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor() -> WidgetDescriptor {
        let options = json!({ "id": "record-select-users", "onselect": "" });
        WidgetDescriptor::new(
            WidgetKind::Dialog,
            "rs_1",
            "/record_select/users/browse",
            options.as_object().cloned().unwrap(),
        )
    }

    #[test]
    fn script_mode_constructs_the_widget() {
        let WidgetMarkup::Script(s) = descriptor().serialize(RenderMode::Script).unwrap() else {
            panic!("expected script");
        };
        assert!(s.starts_with("<script>new RecordSelect.Dialog(\"rs_1\", \"/record_select/users/browse\", {"));
        assert!(s.contains("\"id\":\"record-select-users\""));
        assert!(s.ends_with(");</script>"));
    }

    #[test]
    fn script_mode_escapes_closing_tags() {
        let mut d = descriptor();
        d.options.insert("onselect".into(), json!("alert('</script>')"));
        let WidgetMarkup::Script(s) = d.serialize(RenderMode::Script).unwrap() else {
            panic!("expected script");
        };
        assert_eq!(s.matches("</script>").count(), 1);
        assert!(s.contains("<\\/script>"));
    }

    #[test]
    fn attribute_mode_escapes_json() {
        let WidgetMarkup::Attributes(a) = descriptor().serialize(RenderMode::Attributes).unwrap() else {
            panic!("expected attributes");
        };
        assert!(a.starts_with(" data-rs-type=\"Dialog\" data-rs-id=\"rs_1\""));
        assert!(a.contains("data-rs-url=\"/record_select/users/browse\""));
        assert!(a.contains("data-rs-options=\"{&quot;id&quot;:&quot;record-select-users&quot;"));
        assert!(!a.contains("{\""));
    }

    #[test]
    fn descriptor_wire_shape() {
        let v = serde_json::to_value(descriptor()).unwrap();
        assert_eq!(v["type"], json!("Dialog"));
        assert_eq!(v["id"], json!("rs_1"));
        assert_eq!(v["options"]["onselect"], json!(""));
    }
}
