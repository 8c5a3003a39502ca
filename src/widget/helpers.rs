//! Markup helpers for the four widget kinds.

use super::label::label_for_field;
use super::{RenderMode, WidgetDescriptor, WidgetKind, WidgetMarkup};
use crate::config::{Registry, ResourceConfig};
use crate::error::{AppError, ConfigError};
use handlebars::html_escape;
use serde_json::{json, Map, Value};

/// Id the client uses for the widget container of `controller`.
pub fn record_select_id(controller: &str) -> String {
    format!("record-select-{}", controller.replace('/', "_"))
}

/// DOM id derived from an input name: `user[group_id]` → `user_group_id_`.
fn dom_id(name: &str) -> String {
    name.replace(['[', ']'], "_")
}

fn class_list(extra: Option<&str>) -> String {
    match extra.map(str::trim).filter(|c| !c.is_empty()) {
        Some(c) => format!("{} recordselect", c),
        None => "recordselect".to_string(),
    }
}

fn attrs(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!(" {}=\"{}\"", k, html_escape(v)))
        .collect()
}

/// Rendered widget: the element markup plus the descriptor it carries.
#[derive(Clone, Debug, PartialEq)]
pub struct Widget {
    pub descriptor: WidgetDescriptor,
    pub html: String,
}

#[derive(Clone, Debug, Default)]
pub struct LinkOptions {
    /// Extra browse URL parameters.
    pub params: Vec<(String, String)>,
    /// Client-side selection handler body; sees `id` and `label`.
    pub onselect: Option<String>,
    /// DOM id of the link; random when absent.
    pub html_id: Option<String>,
    /// Merged last into the constructor options.
    pub rs: Map<String, Value>,
    pub mode: RenderMode,
}

#[derive(Clone, Debug)]
pub struct FieldOptions {
    pub controller: String,
    pub params: Vec<(String, String)>,
    /// DOM id; derived from the input name when absent.
    pub id: Option<String>,
    pub class: Option<String>,
    /// Name for the visible text input (single field only).
    pub field_name: Option<String>,
    pub clear_button: bool,
    pub rs: Map<String, Value>,
    pub mode: RenderMode,
}

impl FieldOptions {
    pub fn new(controller: impl Into<String>) -> Self {
        FieldOptions {
            controller: controller.into(),
            params: Vec::new(),
            id: None,
            class: None,
            field_name: None,
            clear_button: true,
            rs: Map::new(),
            mode: RenderMode::default(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AutocompleteOptions {
    pub controller: String,
    pub params: Vec<(String, String)>,
    pub id: Option<String>,
    pub class: Option<String>,
    /// Initial label; defaults to the current record's label.
    pub label: Option<String>,
    pub rs: Map<String, Value>,
    pub mode: RenderMode,
}

impl AutocompleteOptions {
    pub fn new(controller: impl Into<String>) -> Self {
        AutocompleteOptions {
            controller: controller.into(),
            params: Vec::new(),
            id: None,
            class: None,
            label: None,
            rs: Map::new(),
            mode: RenderMode::default(),
        }
    }
}

/// Widget helpers bound to a registry and the path the picker routes are mounted under.
pub struct Widgets<'a> {
    registry: &'a Registry,
    mount: String,
}

impl<'a> Widgets<'a> {
    pub fn new(registry: &'a Registry, mount: impl Into<String>) -> Self {
        Widgets {
            registry,
            mount: mount.into().trim_end_matches('/').to_string(),
        }
    }

    fn resource(&self, controller: &str) -> Result<&'a ResourceConfig, AppError> {
        self.registry
            .resource(controller)
            .ok_or_else(|| ConfigError::MisconfiguredTarget(controller.to_string()).into())
    }

    /// Browse URL for `controller` with extra query params.
    pub fn browse_url(&self, controller: &str, params: &[(String, String)]) -> Result<String, AppError> {
        let base = format!("{}/{}/browse", self.mount, controller);
        if params.is_empty() {
            return Ok(base);
        }
        let query = serde_urlencoded::to_string(params).map_err(|e| AppError::Serialization(e.to_string()))?;
        Ok(format!("{}?{}", base, query))
    }

    fn label(&self, config: &ResourceConfig, record: &Value) -> Result<Value, AppError> {
        Ok(label_for_field(self.registry, config, record)?.map_or(Value::Null, Value::String))
    }

    /// Link that opens a Dialog picker.
    pub fn link_to_record_select(&self, text: &str, controller: &str, options: LinkOptions) -> Result<Widget, AppError> {
        let config = self.resource(controller)?;
        let onselect = options
            .onselect
            .map(|code| format!("(function(id, label) {{{}}})", code))
            .unwrap_or_default();
        let html_id = options
            .html_id
            .unwrap_or_else(|| format!("rs_{}", &uuid::Uuid::new_v4().simple().to_string()[..8]));

        let mut rs = Map::new();
        rs.insert("id".into(), json!(record_select_id(config.controller())));
        rs.insert("onselect".into(), json!(onselect));
        rs.extend(options.rs);

        let url = self.browse_url(config.controller(), &options.params)?;
        let descriptor = WidgetDescriptor::new(WidgetKind::Dialog, html_id.clone(), url, rs);
        let open = format!("<a href=\"#\"{}", attrs(&[("id", html_id.as_str())]));
        finish(descriptor, options.mode, &open, &format!(">{}</a>", html_escape(text)))
    }

    /// Single-record field. Submits the chosen id through the widget's hidden input.
    pub fn record_select_field(&self, name: &str, current: Option<&Value>, options: FieldOptions) -> Result<Widget, AppError> {
        let config = self.resource(&options.controller)?;
        let id = options.id.unwrap_or_else(|| dom_id(name));

        let mut rs = Map::new();
        rs.insert("id".into(), json!(record_select_id(config.controller())));
        if let Some(field_name) = options.field_name {
            rs.insert("field_name".into(), json!(field_name));
        }
        let mut clear_class = "clear-input-button".to_string();
        if let Some(record) = current.filter(|r| is_persisted(config, r)) {
            rs.insert("id".into(), record[config.primary_key()].clone());
            rs.insert("label".into(), self.label(config, record)?);
            clear_class.push_str(" enabled");
        }
        rs.extend(options.rs);

        let url = self.browse_url(config.controller(), &options.params)?;
        let descriptor = WidgetDescriptor::new(WidgetKind::Single, id.clone(), url, rs);
        let class = class_list(options.class.as_deref());
        let open = text_input(name, &id, &class);
        let close = if options.clear_button {
            format!(
                "><button type=\"button\"{}>x</button>",
                attrs(&[("class", clear_class.as_str()), ("aria-label", "Clear input"), ("title", "Clear input")])
            )
        } else {
            ">".to_string()
        };
        finish(descriptor, options.mode, &open, &close)
    }

    /// Autocomplete text field.
    pub fn record_select_autocomplete(
        &self,
        name: &str,
        current: Option<&Value>,
        options: AutocompleteOptions,
    ) -> Result<Widget, AppError> {
        let config = self.resource(&options.controller)?;
        let id = options.id.unwrap_or_else(|| dom_id(name));

        let label = match (options.label, current) {
            (Some(label), _) => json!(label),
            (None, Some(record)) => self.label(config, record)?,
            (None, None) => Value::Null,
        };
        let mut rs = Map::new();
        rs.insert("id".into(), json!(record_select_id(config.controller())));
        rs.insert("label".into(), label);
        rs.extend(options.rs);

        let url = self.browse_url(config.controller(), &options.params)?;
        let descriptor = WidgetDescriptor::new(WidgetKind::Autocomplete, id.clone(), url, rs);
        let class = class_list(options.class.as_deref());
        finish(descriptor, options.mode, &text_input(name, &id, &class), ">")
    }

    /// Multiple-record field. Submits `name[]` once per chosen record, plus an empty entry so
    /// clearing every choice still submits the key.
    pub fn record_multi_select_field(&self, name: &str, current: &[Value], options: FieldOptions) -> Result<Widget, AppError> {
        let config = self.resource(&options.controller)?;
        let id = options.id.unwrap_or_else(|| dom_id(name));

        let mut selected = Vec::with_capacity(current.len());
        for record in current {
            selected.push(json!({
                "id": record[config.primary_key()].clone(),
                "label": self.label(config, record)?,
            }));
        }
        let mut rs = Map::new();
        rs.insert("id".into(), json!(record_select_id(config.controller())));
        rs.insert("current".into(), Value::Array(selected));
        rs.extend(options.rs);

        let url = self.browse_url(config.controller(), &options.params)?;
        let descriptor = WidgetDescriptor::new(WidgetKind::Multiple, id.clone(), url, rs);
        let list_name = format!("{}[]", name);
        let class = class_list(options.class.as_deref());
        let close = format!(
            "><input type=\"hidden\"{}><ul class=\"record-select-list\"></ul>",
            attrs(&[("name", list_name.as_str()), ("value", "")])
        );
        finish(descriptor, options.mode, &text_input(&list_name, &id, &class), &close)
    }
}

/// A record with a primary key value is an existing one.
fn is_persisted(config: &ResourceConfig, record: &Value) -> bool {
    !matches!(record.get(config.primary_key()), None | Some(Value::Null))
}

/// Open `<input type="text" ...` without the closing `>`, so data attributes can follow.
fn text_input(name: &str, id: &str, class: &str) -> String {
    format!(
        "<input type=\"text\"{}",
        attrs(&[
            ("name", name),
            ("id", id),
            ("class", class),
            ("autocomplete", "off"),
            ("onfocus", "this.focused=true"),
            ("onblur", "this.focused=false"),
        ])
    )
}

/// `open` is the main element up to its attributes; `rest` starts with the `>` that closes it.
fn finish(descriptor: WidgetDescriptor, mode: RenderMode, open: &str, rest: &str) -> Result<Widget, AppError> {
    let html = match descriptor.serialize(mode)? {
        WidgetMarkup::Attributes(data) => format!("{}{}{}", open, data, rest),
        WidgetMarkup::Script(script) => format!("{}{}{}", open, rest, script),
    };
    Ok(Widget { descriptor, html })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, HookTable, PickerConfig};

    fn registry() -> Registry {
        let config: PickerConfig = serde_json::from_value(json!({
            "templates": { "user": "<li><label>{{first_name}} {{last_name}}</label></li>" },
            "resources": [{
                "controller": "admin/users",
                "table": "users",
                "columns": [{ "name": "id", "type": "integer" }],
                "label": { "template": "user" }
            }]
        }))
        .unwrap();
        resolve(&config, &HookTable::new()).unwrap()
    }

    fn jo() -> Value {
        json!({ "id": 7, "first_name": "Jo", "last_name": "Smith" })
    }

    #[test]
    fn widget_id_replaces_slashes() {
        assert_eq!(record_select_id("admin/users"), "record-select-admin_users");
        assert_eq!(dom_id("user[group_id]"), "user_group_id_");
    }

    #[test]
    fn unknown_controller_is_misconfigured() {
        let reg = registry();
        let w = Widgets::new(&reg, "/record_select");
        let err = w
            .link_to_record_select("Pick", "groups", LinkOptions::default())
            .unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::MisconfiguredTarget(ref c)) if c == "groups"));
        assert!(w.record_select_field("g", None, FieldOptions::new("groups")).is_err());
    }

    #[test]
    fn dialog_link_in_attribute_mode() {
        let reg = registry();
        let w = Widgets::new(&reg, "/record_select/");
        let widget = w
            .link_to_record_select(
                "Pick <user>",
                "admin/users",
                LinkOptions {
                    params: vec![("group_id".into(), "3".into())],
                    onselect: Some("alert(label)".into()),
                    html_id: Some("pick".into()),
                    ..LinkOptions::default()
                },
            )
            .unwrap();
        assert_eq!(widget.descriptor.kind, WidgetKind::Dialog);
        assert_eq!(widget.descriptor.url, "/record_select/admin/users/browse?group_id=3");
        assert_eq!(widget.descriptor.options["id"], json!("record-select-admin_users"));
        assert_eq!(
            widget.descriptor.options["onselect"],
            json!("(function(id, label) {alert(label)})")
        );
        assert!(widget.html.starts_with("<a href=\"#\" id=\"pick\" data-rs-type=\"Dialog\""));
        assert!(widget.html.ends_with(">Pick &lt;user&gt;</a>"));
    }

    #[test]
    fn single_field_with_current_record() {
        let reg = registry();
        let w = Widgets::new(&reg, "/rs");
        let widget = w
            .record_select_field("user[manager_id]", Some(&jo()), FieldOptions::new("admin/users"))
            .unwrap();
        assert_eq!(widget.descriptor.id, "user_manager_id_");
        assert_eq!(widget.descriptor.options["id"], json!(7));
        assert_eq!(widget.descriptor.options["label"], json!("Jo Smith"));
        assert!(widget.html.contains("class=\"clear-input-button enabled\""));
        assert!(widget.html.contains("name=\"user[manager_id]\""));
    }

    #[test]
    fn single_field_without_record_or_clear_button() {
        let reg = registry();
        let w = Widgets::new(&reg, "/rs");
        let mut options = FieldOptions::new("admin/users");
        options.clear_button = false;
        options.field_name = Some("manager_name".into());
        options.mode = RenderMode::Script;
        let widget = w.record_select_field("manager_id", Some(&json!({ "id": null })), options).unwrap();
        assert_eq!(widget.descriptor.options["id"], json!("record-select-admin_users"));
        assert_eq!(widget.descriptor.options["field_name"], json!("manager_name"));
        assert!(widget.descriptor.options.get("label").is_none());
        assert!(!widget.html.contains("<button"));
        assert!(!widget.html.contains("data-rs-"));
        assert!(widget.html.ends_with("</script>"));
        assert!(widget.html.contains("new RecordSelect.Single(\"manager_id\""));
    }

    #[test]
    fn caller_overrides_are_merged_last() {
        let reg = registry();
        let w = Widgets::new(&reg, "/rs");
        let mut options = AutocompleteOptions::new("admin/users");
        options.label = Some("typed".into());
        options.rs.insert("label".into(), json!("override"));
        let widget = w.record_select_autocomplete("boss", Some(&jo()), options).unwrap();
        assert_eq!(widget.descriptor.kind, WidgetKind::Autocomplete);
        assert_eq!(widget.descriptor.options["label"], json!("override"));
    }

    #[test]
    fn autocomplete_label_from_current_record() {
        let reg = registry();
        let w = Widgets::new(&reg, "/rs");
        let widget = w
            .record_select_autocomplete("boss", Some(&jo()), AutocompleteOptions::new("admin/users"))
            .unwrap();
        assert_eq!(widget.descriptor.options["label"], json!("Jo Smith"));
    }

    #[test]
    fn multi_select_lists_current_records() {
        let reg = registry();
        let w = Widgets::new(&reg, "/rs");
        let current = vec![jo(), json!({ "id": 8, "first_name": "Al", "last_name": "Bo" })];
        let widget = w
            .record_multi_select_field("team[member_ids]", &current, FieldOptions::new("admin/users"))
            .unwrap();
        assert_eq!(widget.descriptor.kind, WidgetKind::Multiple);
        assert_eq!(
            widget.descriptor.options["current"],
            json!([{ "id": 7, "label": "Jo Smith" }, { "id": 8, "label": "Al Bo" }])
        );
        assert!(widget.html.starts_with("<input type=\"text\" name=\"team[member_ids][]\""));
        assert!(widget.html.contains("<input type=\"hidden\" name=\"team[member_ids][]\" value=\"\">"));
        assert!(widget.html.contains("<ul class=\"record-select-list\"></ul>"));
    }
}
