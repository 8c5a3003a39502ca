//! Markup for the browse action: the picker fragment, and the list update script for script callers.

use crate::config::{Registry, ResourceConfig};
use crate::error::AppError;
use crate::service::{Page, RequestContext};
use crate::widget::{label_for_field, record_select_id, render_record};
use handlebars::{html_escape, Handlebars};
use serde::Serialize;
use serde_json::Value;
use std::sync::OnceLock;

const LIST_TEMPLATE: &str = "<ol class=\"record-select-list\">\
{{#if previous}}<li class=\"pagination previous\"><a href=\"{{previous.url}}\">Previous {{previous.count}}</a></li>{{/if}}\
{{#each records}}<li class=\"record\" data-id=\"{{id}}\" data-label=\"{{label}}\">{{{html}}}</li>{{/each}}\
{{#unless records}}<li class=\"found\">No records found</li>{{/unless}}\
{{#if next}}<li class=\"pagination next\"><a href=\"{{next.url}}\">Next {{next.count}}</a></li>{{/if}}\
</ol>";

const BROWSE_TEMPLATE: &str = "<div class=\"record-select\" id=\"{{id}}\">\
<form class=\"record-select-search\" action=\"{{url}}\" method=\"get\">\
<input type=\"text\" name=\"search\" id=\"{{id}}-search\" value=\"{{search}}\" autocomplete=\"off\">\
</form>\
{{> record_select_list}}\
</div>";

fn views() -> Result<&'static Handlebars<'static>, AppError> {
    static VIEWS: OnceLock<Result<Handlebars<'static>, String>> = OnceLock::new();
    VIEWS
        .get_or_init(|| {
            let mut hb = Handlebars::new();
            hb.register_template_string("record_select_list", LIST_TEMPLATE)
                .and_then(|_| hb.register_template_string("record_select_browse", BROWSE_TEMPLATE))
                .map_err(|e| e.to_string())?;
            Ok(hb)
        })
        .as_ref()
        .map_err(|e| AppError::Template(e.clone()))
}

#[derive(Serialize)]
struct RecordView {
    id: Value,
    label: String,
    html: String,
}

#[derive(Serialize)]
struct PagerLink {
    url: String,
    count: u64,
}

#[derive(Serialize)]
struct BrowseView {
    id: String,
    url: String,
    search: String,
    records: Vec<RecordView>,
    previous: Option<PagerLink>,
    next: Option<PagerLink>,
}

/// Same request with another page number.
fn page_url(path: &str, ctx: &RequestContext, page: u32) -> Result<String, AppError> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for (key, value) in &ctx.params {
        if key == "page" {
            continue;
        }
        match value {
            crate::service::ParamValue::Single(v) => pairs.push((key.clone(), v.clone())),
            crate::service::ParamValue::List(vs) => {
                pairs.extend(vs.iter().map(|v| (format!("{}[]", key), v.clone())))
            }
        }
    }
    pairs.push(("page".into(), page.to_string()));
    let query = serde_urlencoded::to_string(&pairs).map_err(|e| AppError::Serialization(e.to_string()))?;
    Ok(format!("{}?{}", path, query))
}

fn record_view(registry: &Registry, config: &ResourceConfig, record: &Value) -> Result<RecordView, AppError> {
    let id = record.get(config.primary_key()).cloned().unwrap_or(Value::Null);
    let fallback = match &id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let label = label_for_field(registry, config, record)?.unwrap_or_else(|| fallback.clone());
    let html = match (config.label(), render_record(registry, config, record)?) {
        (Some(crate::config::LabelRenderer::Template(_)), Some(markup)) => markup,
        (_, Some(text)) => html_escape(&text),
        (_, None) => html_escape(&fallback),
    };
    Ok(RecordView { id, label, html })
}

fn browse_view(
    registry: &Registry,
    config: &ResourceConfig,
    page: &Page,
    ctx: &RequestContext,
    path: &str,
) -> Result<BrowseView, AppError> {
    let records = page
        .records
        .iter()
        .map(|r| record_view(registry, config, r))
        .collect::<Result<Vec<_>, _>>()?;

    let per_page = u64::from(page.per_page.unwrap_or(0));
    let previous = if page.has_previous() {
        Some(PagerLink {
            url: page_url(path, ctx, page.page - 1)?,
            count: per_page,
        })
    } else {
        None
    };
    let next = match page.total {
        Some(total) if page.has_next() => Some(PagerLink {
            url: page_url(path, ctx, page.page + 1)?,
            count: per_page.min(total.saturating_sub(u64::from(page.page) * per_page)),
        }),
        _ => None,
    };

    Ok(BrowseView {
        id: record_select_id(config.controller()),
        url: path.to_string(),
        search: ctx.search.clone().unwrap_or_default(),
        records,
        previous,
        next,
    })
}

/// The picker fragment: search form plus the record list and pager.
pub fn browse_fragment(
    registry: &Registry,
    config: &ResourceConfig,
    page: &Page,
    ctx: &RequestContext,
    path: &str,
) -> Result<String, AppError> {
    let view = browse_view(registry, config, page, ctx, path)?;
    views()?
        .render("record_select_browse", &view)
        .map_err(|e| AppError::Template(e.to_string()))
}

/// Script that swaps the list of an open picker for this page.
pub fn list_update_script(
    registry: &Registry,
    config: &ResourceConfig,
    page: &Page,
    ctx: &RequestContext,
    path: &str,
) -> Result<String, AppError> {
    let view = browse_view(registry, config, page, ctx, path)?;
    let list = views()?
        .render("record_select_list", &view)
        .map_err(|e| AppError::Template(e.to_string()))?;
    let to_json = |s: &str| serde_json::to_string(s).map_err(|e| AppError::Serialization(e.to_string()));
    Ok(format!(
        "RecordSelect.render_page({}, {});",
        to_json(&view.id)?,
        to_json(&list)?.replace("</", "<\\/")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, HookTable, PickerConfig};
    use serde_json::json;

    fn registry() -> Registry {
        let config: PickerConfig = serde_json::from_value(json!({
            "templates": { "user": "<span><label>{{name}}</label></span>" },
            "resources": [
                {
                    "controller": "admin/users", "table": "users",
                    "columns": [{ "name": "id", "type": "integer" }, { "name": "name", "type": "text" }],
                    "per_page": 2,
                    "label": { "template": "user" }
                },
                {
                    "controller": "tags", "table": "tags",
                    "columns": [{ "name": "id", "type": "integer" }]
                }
            ]
        }))
        .unwrap();
        resolve(&config, &HookTable::new()).unwrap()
    }

    fn ctx(items: &[(&str, &str)]) -> RequestContext {
        RequestContext::from_pairs(items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(), false)
    }

    fn page(n: u32) -> Page {
        Page {
            records: vec![json!({ "id": 3, "name": "Jo <3" }), json!({ "id": 4, "name": "Al" })],
            page: n,
            per_page: Some(2),
            total: Some(5),
        }
    }

    #[test]
    fn fragment_lists_records_with_pager() {
        let reg = registry();
        let users = reg.resource("admin/users").unwrap();
        let c = ctx(&[("search", "j"), ("page", "2")]);
        let html = browse_fragment(&reg, users, &page(2), &c, "/rs/admin/users/browse").unwrap();
        assert!(html.starts_with("<div class=\"record-select\" id=\"record-select-admin_users\">"));
        assert!(html.contains("value=\"j\""));
        assert!(html.contains("<li class=\"record\" data-id=\"3\" data-label=\"Jo &lt;3\"><span><label>Jo &lt;3</label></span></li>"));
        assert!(html.contains("<a href=\"/rs/admin/users/browse?search"));
        assert!(html.contains("Previous 2</a>"));
        assert!(html.contains("Next 1</a>"));
    }

    #[test]
    fn empty_page_says_so() {
        let reg = registry();
        let users = reg.resource("admin/users").unwrap();
        let empty = Page { records: Vec::new(), page: 4, per_page: Some(2), total: Some(5) };
        let html = browse_fragment(&reg, users, &empty, &ctx(&[]), "/rs/admin/users/browse").unwrap();
        assert!(html.contains("No records found"));
        assert!(!html.contains("pagination next"));
    }

    #[test]
    fn records_without_renderer_show_their_id() {
        let reg = registry();
        let tags = reg.resource("tags").unwrap();
        let p = Page { records: vec![json!({ "id": 9 })], page: 1, per_page: None, total: None };
        let html = browse_fragment(&reg, tags, &p, &ctx(&[]), "/rs/tags/browse").unwrap();
        assert!(html.contains("data-label=\"9\">9</li>"));
    }

    #[test]
    fn update_script_carries_the_list_only() {
        let reg = registry();
        let users = reg.resource("admin/users").unwrap();
        let js = list_update_script(&reg, users, &page(1), &ctx(&[("update", "1")]), "/rs/admin/users/browse").unwrap();
        assert!(js.starts_with("RecordSelect.render_page(\"record-select-admin_users\", \"<ol class=\\\"record-select-list\\\">"));
        assert!(!js.contains("</"));
        assert!(!js.contains("record-select-search"));
    }
}
