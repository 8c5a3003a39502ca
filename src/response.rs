//! Browse response envelope and its data encodings (JSON, YAML, XML).

use crate::error::AppError;
use crate::extractors::ResponseFormat;
use crate::service::Page;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct PageEnvelope {
    pub data: Vec<Value>,
    pub meta: PageMeta,
}

#[derive(Debug, Serialize)]
pub struct PageMeta {
    pub page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u64>,
    /// Records in this response.
    pub count: usize,
}

impl From<Page> for PageEnvelope {
    fn from(page: Page) -> Self {
        let meta = PageMeta {
            page: page.page,
            per_page: page.per_page,
            total: page.total,
            total_pages: page.total_pages(),
            count: page.records.len(),
        };
        PageEnvelope {
            data: page.records,
            meta,
        }
    }
}

fn with_content_type(content_type: &'static str, body: String) -> Response {
    (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body).into_response()
}

/// Encode a page as JSON, YAML or XML. Markup formats are rendered by the view layer.
pub fn render_data(page: Page, format: ResponseFormat) -> Result<Response, AppError> {
    let envelope = PageEnvelope::from(page);
    let ser = |e: &dyn std::fmt::Display| AppError::Serialization(e.to_string());
    Ok(match format {
        ResponseFormat::Yaml => with_content_type(
            "application/yaml",
            serde_yaml::to_string(&envelope).map_err(|e| ser(&e))?,
        ),
        ResponseFormat::Xml => with_content_type(
            "application/xml",
            quick_xml::se::to_string_with_root("page", &envelope).map_err(|e| ser(&e))?,
        ),
        ResponseFormat::Json | ResponseFormat::Html | ResponseFormat::Js => with_content_type(
            "application/json",
            serde_json::to_string(&envelope).map_err(|e| ser(&e))?,
        ),
    })
}

pub fn html(body: String) -> Response {
    with_content_type("text/html; charset=utf-8", body)
}

pub fn javascript(body: String) -> Response {
    with_content_type("text/javascript; charset=utf-8", body)
}
