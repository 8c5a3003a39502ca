//! Response format negotiation for browse.

use super::params::{query_pairs, wants_js};
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResponseFormat {
    #[default]
    Json,
    Yaml,
    Xml,
    /// The picker fragment.
    Html,
    /// Script callers: a list update script when `update` is set, else the fragment.
    Js,
}

impl ResponseFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" => Some(ResponseFormat::Json),
            "yaml" | "yml" => Some(ResponseFormat::Yaml),
            "xml" => Some(ResponseFormat::Xml),
            "html" => Some(ResponseFormat::Html),
            "js" => Some(ResponseFormat::Js),
            _ => None,
        }
    }

    fn from_media_type(media: &str) -> Option<Self> {
        match media {
            "application/json" | "text/json" | "*/*" => Some(ResponseFormat::Json),
            "application/yaml" | "application/x-yaml" | "text/yaml" | "text/x-yaml" => Some(ResponseFormat::Yaml),
            "application/xml" | "text/xml" => Some(ResponseFormat::Xml),
            "text/html" | "application/xhtml+xml" => Some(ResponseFormat::Html),
            "text/javascript" | "application/javascript" | "application/x-javascript" => Some(ResponseFormat::Js),
            _ => None,
        }
    }

    /// Best match for an Accept header: highest q first, header order breaking ties.
    /// `*/*` and an unusable header mean JSON.
    pub fn from_accept(accept: &str) -> Self {
        let mut ranges: Vec<(f32, String)> = accept
            .split(',')
            .filter_map(|entry| {
                let mut parts = entry.split(';');
                let media = parts.next()?.trim().to_ascii_lowercase();
                let q = parts
                    .filter_map(|p| p.split_once('='))
                    .find(|(k, _)| k.trim().eq_ignore_ascii_case("q"))
                    .map_or(Some(1.0), |(_, v)| v.trim().parse::<f32>().ok())?;
                (!media.is_empty() && q > 0.0).then_some((q, media))
            })
            .collect();
        // stable: equal q keeps header order
        ranges.sort_by(|a, b| b.0.total_cmp(&a.0));
        ranges
            .iter()
            .find_map(|(_, media)| ResponseFormat::from_media_type(media))
            .unwrap_or_default()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ResponseFormat
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    /// `format` query param first, then script detection, then Accept.
    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let explicit = query_pairs(parts.uri.query())
            .unwrap_or_default()
            .into_iter()
            .rev()
            .find(|(k, _)| k == "format")
            .and_then(|(_, v)| ResponseFormat::from_name(&v));
        if let Some(format) = explicit {
            return Ok(format);
        }
        if wants_js(&parts.headers) {
            return Ok(ResponseFormat::Js);
        }
        Ok(parts
            .headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .map(ResponseFormat::from_accept)
            .unwrap_or_default())
    }
}
