//! Browse parameters from the query string, plus whether the caller is a script.

use crate::error::AppError;
use crate::service::RequestContext;
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};

/// Header set by XHR clients.
pub const REQUESTED_WITH_HEADER: &str = "X-Requested-With";

/// True for XHR requests and requests that accept javascript.
pub fn wants_js(headers: &HeaderMap) -> bool {
    let xhr = headers
        .get(REQUESTED_WITH_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"));
    let accepts_js = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("javascript"));
    xhr || accepts_js
}

/// Decode `a=1&ids[]=2&ids[]=3` into ordered pairs.
pub fn query_pairs(query: Option<&str>) -> Result<Vec<(String, String)>, AppError> {
    match query.filter(|q| !q.is_empty()) {
        Some(q) => serde_urlencoded::from_str(q).map_err(|e| AppError::BadRequest(format!("query string: {}", e))),
        None => Ok(Vec::new()),
    }
}

/// Extractor for the browse request context.
#[derive(Clone, Debug)]
pub struct BrowseParams(pub RequestContext);

#[async_trait]
impl<S> FromRequestParts<S> for BrowseParams
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let pairs = query_pairs(parts.uri.query())?;
        Ok(BrowseParams(RequestContext::from_pairs(pairs, wants_js(&parts.headers))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn decodes_repeated_and_bracketed_keys() {
        let pairs = query_pairs(Some("search=jo%20sm&ids%5B%5D=1&ids[]=2")).unwrap();
        assert_eq!(
            pairs,
            vec![
                ("search".to_string(), "jo sm".to_string()),
                ("ids[]".to_string(), "1".to_string()),
                ("ids[]".to_string(), "2".to_string()),
            ]
        );
        assert!(query_pairs(None).unwrap().is_empty());
    }

    #[test]
    fn detects_script_callers() {
        let mut headers = HeaderMap::new();
        assert!(!wants_js(&headers));
        headers.insert(REQUESTED_WITH_HEADER, HeaderValue::from_static("XMLHttpRequest"));
        assert!(wants_js(&headers));

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("text/javascript, */*"));
        assert!(wants_js(&headers));
    }
}
