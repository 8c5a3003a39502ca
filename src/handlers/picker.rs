//! Picker handlers: browse and select, addressed as `<controller path>/<action>`.

use crate::config::ResourceConfig;
use crate::error::AppError;
use crate::extractors::{query_pairs, BrowseParams, ResponseFormat};
use crate::response::{html, javascript, render_data};
use crate::service::{browse as browse_records, select as select_record};
use crate::state::AppState;
use crate::view::{browse_fragment, list_update_script};
use axum::{
    body::Bytes,
    extract::{OriginalUri, Path, RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Split `admin/users/browse` into the controller path and the action.
fn split_action(path: &str) -> Option<(&str, &str)> {
    path.trim_matches('/').rsplit_once('/').filter(|(c, a)| !c.is_empty() && !a.is_empty())
}

fn resource<'a>(state: &'a AppState, controller: &str) -> Result<&'a ResourceConfig, AppError> {
    state
        .registry
        .resource(controller)
        .ok_or_else(|| AppError::NotFound(format!("no record select for {}", controller)))
}

pub async fn browse(
    State(state): State<AppState>,
    Path(path): Path<String>,
    OriginalUri(uri): OriginalUri,
    format: ResponseFormat,
    BrowseParams(ctx): BrowseParams,
) -> Result<Response, AppError> {
    let (controller, action) = split_action(&path).ok_or_else(|| AppError::NotFound(path.clone()))?;
    if action != "browse" {
        return Err(AppError::NotFound(path.clone()));
    }
    let config = resource(&state, controller)?;
    let page = browse_records(state.store.as_ref(), config, &ctx).await?;

    match format {
        ResponseFormat::Js if ctx.update => Ok(javascript(list_update_script(
            &state.registry,
            config,
            &page,
            &ctx,
            uri.path(),
        )?)),
        ResponseFormat::Js | ResponseFormat::Html => {
            Ok(html(browse_fragment(&state.registry, config, &page, &ctx, uri.path())?))
        }
        data => render_data(page, data),
    }
}

/// Record id from the form body, else from the query string.
fn selected_id(query: Option<&str>, body: &[u8]) -> Result<Option<String>, AppError> {
    let form: Vec<(String, String)> = if body.is_empty() {
        Vec::new()
    } else {
        serde_urlencoded::from_bytes(body).map_err(|e| AppError::BadRequest(format!("form body: {}", e)))?
    };
    let find = |pairs: Vec<(String, String)>| pairs.into_iter().rev().find(|(k, _)| k == "id").map(|(_, v)| v);
    Ok(find(form).or(find(query_pairs(query)?)))
}

pub async fn select(
    State(state): State<AppState>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Response, AppError> {
    let (controller, action) = split_action(&path).ok_or_else(|| AppError::NotFound(path.clone()))?;
    if action != "select" {
        return Err(AppError::NotFound(path.clone()));
    }
    let config = resource(&state, controller)?;
    let id = selected_id(query.as_deref(), &body)?
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("id is required".into()))?;
    select_record(state.store.as_ref(), config, id.trim()).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
