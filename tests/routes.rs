//! HTTP round trips through the picker and common routes with an in-memory store.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use record_select::{
    common_routes, picker_routes, resolve, AppError, AppState, HookTable, MemoryStore, PickerConfig,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

fn people(n: i64) -> Vec<Value> {
    (1..=n)
        .map(|i| json!({ "id": i, "first_name": format!("First{}", i), "last_name": "Smith" }))
        .collect()
}

fn app(selected: Arc<AtomicUsize>) -> (Router, Arc<MemoryStore>) {
    let config: PickerConfig = serde_json::from_value(json!({
        "templates": { "person": "<span><label>{{first_name}} {{last_name}}</label></span>" },
        "resources": [{
            "controller": "admin/people",
            "table": "people",
            "columns": [
                { "name": "id", "type": "integer", "nullable": false },
                { "name": "first_name", "type": "character varying" },
                { "name": "last_name", "type": "character varying" }
            ],
            "search_on": ["first_name", "last_name"],
            "full_text_search": true,
            "per_page": 10,
            "label": { "template": "person" },
            "notify": "count"
        }]
    }))
    .unwrap();
    let hooks = HookTable::new().with_notify("count", move |_| {
        selected.fetch_add(1, Ordering::SeqCst);
        Ok::<(), AppError>(())
    });
    let store = Arc::new(MemoryStore::new("id", people(25)));
    let state = AppState::new(store.clone(), resolve(&config, &hooks).unwrap());
    let app = Router::new()
        .merge(common_routes(state.clone()))
        .nest("/record_select", picker_routes(state));
    (app, store)
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn browse_returns_json_page() {
    let (app, store) = app(Arc::new(AtomicUsize::new(0)));
    let response = app
        .oneshot(
            Request::get("/record_select/admin/people/browse?page=2&search=jo%20sm")
                .header(header::ACCEPT, "application/json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["meta"]["total"], json!(25));
    assert_eq!(body["meta"]["total_pages"], json!(3));
    assert_eq!(body["data"].as_array().map(Vec::len), Some(10));
    assert_eq!(body["data"][0]["id"], json!(11));

    let executed = store.executed();
    assert_eq!(executed.len(), 2);
    assert!(executed[1].sql.ends_with("LIMIT 10 OFFSET 10"));
    assert_eq!(executed[1].params.len(), 4);
}

#[tokio::test]
async fn browse_renders_fragment_for_script_callers() {
    let (app, _) = app(Arc::new(AtomicUsize::new(0)));
    let response = app
        .oneshot(
            Request::get("/record_select/admin/people/browse")
                .header("X-Requested-With", "XMLHttpRequest")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/html"));
    let html = body_text(response).await;
    assert!(html.contains("id=\"record-select-admin_people\""));
    assert!(html.contains("<label>First1 Smith</label>"));
}

#[tokio::test]
async fn browse_update_returns_script() {
    let (app, _) = app(Arc::new(AtomicUsize::new(0)));
    let response = app
        .oneshot(
            Request::get("/record_select/admin/people/browse?update=1&page=3")
                .header(header::ACCEPT, "text/javascript")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let js = body_text(response).await;
    assert!(js.starts_with("RecordSelect.render_page(\"record-select-admin_people\""));
}

#[tokio::test]
async fn browse_as_yaml() {
    let (app, _) = app(Arc::new(AtomicUsize::new(0)));
    let response = app
        .oneshot(
            Request::get("/record_select/admin/people/browse?format=yaml")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("total: 25"));
}

#[tokio::test]
async fn bad_filter_value_is_bad_request() {
    let (app, _) = app(Arc::new(AtomicUsize::new(0)));
    let response = app
        .oneshot(
            Request::get("/record_select/admin/people/browse?id=abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["error"]["code"], json!("type_coercion"));
    assert_eq!(body["error"]["details"]["column"], json!("id"));
}

#[tokio::test]
async fn unknown_controller_or_action_is_not_found() {
    let (app, _) = app(Arc::new(AtomicUsize::new(0)));
    for uri in ["/record_select/nobody/browse", "/record_select/admin/people/edit"] {
        let response = app
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
    }
}

#[tokio::test]
async fn select_notifies_once_and_returns_no_content() {
    let selected = Arc::new(AtomicUsize::new(0));
    let (app, _) = app(selected.clone());
    let response = app
        .oneshot(
            Request::post("/record_select/admin/people/select")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("id=7"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(selected.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn select_of_missing_record_is_not_found() {
    let selected = Arc::new(AtomicUsize::new(0));
    let (app, _) = app(selected.clone());
    let response = app
        .oneshot(
            Request::post("/record_select/admin/people/select?id=999")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(selected.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn select_without_id_is_bad_request() {
    let (app, _) = app(Arc::new(AtomicUsize::new(0)));
    let response = app
        .oneshot(
            Request::post("/record_select/admin/people/select")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn readiness_pings_the_store() {
    let (app, _) = app(Arc::new(AtomicUsize::new(0)));
    let response = app
        .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body, json!({ "status": "ok", "store": "ok" }));
}
