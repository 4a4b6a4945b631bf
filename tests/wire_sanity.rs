use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use wirehub_cli::{build_router, Config};

async fn call(router: &Router, method: Method, path: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = body
        .map(|value| Body::from(value.to_string()))
        .unwrap_or_else(Body::empty);
    let request = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body)
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn status_carries_build_details() {
    let router = build_router(&Config::default());
    let (status, body) = call(&router, Method::GET, "/wd/hub/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], 0);
    assert_eq!(body["value"]["build"]["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["value"]["build"]["revision"].is_string());
}

#[tokio::test]
async fn custom_prefix_is_honoured() {
    let mut config = Config::default();
    config.server.url_prefix = "/grid/".into();
    let router = build_router(&config);

    let (status, _) = call(&router, Method::GET, "/grid/status", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&router, Method::GET, "/wd/hub/status", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn windows_can_be_resized_through_a_session() {
    let router = build_router(&Config::default());
    let (_, created) = call(
        &router,
        Method::POST,
        "/wd/hub/session",
        Some(json!({ "desiredCapabilities": { "browserName": "any" } })),
    )
    .await;
    let id = created["sessionId"].as_str().unwrap().to_string();
    let base = format!("/wd/hub/session/{id}");

    let (_, handles) = call(&router, Method::GET, &format!("{base}/window_handles"), None).await;
    let handle = handles["value"][0].as_str().unwrap().to_string();

    let (status, resized) = call(
        &router,
        Method::POST,
        &format!("{base}/window/{handle}/size"),
        Some(json!({ "width": 800, "height": 600 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resized, Value::Null);

    let (_, size) = call(&router, Method::GET, &format!("{base}/window/current/size"), None).await;
    assert_eq!(size["sessionId"], id.as_str());
    assert_eq!(size["value"], json!({ "width": 800, "height": 600 }));

    let (_, listed) = call(&router, Method::GET, "/wd/hub/sessions", None).await;
    assert_eq!(listed["value"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn missing_session_and_window_failures() {
    let router = build_router(&Config::default());
    let (status, body) = call(&router, Method::GET, "/wd/hub/session/unknown/url", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], 6);

    let (_, created) = call(
        &router,
        Method::POST,
        "/wd/hub/session",
        Some(json!({ "desiredCapabilities": {} })),
    )
    .await;
    let id = created["sessionId"].as_str().unwrap();
    let (_, body) = call(
        &router,
        Method::POST,
        &format!("/wd/hub/session/{id}/window"),
        Some(json!({ "name": "ghost" })),
    )
    .await;
    assert_eq!(body["status"], 23);
    assert_eq!(body["sessionId"], id);
}
