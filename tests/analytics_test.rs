use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use sitepulse::ingest::handler::AppState;
use sitepulse::server::build_router;
use sitepulse::storage::duckdb_store::DuckDbStore;
use std::sync::Arc;
use tower::ServiceExt;

const OWNER_KEY: &str = "sk_owner";
const OTHER_KEY: &str = "sk_other";

fn make_app() -> axum::Router {
    let store = Arc::new(DuckDbStore::open_in_memory().unwrap());
    let owner = store.register_account(OWNER_KEY).unwrap();
    let other = store.register_account(OTHER_KEY).unwrap();
    store.register_domain(&owner, "shop.example").unwrap();
    store.register_domain(&other, "blog.example").unwrap();
    build_router(Arc::new(AppState::new(store, "test-secret")))
}

fn post_event(key: Option<&str>, body: &serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/events")
        .header("content-type", "application/json");
    if let Some(key) = key {
        builder = builder.header("authorization", format!("Bearer {key}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get_analytics(key: &str, query: &str) -> Request<Body> {
    Request::builder()
        .uri(format!("/api/analytics?{query}"))
        .header("authorization", format!("Bearer {key}"))
        .body(Body::empty())
        .unwrap()
}

fn beacon(event: &str, path: &str, ua: &str, country: &str) -> Request<Body> {
    let payload = serde_json::json!({
        "domain": "shop.example",
        "url": format!("https://shop.example{path}"),
        "event": event,
        "user_agent": ua,
    });
    Request::builder()
        .method("POST")
        .uri("/api/track")
        .header("content-type", "text/plain")
        .header("cf-ipcountry", country)
        .body(Body::from(payload.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_custom_event_is_stored_lowercase() {
    let app = make_app();

    for name in ["Signup", "signup"] {
        let body = serde_json::json!({"name": name, "domain": "shop.example", "description": "pro plan"});
        let response = app.clone().oneshot(post_event(Some(OWNER_KEY), &body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = json_body(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["event"]["event_name"], "signup");
        assert_eq!(json["event"]["message"], "pro plan");
    }

    let response = app
        .oneshot(get_analytics(OWNER_KEY, "domain=shop.example&range=today"))
        .await
        .unwrap();
    let json = json_body(response).await;
    let events = json["events"].as_array().unwrap();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e["event_name"] == "signup"));
    assert!(json["dailyStats"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_custom_event_requires_bearer_key() {
    let app = make_app();
    let body = serde_json::json!({"name": "signup", "domain": "shop.example"});

    let response = app.clone().oneshot(post_event(None, &body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.oneshot(post_event(Some("sk_wrong"), &body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_custom_event_validation() {
    let app = make_app();

    let response = app
        .clone()
        .oneshot(post_event(
            Some(OWNER_KEY),
            &serde_json::json!({"name": "   ", "domain": "shop.example"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "name is required");

    let response = app
        .oneshot(post_event(
            Some(OWNER_KEY),
            &serde_json::json!({"name": "signup", "domain": ""}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_custom_event_malformed_body_is_json_error() {
    let app = make_app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/events")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {OWNER_KEY}"))
        .body(Body::from("{name: signup"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert!(json["error"].as_str().unwrap().starts_with("malformed event"));
}

#[tokio::test]
async fn test_custom_event_for_foreign_domain() {
    let app = make_app();
    let body = serde_json::json!({"name": "signup", "domain": "blog.example"});
    let response = app.oneshot(post_event(Some(OWNER_KEY), &body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_analytics_bundle_after_ingest() {
    let app = make_app();
    let iphone = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_2 like Mac OS X) Mobile/15E148";
    let windows = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/120.0";

    for request in [
        beacon("session_start", "/", iphone, "US"),
        beacon("pageview", "/", iphone, "US"),
        beacon("session_start", "/", windows, "DE"),
        beacon("pageview", "/pricing", windows, "DE"),
        beacon("session_start", "/", iphone, "US"),
    ] {
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    let response = app
        .oneshot(get_analytics(OWNER_KEY, "domain=shop.example&range=today"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;

    assert_eq!(json["range"], "today");
    assert_eq!(json["visits"].as_array().unwrap().len(), 3);
    assert_eq!(json["pageViews"].as_array().unwrap().len(), 2);

    let daily = &json["dailyStats"][0];
    assert_eq!(daily["visits"], 3);
    assert_eq!(daily["unique_visitors"], 3);
    assert_eq!(daily["page_views"], 2);

    assert_eq!(
        json["deviceStats"],
        serde_json::json!([{"value": "mobile", "count": 2}, {"value": "desktop", "count": 1}])
    );
    assert_eq!(
        json["countryStats"],
        serde_json::json!([{"value": "US", "count": 2}, {"value": "DE", "count": 1}])
    );
    assert_eq!(
        json["osStats"],
        serde_json::json!([{"value": "iOS", "count": 2}, {"value": "Windows", "count": 1}])
    );
}

#[tokio::test]
async fn test_analytics_default_and_invalid_range() {
    let app = make_app();

    let response = app
        .clone()
        .oneshot(get_analytics(OWNER_KEY, "domain=shop.example"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["range"], "last7days");

    let response = app
        .oneshot(get_analytics(OWNER_KEY, "domain=shop.example&range=lastyear"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_analytics_is_scoped_to_owner() {
    let app = make_app();

    let response = app
        .clone()
        .oneshot(get_analytics(OTHER_KEY, "domain=shop.example&range=today"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/analytics?domain=shop.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
