use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use chirp_api::{
    AppState,
    auth::create_token,
    config::EmptyAuthorFeed,
    directory::{AuthorDirectory, InMemoryIdentityProvider},
    models::AuthorRecord,
    rate_limit::{RateLimitConfig, SlidingWindowLimiter, ingress_limiter},
    routes,
    service::{PostService, ServiceOptions},
    store::InMemoryPostStore,
};
use serde_json::{Value, json};
use std::{num::NonZeroU32, sync::Arc, time::Duration};
use tower::ServiceExt;

const SECRET: &str = "test-secret-key-for-testing-only";

struct TestApp {
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        Self::with(ServiceOptions::default(), 1000)
    }

    fn with(options: ServiceOptions, global_rps: u32) -> Self {
        let identity = Arc::new(InMemoryIdentityProvider::with_users([
            AuthorRecord {
                id: "U1".into(),
                display_name: Some("alice".into()),
                profile_image_url: "https://img.example/alice.png".into(),
            },
            AuthorRecord {
                id: "U2".into(),
                display_name: Some("bob".into()),
                profile_image_url: "https://img.example/bob.png".into(),
            },
        ]));
        let directory = AuthorDirectory::new(identity, 100, Duration::from_secs(1));
        let limiter = Arc::new(SlidingWindowLimiter::new(RateLimitConfig::default()));
        let service = PostService::new(
            Arc::new(InMemoryPostStore::new()),
            limiter,
            directory,
            options,
        );
        let state = AppState::new(
            service,
            ingress_limiter(NonZeroU32::new(global_rps).unwrap()),
            SECRET,
        );

        Self {
            router: routes::router(state, Duration::from_secs(5)),
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value, axum::http::HeaderMap) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body, headers)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::get(uri).body(Body::empty()).unwrap();
        let (status, body, _) = self.send(request).await;
        (status, body)
    }

    async fn post_raw(
        &self,
        identity: Option<&str>,
        body: &str,
    ) -> (StatusCode, Value, axum::http::HeaderMap) {
        let mut request = Request::post("/posts").header(header::CONTENT_TYPE, "application/json");
        if let Some(identity) = identity {
            let token = create_token(identity, SECRET, chrono::Duration::hours(1)).unwrap();
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(request.body(Body::from(body.to_string())).unwrap())
            .await
    }

    async fn post_as(&self, identity: &str, content: &str) -> (StatusCode, Value, axum::http::HeaderMap) {
        let token = create_token(identity, SECRET, chrono::Duration::hours(1)).unwrap();
        let request = Request::post("/posts")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "content": content }).to_string()))
            .unwrap();
        self.send(request).await
    }
}

#[tokio::test]
async fn health_is_ok() {
    let app = TestApp::new();
    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn create_then_read_back() {
    let app = TestApp::new();

    let (status, created, _) = app.post_as("U1", "🎉").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["authorId"], "U1");
    assert_eq!(created["content"], "🎉");
    let id = created["id"].as_str().unwrap().to_string();

    let (status, entry) = app.get(&format!("/posts/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entry["post"], created);
    assert_eq!(entry["author"]["name"], "alice");
    assert_eq!(entry["author"]["profileImageUrl"], "https://img.example/alice.png");

    let (status, all) = app.get("/posts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all[0]["post"]["id"], id.as_str());

    let (status, mine) = app.get("/users/U1/posts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn feed_is_newest_first() {
    let app = TestApp::new();
    app.post_as("U1", "1️⃣").await;
    app.post_as("U2", "2️⃣").await;
    app.post_as("U1", "3️⃣").await;

    let (_, all) = app.get("/posts").await;
    let entries = all.as_array().unwrap();
    assert_eq!(entries.len(), 3);

    let stamps: Vec<&str> = entries
        .iter()
        .map(|e| e["post"]["createdAt"].as_str().unwrap())
        .collect();
    let parsed: Vec<chrono::DateTime<chrono::Utc>> =
        stamps.iter().map(|s| s.parse().unwrap()).collect();
    assert!(parsed.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn create_requires_a_session() {
    let app = TestApp::new();
    let request = Request::post("/posts")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "content": "🎉" }).to_string()))
        .unwrap();

    let (status, body, _) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn non_emoji_content_is_a_field_error() {
    let app = TestApp::new();

    let (status, body, _) = app.post_as("U1", "hello").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"]["content"][0], "Only emojis are allowed!");

    let (status, _, _) = app.post_as("U1", &"🎉".repeat(281)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_or_mistyped_content_is_a_field_error() {
    let app = TestApp::new();

    for body in [r#"{}"#, r#"{"content": 5}"#] {
        let (status, json, _) = app.post_raw(Some("U1"), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(json["code"], "BAD_REQUEST");
        assert!(json["fields"]["content"][0].is_string(), "{body}");
    }

    let (status, json, _) = app.post_raw(Some("U1"), "not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["fields"]["body"][0].is_string());
}

#[tokio::test]
async fn bad_body_without_session_is_unauthorized() {
    let app = TestApp::new();
    let (status, json, _) = app.post_raw(None, r#"{}"#).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn fourth_post_is_too_many_requests() {
    let app = TestApp::new();
    for _ in 0..3 {
        let (status, _, _) = app.post_as("U1", "🎉").await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body, headers) = app.post_as("U1", "🎉").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], "TOO_MANY_REQUESTS");
    assert_eq!(body["error"], "You are posting too fast");
    assert!(headers.contains_key(header::RETRY_AFTER));

    // Other authors keep their own quota
    let (status, _, _) = app.post_as("U2", "🎉").await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn ghost_user_feed_is_not_found() {
    let app = TestApp::new();
    let (status, body) = app.get("/users/ghost-user/posts").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn empty_feed_policy_can_return_a_list() {
    let app = TestApp::with(
        ServiceOptions {
            empty_author_feed: EmptyAuthorFeed::Empty,
            ..ServiceOptions::default()
        },
        1000,
    );
    let (status, body) = app.get("/users/ghost-user/posts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn post_by_unknown_author_breaks_the_feed() {
    let app = TestApp::new();
    app.post_as("U1", "🎉").await;
    app.post_as("stranger", "👻").await;

    let (status, body) = app.get("/posts").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
}

#[tokio::test]
async fn missing_post_is_not_found() {
    let app = TestApp::new();
    let (status, _) = app.get("/posts/does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn profile_by_slug() {
    let app = TestApp::new();
    let (status, body) = app.get("/profiles/@bob").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "U2");
    assert_eq!(body["name"], "bob");

    let (status, _) = app.get("/profiles/@nobody").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn ingress_throttle_answers_429() {
    let app = TestApp::with(ServiceOptions::default(), 2);
    assert_eq!(app.get("/health").await.0, StatusCode::OK);
    assert_eq!(app.get("/health").await.0, StatusCode::OK);

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Too many requests");
}
