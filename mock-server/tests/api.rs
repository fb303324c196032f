use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, Thread, DEFAULT_API_KEY};
use serde_json::Value;
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get_request(uri: &str) -> Request<String> {
    Request::builder()
        .uri(uri)
        .header("XF-Api-Key", DEFAULT_API_KEY)
        .body(String::new())
        .unwrap()
}

fn form_request(uri: &str, user_id: Option<&str>, body: &str) -> Request<String> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("XF-Api-Key", DEFAULT_API_KEY)
        .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(user_id) = user_id {
        builder = builder.header("XF-Api-User", user_id);
    }
    builder.body(body.to_string()).unwrap()
}

fn error_code(body: &Value) -> &str {
    body["errors"][0]["code"].as_str().unwrap()
}

// --- auth ---

#[tokio::test]
async fn missing_api_key_is_rejected() {
    let resp = app(DEFAULT_API_KEY)
        .oneshot(Request::builder().uri("/index").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert_eq!(error_code(&body), "api_key_not_found");
}

#[tokio::test]
async fn wrong_api_key_is_unauthorized() {
    let resp = app("other-key").oneshot(get_request("/index")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn index_with_valid_key() {
    let resp = app(DEFAULT_API_KEY).oneshot(get_request("/index")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["site_title"], "Mock XenForo");
}

// --- users ---

#[tokio::test]
async fn me_requires_acting_user() {
    let resp = app(DEFAULT_API_KEY).oneshot(get_request("/me")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert_eq!(error_code(&body), "no_api_user");
}

#[tokio::test]
async fn me_returns_acting_user() {
    let req = Request::builder()
        .uri("/me")
        .header("XF-Api-Key", DEFAULT_API_KEY)
        .header("XF-Api-User", "2")
        .body(String::new())
        .unwrap();
    let resp = app(DEFAULT_API_KEY).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["me"]["username"], "Kim");
}

#[tokio::test]
async fn list_users_is_paginated() {
    let resp = app(DEFAULT_API_KEY).oneshot(get_request("/users?page=1")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["users"].as_array().unwrap().len(), 2);
    assert_eq!(body["pagination"]["total"], 2);
}

#[tokio::test]
async fn get_user_not_found() {
    let resp = app(DEFAULT_API_KEY).oneshot(get_request("/users/99")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = body_json(resp).await;
    assert_eq!(error_code(&body), "not_found");
}

// --- nodes & forums ---

#[tokio::test]
async fn category_is_not_a_forum() {
    let resp = app(DEFAULT_API_KEY).oneshot(get_request("/forums/1")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app(DEFAULT_API_KEY).oneshot(get_request("/nodes/1")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn forum_threads_lists_seeded_thread() {
    let resp = app(DEFAULT_API_KEY)
        .oneshot(get_request("/forums/2/threads"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    let threads: Vec<Thread> = serde_json::from_value(body["threads"].clone()).unwrap();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].title, "Welcome");
}

// --- threads ---

#[tokio::test]
async fn get_thread_with_posts() {
    let resp = app(DEFAULT_API_KEY)
        .oneshot(get_request("/threads/1?with_posts=1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["posts"].as_array().unwrap().len(), 1);

    let resp = app(DEFAULT_API_KEY).oneshot(get_request("/threads/1")).await.unwrap();
    let body: Value = body_json(resp).await;
    assert!(body.get("posts").is_none());
}

#[tokio::test]
async fn create_thread_requires_acting_user() {
    let resp = app(DEFAULT_API_KEY)
        .oneshot(form_request("/threads", None, "node_id=2&title=Hi&message=Body"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_thread_rejects_blank_title() {
    let resp = app(DEFAULT_API_KEY)
        .oneshot(form_request("/threads", Some("1"), "node_id=2&title=+&message=Body"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert_eq!(error_code(&body), "please_enter_valid_title");
}

#[tokio::test]
async fn create_thread_in_category_is_not_found() {
    let resp = app(DEFAULT_API_KEY)
        .oneshot(form_request("/threads", Some("1"), "node_id=1&title=Hi&message=Body"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_thread_malformed_form_returns_422() {
    let resp = app(DEFAULT_API_KEY)
        .oneshot(form_request("/threads", Some("1"), "title=Hi"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// --- echo ---

#[tokio::test]
async fn echo_reflects_request() {
    let resp = app(DEFAULT_API_KEY)
        .oneshot(form_request("/echo?a=1", Some("5"), "x=y"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["method"], "POST");
    assert_eq!(body["path"], "/echo");
    assert_eq!(body["query"], "a=1");
    assert_eq!(body["body"], "x=y");
    assert_eq!(body["headers"]["xf-api-user"], "5");
}

// --- full thread lifecycle ---

#[tokio::test]
async fn thread_lifecycle() {
    use tower::Service;

    let mut app = app(DEFAULT_API_KEY).into_service();

    // create a thread as Kim
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(form_request(
            "/threads",
            Some("2"),
            "node_id=2&title=Second+thread&message=Opening+post",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["success"], true);
    let created: Thread = serde_json::from_value(body["thread"].clone()).unwrap();
    assert_eq!(created.thread_id, 2);
    assert_eq!(created.username, "Kim");
    let first_post = created.first_post_id;

    // reply as Admin
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(form_request(
            "/posts",
            Some("1"),
            &format!("thread_id={}&message=Reply", created.thread_id),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["post"]["username"], "Admin");

    // thread now has one reply
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get_request(&format!("/threads/{}?with_posts=true", created.thread_id)))
        .await
        .unwrap();
    let body: Value = body_json(resp).await;
    assert_eq!(body["thread"]["reply_count"], 1);
    assert_eq!(body["posts"].as_array().unwrap().len(), 2);

    // first post is readable on its own
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get_request(&format!("/posts/{first_post}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["post"]["message"], "Opening post");

    // reply to a missing thread
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(form_request("/posts", Some("1"), "thread_id=99&message=Lost"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_bytes(resp).await;
    assert!(!body.is_empty());

    // thread list shows both threads
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get_request("/threads"))
        .await
        .unwrap();
    let body: Value = body_json(resp).await;
    assert_eq!(body["threads"].as_array().unwrap().len(), 2);
}
