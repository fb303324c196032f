use std::{
    collections::BTreeMap,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    extract::{Path, Query, Request, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;

pub const DEFAULT_API_KEY: &str = "mock-api-key";
pub const PER_PAGE: usize = 20;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub user_id: u64,
    pub username: String,
    pub message_count: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Node {
    pub node_id: u64,
    pub title: String,
    pub node_type_id: String,
    pub parent_node_id: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Thread {
    pub thread_id: u64,
    pub node_id: u64,
    pub title: String,
    pub user_id: u64,
    pub username: String,
    pub reply_count: u64,
    pub first_post_id: u64,
    pub post_date: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    pub post_id: u64,
    pub thread_id: u64,
    pub user_id: u64,
    pub username: String,
    pub message: String,
    pub post_date: u64,
}

#[derive(Deserialize)]
pub struct CreateThread {
    pub node_id: u64,
    pub title: String,
    pub message: String,
}

#[derive(Deserialize)]
pub struct CreatePost {
    pub thread_id: u64,
    pub message: String,
}

#[derive(Deserialize, Default)]
pub struct PageQuery {
    pub page: Option<usize>,
}

#[derive(Deserialize, Default)]
pub struct ThreadQuery {
    pub with_posts: Option<String>,
}

impl ThreadQuery {
    /// XenForo accepts `1` or `true` for boolean flags.
    pub fn with_posts(&self) -> bool {
        matches!(self.with_posts.as_deref(), Some("1" | "true"))
    }
}

/// In-memory board contents.
#[derive(Debug)]
pub struct Board {
    users: BTreeMap<u64, User>,
    nodes: BTreeMap<u64, Node>,
    threads: BTreeMap<u64, Thread>,
    posts: BTreeMap<u64, Post>,
    next_thread_id: u64,
    next_post_id: u64,
}

impl Board {
    /// Two users, one category holding one forum, and a welcome thread.
    pub fn seeded() -> Self {
        let users = [
            User { user_id: 1, username: "Admin".to_string(), message_count: 1 },
            User { user_id: 2, username: "Kim".to_string(), message_count: 0 },
        ];
        let nodes = [
            Node {
                node_id: 1,
                title: "Main category".to_string(),
                node_type_id: "Category".to_string(),
                parent_node_id: 0,
            },
            Node {
                node_id: 2,
                title: "General discussion".to_string(),
                node_type_id: "Forum".to_string(),
                parent_node_id: 1,
            },
        ];
        let thread = Thread {
            thread_id: 1,
            node_id: 2,
            title: "Welcome".to_string(),
            user_id: 1,
            username: "Admin".to_string(),
            reply_count: 0,
            first_post_id: 1,
            post_date: 1_700_000_000,
        };
        let post = Post {
            post_id: 1,
            thread_id: 1,
            user_id: 1,
            username: "Admin".to_string(),
            message: "Welcome to the board.".to_string(),
            post_date: 1_700_000_000,
        };

        Self {
            users: users.into_iter().map(|u| (u.user_id, u)).collect(),
            nodes: nodes.into_iter().map(|n| (n.node_id, n)).collect(),
            threads: BTreeMap::from([(thread.thread_id, thread)]),
            posts: BTreeMap::from([(post.post_id, post)]),
            next_thread_id: 2,
            next_post_id: 2,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    api_key: Arc<str>,
    board: Arc<RwLock<Board>>,
}

/// XenForo-style error body: `{"errors":[{"code", "message", "params"}]}`.
#[derive(Debug)]
pub struct XfError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
}

impl XfError {
    const fn new(status: StatusCode, code: &'static str, message: &'static str) -> Self {
        Self { status, code, message }
    }

    fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", "Requested page could not be found.")
    }

    fn no_api_user() -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "no_api_user",
            "This request requires an acting user via the XF-Api-User header.",
        )
    }
}

impl IntoResponse for XfError {
    fn into_response(self) -> Response {
        let body = json!({
            "errors": [{ "code": self.code, "message": self.message, "params": [] }]
        });
        (self.status, Json(body)).into_response()
    }
}

type XfResult = Result<Json<Value>, XfError>;

pub fn app(api_key: impl Into<String>) -> Router {
    let state = AppState {
        api_key: Arc::from(api_key.into()),
        board: Arc::new(RwLock::new(Board::seeded())),
    };
    Router::new()
        .route("/index", get(index))
        .route("/me", get(me))
        .route("/users", get(list_users))
        .route("/users/{id}", get(get_user))
        .route("/nodes", get(list_nodes))
        .route("/nodes/{id}", get(get_node))
        .route("/forums/{id}", get(get_forum))
        .route("/forums/{id}/threads", get(get_forum_threads))
        .route("/threads", get(list_threads).post(create_thread))
        .route("/threads/{id}", get(get_thread))
        .route("/posts", post(create_post))
        .route("/posts/{id}", get(get_post))
        .route("/alerts", get(list_alerts))
        .route("/echo", any(echo))
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(listener: TcpListener, api_key: impl Into<String>) -> Result<(), std::io::Error> {
    axum::serve(listener, app(api_key)).await
}

async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let rejection = match request.headers().get("xf-api-key").and_then(|value| value.to_str().ok()) {
        Some(key) if key == &*state.api_key => None,
        Some(_) => Some(StatusCode::UNAUTHORIZED),
        None => Some(StatusCode::BAD_REQUEST),
    };
    match rejection {
        None => next.run(request).await,
        Some(status) => XfError::new(
            status,
            "api_key_not_found",
            "API key provided in request was not found.",
        )
        .into_response(),
    }
}

fn acting_user(headers: &HeaderMap) -> Option<u64> {
    headers
        .get("xf-api-user")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

fn paginate<T: Serialize>(items: Vec<T>, page: Option<usize>) -> (Vec<T>, Value) {
    let total = items.len();
    let last_page = total.div_ceil(PER_PAGE).max(1);
    let current_page = page.unwrap_or(1).clamp(1, last_page);
    let shown: Vec<T> = items
        .into_iter()
        .skip((current_page - 1) * PER_PAGE)
        .take(PER_PAGE)
        .collect();
    let pagination = json!({
        "current_page": current_page,
        "last_page": last_page,
        "per_page": PER_PAGE,
        "shown": shown.len(),
        "total": total,
    });
    (shown, pagination)
}

async fn index() -> Json<Value> {
    Json(json!({
        "version_id": 2_030_000,
        "site_title": "Mock XenForo",
        "base_url": "http://localhost",
        "api_url": "http://localhost/api",
    }))
}

async fn me(State(state): State<AppState>, headers: HeaderMap) -> XfResult {
    let user_id = acting_user(&headers).ok_or_else(XfError::no_api_user)?;
    let board = state.board.read().await;
    let user = board.users.get(&user_id).ok_or_else(XfError::not_found)?;
    Ok(Json(json!({ "me": user })))
}

async fn list_users(State(state): State<AppState>, Query(query): Query<PageQuery>) -> Json<Value> {
    let board = state.board.read().await;
    let (users, pagination) = paginate(board.users.values().cloned().collect(), query.page);
    Json(json!({ "users": users, "pagination": pagination }))
}

async fn get_user(State(state): State<AppState>, Path(id): Path<u64>) -> XfResult {
    let board = state.board.read().await;
    let user = board.users.get(&id).ok_or_else(XfError::not_found)?;
    Ok(Json(json!({ "user": user })))
}

async fn list_nodes(State(state): State<AppState>) -> Json<Value> {
    let board = state.board.read().await;
    let nodes: Vec<&Node> = board.nodes.values().collect();
    Json(json!({ "nodes": nodes }))
}

async fn get_node(State(state): State<AppState>, Path(id): Path<u64>) -> XfResult {
    let board = state.board.read().await;
    let node = board.nodes.get(&id).ok_or_else(XfError::not_found)?;
    Ok(Json(json!({ "node": node })))
}

async fn get_forum(State(state): State<AppState>, Path(id): Path<u64>) -> XfResult {
    let board = state.board.read().await;
    let forum = board
        .nodes
        .get(&id)
        .filter(|node| node.node_type_id == "Forum")
        .ok_or_else(XfError::not_found)?;
    Ok(Json(json!({ "forum": forum })))
}

async fn get_forum_threads(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Query(query): Query<PageQuery>,
) -> XfResult {
    let board = state.board.read().await;
    board
        .nodes
        .get(&id)
        .filter(|node| node.node_type_id == "Forum")
        .ok_or_else(XfError::not_found)?;
    let threads: Vec<Thread> = board
        .threads
        .values()
        .filter(|thread| thread.node_id == id)
        .cloned()
        .collect();
    let (threads, pagination) = paginate(threads, query.page);
    Ok(Json(json!({ "threads": threads, "pagination": pagination })))
}

async fn list_threads(State(state): State<AppState>, Query(query): Query<PageQuery>) -> Json<Value> {
    let board = state.board.read().await;
    let (threads, pagination) = paginate(board.threads.values().cloned().collect(), query.page);
    Json(json!({ "threads": threads, "pagination": pagination }))
}

async fn get_thread(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Query(query): Query<ThreadQuery>,
) -> XfResult {
    let board = state.board.read().await;
    let thread = board.threads.get(&id).ok_or_else(XfError::not_found)?;
    if query.with_posts() {
        let posts: Vec<&Post> = board.posts.values().filter(|p| p.thread_id == id).collect();
        return Ok(Json(json!({ "thread": thread, "posts": posts })));
    }
    Ok(Json(json!({ "thread": thread })))
}

async fn create_thread(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(input): Form<CreateThread>,
) -> XfResult {
    let user_id = acting_user(&headers).ok_or_else(XfError::no_api_user)?;
    if input.title.trim().is_empty() {
        return Err(XfError::new(
            StatusCode::BAD_REQUEST,
            "please_enter_valid_title",
            "Please enter a valid title.",
        ));
    }

    let mut board = state.board.write().await;
    let username = board
        .users
        .get(&user_id)
        .map(|user| user.username.clone())
        .ok_or_else(XfError::not_found)?;
    board
        .nodes
        .get(&input.node_id)
        .filter(|node| node.node_type_id == "Forum")
        .ok_or_else(XfError::not_found)?;

    let thread_id = board.next_thread_id;
    let post_id = board.next_post_id;
    board.next_thread_id += 1;
    board.next_post_id += 1;

    let post_date = now();
    let thread = Thread {
        thread_id,
        node_id: input.node_id,
        title: input.title,
        user_id,
        username: username.clone(),
        reply_count: 0,
        first_post_id: post_id,
        post_date,
    };
    board.posts.insert(
        post_id,
        Post {
            post_id,
            thread_id,
            user_id,
            username,
            message: input.message,
            post_date,
        },
    );
    board.threads.insert(thread_id, thread.clone());
    if let Some(user) = board.users.get_mut(&user_id) {
        user.message_count += 1;
    }
    Ok(Json(json!({ "success": true, "thread": thread })))
}

async fn get_post(State(state): State<AppState>, Path(id): Path<u64>) -> XfResult {
    let board = state.board.read().await;
    let post = board.posts.get(&id).ok_or_else(XfError::not_found)?;
    Ok(Json(json!({ "post": post })))
}

async fn create_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(input): Form<CreatePost>,
) -> XfResult {
    let user_id = acting_user(&headers).ok_or_else(XfError::no_api_user)?;
    let mut board = state.board.write().await;
    let username = board
        .users
        .get(&user_id)
        .map(|user| user.username.clone())
        .ok_or_else(XfError::not_found)?;
    let thread = board
        .threads
        .get_mut(&input.thread_id)
        .ok_or_else(XfError::not_found)?;
    thread.reply_count += 1;

    let post_id = board.next_post_id;
    board.next_post_id += 1;
    let post = Post {
        post_id,
        thread_id: input.thread_id,
        user_id,
        username,
        message: input.message,
        post_date: now(),
    };
    board.posts.insert(post_id, post.clone());
    if let Some(user) = board.users.get_mut(&user_id) {
        user.message_count += 1;
    }
    Ok(Json(json!({ "success": true, "post": post })))
}

async fn list_alerts(headers: HeaderMap) -> XfResult {
    acting_user(&headers).ok_or_else(XfError::no_api_user)?;
    let (alerts, pagination) = paginate(Vec::<Value>::new(), None);
    Ok(Json(json!({ "alerts": alerts, "pagination": pagination })))
}

/// Reflect the request back so clients can check what went over the wire.
async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: String) -> Json<Value> {
    let headers: BTreeMap<String, String> = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query(),
        "headers": headers,
        "body": body,
    }))
}
