//! In-process fake of the link-aggregator backend for integration tests.
//!
//! Serves a small fixed data set under `/api` on an ephemeral port and
//! applies the real toggle rules for votes and saves.

#![allow(dead_code)]

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

pub const API_KEY: &str = "key-alice";
pub const PASSWORD: &str = "hunter2";

/// Post whose vote endpoint always fails.
pub const BROKEN_POST: i64 = 13;

/// Account whose login response carries no API key.
pub const KEYLESS_USER: &str = "mallory";

#[derive(Default)]
pub struct ServerState {
    /// post id -> (score, caller's direction: -1, 0, 1)
    pub scores: HashMap<i64, (i64, i64)>,
    pub saved_posts: HashSet<i64>,
    pub requests: Vec<String>,
    pub api_keys_seen: Vec<Option<String>>,
    /// Text fields of the last multipart update, in arrival order.
    pub last_form: Vec<(String, String)>,
}

pub type Shared = Arc<Mutex<ServerState>>;

pub struct FakeServer {
    pub base_url: String,
    pub state: Shared,
}

impl FakeServer {
    pub async fn start() -> Self {
        let mut initial = ServerState::default();
        initial.scores.insert(42, (10, 0));
        initial.scores.insert(BROKEN_POST, (3, 0));
        let state: Shared = Arc::new(Mutex::new(initial));

        let app = Router::new()
            .route("/api/accounts/login", post(login))
            .route("/api/accounts/me", get(me))
            .route("/api/accounts/{username}", get(user_profile))
            .route("/api/posts", get(list_posts))
            .route("/api/posts/saved", get(saved_posts))
            .route("/api/posts/{id}", get(get_post).put(update_post))
            .route("/api/posts/{id}/comments", get(post_comments))
            .route("/api/posts/{id}/{action}", post(post_action))
            .route("/api/comments/saved", get(saved_comments))
            .route("/api/communities", get(broken_communities))
            .route("/api/search", get(search))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}/api", addr),
            state,
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn last_form(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().last_form.clone()
    }

    pub fn score(&self, id: i64) -> (i64, i64) {
        self.state.lock().unwrap().scores[&id]
    }
}

/// An address nothing listens on.
pub async fn dead_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/api", addr)
}

pub fn alice_profile(with_key: bool) -> Value {
    let mut profile = json!({
        "id": 1,
        "username": "alice",
        "display_name": "Alice Liddell",
        "bio": "Curiouser and curiouser",
        "avatar": null,
        "banner": null,
    });
    if with_key {
        profile["api_key"] = json!(API_KEY);
    }
    profile
}

fn post_json(id: i64, score: i64) -> Value {
    json!({
        "id": id,
        "title": format!("Post number {}", id),
        "content": "Body text",
        "url": "https://example.org/article",
        "author_id": 2,
        "author_name": "bob",
        "created_at": "2024-05-01T12:00:00Z",
        "votes": score,
        "communities": ["rust"],
        "comment_count": 2,
    })
}

fn comment_json(id: i64, parent: Option<i64>, content: &str, replies: Vec<Value>) -> Value {
    json!({
        "id": id,
        "post_id": 42,
        "parent_id": parent,
        "content": content,
        "author_id": 3,
        "author_name": "carol",
        "created_at": "2024-05-01T13:00:00Z",
        "votes": 1,
        "replies": replies,
    })
}

fn record(state: &Shared, headers: &HeaderMap, line: String) -> bool {
    let key = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let mut state = state.lock().unwrap();
    state.requests.push(line);
    let authorized = key.as_deref() == Some(API_KEY);
    state.api_keys_seen.push(key);
    authorized
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Authentication credentials were not provided."})),
    )
        .into_response()
}

async fn login(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    record(&state, &headers, "POST /accounts/login".into());
    if body["username"] == "alice" && body["password"] == PASSWORD {
        Json(alice_profile(true)).into_response()
    } else if body["username"] == KEYLESS_USER && body["password"] == PASSWORD {
        Json(json!({"id": 4, "username": KEYLESS_USER})).into_response()
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Invalid username or password"})),
        )
            .into_response()
    }
}

async fn me(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if !record(&state, &headers, "GET /accounts/me".into()) {
        return unauthorized();
    }
    Json(alice_profile(false)).into_response()
}

async fn user_profile(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> Response {
    record(&state, &headers, format!("GET /accounts/{}", username));
    if username == "bob" {
        Json(json!({"id": 2, "username": "bob", "bio": "Builds things"})).into_response()
    } else {
        (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response()
    }
}

async fn list_posts(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let filter = query.get("filter").cloned().unwrap_or_default();
    let order = query.get("order").cloned().unwrap_or_default();
    record(&state, &headers, format!("GET /posts?filter={}&order={}", filter, order));

    let score = state.lock().unwrap().scores[&42].0;
    Json(json!([post_json(42, score)])).into_response()
}

async fn saved_posts(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if !record(&state, &headers, "GET /posts/saved".into()) {
        return unauthorized();
    }
    let state = state.lock().unwrap();
    let mut ids: Vec<i64> = state.saved_posts.iter().copied().collect();
    ids.sort();
    let posts: Vec<Value> = ids
        .into_iter()
        .map(|id| post_json(id, state.scores.get(&id).map(|s| s.0).unwrap_or(0)))
        .collect();
    Json(Value::Array(posts)).into_response()
}

async fn saved_comments(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if !record(&state, &headers, "GET /comments/saved".into()) {
        return unauthorized();
    }
    Json(json!([])).into_response()
}

async fn get_post(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    record(&state, &headers, format!("GET /posts/{}", id));
    let score = state.lock().unwrap().scores.get(&id).map(|s| s.0);
    match score {
        Some(score) => Json(post_json(id, score)).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"detail": "No such post"}))).into_response(),
    }
}

async fn update_post(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Response {
    if !record(&state, &headers, format!("PUT /posts/{}", id)) {
        return unauthorized();
    }
    let mut fields = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let value = field.text().await.unwrap_or_default();
        fields.push((name, value));
    }
    let mut post = post_json(id, 10);
    for (name, value) in &fields {
        if name == "title" {
            post["title"] = json!(value);
        }
        if name == "url" {
            post["url"] = if value.is_empty() { Value::Null } else { json!(value) };
        }
    }
    state.lock().unwrap().last_form = fields;
    Json(post).into_response()
}

async fn post_comments(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let order = query.get("order").cloned().unwrap_or_default();
    record(&state, &headers, format!("GET /posts/{}/comments?order={}", id, order));
    Json(json!([
        comment_json(7, None, "First!", vec![comment_json(8, Some(7), "A reply", vec![])]),
        comment_json(9, None, "Another thought", vec![]),
    ]))
    .into_response()
}

async fn post_action(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((id, action)): Path<(i64, String)>,
) -> Response {
    if !record(&state, &headers, format!("POST /posts/{}/{}", id, action)) {
        return unauthorized();
    }
    if id == BROKEN_POST {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "database is down"})),
        )
            .into_response();
    }

    let mut state = state.lock().unwrap();
    match action.as_str() {
        "upvote" | "downvote" => {
            let clicked = if action == "upvote" { 1 } else { -1 };
            let Some(entry) = state.scores.get_mut(&id) else {
                return StatusCode::NOT_FOUND.into_response();
            };
            let (score, current) = *entry;
            let next = if current == clicked { 0 } else { clicked };
            *entry = (score + next - current, next);
            Json(json!({"votes": entry.0})).into_response()
        }
        "save" => {
            let saved = if state.saved_posts.remove(&id) {
                false
            } else {
                state.saved_posts.insert(id);
                true
            };
            Json(json!({"saved": saved})).into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn broken_communities(State(state): State<Shared>, headers: HeaderMap) -> Response {
    record(&state, &headers, "GET /communities".into());
    (StatusCode::OK, "<html>maintenance</html>").into_response()
}

async fn search(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let q = query.get("q").cloned().unwrap_or_default();
    let kind = query.get("type").cloned().unwrap_or_default();
    record(&state, &headers, format!("GET /search?q={}&type={}", q, kind));
    Json(json!({
        "posts": [post_json(42, 10)],
        "comments": [comment_json(7, None, "First!", vec![])],
    }))
    .into_response()
}
