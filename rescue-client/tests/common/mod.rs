// rescue-client/tests/common/mod.rs
// 测试后端 - axum 模拟 REST + /ws/map/

#![allow(dead_code)]

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use rescue_client::{ClientConfig, ReconnectPolicy, RescueClient};
use serde_json::{Value, json};
use shared::ApiResponse;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

pub const PASSWORD: &str = "secret";
const REFRESH_COOKIE: &str = "refresh_token=rt-1";

/// Server → client push on every open stream
#[derive(Debug, Clone)]
pub enum Push {
    Text(String),
    Close(u16),
}

/// Observable backend state
pub struct BackendState {
    valid_token: Mutex<String>,
    issued: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    /// Tokens presented on accepted stream handshakes, in order
    pub stream_tokens: Mutex<Vec<String>>,
    open_streams: AtomicUsize,
    push: broadcast::Sender<Push>,
    pub map_points: Mutex<Value>,
    pub map_queries: Mutex<Vec<HashMap<String, String>>>,
    pub account_requests: AtomicUsize,
    pub account_total: i64,
    pub request_queries: Mutex<Vec<HashMap<String, String>>>,
    /// `(request id, status)` in arrival order
    pub status_updates: Mutex<Vec<(String, String)>>,
    pub team_queries: Mutex<Vec<HashMap<String, String>>>,
    /// `(request id, team id)` dispatches accepted
    pub assignments: Mutex<Vec<(String, String)>>,
}

impl BackendState {
    fn new() -> Self {
        let (push, _) = broadcast::channel(64);
        Self {
            valid_token: Mutex::new(String::new()),
            issued: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            stream_tokens: Mutex::new(Vec::new()),
            open_streams: AtomicUsize::new(0),
            push,
            map_points: Mutex::new(json!([])),
            map_queries: Mutex::new(Vec::new()),
            account_requests: AtomicUsize::new(0),
            account_total: 25,
            request_queries: Mutex::new(Vec::new()),
            status_updates: Mutex::new(Vec::new()),
            team_queries: Mutex::new(Vec::new()),
            assignments: Mutex::new(Vec::new()),
        }
    }

    fn mint(&self) -> String {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let token = format!("T{n}");
        *self.valid_token.lock() = token.clone();
        token
    }

    /// Invalidate the current access token
    pub fn expire(&self) {
        self.valid_token.lock().clear();
    }

    pub fn current_token(&self) -> String {
        self.valid_token.lock().clone()
    }

    pub fn open_streams(&self) -> usize {
        self.open_streams.load(Ordering::SeqCst)
    }

    pub fn push(&self, push: Push) {
        let _ = self.push.send(push);
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let valid = self.valid_token.lock();
        !valid.is_empty()
            && headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .is_some_and(|t| t == valid.as_str())
    }
}

pub struct TestBackend {
    pub addr: SocketAddr,
    pub state: Arc<BackendState>,
    server: JoinHandle<()>,
}

impl TestBackend {
    pub async fn start() -> Self {
        let state = Arc::new(BackendState::new());
        let app = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/refresh", post(refresh))
            .route("/api/auth/logout", post(logout))
            .route("/api/map-points", get(map_points))
            .route("/api/admin/accounts", get(list_accounts))
            .route("/api/admin/accounts/{id}/active", patch(set_active))
            .route("/api/rescue-teams/", get(list_teams))
            .route("/api/requests", get(list_requests))
            .route("/api/requests/{id}/status", patch(update_status))
            .route("/api/rescue-teams/find-teams", get(find_teams))
            .route("/api/rescue-teams/dispatch/assign", post(assign_team))
            .route("/ws/map/", get(stream))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test backend");
        let addr = listener.local_addr().expect("local addr");
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("test backend");
        });

        Self {
            addr,
            state,
            server,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Config pointing REST and stream at this backend
    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(self.base_url())
            .with_reconnect(ReconnectPolicy::fixed(Duration::from_millis(200)))
            .with_timeout(Duration::from_secs(5))
    }

    pub fn client(&self) -> RescueClient {
        RescueClient::new(self.config()).expect("client")
    }
}

impl Drop for TestBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Poll `cond` until it holds or the deadline passes
pub async fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !cond() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

// ========== Handlers ==========

async fn login(State(state): State<Arc<BackendState>>, Json(body): Json<Value>) -> Response {
    if body["password"] != PASSWORD {
        return (StatusCode::UNAUTHORIZED, Json(json!({"detail": "bad credentials"}))).into_response();
    }
    let token = state.mint();
    let identifier = body["identifier"].as_str().unwrap_or_default().to_string();
    (
        [(header::SET_COOKIE, format!("{REFRESH_COOKIE}; HttpOnly; Path=/"))],
        Json(json!({
            "access_token": token,
            "token_type": "bearer",
            "user": {"id": "u1", "email": identifier, "role": "admin"}
        })),
    )
        .into_response()
}

async fn refresh(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let has_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.split(';').any(|c| c.trim() == REFRESH_COOKIE));
    if !has_cookie {
        return (StatusCode::UNAUTHORIZED, Json(json!({"detail": "no refresh token"}))).into_response();
    }
    // Slow enough for concurrent callers to pile up behind the exchange
    tokio::time::sleep(Duration::from_millis(50)).await;
    let token = state.mint();
    Json(json!({"token_type": "bearer", "access_token": token})).into_response()
}

async fn logout(State(state): State<Arc<BackendState>>) -> Response {
    state.logout_calls.fetch_add(1, Ordering::SeqCst);
    state.expire();
    (
        [(header::SET_COOKIE, "refresh_token=; Max-Age=0; Path=/".to_string())],
        Json(json!({"message": "logged out"})),
    )
        .into_response()
}

async fn map_points(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !state.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    state.map_queries.lock().push(query);
    Json(state.map_points.lock().clone()).into_response()
}

async fn list_accounts(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !state.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    state.account_requests.fetch_add(1, Ordering::SeqCst);

    let limit: usize = query.get("limit").and_then(|v| v.parse().ok()).unwrap_or(10);
    let before: i64 = query
        .get("cursor")
        .and_then(|v| v.parse().ok())
        .unwrap_or(i64::MAX);
    let search = query.get("search").cloned().unwrap_or_default();

    // Newest (highest id) first
    let matching: Vec<i64> = (1..=state.account_total)
        .rev()
        .filter(|id| *id < before)
        .filter(|id| search.is_empty() || format!("user{id}@rescue.example").contains(&search))
        .collect();
    let page: Vec<i64> = matching.iter().copied().take(limit).collect();
    let next_cursor = (matching.len() > page.len())
        .then(|| page.last().map(|id| id.to_string()))
        .flatten();

    let items: Vec<Value> = page
        .iter()
        .map(|id| {
            json!({
                "id": id,
                "email": format!("user{id}@rescue.example"),
                "phone": null,
                "role": {"id": 2, "name": "rescuer"},
                "is_active": id % 2 == 0,
                "created_at": "2024-10-01T10:00:00Z"
            })
        })
        .collect();
    Json(json!({"items": items, "next_cursor": next_cursor})).into_response()
}

async fn set_active(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    if !state.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({"id": id, "is_active": body["is_active"]})).into_response()
}

async fn list_teams(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    if !state.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(ApiResponse::ok(json!([
        {"id": "t1", "name": "Team Alpha", "latitude": 10.7, "longitude": 106.6, "status": "available"},
        {"id": "t2", "name": "Team Bravo", "status": "busy"}
    ])))
    .into_response()
}

const REQUEST_IDS: [&str; 3] = ["r1", "r2", "r3"];

fn request_row(id: &str, status: &str) -> Value {
    let assignment = (status == "IN_PROGRESS").then(|| {
        json!({
            "task_id": format!("task-{id}"),
            "status": "ASSIGNED",
            "team_name": "Team Alpha",
            "team_phone": null,
            "team_lat": 10.7,
            "team_lng": 106.6,
            "updated_at": "2025-11-20T09:00:00Z"
        })
    });
    json!({
        "id": id,
        "code": format!("RQ-{id}"),
        "name": format!("Caller {id}"),
        "contact_phone": "0900000000",
        "adults": 2,
        "children": 1,
        "elderly": 0,
        "people_summary": "2 adults, 1 child",
        "latitude": 10.76,
        "longitude": 106.66,
        "address": "District 1",
        "status": status,
        "created_at": "2025-11-20T08:00:00Z",
        "conditions": ["flooded"],
        "media_urls": [],
        "description_short": "Water rising",
        "active_assignment": assignment
    })
}

async fn list_requests(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !state.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    state.request_queries.lock().push(query.clone());

    let page: usize = query.get("page").and_then(|v| v.parse().ok()).unwrap_or(1);
    let page_size: usize = query.get("page_size").and_then(|v| v.parse().ok()).unwrap_or(20);
    let rows: Vec<Value> = REQUEST_IDS
        .iter()
        .map(|id| {
            let status = if *id == "r3" { "IN_PROGRESS" } else { "PENDING" };
            request_row(id, status)
        })
        .filter(|row| query.get("status").is_none_or(|s| row["status"] == s.as_str()))
        .collect();
    let total = rows.len();
    let items: Vec<Value> = rows
        .into_iter()
        .skip(page.saturating_sub(1) * page_size)
        .take(page_size)
        .collect();
    Json(json!({"items": items, "total": total, "page": page, "page_size": page_size}))
        .into_response()
}

async fn update_status(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if !state.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let status = body["status"].as_str().unwrap_or_default().to_string();
    state.status_updates.lock().push((id, status));
    Json(json!({"success": true})).into_response()
}

async fn find_teams(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !state.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    state.team_queries.lock().push(query);
    Json(json!([
        {"id": "t1", "name": "Team Alpha", "contact_phone": "0911", "distance": 1.25},
        {"id": "t2", "name": "Team Bravo", "contact_phone": null, "distance": 7.5}
    ]))
    .into_response()
}

async fn assign_team(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !state.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let request_id = body["request_id"].as_str().unwrap_or_default().to_string();
    let team_id = body["rescue_team_id"].as_str().unwrap_or_default().to_string();
    if !REQUEST_IDS.contains(&request_id.as_str()) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "message": "request not found"})),
        )
            .into_response();
    }
    state.assignments.lock().push((request_id.clone(), team_id));
    Json(json!({
        "success": true,
        "message": "dispatched",
        "task_id": format!("task-{request_id}"),
        "status": "ASSIGNED"
    }))
    .into_response()
}

async fn stream(
    State(state): State<Arc<BackendState>>,
    Query(query): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let token = query.get("token").cloned().unwrap_or_default();
    if token.is_empty() || token != state.current_token() {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    state.stream_tokens.lock().push(token);
    ws.on_upgrade(move |socket| stream_session(socket, state))
}

async fn stream_session(mut socket: WebSocket, state: Arc<BackendState>) {
    let mut pushes = state.push.subscribe();
    state.open_streams.fetch_add(1, Ordering::SeqCst);

    loop {
        tokio::select! {
            push = pushes.recv() => match push {
                Ok(Push::Text(text)) => {
                    if socket.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Ok(Push::Close(code)) => {
                    let frame = CloseFrame { code, reason: Utf8Bytes::from_static("server close") };
                    let _ = socket.send(Message::Close(Some(frame))).await;
                    break;
                }
                Err(_) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }

    state.open_streams.fetch_sub(1, Ordering::SeqCst);
}
