#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{Value, json};
use uuid::Uuid;

use bingo_http::{HttpAuthority, HttpAuthorityConfig};

/// What the imitation backend holds and what it has been sent.
#[derive(Debug)]
pub struct Backend {
    pub status: String,
    pub turn: Option<Uuid>,
    pub players: Vec<(Uuid, String)>,
    /// Raw `drawnNumbers` entries, any shape the real backend uses.
    pub draws: Vec<Value>,
    pub tickets: HashMap<Uuid, Value>,
    /// `Null` until a winner is published.
    pub winner: Value,
    pub check_winner: Value,
    pub room_delay: Duration,
    pub turn_bodies: Vec<String>,
    pub generate_bodies: Vec<Value>,
    pub restarts: usize,
}

impl Default for Backend {
    fn default() -> Self {
        Self {
            status: "active".to_string(),
            turn: None,
            players: Vec::new(),
            draws: Vec::new(),
            tickets: HashMap::new(),
            winner: Value::Null,
            check_winner: json!({ "winner": false }),
            room_delay: Duration::ZERO,
            turn_bodies: Vec::new(),
            generate_bodies: Vec::new(),
            restarts: 0,
        }
    }
}

type Shared = Arc<Mutex<Backend>>;

pub fn grid() -> Value {
    json!([
        [1, 2, 3, 4, 5],
        [6, 7, 8, 9, 10],
        [11, 12, 13, 14, 15],
        [16, 17, 18, 19, 20],
        [21, 22, 23, 24, 25]
    ])
}

async fn get_room(State(s): State<Shared>, Path(_room): Path<String>) -> Json<Value> {
    let (delay, body) = {
        let b = s.lock().unwrap();
        let body = json!({
            "id": "room",
            "status": b.status,
            "currentTurnPlayerId": b.turn.map(|t| t.to_string()).unwrap_or_default(),
            "playerCount": b.players.len(),
        });
        (b.room_delay, body)
    };
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    Json(body)
}

async fn get_draws(State(s): State<Shared>, Path(_room): Path<String>) -> Json<Value> {
    let b = s.lock().unwrap();
    Json(json!({ "drawnNumbers": b.draws, "lastNumber": null }))
}

async fn post_draw(State(s): State<Shared>, Json(body): Json<Value>) -> StatusCode {
    let mut b = s.lock().unwrap();
    let number = body["number"].as_u64().unwrap_or_default();
    let taken = b
        .draws
        .iter()
        .any(|d| d.as_u64() == Some(number) || d["number"].as_u64() == Some(number));
    if taken {
        return StatusCode::BAD_REQUEST;
    }
    b.draws
        .push(json!({ "number": number, "playerId": body["playerId"] }));
    StatusCode::OK
}

async fn put_turn(
    State(s): State<Shared>,
    Path(_room): Path<String>,
    Json(player): Json<String>,
) -> StatusCode {
    let mut b = s.lock().unwrap();
    b.turn_bodies.push(player.clone());
    match Uuid::parse_str(&player) {
        Ok(id) => {
            b.turn = Some(id);
            StatusCode::NO_CONTENT
        },
        Err(_) => StatusCode::BAD_REQUEST,
    }
}

async fn get_players(State(s): State<Shared>, Path(_room): Path<String>) -> Json<Value> {
    let b = s.lock().unwrap();
    let players: Vec<Value> = b
        .players
        .iter()
        .map(|(id, name)| json!({ "playerId": id.to_string(), "userName": name }))
        .collect();
    Json(Value::Array(players))
}

async fn check_winner(State(s): State<Shared>, Json(_body): Json<Value>) -> Json<Value> {
    let b = s.lock().unwrap();
    Json(b.check_winner.clone())
}

async fn get_winner(State(s): State<Shared>, Path(_room): Path<String>) -> Response {
    let b = s.lock().unwrap();
    if b.winner.is_null() {
        StatusCode::NOT_FOUND.into_response()
    } else {
        Json(b.winner.clone()).into_response()
    }
}

async fn restart(State(s): State<Shared>, Path(_room): Path<String>) -> StatusCode {
    let mut b = s.lock().unwrap();
    b.restarts += 1;
    b.status = "active".to_string();
    b.draws.clear();
    b.winner = Value::Null;
    StatusCode::OK
}

async fn get_ticket(State(s): State<Shared>, Path(player): Path<String>) -> Response {
    let b = s.lock().unwrap();
    let ticket = Uuid::parse_str(&player)
        .ok()
        .and_then(|id| b.tickets.get(&id).cloned());
    match ticket {
        Some(ticket) => Json(ticket).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Stores the grid as a JSON string and answers without it.
async fn generate_ticket(State(s): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut b = s.lock().unwrap();
    b.generate_bodies.push(body.clone());
    let Some(player) = body["playerId"].as_str().and_then(|p| Uuid::parse_str(p).ok()) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    b.tickets.insert(player, Value::String(grid().to_string()));
    Json(json!({ "message": "Ticket generated" })).into_response()
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub backend: Shared,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn new() -> Self {
        let backend: Shared = Arc::new(Mutex::new(Backend::default()));
        let app = Router::new()
            .route("/api/rooms/{id}", get(get_room))
            .route("/api/rooms/{id}/turn", put(put_turn))
            .route("/api/rooms/{id}/restart", post(restart))
            .route("/api/draw", post(post_draw))
            .route("/api/draw/{id}", get(get_draws))
            .route("/api/players/room/{id}", get(get_players))
            .route("/api/game/check-winner", post(check_winner))
            .route("/api/game/winner/{id}", get(get_winner))
            .route("/api/tickets/generate", post(generate_ticket))
            .route("/api/tickets/{player}", get(get_ticket))
            .with_state(Arc::clone(&backend));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            backend,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn backend(&self) -> MutexGuard<'_, Backend> {
        self.backend.lock().unwrap()
    }

    pub fn authority(&self) -> HttpAuthority {
        self.authority_with_timeout(2000)
    }

    pub fn authority_with_timeout(&self, request_timeout_ms: u64) -> HttpAuthority {
        let config = HttpAuthorityConfig {
            request_timeout_ms,
            ..HttpAuthorityConfig::new(self.base_url())
        };
        HttpAuthority::new(&config).unwrap()
    }

    /// Two players in an active room; returns `(first, second)`.
    pub fn seat_two(&self) -> (Uuid, Uuid) {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let mut b = self.backend();
        b.players = vec![(first, "ann".to_string()), (second, "bob".to_string())];
        b.turn = Some(first);
        (first, second)
    }
}
