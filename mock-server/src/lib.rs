//! In-memory stand-in for the slice of the Home Assistant REST API the
//! resolver talks to. Everything it serves comes from a `Fixture`; every
//! request line is appended to a journal so tests can assert on call order.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

/// What the mock instance knows about.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Fixture {
    /// Required bearer token. `None` accepts any request.
    pub token: Option<String>,
    /// `/api/states` payload, served verbatim.
    pub states: Vec<Value>,
    /// `todo.get_items` items by entity id. Other entities get a 400, like
    /// integrations that do not support service responses.
    pub service_items: HashMap<String, Vec<Value>>,
    /// `todo.get_items` items by raw `list_id`, checked first when the call
    /// carries one.
    pub raw_list_items: HashMap<String, Vec<Value>>,
    /// `/api/todo/items` payloads by entity id. Other entities get a 404.
    pub todo_api_items: HashMap<String, Vec<Value>>,
    /// `/api/shopping_list` payload. `None` means the integration is not
    /// loaded and the endpoint 404s.
    pub shopping_list: Option<Vec<Value>>,
}

impl Fixture {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[derive(Debug, Default)]
pub struct MockState {
    pub fixture: Fixture,
    /// `METHOD /path?query` of every request received, in order.
    pub requests: Vec<String>,
}

pub type Db = Arc<RwLock<MockState>>;

pub fn db(fixture: Fixture) -> Db {
    Arc::new(RwLock::new(MockState {
        fixture,
        requests: Vec::new(),
    }))
}

pub fn app(db: Db) -> Router {
    Router::new()
        .route("/api/states", get(list_states))
        .route("/api/states/{entity_id}", get(get_state))
        .route("/api/services/todo/get_items", post(get_items_service))
        .route("/api/todo/items", get(todo_items))
        .route("/api/shopping_list", get(shopping_list))
        .layer(middleware::from_fn_with_state(db.clone(), journal_and_authorize))
        .with_state(db)
}

pub async fn run(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app(db)).await
}

async fn journal_and_authorize(State(db): State<Db>, request: Request, next: Next) -> Response {
    let line = match request.uri().path_and_query() {
        Some(pq) => format!("{} {pq}", request.method()),
        None => format!("{} {}", request.method(), request.uri().path()),
    };

    let authorized = {
        let mut state = db.write().await;
        state.requests.push(line);
        match &state.fixture.token {
            None => true,
            Some(token) => request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v == format!("Bearer {token}")),
        }
    };

    if !authorized {
        return (StatusCode::UNAUTHORIZED, "401: Unauthorized").into_response();
    }
    next.run(request).await
}

async fn list_states(State(db): State<Db>) -> Json<Vec<Value>> {
    Json(db.read().await.fixture.states.clone())
}

async fn get_state(
    State(db): State<Db>,
    Path(entity_id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let state = db.read().await;
    state
        .fixture
        .states
        .iter()
        .find(|s| s.get("entity_id").and_then(Value::as_str) == Some(entity_id.as_str()))
        .cloned()
        .map(Json)
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(json!({"message": "Entity not found."})),
            )
        })
}

#[derive(Debug, Deserialize)]
pub struct GetItemsCall {
    pub entity_id: String,
    #[serde(default)]
    pub list_id: Option<String>,
}

async fn get_items_service(
    State(db): State<Db>,
    Query(params): Query<HashMap<String, String>>,
    Json(call): Json<GetItemsCall>,
) -> Result<Json<Value>, (StatusCode, String)> {
    if !params.contains_key("return_response") {
        return Err((
            StatusCode::BAD_REQUEST,
            "Service call requires responses but caller did not ask for responses".to_string(),
        ));
    }

    let state = db.read().await;
    let fixture = &state.fixture;
    let items = call
        .list_id
        .as_ref()
        .and_then(|list_id| fixture.raw_list_items.get(list_id))
        .or_else(|| fixture.service_items.get(&call.entity_id))
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                format!("Entity {} does not support this service.", call.entity_id),
            )
        })?;

    Ok(Json(json!({
        "changed_states": [],
        "service_response": { call.entity_id.as_str(): { "items": items } },
    })))
}

#[derive(Debug, Deserialize)]
pub struct TodoItemsQuery {
    pub entity_id: String,
}

async fn todo_items(
    State(db): State<Db>,
    Query(query): Query<TodoItemsQuery>,
) -> Result<Json<Vec<Value>>, StatusCode> {
    let state = db.read().await;
    state
        .fixture
        .todo_api_items
        .get(&query.entity_id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn shopping_list(State(db): State<Db>) -> Result<Json<Vec<Value>>, StatusCode> {
    let state = db.read().await;
    state
        .fixture
        .shopping_list
        .clone()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}
