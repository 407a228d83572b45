//! HTTP server the client's integration tests talk to.
//!
//! The `/items` store is a small JSON CRUD resource. It backs the client's
//! JSON round trips: POST creates an item, PUT updates it, GET reads it back
//! and DELETE removes it.
//!
//! The other routes serve fixed bodies for the cases the client treats
//! specially: text in a declared charset, raw bytes, a redirect, error
//! statuses with and without a body, and a slow response.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
    time::Duration,
};

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Redirect},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// `café` encoded as ISO-8859-1.
pub const LATIN1_BODY: &[u8] = b"caf\xe9";
pub const UTF8_BODY: &str = "café ☕";
pub const LINES_BODY: &str = "alpha\nbeta\ngamma\n";
pub const ERROR_BODY: &str = "bad request";
pub const SLOW_DELAY: Duration = Duration::from_secs(2);

/// Every byte value once, for binary copies.
pub fn binary_body() -> Vec<u8> {
    (0..=255).collect()
}

/// What `/echo` saw of the request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    /// Header names are lowercase.
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct CreateItem {
    pub name: String,
    #[serde(default)]
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct UpdateItem {
    pub name: Option<String>,
    pub quantity: Option<u32>,
}

pub type Db = Arc<RwLock<HashMap<Uuid, Item>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/echo", any(echo))
        .route("/echo/{*rest}", any(echo))
        .route("/text/latin1", get(latin1_text))
        .route("/text/utf8", get(utf8_text))
        .route("/lines", get(lines))
        .route("/binary", get(binary))
        .route("/redirect", get(redirect))
        .route("/fail/with-body", any(fail_with_body))
        .route("/fail/empty", any(fail_empty))
        .route("/slow", get(slow))
        .route("/items", get(list_items).post(create_item))
        .route("/items/{id}", get(get_item).put(update_item).delete(delete_item))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Echo> {
    let headers = headers
        .iter()
        .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
        .collect();
    tracing::debug!(%method, %uri, "echo");
    Json(Echo {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

async fn latin1_text() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain; charset=ISO-8859-1")], LATIN1_BODY)
}

async fn utf8_text() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain")], UTF8_BODY)
}

async fn lines() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], LINES_BODY)
}

async fn binary() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/octet-stream")], binary_body())
}

async fn redirect() -> Redirect {
    Redirect::to("/text/utf8")
}

async fn fail_with_body() -> (StatusCode, &'static str) {
    (StatusCode::BAD_REQUEST, ERROR_BODY)
}

async fn fail_empty() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn slow() -> &'static str {
    tokio::time::sleep(SLOW_DELAY).await;
    "late"
}

async fn list_items(State(db): State<Db>) -> Json<Vec<Item>> {
    let items = db.read().await;
    Json(items.values().cloned().collect())
}

async fn create_item(
    State(db): State<Db>,
    Json(input): Json<CreateItem>,
) -> (StatusCode, Json<Item>) {
    let item = Item {
        id: Uuid::new_v4(),
        name: input.name,
        quantity: input.quantity,
    };
    tracing::debug!(id = %item.id, "created item");
    db.write().await.insert(item.id, item.clone());
    (StatusCode::CREATED, Json(item))
}

async fn get_item(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<Json<Item>, StatusCode> {
    let items = db.read().await;
    items.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn update_item(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateItem>,
) -> Result<Json<Item>, StatusCode> {
    let mut items = db.write().await;
    let item = items.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    if let Some(name) = input.name {
        item.name = name;
    }
    if let Some(quantity) = input.quantity {
        item.quantity = quantity;
    }
    Ok(Json(item.clone()))
}

async fn delete_item(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    let mut items = db.write().await;
    tracing::debug!(%id, "deleting item");
    items.remove(&id).map(|_| StatusCode::NO_CONTENT).ok_or(StatusCode::NOT_FOUND)
}
