//! In-memory todoable service.
//!
//! Serves the same routes as the real API under `/api`: basic-auth
//! `POST /authenticate` issues short-lived tokens, and every `/lists` route
//! requires `Authorization: Token token="..."` naming an unexpired one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const API_PREFIX: &str = "/api";

#[derive(Clone, Debug)]
pub struct MockConfig {
    pub username: String,
    pub password: String,
    pub token_ttl: Duration,
    /// Prefix for `src` links in responses.
    pub public_uri: String,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            username: "username".to_string(),
            password: "password".to_string(),
            token_ttl: Duration::minutes(20),
            public_uri: "http://localhost:3000/api".to_string(),
        }
    }
}

/// Entry in `GET /lists`, and the body of create/update responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct List {
    pub name: String,
    pub src: String,
    pub id: Uuid,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub finished_at: Option<DateTime<Utc>>,
    pub src: String,
    pub id: Uuid,
}

/// Body of `GET /lists/{id}`. Like the real service, it omits the id.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListDetail {
    pub name: String,
    pub items: Vec<Item>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListCollection {
    pub lists: Vec<List>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Authentication {
    pub token: String,
    pub expires_at: String,
}

#[derive(Deserialize, Default)]
pub struct NameParams {
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize, Default)]
pub struct ListParams {
    #[serde(default)]
    pub list: NameParams,
}

#[derive(Deserialize, Default)]
pub struct ItemParams {
    #[serde(default)]
    pub item: NameParams,
}

struct StoredList {
    id: Uuid,
    name: String,
    items: Vec<Item>,
}

#[derive(Default)]
struct Store {
    lists: Vec<StoredList>,
    tokens: HashMap<String, DateTime<Utc>>,
}

impl Store {
    fn list_mut(&mut self, id: Uuid) -> Result<&mut StoredList, MockError> {
        self.lists.iter_mut().find(|l| l.id == id).ok_or(MockError::NotFound)
    }
}

#[derive(Clone)]
pub struct MockState {
    store: Arc<RwLock<Store>>,
    config: Arc<MockConfig>,
    auth_count: Arc<AtomicUsize>,
    token_ttl_secs: Arc<AtomicI64>,
}

impl MockState {
    pub fn new(config: MockConfig) -> Self {
        Self {
            store: Arc::new(RwLock::new(Store::default())),
            token_ttl_secs: Arc::new(AtomicI64::new(config.token_ttl.num_seconds())),
            config: Arc::new(config),
            auth_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Lifetime of tokens issued from now on. Tokens already issued keep
    /// their expiry.
    pub fn set_token_ttl(&self, ttl: Duration) {
        self.token_ttl_secs.store(ttl.num_seconds(), Ordering::SeqCst);
    }

    fn token_ttl(&self) -> Duration {
        Duration::seconds(self.token_ttl_secs.load(Ordering::SeqCst))
    }

    /// Successful `POST /authenticate` calls so far.
    pub fn auth_count(&self) -> usize {
        self.auth_count.load(Ordering::SeqCst)
    }

    fn list_src(&self, id: Uuid) -> String {
        format!("{}/lists/{id}", self.config.public_uri)
    }

    fn item_src(&self, list_id: Uuid, id: Uuid) -> String {
        format!("{}/lists/{list_id}/items/{id}", self.config.public_uri)
    }

    fn summary(&self, list: &StoredList) -> List {
        List {
            name: list.name.clone(),
            src: self.list_src(list.id),
            id: list.id,
        }
    }
}

pub enum MockError {
    NotFound,
    Invalid(Value),
}

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        match self {
            MockError::NotFound => StatusCode::NOT_FOUND.into_response(),
            MockError::Invalid(errors) => (StatusCode::UNPROCESSABLE_ENTITY, Json(errors)).into_response(),
        }
    }
}

fn validate_name(name: &str) -> Result<String, MockError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(MockError::Invalid(json!({"name": ["can't be blank"]})));
    }
    Ok(name.to_string())
}

/// Router with default credentials (`username` / `password`).
pub fn app() -> Router {
    router(MockState::new(MockConfig::default()))
}

pub fn router(state: MockState) -> Router {
    let protected = Router::new()
        .route("/lists", get(list_lists).post(create_list))
        .route("/lists/{id}", get(get_list).patch(update_list).delete(delete_list))
        .route("/lists/{id}/items", post(create_item))
        .route("/lists/{id}/items/{item_id}", delete(delete_item))
        .route("/lists/{id}/items/{item_id}/finish", put(finish_item))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    let api = Router::new().route("/authenticate", post(authenticate)).merge(protected);

    Router::new().nest(API_PREFIX, api).with_state(state)
}

pub async fn run(listener: TcpListener, state: MockState) -> Result<(), std::io::Error> {
    axum::serve(listener, router(state)).await
}

/// `Basic base64(user:pass)` → `(user, pass)`.
pub fn parse_basic(value: &str) -> Option<(String, String)> {
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = String::from_utf8(BASE64.decode(encoded.trim()).ok()?).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

/// `Token token="abc"` → `abc`.
pub fn parse_token(value: &str) -> Option<&str> {
    value.strip_prefix("Token token=\"")?.strip_suffix('"')
}

async fn require_token(State(state): State<MockState>, request: Request, next: Next) -> Result<Response, StatusCode> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_token)
        .map(str::to_string)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let valid = state
        .store
        .read()
        .await
        .tokens
        .get(&token)
        .is_some_and(|expires_at| Utc::now() <= *expires_at);
    if !valid {
        debug!("rejected unknown or expired token");
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(request).await)
}

async fn authenticate(State(state): State<MockState>, headers: HeaderMap) -> Result<Json<Authentication>, StatusCode> {
    let (user, pass) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_basic)
        .ok_or(StatusCode::UNAUTHORIZED)?;
    if user != state.config.username || pass != state.config.password {
        info!(%user, "rejected credentials");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let token = Uuid::new_v4().simple().to_string();
    let expires_at = Utc::now() + state.token_ttl();
    state.store.write().await.tokens.insert(token.clone(), expires_at);
    state.auth_count.fetch_add(1, Ordering::SeqCst);
    info!(%user, %expires_at, "issued token");

    Ok(Json(Authentication {
        token,
        expires_at: expires_at.to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

async fn list_lists(State(state): State<MockState>) -> Json<ListCollection> {
    let store = state.store.read().await;
    Json(ListCollection {
        lists: store.lists.iter().map(|l| state.summary(l)).collect(),
    })
}

async fn create_list(
    State(state): State<MockState>,
    Json(params): Json<ListParams>,
) -> Result<(StatusCode, Json<List>), MockError> {
    let name = validate_name(&params.list.name)?;
    let list = StoredList {
        id: Uuid::new_v4(),
        name,
        items: Vec::new(),
    };
    let summary = state.summary(&list);
    state.store.write().await.lists.push(list);
    debug!(id = %summary.id, "created list");
    Ok((StatusCode::CREATED, Json(summary)))
}

async fn get_list(State(state): State<MockState>, Path(id): Path<Uuid>) -> Result<Json<ListDetail>, MockError> {
    let store = state.store.read().await;
    let list = store.lists.iter().find(|l| l.id == id).ok_or(MockError::NotFound)?;
    Ok(Json(ListDetail {
        name: list.name.clone(),
        items: list.items.clone(),
    }))
}

async fn update_list(
    State(state): State<MockState>,
    Path(id): Path<Uuid>,
    Json(params): Json<ListParams>,
) -> Result<Json<List>, MockError> {
    let mut store = state.store.write().await;
    let list = store.list_mut(id)?;
    list.name = validate_name(&params.list.name)?;
    Ok(Json(state.summary(list)))
}

async fn delete_list(State(state): State<MockState>, Path(id): Path<Uuid>) -> Result<StatusCode, MockError> {
    let mut store = state.store.write().await;
    let before = store.lists.len();
    store.lists.retain(|l| l.id != id);
    if store.lists.len() == before {
        return Err(MockError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn create_item(
    State(state): State<MockState>,
    Path(id): Path<Uuid>,
    Json(params): Json<ItemParams>,
) -> Result<(StatusCode, Json<Item>), MockError> {
    let mut store = state.store.write().await;
    let list = store.list_mut(id)?;
    let item_id = Uuid::new_v4();
    let item = Item {
        name: validate_name(&params.item.name)?,
        finished_at: None,
        src: state.item_src(id, item_id),
        id: item_id,
    };
    list.items.push(item.clone());
    Ok((StatusCode::CREATED, Json(item)))
}

async fn finish_item(
    State(state): State<MockState>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<String, MockError> {
    let mut store = state.store.write().await;
    let item = store
        .list_mut(id)?
        .items
        .iter_mut()
        .find(|i| i.id == item_id)
        .ok_or(MockError::NotFound)?;
    if item.finished_at.is_none() {
        item.finished_at = Some(Utc::now());
    }
    Ok(format!("{} finished", item.name))
}

async fn delete_item(
    State(state): State<MockState>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, MockError> {
    let mut store = state.store.write().await;
    let list = store.list_mut(id)?;
    let before = list.items.len();
    list.items.retain(|i| i.id != item_id);
    if list.items.len() == before {
        return Err(MockError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_basic_decodes_credentials() {
        let header = format!("Basic {}", BASE64.encode("progressions@gmail.com:todoable"));
        assert_eq!(
            parse_basic(&header),
            Some(("progressions@gmail.com".to_string(), "todoable".to_string()))
        );
    }

    #[test]
    fn parse_basic_rejects_other_schemes() {
        assert_eq!(parse_basic("Bearer abc"), None);
        assert_eq!(parse_basic("Basic !!!"), None);
    }

    #[test]
    fn parse_token_extracts_quoted_value() {
        assert_eq!(parse_token("Token token=\"abcdef\""), Some("abcdef"));
        assert_eq!(parse_token("Bearer abcdef"), None);
        assert_eq!(parse_token("Token token=\"abcdef"), None);
    }

    #[test]
    fn list_detail_has_no_id() {
        let detail = ListDetail {
            name: "Groceries".to_string(),
            items: Vec::new(),
        };
        let json = serde_json::to_value(&detail).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["items"], json!([]));
    }

    #[test]
    fn params_default_to_blank_name() {
        let params: ListParams = serde_json::from_str("{}").unwrap();
        assert!(params.list.name.is_empty());
        assert!(validate_name(&params.list.name).is_err());
        let params: ItemParams = serde_json::from_str(r#"{"item":{"name":"  dish soap "}}"#).unwrap();
        assert!(matches!(validate_name(&params.item.name), Ok(n) if n == "dish soap"));
    }
}
