//! In-process REST backend for tests.
//!
//! Every request is recorded; responses are looked up by `"METHOD /path"`
//! (path relative to `/api`, without the query string).

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderName, Method, Response, StatusCode, Uri};
use axum::Router;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

use crate::api::HttpGateway;
use crate::cache::{KeyValueStorage, MemoryStorage};
use crate::config::ApiConfig;
use crate::event::EventBus;
use crate::store::SessionStore;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
  pub method: String,
  pub path: String,
  pub query: Option<String>,
  pub authorization: Option<String>,
  pub cookie: Option<String>,
  pub content_type: Option<String>,
  pub body: String,
}

impl RecordedRequest {
  pub fn json(&self) -> Value {
    serde_json::from_str(&self.body).unwrap_or(Value::Null)
  }
}

#[derive(Debug, Clone)]
pub struct StubResponse {
  status: u16,
  body: String,
  content_type: &'static str,
  set_cookie: Option<String>,
  delay: Option<Duration>,
}

impl StubResponse {
  pub fn json(status: u16, body: Value) -> Self {
    Self {
      status,
      body: body.to_string(),
      content_type: "application/json",
      set_cookie: None,
      delay: None,
    }
  }

  /// `{success: true, data}` with a 200.
  pub fn ok(data: Value) -> Self {
    Self::json(200, json!({"success": true, "data": data}))
  }

  /// `{success: true}` without data.
  pub fn done(message: &str) -> Self {
    Self::json(200, json!({"success": true, "message": message}))
  }

  pub fn failure(status: u16, message: &str) -> Self {
    Self::json(status, json!({"success": false, "message": message}))
  }

  pub fn text(status: u16, body: &str) -> Self {
    Self {
      status,
      body: body.to_string(),
      content_type: "text/plain",
      set_cookie: None,
      delay: None,
    }
  }

  pub fn with_cookie(mut self, header: &str) -> Self {
    self.set_cookie = Some(header.to_string());
    self
  }

  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = Some(delay);
    self
  }
}

#[derive(Default)]
struct StubState {
  responses: Mutex<HashMap<String, StubResponse>>,
  requests: Mutex<Vec<RecordedRequest>>,
}

pub struct StubBackend {
  state: Arc<StubState>,
  base_url: String,
}

impl StubBackend {
  pub async fn start() -> Self {
    let state = Arc::new(StubState::default());
    let app = Router::new()
      .fallback(handle)
      .with_state(Arc::clone(&state));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      let _ = axum::serve(listener, app).await;
    });

    Self {
      state,
      base_url: format!("http://{}/api", addr),
    }
  }

  pub fn api_config(&self) -> ApiConfig {
    ApiConfig {
      base_url: self.base_url.clone(),
      ..Default::default()
    }
  }

  /// Gateway plus its session, backed by in-memory storage.
  pub fn gateway(&self) -> (HttpGateway, SessionStore) {
    let (_, session) = session();
    let gateway = HttpGateway::new(&self.api_config(), session.clone()).unwrap();
    (gateway, session)
  }

  pub fn respond(&self, route: &str, response: StubResponse) {
    self
      .state
      .responses
      .lock()
      .unwrap()
      .insert(route.to_string(), response);
  }

  pub fn requests(&self) -> Vec<RecordedRequest> {
    self.state.requests.lock().unwrap().clone()
  }

  pub fn count(&self, route: &str) -> usize {
    self
      .requests()
      .iter()
      .filter(|r| route_key(&r.method, &r.path) == route)
      .count()
  }

  pub fn last_request(&self, route: &str) -> Option<RecordedRequest> {
    self
      .requests()
      .into_iter()
      .rev()
      .find(|r| route_key(&r.method, &r.path) == route)
  }
}

pub fn session() -> (Arc<dyn KeyValueStorage>, SessionStore) {
  let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
  let session = SessionStore::restore(Arc::clone(&storage), EventBus::new());
  (storage, session)
}

fn route_key(method: &str, path: &str) -> String {
  format!("{} {}", method, path)
}

async fn handle(
  State(state): State<Arc<StubState>>,
  method: Method,
  uri: Uri,
  headers: HeaderMap,
  body: Bytes,
) -> Response<Body> {
  let header = |name: HeaderName| {
    headers
      .get(name)
      .and_then(|v| v.to_str().ok())
      .map(String::from)
  };
  let path = uri
    .path()
    .strip_prefix("/api")
    .unwrap_or(uri.path())
    .to_string();
  let request = RecordedRequest {
    method: method.to_string(),
    path: path.clone(),
    query: uri.query().map(String::from),
    authorization: header(AUTHORIZATION),
    cookie: header(COOKIE),
    content_type: header(CONTENT_TYPE),
    body: String::from_utf8_lossy(&body).to_string(),
  };
  state.requests.lock().unwrap().push(request);

  let stub = state
    .responses
    .lock()
    .unwrap()
    .get(&route_key(method.as_str(), &path))
    .cloned()
    .unwrap_or_else(|| StubResponse::failure(404, "Route not found"));

  if let Some(delay) = stub.delay {
    tokio::time::sleep(delay).await;
  }

  let mut response = Response::builder()
    .status(StatusCode::from_u16(stub.status).unwrap())
    .header(CONTENT_TYPE, stub.content_type);
  if let Some(cookie) = &stub.set_cookie {
    response = response.header(SET_COOKIE, cookie.as_str());
  }
  response.body(Body::from(stub.body)).unwrap()
}
