//! The one HTTP client every endpoint goes through.
//!
//! Before sending, a bearer token from the session is attached when there is
//! one; cookie-backed sessions rely on the shared cookie jar instead. After
//! receiving, 401 responses are classified: a known backend-fault message is
//! logged and the session kept, anything else ends the current session.

use color_eyre::{eyre::eyre, Result};
use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::multipart::Form;
use reqwest::{Client, Method, Request, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::api_types::Envelope;
use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::event::LogoutReason;
use crate::store::SessionStore;

/// What to send in the request body.
pub enum RequestBody {
  Empty,
  Json(Value),
  Multipart(Form),
}

impl RequestBody {
  pub fn json<B: Serialize + ?Sized>(body: &B) -> ApiResult<Self> {
    Ok(Self::Json(serde_json::to_value(body)?))
  }
}

#[derive(Clone)]
pub struct HttpGateway {
  client: Client,
  base_url: String,
  session: SessionStore,
  transient_401_messages: Vec<String>,
}

impl HttpGateway {
  pub fn new(config: &ApiConfig, session: SessionStore) -> Result<Self> {
    let client = Client::builder()
      .timeout(config.timeout())
      .cookie_provider(session.cookies())
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      client,
      base_url: config.base_url.trim_end_matches('/').to_string(),
      session,
      transient_401_messages: config
        .transient_401_messages
        .iter()
        .map(|m| m.to_lowercase())
        .collect(),
    })
  }

  pub fn session(&self) -> &SessionStore {
    &self.session
  }

  // ==========================================================================
  // Typed helpers
  // ==========================================================================

  pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
    self.get_with_query(path, &[]).await
  }

  pub async fn get_with_query<T: DeserializeOwned>(
    &self,
    path: &str,
    query: &[(&str, String)],
  ) -> ApiResult<T> {
    self
      .envelope::<T>(Method::GET, path, query, RequestBody::Empty)
      .await?
      .into_data()
  }

  /// GET where a successful response may legitimately carry no data.
  pub async fn get_optional<T: DeserializeOwned>(
    &self,
    path: &str,
    query: &[(&str, String)],
  ) -> ApiResult<Option<T>> {
    Ok(
      self
        .envelope::<T>(Method::GET, path, query, RequestBody::Empty)
        .await?
        .data,
    )
  }

  pub async fn post<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
  where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
  {
    self
      .envelope::<T>(Method::POST, path, &[], RequestBody::json(body)?)
      .await?
      .into_data()
  }

  pub async fn put<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
  where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
  {
    self
      .envelope::<T>(Method::PUT, path, &[], RequestBody::json(body)?)
      .await?
      .into_data()
  }

  /// A call whose only result is success; returns the server's message.
  pub async fn command(
    &self,
    method: Method,
    path: &str,
    body: RequestBody,
  ) -> ApiResult<Option<String>> {
    Ok(
      self
        .envelope::<Value>(method, path, &[], body)
        .await?
        .message,
    )
  }

  pub async fn upload<T: DeserializeOwned>(&self, path: &str, form: Form) -> ApiResult<T> {
    self
      .envelope::<T>(Method::POST, path, &[], RequestBody::Multipart(form))
      .await?
      .into_data()
  }

  // ==========================================================================
  // Core
  // ==========================================================================

  /// Send a request and unwrap the `{success, data, message}` envelope.
  /// `success: false` fails even on a 2xx status.
  pub async fn envelope<T: DeserializeOwned>(
    &self,
    method: Method,
    path: &str,
    query: &[(&str, String)],
    body: RequestBody,
  ) -> ApiResult<Envelope<T>> {
    let (status, body) = self.send(method, path, query, body).await?;
    let envelope: Envelope<T> = serde_json::from_value(body)?;
    if !envelope.success {
      return Err(ApiError::Server {
        status: Some(status.as_u16()),
        message: envelope.message,
      });
    }
    Ok(envelope)
  }

  /// Send a request and return its status and JSON body. Non-2xx statuses
  /// are turned into errors carrying the server's message.
  pub async fn send(
    &self,
    method: Method,
    path: &str,
    query: &[(&str, String)],
    body: RequestBody,
  ) -> ApiResult<(StatusCode, Value)> {
    let url = self.url(path)?;
    let mut builder = self.client.request(method, url);
    if !query.is_empty() {
      builder = builder.query(query);
    }
    if let Some(token) = self.session.bearer_token() {
      builder = builder.bearer_auth(token);
    }
    let payload_log = match body {
      RequestBody::Empty => None,
      RequestBody::Json(value) => {
        let rendered = value.to_string();
        builder = builder.json(&value);
        Some(rendered)
      }
      RequestBody::Multipart(form) => {
        builder = builder.multipart(form);
        Some("<multipart>".to_string())
      }
    };

    let request = builder.build()?;
    log_request(&request, payload_log.as_deref());

    let response = self.client.execute(request).await?;
    let status = response.status();
    let url = response.url().to_string();
    let text = response.text().await?;
    debug!(%status, url = %url, body = %text, "response");

    let body = parse_body(&text);
    let message = body
      .get("message")
      .and_then(Value::as_str)
      .map(String::from);

    if status == StatusCode::UNAUTHORIZED {
      return Err(self.handle_unauthorized(message));
    }
    if !status.is_success() {
      return Err(ApiError::Server {
        status: Some(status.as_u16()),
        message,
      });
    }
    Ok((status, body))
  }

  fn url(&self, path: &str) -> ApiResult<Url> {
    let joined = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
    Url::parse(&joined).map_err(|e| ApiError::Network(format!("Invalid URL {}: {}", joined, e)))
  }

  fn is_transient_401(&self, message: &str) -> bool {
    let message = message.to_lowercase();
    self
      .transient_401_messages
      .iter()
      .any(|known| !known.is_empty() && message.contains(known.as_str()))
  }

  fn handle_unauthorized(&self, message: Option<String>) -> ApiError {
    let transient = message
      .as_deref()
      .is_some_and(|m| self.is_transient_401(m));

    let session_cleared = if transient {
      warn!(
        message = message.as_deref().unwrap_or_default(),
        "401 from a backend fault, keeping session"
      );
      false
    } else if self.session.is_authenticated() {
      self.session.logout(LogoutReason::Unauthorized)
    } else {
      false
    };

    ApiError::Unauthorized {
      message,
      session_cleared,
    }
  }
}

/// JSON when it parses, otherwise the raw text as a string value.
fn parse_body(text: &str) -> Value {
  if text.trim().is_empty() {
    return Value::Null;
  }
  serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn log_request(request: &Request, payload: Option<&str>) {
  debug!(
    method = %request.method(),
    url = %request.url(),
    headers = ?redacted_headers(request.headers()),
    payload = payload.unwrap_or(""),
    "request"
  );
}

fn redacted_headers(headers: &HeaderMap) -> Vec<(String, String)> {
  headers
    .iter()
    .map(|(name, value)| {
      let value = if name == AUTHORIZATION {
        "Bearer <redacted>".to_string()
      } else {
        value.to_str().unwrap_or("<binary>").to_string()
      };
      (name.to_string(), value)
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::User;
  use crate::store::SessionToken;
  use crate::test_support::{StubBackend, StubResponse};
  use serde_json::json;

  fn user() -> User {
    User {
      id: "u1".into(),
      email: "ada@example.com".into(),
      name: "Ada".into(),
      avatar: None,
    }
  }

  #[tokio::test]
  async fn test_bearer_token_is_attached() {
    let backend = StubBackend::start().await;
    backend.respond("GET /ping", StubResponse::ok(json!({"pong": true})));
    let (gateway, session) = backend.gateway();
    session.login(user(), Some(SessionToken::Bearer("t0k".into())));

    let data: Value = gateway.get("/ping").await.unwrap();
    assert_eq!(data, json!({"pong": true}));
    assert_eq!(
      backend.last_request("GET /ping").unwrap().authorization.as_deref(),
      Some("Bearer t0k")
    );
  }

  #[tokio::test]
  async fn test_cookie_session_sends_no_authorization() {
    let backend = StubBackend::start().await;
    backend.respond("GET /ping", StubResponse::ok(json!({})));
    let (gateway, session) = backend.gateway();
    session.login(user(), Some(SessionToken::Cookie));

    let _: Value = gateway.get("/ping").await.unwrap();
    assert_eq!(backend.last_request("GET /ping").unwrap().authorization, None);
  }

  #[tokio::test]
  async fn test_transient_401_keeps_session() {
    let backend = StubBackend::start().await;
    backend.respond(
      "GET /auth/me",
      StubResponse::failure(401, "User identity not found"),
    );
    let (gateway, session) = backend.gateway();
    session.login(user(), Some(SessionToken::Bearer("t".into())));

    let err = gateway.get::<Value>("/auth/me").await.unwrap_err();
    assert_eq!(
      err,
      ApiError::Unauthorized {
        message: Some("User identity not found".into()),
        session_cleared: false,
      }
    );
    assert!(session.is_authenticated());
  }

  #[tokio::test]
  async fn test_other_401_clears_session() {
    let backend = StubBackend::start().await;
    backend.respond("GET /auth/me", StubResponse::failure(401, "Token expired"));
    let (gateway, session) = backend.gateway();
    session.login(user(), Some(SessionToken::Bearer("t".into())));

    let err = gateway.get::<Value>("/auth/me").await.unwrap_err();
    assert!(matches!(
      err,
      ApiError::Unauthorized {
        session_cleared: true,
        ..
      }
    ));
    assert!(!session.is_authenticated());
    assert_eq!(session.bearer_token(), None);
  }

  #[tokio::test]
  async fn test_401_without_session_is_reported_only() {
    let backend = StubBackend::start().await;
    backend.respond(
      "POST /auth/login",
      StubResponse::failure(401, "Invalid credentials"),
    );
    let (gateway, _session) = backend.gateway();

    let err = gateway
      .post::<_, Value>("/auth/login", &json!({}))
      .await
      .unwrap_err();
    assert_eq!(err.user_message("Login failed"), "Invalid credentials");
    assert!(matches!(
      err,
      ApiError::Unauthorized {
        session_cleared: false,
        ..
      }
    ));
  }

  #[tokio::test]
  async fn test_envelope_failure_on_2xx() {
    let backend = StubBackend::start().await;
    backend.respond(
      "GET /flashcards",
      StubResponse::json(200, json!({"success": false, "message": "Quota exceeded"})),
    );
    let (gateway, _) = backend.gateway();

    let err = gateway.get::<Value>("/flashcards").await.unwrap_err();
    assert_eq!(
      err,
      ApiError::Server {
        status: Some(200),
        message: Some("Quota exceeded".into()),
      }
    );
  }

  #[tokio::test]
  async fn test_server_error_without_message_uses_fallback() {
    let backend = StubBackend::start().await;
    backend.respond("GET /flashcards", StubResponse::text(500, "boom"));
    let (gateway, _) = backend.gateway();

    let err = gateway.get::<Value>("/flashcards").await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.user_message("Could not load cards"), "Could not load cards");
  }

  #[tokio::test]
  async fn test_unreachable_server_is_transport_error() {
    let config = ApiConfig {
      base_url: "http://127.0.0.1:9".into(),
      ..Default::default()
    };
    let (_, session) = crate::test_support::session();
    let gateway = HttpGateway::new(&config, session).unwrap();

    let err = gateway.get::<Value>("/ping").await.unwrap_err();
    assert!(err.is_transport());
  }

  #[test]
  fn test_authorization_is_redacted() {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, "Bearer secret".parse().unwrap());
    let rendered = format!("{:?}", redacted_headers(&headers));
    assert!(!rendered.contains("secret"));
  }
}
