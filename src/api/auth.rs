//! Session lifecycle endpoints.
//!
//! Inputs are checked before any request is made; a rejected input never
//! reaches the network.

use reqwest::Method;
use serde_json::json;
use tracing::{info, warn};

use super::api_types::{ApiAuthPayload, ApiForgotPassword, ApiUserPayload};
use super::gateway::{HttpGateway, RequestBody};
use super::types::{PasswordResetRequested, User};
use crate::error::{ApiError, ApiResult};
use crate::event::LogoutReason;
use crate::store::SessionToken;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
  pub name: Option<String>,
  pub avatar: Option<String>,
}

#[derive(Clone)]
pub struct AuthApi {
  gateway: HttpGateway,
}

impl AuthApi {
  pub fn new(gateway: HttpGateway) -> Self {
    Self { gateway }
  }

  pub async fn register(
    &self,
    name: &str,
    email: &str,
    password: &str,
    confirm: &str,
  ) -> ApiResult<User> {
    let name = required(name, "Name is required")?;
    let email = validate_email(email)?;
    validate_new_password(password, confirm)?;

    let payload: ApiAuthPayload = self
      .gateway
      .post(
        "/auth/register",
        &json!({"name": name, "email": email, "password": password}),
      )
      .await?;
    Ok(self.start_session(payload))
  }

  pub async fn login(&self, email: &str, password: &str) -> ApiResult<User> {
    let email = validate_email(email)?;
    if password.is_empty() {
      return Err(ApiError::validation("Password is required"));
    }

    let payload: ApiAuthPayload = self
      .gateway
      .post("/auth/login", &json!({"email": email, "password": password}))
      .await?;
    Ok(self.start_session(payload))
  }

  /// Tell the server, then end the local session whatever it said. Returns
  /// whether a session was ended, including one the server call itself ended.
  pub async fn logout(&self) -> bool {
    let was_authenticated = self.gateway.session().is_authenticated();
    if was_authenticated {
      if let Err(e) = self
        .gateway
        .command(Method::POST, "/auth/logout", RequestBody::Empty)
        .await
      {
        warn!(error = %e, "server logout failed, clearing local session anyway");
      }
    }
    let ended = self.gateway.session().logout(LogoutReason::UserRequested);
    was_authenticated || ended
  }

  /// Re-read the identity behind the current session.
  pub async fn me(&self) -> ApiResult<User> {
    let payload: ApiUserPayload = self.gateway.get("/auth/me").await?;
    let user: User = payload.into_user().into();
    self.gateway.session().update_user(user.clone());
    Ok(user)
  }

  pub async fn profile(&self) -> ApiResult<User> {
    let payload: ApiUserPayload = self.gateway.get("/auth/profile").await?;
    Ok(payload.into_user().into())
  }

  pub async fn update_profile(&self, update: ProfileUpdate) -> ApiResult<User> {
    let mut body = serde_json::Map::new();
    if let Some(name) = &update.name {
      body.insert("name".into(), required(name, "Name is required")?.into());
    }
    if let Some(avatar) = &update.avatar {
      body.insert("avatar".into(), avatar.trim().into());
    }
    if body.is_empty() {
      return Err(ApiError::validation("Nothing to update"));
    }

    let payload: ApiUserPayload = self.gateway.put("/auth/profile", &body).await?;
    let user: User = payload.into_user().into();
    self.gateway.session().update_user(user.clone());
    Ok(user)
  }

  pub async fn change_password(
    &self,
    current: &str,
    new_password: &str,
    confirm: &str,
  ) -> ApiResult<Option<String>> {
    if current.is_empty() {
      return Err(ApiError::validation("Current password is required"));
    }
    validate_new_password(new_password, confirm)?;

    let body = RequestBody::json(&json!({
      "currentPassword": current,
      "newPassword": new_password,
    }))?;
    self
      .gateway
      .command(Method::PUT, "/auth/profile/password", body)
      .await
  }

  pub async fn forgot_password(&self, email: &str) -> ApiResult<PasswordResetRequested> {
    let email = validate_email(email)?;
    let envelope = self
      .gateway
      .envelope::<ApiForgotPassword>(
        Method::POST,
        "/auth/forgot-password",
        &[],
        RequestBody::json(&json!({"email": email}))?,
      )
      .await?;
    Ok(PasswordResetRequested {
      message: envelope.message,
      reset_token: envelope.data.unwrap_or_default().reset_token,
    })
  }

  pub async fn reset_password(
    &self,
    token: &str,
    new_password: &str,
    confirm: &str,
  ) -> ApiResult<Option<String>> {
    let token = required(token, "Reset token is required")?;
    validate_new_password(new_password, confirm)?;

    let body = RequestBody::json(&json!({"token": token, "password": new_password}))?;
    self
      .gateway
      .command(Method::POST, "/auth/reset-password", body)
      .await
  }

  fn start_session(&self, payload: ApiAuthPayload) -> User {
    let (user, token) = payload.into_parts();
    let token = match token {
      Some(token) => SessionToken::Bearer(token),
      None => SessionToken::Cookie,
    };
    info!(user = %user.email, cookie = (token == SessionToken::Cookie), "session started");
    self.gateway.session().login(user.clone(), Some(token));
    user
  }
}

fn required<'a>(value: &'a str, message: &str) -> ApiResult<&'a str> {
  let value = value.trim();
  if value.is_empty() {
    return Err(ApiError::validation(message));
  }
  Ok(value)
}

pub fn validate_email(email: &str) -> ApiResult<&str> {
  let email = required(email, "Email is required")?;
  if !email.contains('@') {
    return Err(ApiError::validation("Enter a valid email address"));
  }
  Ok(email)
}

pub fn validate_new_password(password: &str, confirm: &str) -> ApiResult<()> {
  if password.is_empty() {
    return Err(ApiError::validation("Password is required"));
  }
  if password.chars().count() < MIN_PASSWORD_LEN {
    return Err(ApiError::validation(format!(
      "Password must be at least {} characters",
      MIN_PASSWORD_LEN
    )));
  }
  if password != confirm {
    return Err(ApiError::validation("Passwords do not match"));
  }
  Ok(())
}
