use reqwest::Method;
use serde_json::json;
use tracing::{info, warn};

use super::api_types::ApiNotificationPreferences;
use super::gateway::{HttpGateway, RequestBody};
use super::types::{NotificationHistory, NotificationHistoryParams, NotificationPreferences};
use crate::error::{ApiError, ApiResult};

const FCM_TOKEN_PATH: &str = "/notifications/fcm-token";

#[derive(Clone)]
pub struct NotificationApi {
  gateway: HttpGateway,
}

impl NotificationApi {
  pub fn new(gateway: HttpGateway) -> Self {
    Self { gateway }
  }

  /// Preferences in client naming. A response without data reads as all-off.
  pub async fn preferences(&self) -> ApiResult<NotificationPreferences> {
    let prefs: Option<ApiNotificationPreferences> = self
      .gateway
      .get_optional("/notifications/preferences", &[])
      .await?;
    Ok(prefs.unwrap_or_default().into_client())
  }

  pub async fn update_preferences(
    &self,
    prefs: &NotificationPreferences,
  ) -> ApiResult<NotificationPreferences> {
    let wire = ApiNotificationPreferences::from_client(prefs)?;
    let envelope = self
      .gateway
      .envelope::<ApiNotificationPreferences>(
        Method::PUT,
        "/notifications/preferences",
        &[],
        RequestBody::json(&wire)?,
      )
      .await?;
    Ok(envelope.data.unwrap_or(wire).into_client())
  }

  pub async fn history(&self, params: &NotificationHistoryParams) -> ApiResult<NotificationHistory> {
    let history: Option<NotificationHistory> = self
      .gateway
      .get_optional("/notifications/history", &params.to_query())
      .await?;
    Ok(history.unwrap_or_default())
  }

  /// Register a device token. Failures are logged and reported as `false`.
  pub async fn register_push_token(&self, token: &str, platform: &str) -> bool {
    self
      .push_token(Method::POST, token, Some(platform))
      .await
      .map_err(|e| warn!(error = %e, "push token registration failed"))
      .is_ok()
  }

  pub async fn unregister_push_token(&self, token: &str) -> bool {
    self
      .push_token(Method::DELETE, token, None)
      .await
      .map_err(|e| warn!(error = %e, "push token removal failed"))
      .is_ok()
  }

  async fn push_token(&self, method: Method, token: &str, platform: Option<&str>) -> ApiResult<()> {
    let token = token.trim();
    if token.is_empty() {
      return Err(ApiError::validation("Push token is empty"));
    }
    let body = match platform {
      Some(platform) => json!({"token": token, "platform": platform}),
      None => json!({"token": token}),
    };
    let action = if method == Method::DELETE { "unregistered" } else { "registered" };
    self
      .gateway
      .command(method, FCM_TOKEN_PATH, RequestBody::json(&body)?)
      .await?;
    info!(action, "push token");
    Ok(())
  }
}
