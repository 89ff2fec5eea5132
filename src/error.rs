//! Error taxonomy for every call that goes through the gateway.
//!
//! Errors are cloneable so one in-flight fetch can hand the same failure to
//! every caller waiting on it.

use thiserror::Error;

/// Message shown when the transport fails and the server said nothing.
pub const GENERIC_NETWORK_MESSAGE: &str = "Could not reach the server. Check your connection and try again.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
  /// Rejected before any request was made.
  #[error("{0}")]
  Validation(String),

  #[error("Request timed out")]
  Timeout,

  #[error("Network error: {0}")]
  Network(String),

  /// Non-2xx status or an envelope with `success: false`.
  #[error("{}", .message.as_deref().unwrap_or("Server error"))]
  Server {
    status: Option<u16>,
    message: Option<String>,
  },

  /// HTTP 401. `session_cleared` records whether the gateway logged the user out.
  #[error("{}", .message.as_deref().unwrap_or("Authentication required"))]
  Unauthorized {
    message: Option<String>,
    session_cleared: bool,
  },

  #[error("Unexpected response: {0}")]
  Decode(String),
}

impl ApiError {
  pub fn validation(message: impl Into<String>) -> Self {
    Self::Validation(message.into())
  }

  /// The message a screen should show: the server's own wording when it sent one,
  /// the validation text for client-side rejections, otherwise `fallback`.
  pub fn user_message(&self, fallback: &str) -> String {
    match self {
      Self::Validation(msg) => msg.clone(),
      Self::Server {
        message: Some(msg), ..
      }
      | Self::Unauthorized {
        message: Some(msg), ..
      } if !msg.trim().is_empty() => msg.clone(),
      Self::Timeout | Self::Network(_) => GENERIC_NETWORK_MESSAGE.to_string(),
      _ => fallback.to_string(),
    }
  }

  /// Transport-level failures: the server was never heard from.
  pub fn is_transport(&self) -> bool {
    matches!(self, Self::Timeout | Self::Network(_))
  }

  pub fn is_validation(&self) -> bool {
    matches!(self, Self::Validation(_))
  }

  pub fn status(&self) -> Option<u16> {
    match self {
      Self::Server { status, .. } => *status,
      Self::Unauthorized { .. } => Some(401),
      _ => None,
    }
  }
}

impl From<reqwest::Error> for ApiError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_timeout() {
      Self::Timeout
    } else if err.is_decode() {
      Self::Decode(err.to_string())
    } else {
      Self::Network(err.to_string())
    }
  }
}

impl From<serde_json::Error> for ApiError {
  fn from(err: serde_json::Error) -> Self {
    Self::Decode(err.to_string())
  }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_server_message_is_verbatim() {
    let err = ApiError::Server {
      status: Some(400),
      message: Some("Word already exists".to_string()),
    };
    assert_eq!(err.user_message("Failed to add card"), "Word already exists");
  }

  #[test]
  fn test_missing_message_uses_fallback() {
    let err = ApiError::Server {
      status: Some(500),
      message: None,
    };
    assert_eq!(err.user_message("Failed to add card"), "Failed to add card");

    let blank = ApiError::Server {
      status: Some(500),
      message: Some("  ".to_string()),
    };
    assert_eq!(blank.user_message("Failed to add card"), "Failed to add card");
  }

  #[test]
  fn test_transport_errors_get_generic_message() {
    assert!(ApiError::Timeout.is_transport());
    assert_eq!(
      ApiError::Network("refused".into()).user_message("x"),
      GENERIC_NETWORK_MESSAGE
    );
  }

  #[test]
  fn test_unauthorized_status() {
    let err = ApiError::Unauthorized {
      message: None,
      session_cleared: true,
    };
    assert_eq!(err.status(), Some(401));
    assert_eq!(err.to_string(), "Authentication required");
  }
}
