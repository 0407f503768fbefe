use actix_web::{
  HttpResponse,
  error::ResponseError,
  http::{StatusCode, header::ContentType},
};
use serde::Serialize;
use std::fmt;

use crate::domain::auth::errors::{AuthError, RepositoryError};
use crate::domain::billing::BillingError;
use crate::domain::settings::SettingsError;

use super::dtos::ErrorResponse;

/// API error type that maps domain errors to HTTP responses
#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum ApiError {
  /// Malformed input (400)
  Validation(String),

  /// Operation not permitted in the current state (422)
  InvalidState(String),

  /// Resource does not exist (404)
  NotFound(String),

  /// Uniqueness conflict (409)
  Conflict(String),

  /// Authentication/authorization failures
  Auth(AuthErrorKind),

  /// External payment processor rejected or failed the operation (502)
  Gateway(String),

  /// The gateway declined the payment itself (402)
  PaymentFailed(String),

  /// Internal server error (500)
  Internal(String),
}

#[derive(Debug, Serialize)]
pub enum AuthErrorKind {
  /// Invalid credentials (401)
  InvalidCredentials,

  /// Session expired or invalid (401)
  InvalidSession,

  /// Invalid token format (401)
  InvalidToken,

  /// Rate limit exceeded (429)
  RateLimitExceeded,

  /// Email already exists (409)
  EmailAlreadyExists,

  /// User not found (404)
  UserNotFound,

  /// Actor lacks the required role (403)
  Forbidden,
}

impl fmt::Display for ApiError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ApiError::Validation(msg) => write!(f, "Validation error: {}", msg),
      ApiError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
      ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
      ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
      ApiError::Auth(kind) => write!(f, "Authentication error: {:?}", kind),
      ApiError::Gateway(msg) => write!(f, "Gateway error: {}", msg),
      ApiError::PaymentFailed(msg) => write!(f, "Payment failed: {}", msg),
      ApiError::Internal(msg) => write!(f, "Internal error: {}", msg),
    }
  }
}

impl ResponseError for ApiError {
  fn status_code(&self) -> StatusCode {
    match self {
      ApiError::Validation(_) => StatusCode::BAD_REQUEST,
      ApiError::InvalidState(_) => StatusCode::UNPROCESSABLE_ENTITY,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Conflict(_) => StatusCode::CONFLICT,
      ApiError::Auth(kind) => match kind {
        AuthErrorKind::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthErrorKind::InvalidSession => StatusCode::UNAUTHORIZED,
        AuthErrorKind::InvalidToken => StatusCode::UNAUTHORIZED,
        AuthErrorKind::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
        AuthErrorKind::EmailAlreadyExists => StatusCode::CONFLICT,
        AuthErrorKind::UserNotFound => StatusCode::NOT_FOUND,
        AuthErrorKind::Forbidden => StatusCode::FORBIDDEN,
      },
      ApiError::Gateway(_) => StatusCode::BAD_GATEWAY,
      ApiError::PaymentFailed(_) => StatusCode::PAYMENT_REQUIRED,
      ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    let (error_type, message) = match self {
      ApiError::Validation(msg) => ("validation_error", msg.clone()),
      ApiError::InvalidState(msg) => ("invalid_state", msg.clone()),
      ApiError::NotFound(msg) => ("not_found", msg.clone()),
      ApiError::Conflict(msg) => ("conflict", msg.clone()),
      ApiError::Auth(kind) => match kind {
        AuthErrorKind::InvalidCredentials => (
          "invalid_credentials",
          "Invalid email or password".to_string(),
        ),
        AuthErrorKind::InvalidSession => {
          ("invalid_session", "Invalid or expired session".to_string())
        }
        AuthErrorKind::InvalidToken => (
          "invalid_token",
          "Invalid or missing authorization token".to_string(),
        ),
        AuthErrorKind::RateLimitExceeded => (
          "rate_limit_exceeded",
          "Too many login attempts. Please try again later".to_string(),
        ),
        AuthErrorKind::EmailAlreadyExists => (
          "email_already_exists",
          "An account with this email already exists".to_string(),
        ),
        AuthErrorKind::UserNotFound => ("user_not_found", "User not found".to_string()),
        AuthErrorKind::Forbidden => (
          "forbidden",
          "You are not allowed to perform this action".to_string(),
        ),
      },
      ApiError::Gateway(msg) => {
        // Detail is logged for reconciliation; the caller gets a retryable
        // generic message.
        tracing::error!("Gateway error: {}", msg);
        (
          "gateway_error",
          "Payment processing failed. Please try again".to_string(),
        )
      }
      ApiError::PaymentFailed(msg) => {
        tracing::warn!("Payment failed: {}", msg);
        (
          "payment_failed",
          "The payment was not completed. Please try again".to_string(),
        )
      }
      ApiError::Internal(msg) => {
        // Don't expose internal error details
        tracing::error!("Internal error: {}", msg);
        (
          "internal_error",
          "An internal server error occurred".to_string(),
        )
      }
    };

    HttpResponse::build(status)
      .content_type(ContentType::json())
      .json(ErrorResponse {
        error: error_type.to_string(),
        message,
        details: None,
      })
  }
}

impl From<AuthError> for ApiError {
  fn from(error: AuthError) -> Self {
    match error {
      AuthError::InvalidCredentials => ApiError::Auth(AuthErrorKind::InvalidCredentials),
      AuthError::EmailAlreadyExists => ApiError::Auth(AuthErrorKind::EmailAlreadyExists),
      AuthError::UserNotFound => ApiError::Auth(AuthErrorKind::UserNotFound),
      AuthError::InvalidSession => ApiError::Auth(AuthErrorKind::InvalidSession),
      AuthError::PermissionDenied(_) => ApiError::Auth(AuthErrorKind::Forbidden),
      AuthError::RateLimitExceeded => ApiError::Auth(AuthErrorKind::RateLimitExceeded),
      AuthError::ValueObject(err) => ApiError::Validation(err.to_string()),
      AuthError::Repository(err) => match err {
        RepositoryError::NotFound => ApiError::Auth(AuthErrorKind::UserNotFound),
        RepositoryError::DuplicateKey(_) => ApiError::Auth(AuthErrorKind::EmailAlreadyExists),
        _ => ApiError::Internal(err.to_string()),
      },
    }
  }
}

impl From<BillingError> for ApiError {
  fn from(error: BillingError) -> Self {
    match error {
      BillingError::Validation(err) => ApiError::Validation(err.to_string()),
      BillingError::NoItems => {
        ApiError::Validation("Invoice requires at least one line item".to_string())
      }
      BillingError::InvoiceNotFound(id) => ApiError::NotFound(format!("Invoice {}", id)),
      BillingError::CustomerNotFound(id) => ApiError::NotFound(format!("Customer {}", id)),
      BillingError::PaymentNotFound(id) => ApiError::NotFound(format!("Payment {}", id)),
      BillingError::InvalidState { .. } | BillingError::InvalidTransition { .. } => {
        ApiError::InvalidState(error.to_string())
      }
      BillingError::InvoiceNumberConflict(number) => {
        ApiError::Conflict(format!("Invoice number '{}' already exists", number))
      }
      // Idempotent capture handling happens in the use case; reaching the
      // boundary means a genuinely conflicting manual entry.
      BillingError::DuplicateTransaction { transaction_id, .. } => {
        ApiError::Conflict(format!("Transaction '{}' already recorded", transaction_id))
      }
      BillingError::PermissionDenied(_) => ApiError::Auth(AuthErrorKind::Forbidden),
      BillingError::Gateway(msg) => ApiError::Gateway(msg),
      BillingError::PaymentFailed(msg) => ApiError::PaymentFailed(msg),
      BillingError::Database(err) => ApiError::Internal(err.to_string()),
      BillingError::Internal(msg) => ApiError::Internal(msg),
    }
  }
}

impl From<SettingsError> for ApiError {
  fn from(error: SettingsError) -> Self {
    match error {
      SettingsError::NotFound(key) => ApiError::NotFound(format!("Setting '{}'", key)),
      SettingsError::InvalidType(t) => ApiError::Validation(format!("Invalid setting type: {}", t)),
      SettingsError::InvalidValue { key, reason } => {
        ApiError::Validation(format!("Invalid value for '{}': {}", key, reason))
      }
      SettingsError::PermissionDenied(_) => ApiError::Auth(AuthErrorKind::Forbidden),
      SettingsError::Database(err) => ApiError::Internal(err.to_string()),
    }
  }
}

/// Convert validation errors from validator crate
impl From<validator::ValidationErrors> for ApiError {
  fn from(errors: validator::ValidationErrors) -> Self {
    let messages: Vec<String> = errors
      .field_errors()
      .iter()
      .flat_map(|(field, errors)| {
        errors
          .iter()
          .map(|error| {
            error
              .message
              .as_ref()
              .map(|m| m.to_string())
              .unwrap_or_else(|| format!("Invalid field: {}", field))
          })
          .collect::<Vec<_>>()
      })
      .collect();

    ApiError::Validation(messages.join(", "))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::billing::{InvoiceStatus, PaymentMethod};

  #[test]
  fn test_api_error_status_codes() {
    assert_eq!(
      ApiError::Validation("test".to_string()).status_code(),
      StatusCode::BAD_REQUEST
    );
    assert_eq!(
      ApiError::InvalidState("test".to_string()).status_code(),
      StatusCode::UNPROCESSABLE_ENTITY
    );
    assert_eq!(
      ApiError::Gateway("test".to_string()).status_code(),
      StatusCode::BAD_GATEWAY
    );
    assert_eq!(
      ApiError::PaymentFailed("test".to_string()).status_code(),
      StatusCode::PAYMENT_REQUIRED
    );
    assert_eq!(
      ApiError::Auth(AuthErrorKind::Forbidden).status_code(),
      StatusCode::FORBIDDEN
    );
  }

  #[test]
  fn test_billing_error_conversion() {
    let api_error: ApiError = BillingError::invalid_state(InvoiceStatus::Paid, "cancel").into();
    assert_eq!(api_error.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

    let api_error: ApiError = BillingError::InvoiceNumberConflict("R-2026-0001".into()).into();
    assert_eq!(api_error.status_code(), StatusCode::CONFLICT);

    let api_error: ApiError = BillingError::DuplicateTransaction {
      method: PaymentMethod::PayPal,
      transaction_id: "TXN-1".into(),
    }
    .into();
    assert_eq!(api_error.status_code(), StatusCode::CONFLICT);

    let api_error: ApiError = BillingError::PermissionDenied("nope".into()).into();
    assert_eq!(api_error.status_code(), StatusCode::FORBIDDEN);
  }
}
