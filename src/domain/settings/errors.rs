use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
  #[error("Setting not found: {0}")]
  NotFound(String),

  #[error("Invalid setting type: {0}")]
  InvalidType(String),

  #[error("Invalid setting value for '{key}': {reason}")]
  InvalidValue { key: String, reason: String },

  #[error("Permission denied: {0}")]
  PermissionDenied(String),

  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),
}
