use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::errors::SettingsError;

/// Setting value types. Values are stored as text and cast on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingType {
  String,
  Boolean,
  Integer,
  Json,
  File,
}

impl SettingType {
  pub fn as_str(&self) -> &'static str {
    match self {
      SettingType::String => "string",
      SettingType::Boolean => "boolean",
      SettingType::Integer => "integer",
      SettingType::Json => "json",
      SettingType::File => "file",
    }
  }
}

impl FromStr for SettingType {
  type Err = SettingsError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "string" => Ok(SettingType::String),
      "boolean" => Ok(SettingType::Boolean),
      "integer" => Ok(SettingType::Integer),
      "json" => Ok(SettingType::Json),
      "file" => Ok(SettingType::File),
      _ => Err(SettingsError::InvalidType(s.to_string())),
    }
  }
}

impl fmt::Display for SettingType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// One application setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
  pub id: Uuid,
  pub key: String,
  pub value: Option<String>,
  pub setting_type: SettingType,
  pub description: Option<String>,
  pub group: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Setting {
  pub fn new(
    key: String,
    value: Option<String>,
    setting_type: SettingType,
    description: Option<String>,
    group: String,
  ) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      key,
      value,
      setting_type,
      description,
      group,
      created_at: now,
      updated_at: now,
    }
  }

  pub fn as_bool(&self) -> bool {
    match (&self.value, self.setting_type) {
      (Some(value), SettingType::Boolean) => {
        matches!(value.as_str(), "1" | "true" | "yes" | "on")
      }
      _ => false,
    }
  }

  pub fn as_integer(&self) -> Option<i64> {
    match (&self.value, self.setting_type) {
      (Some(value), SettingType::Integer) => value.parse().ok(),
      _ => None,
    }
  }

  pub fn as_json(&self) -> Option<serde_json::Value> {
    match (&self.value, self.setting_type) {
      (Some(value), SettingType::Json) => serde_json::from_str(value).ok(),
      _ => None,
    }
  }
}

/// Keys the billing core reads.
pub mod keys {
  /// German small-business exemption flag (§19 UStG).
  pub const COMPANY_SMALL_BUSINESS: &str = "company_small_business";
  pub const COMPANY_NAME: &str = "company_name";
  pub const COMPANY_EMAIL: &str = "company_email";
  pub const COMPANY_LOGO: &str = "company_logo";
}

#[cfg(test)]
mod tests {
  use super::*;

  fn setting(value: &str, setting_type: SettingType) -> Setting {
    Setting::new(
      "test".to_string(),
      Some(value.to_string()),
      setting_type,
      None,
      "general".to_string(),
    )
  }

  #[test]
  fn test_boolean_casting() {
    assert!(setting("1", SettingType::Boolean).as_bool());
    assert!(setting("true", SettingType::Boolean).as_bool());
    assert!(!setting("0", SettingType::Boolean).as_bool());
    assert!(!setting("false", SettingType::Boolean).as_bool());
    // a string-typed "true" is not a boolean
    assert!(!setting("true", SettingType::String).as_bool());
  }

  #[test]
  fn test_integer_casting() {
    assert_eq!(setting("42", SettingType::Integer).as_integer(), Some(42));
    assert_eq!(setting("x", SettingType::Integer).as_integer(), None);
    assert_eq!(setting("42", SettingType::String).as_integer(), None);
  }

  #[test]
  fn test_type_round_trip() {
    for t in [
      SettingType::String,
      SettingType::Boolean,
      SettingType::Integer,
      SettingType::Json,
      SettingType::File,
    ] {
      assert_eq!(t.as_str().parse::<SettingType>().unwrap(), t);
    }
  }
}
