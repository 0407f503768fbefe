use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use uuid::Uuid;

use super::value_objects::Role;

/// User entity: staff and customers share one account table, told apart by
/// role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub id: Uuid,
  /// User's email address (unique)
  pub email: String,
  /// Hashed password using Argon2
  pub password_hash: String,
  pub first_name: String,
  pub last_name: String,
  pub role: Role,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl User {
  pub fn new(
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    role: Role,
  ) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      email,
      password_hash,
      first_name,
      last_name,
      role,
      created_at: now,
      updated_at: now,
    }
  }

  pub fn full_name(&self) -> String {
    format!("{} {}", self.first_name, self.last_name)
  }

  /// The capability context passed into core operations.
  pub fn actor(&self) -> Actor {
    Actor {
      user_id: self.id,
      role: self.role,
    }
  }
}

/// Who is performing an operation. Core services take this explicitly as a
/// precondition instead of reading ambient request state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
  pub user_id: Uuid,
  pub role: Role,
}

impl Actor {
  pub fn new(user_id: Uuid, role: Role) -> Self {
    Self { user_id, role }
  }

  pub fn is_admin(&self) -> bool {
    self.role == Role::Admin
  }

  pub fn is_staff(&self) -> bool {
    self.role.is_staff()
  }
}

/// Session entity representing an active login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
  pub id: Uuid,
  pub user_id: Uuid,
  /// SHA-256 hash of the bearer token; the token itself is never stored
  pub token_hash: String,
  pub ip_address: Option<IpAddr>,
  pub user_agent: Option<String>,
  pub expires_at: DateTime<Utc>,
  pub created_at: DateTime<Utc>,
}

impl Session {
  pub fn new(
    user_id: Uuid,
    token_hash: String,
    expires_at: DateTime<Utc>,
    ip_address: Option<IpAddr>,
    user_agent: Option<String>,
  ) -> Self {
    Self {
      id: Uuid::new_v4(),
      user_id,
      token_hash,
      ip_address,
      user_agent,
      expires_at,
      created_at: Utc::now(),
    }
  }

  pub fn with_duration(
    user_id: Uuid,
    token_hash: String,
    duration: Duration,
    ip_address: Option<IpAddr>,
    user_agent: Option<String>,
  ) -> Self {
    Self::new(user_id, token_hash, Utc::now() + duration, ip_address, user_agent)
  }

  pub fn is_expired(&self) -> bool {
    self.expires_at <= Utc::now()
  }

  pub fn is_valid(&self) -> bool {
    !self.is_expired()
  }
}

/// LoginAttempt entity for tracking authentication attempts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginAttempt {
  pub id: Uuid,
  pub email: String,
  pub ip_address: IpAddr,
  pub success: bool,
  pub attempted_at: DateTime<Utc>,
}

impl LoginAttempt {
  pub fn new(email: String, ip_address: IpAddr, success: bool) -> Self {
    Self {
      id: Uuid::new_v4(),
      email,
      ip_address,
      success,
      attempted_at: Utc::now(),
    }
  }

  pub fn success(email: String, ip_address: IpAddr) -> Self {
    Self::new(email, ip_address, true)
  }

  pub fn failure(email: String, ip_address: IpAddr) -> Self {
    Self::new(email, ip_address, false)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_user_actor() {
    let user = User::new(
      "anna@example.com".to_string(),
      "hash".to_string(),
      "Anna".to_string(),
      "Schmidt".to_string(),
      Role::Trainer,
    );

    let actor = user.actor();
    assert_eq!(actor.user_id, user.id);
    assert!(actor.is_staff());
    assert!(!actor.is_admin());
    assert_eq!(user.full_name(), "Anna Schmidt");
  }

  #[test]
  fn test_session_expiration() {
    let session = Session::new(
      Uuid::new_v4(),
      "hash".to_string(),
      Utc::now() - Duration::seconds(10),
      None,
      None,
    );
    assert!(session.is_expired());

    let session = Session::with_duration(
      Uuid::new_v4(),
      "hash".to_string(),
      Duration::hours(1),
      Some("127.0.0.1".parse().unwrap()),
      None,
    );
    assert!(session.is_valid());
  }

  #[test]
  fn test_login_attempt_creation() {
    let ip = "192.168.1.1".parse().unwrap();
    assert!(LoginAttempt::success("a@b.com".to_string(), ip).success);
    assert!(!LoginAttempt::failure("a@b.com".to_string(), ip).success);
  }
}
