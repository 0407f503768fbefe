use async_trait::async_trait;
use uuid::Uuid;

use super::entities::{LoginAttempt, Session, User};
use super::errors::AuthError;
use super::value_objects::Email;

#[async_trait]
pub trait UserRepository: Send + Sync {
  async fn create(&self, user: User) -> Result<User, AuthError>;
  async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError>;
  async fn find_by_email(&self, email: &Email) -> Result<Option<User>, AuthError>;
  async fn update(&self, user: User) -> Result<User, AuthError>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
  async fn create(&self, session: Session) -> Result<Session, AuthError>;
  async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<Session>, AuthError>;
  async fn delete(&self, session_id: Uuid) -> Result<(), AuthError>;
  async fn delete_all_for_user(&self, user_id: Uuid) -> Result<u64, AuthError>;
}

#[async_trait]
pub trait LoginAttemptRepository: Send + Sync {
  async fn create(&self, attempt: LoginAttempt) -> Result<LoginAttempt, AuthError>;

  /// Recent failed attempts for an email within the window, for rate
  /// limiting.
  async fn count_recent_failures(
    &self,
    email: &str,
    window_seconds: i64,
  ) -> Result<i64, AuthError>;
}
