use chrono::Duration;
use std::net::IpAddr;
use std::sync::Arc;
use uuid::Uuid;

use super::entities::{LoginAttempt, Session, User};
use super::errors::{AuthError, RepositoryError};
use super::ports::{LoginAttemptRepository, SessionRepository, UserRepository};
use super::value_objects::{Email, Password, Role, SessionToken};

/// Authentication configuration, supplied by the application config.
#[derive(Debug, Clone)]
pub struct AuthServiceConfig {
  pub session_ttl_seconds: i64,
  pub rate_limit_window_seconds: i64,
  pub max_failed_attempts: i64,
}

impl Default for AuthServiceConfig {
  fn default() -> Self {
    Self {
      session_ttl_seconds: 24 * 3600,
      rate_limit_window_seconds: 15 * 60,
      max_failed_attempts: 5,
    }
  }
}

/// Authentication service implementing login, logout and session validation
pub struct AuthService {
  user_repo: Arc<dyn UserRepository>,
  session_repo: Arc<dyn SessionRepository>,
  attempt_repo: Arc<dyn LoginAttemptRepository>,
  config: AuthServiceConfig,
}

impl AuthService {
  pub fn new(
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    attempt_repo: Arc<dyn LoginAttemptRepository>,
    config: AuthServiceConfig,
  ) -> Self {
    Self {
      user_repo,
      session_repo,
      attempt_repo,
      config,
    }
  }

  /// Registers a new user. Only admins create accounts; customers receive
  /// their credentials when they sign up at the school.
  pub async fn register(
    &self,
    email: Email,
    password: Password,
    first_name: String,
    last_name: String,
    role: Role,
  ) -> Result<User, AuthError> {
    if self.user_repo.find_by_email(&email).await?.is_some() {
      return Err(AuthError::EmailAlreadyExists);
    }

    let password_hash = password.hash()?;
    let user = User::new(
      email.into_inner(),
      password_hash.into_inner(),
      first_name,
      last_name,
      role,
    );

    match self.user_repo.create(user).await {
      Ok(user) => Ok(user),
      Err(AuthError::Repository(RepositoryError::DuplicateKey(_))) => {
        Err(AuthError::EmailAlreadyExists)
      }
      Err(e) => Err(e),
    }
  }

  /// Authenticates a user and creates a new session.
  pub async fn login(
    &self,
    email: Email,
    password: Password,
    ip_address: Option<IpAddr>,
    user_agent: Option<String>,
  ) -> Result<(User, Session, SessionToken), AuthError> {
    // Rate limit before touching the password so enumeration and stuffing
    // attempts hit the same wall
    let failed_attempts = self
      .attempt_repo
      .count_recent_failures(email.as_str(), self.config.rate_limit_window_seconds)
      .await?;

    if failed_attempts >= self.config.max_failed_attempts {
      if let Some(ip) = ip_address {
        let attempt = LoginAttempt::failure(email.as_str().to_string(), ip);
        self.attempt_repo.create(attempt).await?;
      }
      return Err(AuthError::RateLimitExceeded);
    }

    let user = self
      .user_repo
      .find_by_email(&email)
      .await?
      .ok_or(AuthError::InvalidCredentials)?;

    let password_hash = super::value_objects::PasswordHash::from_hash(&user.password_hash)?;
    let is_valid = password_hash.verify(&password)?;

    if !is_valid {
      if let Some(ip) = ip_address {
        let attempt = LoginAttempt::failure(email.into_inner(), ip);
        self.attempt_repo.create(attempt).await?;
      }
      return Err(AuthError::InvalidCredentials);
    }

    if let Some(ip) = ip_address {
      let attempt = LoginAttempt::success(email.into_inner(), ip);
      self.attempt_repo.create(attempt).await?;
    }

    let session_token = SessionToken::generate()?;
    let token_hash = session_token.hash();

    let session = Session::with_duration(
      user.id,
      token_hash.into_inner(),
      Duration::seconds(self.config.session_ttl_seconds),
      ip_address,
      user_agent,
    );

    let created_session = self.session_repo.create(session).await?;

    Ok((user, created_session, session_token))
  }

  /// Logs out by invalidating the session behind the token.
  pub async fn logout(&self, token: SessionToken) -> Result<(), AuthError> {
    let token_hash = token.hash();

    let session = self
      .session_repo
      .find_by_token_hash(token_hash.as_str())
      .await?
      .ok_or(AuthError::InvalidSession)?;

    self.session_repo.delete(session.id).await?;
    Ok(())
  }

  pub async fn logout_all(&self, user_id: Uuid) -> Result<u64, AuthError> {
    self
      .user_repo
      .find_by_id(user_id)
      .await?
      .ok_or(AuthError::UserNotFound)?;

    self.session_repo.delete_all_for_user(user_id).await
  }

  /// Resolves a bearer token to its user. Expired sessions are removed on
  /// sight.
  pub async fn authenticate(&self, token: SessionToken) -> Result<User, AuthError> {
    let token_hash = token.hash();

    let session = self
      .session_repo
      .find_by_token_hash(token_hash.as_str())
      .await?
      .ok_or(AuthError::InvalidSession)?;

    if session.is_expired() {
      self.session_repo.delete(session.id).await?;
      return Err(AuthError::InvalidSession);
    }

    self
      .user_repo
      .find_by_id(session.user_id)
      .await?
      .ok_or(AuthError::UserNotFound)
  }
}
