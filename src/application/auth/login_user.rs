use chrono::{DateTime, Utc};
use serde::Serialize;
use std::net::IpAddr;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::auth::{AuthError, AuthService, Email, Password, Role};

#[derive(Debug)]
pub struct LoginUserCommand {
  pub email: String,
  pub password: String,
  pub ip_address: Option<IpAddr>,
  pub user_agent: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginUserResponse {
  pub user_id: Uuid,
  pub email: String,
  pub first_name: String,
  pub last_name: String,
  pub role: Role,
  /// Bearer token for subsequent requests. Returned once, never stored.
  pub token: String,
  pub expires_at: DateTime<Utc>,
}

pub struct LoginUserUseCase {
  auth_service: Arc<AuthService>,
}

impl LoginUserUseCase {
  pub fn new(auth_service: Arc<AuthService>) -> Self {
    Self { auth_service }
  }

  pub async fn execute(&self, command: LoginUserCommand) -> Result<LoginUserResponse, AuthError> {
    let email = Email::new(command.email)?;
    let password = Password::new(command.password)?;

    let (user, session, token) = self
      .auth_service
      .login(email, password, command.ip_address, command.user_agent)
      .await?;

    Ok(LoginUserResponse {
      user_id: user.id,
      email: user.email,
      first_name: user.first_name,
      last_name: user.last_name,
      role: user.role,
      token: token.into_inner(),
      expires_at: session.expires_at,
    })
  }
}
