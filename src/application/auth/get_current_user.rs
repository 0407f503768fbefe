use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::auth::{AuthError, AuthService, Role, SessionToken};

#[derive(Debug, Serialize)]
pub struct CurrentUserResponse {
  pub user_id: Uuid,
  pub email: String,
  pub first_name: String,
  pub last_name: String,
  pub role: Role,
  pub created_at: DateTime<Utc>,
}

pub struct GetCurrentUserUseCase {
  auth_service: Arc<AuthService>,
}

impl GetCurrentUserUseCase {
  pub fn new(auth_service: Arc<AuthService>) -> Self {
    Self { auth_service }
  }

  pub async fn execute(&self, token: String) -> Result<CurrentUserResponse, AuthError> {
    let token = SessionToken::from_string(token)?;
    let user = self.auth_service.authenticate(token).await?;

    Ok(CurrentUserResponse {
      user_id: user.id,
      email: user.email,
      first_name: user.first_name,
      last_name: user.last_name,
      role: user.role,
      created_at: user.created_at,
    })
  }
}
