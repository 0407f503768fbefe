use actix_web::{HttpRequest, HttpResponse, web};
use std::str::FromStr;
use std::sync::Arc;
use validator::Validate;

use crate::{
  adapters::http::{
    dtos::{LoginRequest, RegisterRequest, SuccessResponse},
    errors::ApiError,
    middleware::RequestActor,
  },
  application::auth::{
    GetCurrentUserUseCase, LoginUserCommand, LoginUserUseCase, LogoutUserCommand,
    LogoutUserUseCase, RegisterUserCommand, RegisterUserUseCase,
  },
  domain::auth::Role,
};

/// POST /api/v1/auth/login
pub async fn login_handler(
  request: web::Json<LoginRequest>,
  use_case: web::Data<Arc<LoginUserUseCase>>,
  http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
  request.validate()?;

  let command = LoginUserCommand {
    email: request.email.clone(),
    password: request.password.clone(),
    ip_address: http_req.peer_addr().map(|addr| addr.ip()),
    user_agent: http_req
      .headers()
      .get("User-Agent")
      .and_then(|h| h.to_str().ok())
      .map(|s| s.to_string()),
  };

  let response = use_case.execute(command).await?;
  Ok(HttpResponse::Ok().json(response))
}

/// POST /api/v1/auth/logout
pub async fn logout_handler(
  use_case: web::Data<Arc<LogoutUserUseCase>>,
  http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
  let token = http_req
    .headers()
    .get("Authorization")
    .and_then(|h| h.to_str().ok())
    .and_then(|s| s.strip_prefix("Bearer "))
    .map(|s| s.to_string())
    .ok_or(ApiError::Auth(
      crate::adapters::http::errors::AuthErrorKind::InvalidToken,
    ))?;

  use_case.execute(LogoutUserCommand { token }).await?;

  Ok(HttpResponse::Ok().json(SuccessResponse {
    message: "Logged out".to_string(),
  }))
}

/// GET /api/v1/auth/user
pub async fn current_user_handler(
  use_case: web::Data<Arc<GetCurrentUserUseCase>>,
  http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
  let token = http_req
    .headers()
    .get("Authorization")
    .and_then(|h| h.to_str().ok())
    .and_then(|s| s.strip_prefix("Bearer "))
    .map(|s| s.to_string())
    .ok_or(ApiError::Auth(
      crate::adapters::http::errors::AuthErrorKind::InvalidToken,
    ))?;

  let response = use_case.execute(token).await?;
  Ok(HttpResponse::Ok().json(response))
}

/// POST /api/v1/auth/register (admin only)
pub async fn register_handler(
  request: web::Json<RegisterRequest>,
  use_case: web::Data<Arc<RegisterUserUseCase>>,
  http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
  request.validate()?;

  let role = Role::from_str(&request.role).map_err(|e| ApiError::Validation(e.to_string()))?;

  let command = RegisterUserCommand {
    actor: http_req.actor(),
    email: request.email.clone(),
    password: request.password.clone(),
    first_name: request.first_name.clone(),
    last_name: request.last_name.clone(),
    role,
    trainer_id: request.trainer_id,
  };

  let response = use_case.execute(command).await?;
  Ok(HttpResponse::Created().json(response))
}
