use actix_web::{
  Error, HttpMessage,
  body::EitherBody,
  dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
  error::ResponseError,
};
use futures_util::future::LocalBoxFuture;
use std::{
  future::{Ready, ready},
  rc::Rc,
  sync::Arc,
};

use crate::{
  adapters::http::errors::{ApiError, AuthErrorKind},
  application::auth::GetCurrentUserUseCase,
  domain::auth::Actor,
};

/// Bearer-token authentication middleware.
///
/// Resolves the Authorization header to a user session and attaches the
/// resulting `Actor` to request extensions. Handlers pass that actor into
/// the core operations as an explicit capability argument.
pub struct AuthMiddleware {
  get_user_use_case: Arc<GetCurrentUserUseCase>,
}

impl AuthMiddleware {
  pub fn new(get_user_use_case: Arc<GetCurrentUserUseCase>) -> Self {
    Self { get_user_use_case }
  }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
  S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
  S::Future: 'static,
  B: 'static,
{
  type Response = ServiceResponse<EitherBody<B>>;
  type Error = Error;
  type Transform = AuthMiddlewareService<S>;
  type InitError = ();
  type Future = Ready<Result<Self::Transform, Self::InitError>>;

  fn new_transform(&self, service: S) -> Self::Future {
    ready(Ok(AuthMiddlewareService {
      service: Rc::new(service),
      get_user_use_case: self.get_user_use_case.clone(),
    }))
  }
}

pub struct AuthMiddlewareService<S> {
  service: Rc<S>,
  get_user_use_case: Arc<GetCurrentUserUseCase>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
  S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
  S::Future: 'static,
  B: 'static,
{
  type Response = ServiceResponse<EitherBody<B>>;
  type Error = Error;
  type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

  forward_ready!(service);

  fn call(&self, req: ServiceRequest) -> Self::Future {
    let service = Rc::clone(&self.service);
    let get_user_use_case = self.get_user_use_case.clone();

    Box::pin(async move {
      let token = match extract_bearer_token(&req) {
        Ok(token) => token,
        Err(e) => {
          let (request, _) = req.into_parts();
          let response = e.error_response().map_into_right_body();
          return Ok(ServiceResponse::new(request, response));
        }
      };

      let user = match get_user_use_case.execute(token).await {
        Ok(user) => user,
        Err(e) => {
          let (request, _) = req.into_parts();
          let api_error: ApiError = e.into();
          let response = api_error.error_response().map_into_right_body();
          return Ok(ServiceResponse::new(request, response));
        }
      };

      let actor = Actor::new(user.user_id, user.role);
      req.extensions_mut().insert(actor);

      let res = service.call(req).await?;
      Ok(res.map_into_left_body())
    })
  }
}

fn extract_bearer_token(req: &ServiceRequest) -> Result<String, ApiError> {
  req
    .headers()
    .get("Authorization")
    .and_then(|h| h.to_str().ok())
    .and_then(|s| s.strip_prefix("Bearer "))
    .map(|s| s.to_string())
    .ok_or(ApiError::Auth(AuthErrorKind::InvalidToken))
}

/// Extension trait to extract the authenticated actor in handlers behind
/// `AuthMiddleware`.
pub trait RequestActor {
  /// # Panics
  ///
  /// Panics if no actor is present, i.e. the route is not wrapped in
  /// `AuthMiddleware`.
  fn actor(&self) -> Actor;
}

impl RequestActor for actix_web::HttpRequest {
  fn actor(&self) -> Actor {
    self
      .extensions()
      .get::<Actor>()
      .copied()
      .expect("Actor not found in request extensions. Did you forget to add AuthMiddleware?")
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::test::TestRequest;

  #[test]
  fn test_extract_bearer_token_valid() {
    let req = TestRequest::default()
      .insert_header(("Authorization", "Bearer test_token_123"))
      .to_srv_request();

    assert_eq!(extract_bearer_token(&req).unwrap(), "test_token_123");
  }

  #[test]
  fn test_extract_bearer_token_missing() {
    let req = TestRequest::default().to_srv_request();
    assert!(extract_bearer_token(&req).is_err());
  }

  #[test]
  fn test_extract_bearer_token_wrong_scheme() {
    let req = TestRequest::default()
      .insert_header(("Authorization", "Basic dXNlcjpwYXNz"))
      .to_srv_request();

    assert!(extract_bearer_token(&req).is_err());
  }
}
