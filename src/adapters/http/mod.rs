pub mod dtos;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod routes;

pub use dtos::ErrorResponse;
pub use errors::{ApiError, AuthErrorKind};
pub use middleware::{AuthMiddleware, RequestActor, RequestIdMiddleware};
pub use routes::{
  configure_auth_routes, configure_invoice_routes, configure_payment_routes,
  configure_settings_routes, configure_webhook_routes,
};
