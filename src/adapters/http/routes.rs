use actix_web::web;
use std::sync::Arc;

use crate::application::auth::{
  GetCurrentUserUseCase, LoginUserUseCase, LogoutUserUseCase, RegisterUserUseCase,
};
use crate::application::billing::{
  CancelInvoiceUseCase, CapturePayPalOrderUseCase, CreateInvoiceUseCase, CreatePayPalOrderUseCase,
  DeleteInvoiceUseCase, GetInvoiceDetailsUseCase, IssueInvoiceUseCase, ListInvoicesUseCase,
  ListPaymentsUseCase, MarkInvoicePaidUseCase, ProcessWebhookEventUseCase, RecordPaymentUseCase,
};
use crate::application::settings::{GetSettingsUseCase, UpdateSettingsUseCase};
use crate::infrastructure::paypal::PayPalWebhookVerifier;

use super::handlers;
use super::middleware::AuthMiddleware;

/// Auth routes under /api/v1/auth. Login is public; registration is
/// admin-only and therefore runs behind the auth middleware.
pub fn configure_auth_routes(
  cfg: &mut web::ServiceConfig,
  login_use_case: Arc<LoginUserUseCase>,
  logout_use_case: Arc<LogoutUserUseCase>,
  get_user_use_case: Arc<GetCurrentUserUseCase>,
  register_use_case: Arc<RegisterUserUseCase>,
) {
  cfg
    .app_data(web::Data::new(login_use_case))
    .app_data(web::Data::new(logout_use_case))
    .app_data(web::Data::new(get_user_use_case.clone()))
    .app_data(web::Data::new(register_use_case))
    .route("/login", web::post().to(handlers::auth::login_handler))
    .route("/logout", web::post().to(handlers::auth::logout_handler))
    .route("/user", web::get().to(handlers::auth::current_user_handler))
    .service(
      web::resource("/register")
        .wrap(AuthMiddleware::new(get_user_use_case))
        .route(web::post().to(handlers::auth::register_handler)),
    );
}

/// Invoice routes under /api/v1/invoices (protected)
#[allow(clippy::too_many_arguments)]
pub fn configure_invoice_routes(
  cfg: &mut web::ServiceConfig,
  create_use_case: Arc<CreateInvoiceUseCase>,
  list_use_case: Arc<ListInvoicesUseCase>,
  get_use_case: Arc<GetInvoiceDetailsUseCase>,
  issue_use_case: Arc<IssueInvoiceUseCase>,
  mark_paid_use_case: Arc<MarkInvoicePaidUseCase>,
  cancel_use_case: Arc<CancelInvoiceUseCase>,
  delete_use_case: Arc<DeleteInvoiceUseCase>,
) {
  cfg
    .app_data(web::Data::new(create_use_case))
    .app_data(web::Data::new(list_use_case))
    .app_data(web::Data::new(get_use_case))
    .app_data(web::Data::new(issue_use_case))
    .app_data(web::Data::new(mark_paid_use_case))
    .app_data(web::Data::new(cancel_use_case))
    .app_data(web::Data::new(delete_use_case))
    .route("", web::post().to(handlers::invoices::create_invoice_handler))
    .route("", web::get().to(handlers::invoices::list_invoices_handler))
    .route(
      "/overdue/list",
      web::get().to(handlers::invoices::list_overdue_invoices_handler),
    )
    .route(
      "/{invoice_id}",
      web::get().to(handlers::invoices::get_invoice_handler),
    )
    .route(
      "/{invoice_id}",
      web::delete().to(handlers::invoices::delete_invoice_handler),
    )
    .route(
      "/{invoice_id}/issue",
      web::post().to(handlers::invoices::issue_invoice_handler),
    )
    .route(
      "/{invoice_id}/mark-paid",
      web::post().to(handlers::invoices::mark_invoice_paid_handler),
    )
    .route(
      "/{invoice_id}/cancel",
      web::post().to(handlers::invoices::cancel_invoice_handler),
    );
}

/// Payment routes under /api/v1/payments (protected)
pub fn configure_payment_routes(
  cfg: &mut web::ServiceConfig,
  record_use_case: Arc<RecordPaymentUseCase>,
  list_use_case: Arc<ListPaymentsUseCase>,
  create_order_use_case: Arc<CreatePayPalOrderUseCase>,
  capture_order_use_case: Arc<CapturePayPalOrderUseCase>,
) {
  cfg
    .app_data(web::Data::new(record_use_case))
    .app_data(web::Data::new(list_use_case))
    .app_data(web::Data::new(create_order_use_case))
    .app_data(web::Data::new(capture_order_use_case))
    .route("", web::post().to(handlers::payments::record_payment_handler))
    .route("", web::get().to(handlers::payments::list_payments_handler))
    .route(
      "/paypal/create-order",
      web::post().to(handlers::paypal::create_order_handler),
    )
    .route(
      "/paypal/capture-order",
      web::post().to(handlers::paypal::capture_order_handler),
    );
}

/// Webhook receiver, mounted at /api/v1/payments/paypal/webhook. Public:
/// PayPal authenticates through the signature, not a session.
pub fn configure_webhook_routes(
  cfg: &mut web::ServiceConfig,
  process_use_case: Arc<ProcessWebhookEventUseCase>,
  verifier: Arc<PayPalWebhookVerifier>,
) {
  cfg
    .app_data(web::Data::new(process_use_case))
    .app_data(web::Data::new(verifier))
    .route("", web::post().to(handlers::paypal::webhook_handler));
}

/// Settings routes under /api/v1/settings (protected, admin checked in the
/// domain layer)
pub fn configure_settings_routes(
  cfg: &mut web::ServiceConfig,
  get_use_case: Arc<GetSettingsUseCase>,
  update_use_case: Arc<UpdateSettingsUseCase>,
) {
  cfg
    .app_data(web::Data::new(get_use_case))
    .app_data(web::Data::new(update_use_case))
    .route("", web::get().to(handlers::settings::get_settings_handler))
    .route(
      "",
      web::put().to(handlers::settings::update_settings_handler),
    );
}
