use actix_web::{HttpRequest, HttpResponse, web};
use std::sync::Arc;

use crate::{
  adapters::http::{
    dtos::{CapturePayPalOrderRequest, CreatePayPalOrderRequest},
    errors::ApiError,
    middleware::RequestActor,
  },
  application::billing::{
    CapturePayPalOrderCommand, CapturePayPalOrderUseCase, CreatePayPalOrderCommand,
    CreatePayPalOrderUseCase, ProcessWebhookEventCommand, ProcessWebhookEventUseCase,
    WebhookEventBody,
  },
  infrastructure::metrics::Metrics,
  infrastructure::paypal::{PayPalWebhookVerifier, WebhookHeaders},
};

/// POST /api/v1/payments/paypal/create-order
pub async fn create_order_handler(
  request: web::Json<CreatePayPalOrderRequest>,
  use_case: web::Data<Arc<CreatePayPalOrderUseCase>>,
  metrics: web::Data<Arc<Metrics>>,
  http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
  let command = CreatePayPalOrderCommand {
    actor: http_req.actor(),
    invoice_id: request.invoice_id,
  };

  let response = use_case.execute(command).await?;
  metrics.gateway_orders_created.inc();

  Ok(HttpResponse::Ok().json(response))
}

/// POST /api/v1/payments/paypal/capture-order
pub async fn capture_order_handler(
  request: web::Json<CapturePayPalOrderRequest>,
  use_case: web::Data<Arc<CapturePayPalOrderUseCase>>,
  metrics: web::Data<Arc<Metrics>>,
  http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
  let command = CapturePayPalOrderCommand {
    actor: http_req.actor(),
    invoice_id: request.invoice_id,
    order_id: request.order_id.clone(),
  };

  match use_case.execute(command).await {
    Ok(response) => {
      metrics.gateway_captures.with_label_values(&["completed"]).inc();
      Ok(HttpResponse::Ok().json(response))
    }
    Err(e) => {
      metrics.gateway_captures.with_label_values(&["failed"]).inc();
      Err(e.into())
    }
  }
}

/// POST /api/v1/payments/paypal/webhook
///
/// Public endpoint. Every delivery runs through the signature verifier
/// before any payment or invoice record is touched; failed verification
/// acknowledges nothing and returns 401.
pub async fn webhook_handler(
  body: web::Bytes,
  use_case: web::Data<Arc<ProcessWebhookEventUseCase>>,
  verifier: web::Data<Arc<PayPalWebhookVerifier>>,
  metrics: web::Data<Arc<Metrics>>,
  http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
  let headers = webhook_headers(&http_req);

  if !verifier.verify(&headers, &body).await {
    metrics.webhooks_received.with_label_values(&["rejected"]).inc();
    return Ok(HttpResponse::Unauthorized().json(serde_json::json!({
      "status": "invalid signature"
    })));
  }
  metrics.webhooks_received.with_label_values(&["accepted"]).inc();

  let event: WebhookEventBody = serde_json::from_slice(&body)
    .map_err(|e| ApiError::Validation(format!("Invalid webhook body: {}", e)))?;

  tracing::info!(event_type = %event.event_type, "PayPal webhook received");

  let outcome = use_case
    .execute(ProcessWebhookEventCommand { body: event })
    .await?;

  Ok(HttpResponse::Ok().json(serde_json::json!({
    "status": "success",
    "outcome": outcome,
  })))
}

fn webhook_headers(req: &HttpRequest) -> WebhookHeaders {
  let header = |name: &str| {
    req
      .headers()
      .get(name)
      .and_then(|h| h.to_str().ok())
      .map(|s| s.to_string())
  };

  WebhookHeaders {
    transmission_id: header("PAYPAL-TRANSMISSION-ID"),
    transmission_time: header("PAYPAL-TRANSMISSION-TIME"),
    transmission_sig: header("PAYPAL-TRANSMISSION-SIG"),
    cert_url: header("PAYPAL-CERT-URL"),
    auth_algo: header("PAYPAL-AUTH-ALGO"),
  }
}
