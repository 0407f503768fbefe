use actix_web::{HttpRequest, HttpResponse, web};
use std::str::FromStr;
use std::sync::Arc;
use validator::Validate;

use crate::{
  adapters::http::{
    dtos::{ListPaymentsQuery, RecordPaymentRequest},
    errors::ApiError,
    middleware::RequestActor,
  },
  application::billing::{
    ListPaymentsCommand, ListPaymentsUseCase, RecordPaymentCommand, RecordPaymentUseCase,
  },
  domain::billing::{PaymentMethod, PaymentStatus},
};

/// POST /api/v1/payments
pub async fn record_payment_handler(
  request: web::Json<RecordPaymentRequest>,
  use_case: web::Data<Arc<RecordPaymentUseCase>>,
  http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
  request.validate()?;

  let payment_method = PaymentMethod::from_str(&request.payment_method)
    .map_err(|e| ApiError::Validation(e.to_string()))?;

  let command = RecordPaymentCommand {
    actor: http_req.actor(),
    invoice_id: request.invoice_id,
    amount: request.amount,
    payment_method,
    transaction_id: request.transaction_id.clone(),
  };

  let response = use_case.execute(command).await?;
  Ok(HttpResponse::Created().json(response))
}

/// GET /api/v1/payments
pub async fn list_payments_handler(
  query: web::Query<ListPaymentsQuery>,
  use_case: web::Data<Arc<ListPaymentsUseCase>>,
  http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
  let payment_method = query
    .payment_method
    .as_deref()
    .map(PaymentMethod::from_str)
    .transpose()
    .map_err(|e| ApiError::Validation(e.to_string()))?;

  let status = query
    .status
    .as_deref()
    .map(PaymentStatus::from_str)
    .transpose()
    .map_err(|e| ApiError::Validation(e.to_string()))?;

  let command = ListPaymentsCommand {
    actor: http_req.actor(),
    invoice_id: query.invoice_id,
    payment_method,
    status,
  };

  let response = use_case.execute(command).await?;
  Ok(HttpResponse::Ok().json(response))
}
