use actix_web::{HttpRequest, HttpResponse, web};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::{
  adapters::http::{
    dtos::{
      CancelInvoiceRequest, CreateInvoiceRequest, ListInvoicesQuery, MarkInvoicePaidRequest,
    },
    errors::ApiError,
    middleware::RequestActor,
  },
  application::billing::{
    CancelInvoiceCommand, CancelInvoiceUseCase, CreateInvoiceCommand, CreateInvoiceItemDto,
    CreateInvoiceUseCase, DeleteInvoiceCommand, DeleteInvoiceUseCase, GetInvoiceDetailsCommand,
    GetInvoiceDetailsUseCase, IssueInvoiceCommand, IssueInvoiceUseCase, ListInvoicesCommand,
    ListInvoicesUseCase, MarkInvoicePaidCommand, MarkInvoicePaidUseCase,
  },
  domain::billing::{InvoiceStatus, PaymentMethod},
};

/// POST /api/v1/invoices
pub async fn create_invoice_handler(
  request: web::Json<CreateInvoiceRequest>,
  use_case: web::Data<Arc<CreateInvoiceUseCase>>,
  http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
  request.validate()?;

  let request = request.into_inner();
  let command = CreateInvoiceCommand {
    actor: http_req.actor(),
    customer_id: request.customer_id,
    invoice_number: request.invoice_number,
    issue_date: request.issue_date,
    due_date: request.due_date,
    notes: request.notes,
    items: request
      .items
      .into_iter()
      .map(|item| CreateInvoiceItemDto {
        description: item.description,
        quantity: item.quantity,
        unit_price: item.unit_price,
        tax_rate: item.tax_rate,
      })
      .collect(),
    issue: request.issue,
  };

  let response = use_case.execute(command).await?;
  Ok(HttpResponse::Created().json(response))
}

/// GET /api/v1/invoices
pub async fn list_invoices_handler(
  query: web::Query<ListInvoicesQuery>,
  use_case: web::Data<Arc<ListInvoicesUseCase>>,
  http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
  let status = query
    .status
    .as_deref()
    .map(InvoiceStatus::from_str)
    .transpose()
    .map_err(|e| ApiError::Validation(e.to_string()))?;

  let command = ListInvoicesCommand {
    actor: http_req.actor(),
    status,
    customer_id: query.customer_id,
    overdue_only: query.overdue_only,
  };

  let response = use_case.execute(command).await?;
  Ok(HttpResponse::Ok().json(response))
}

/// GET /api/v1/invoices/overdue/list
pub async fn list_overdue_invoices_handler(
  use_case: web::Data<Arc<ListInvoicesUseCase>>,
  http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
  let command = ListInvoicesCommand {
    actor: http_req.actor(),
    status: None,
    customer_id: None,
    overdue_only: true,
  };

  let response = use_case.execute(command).await?;
  Ok(HttpResponse::Ok().json(response))
}

/// GET /api/v1/invoices/{invoice_id}
pub async fn get_invoice_handler(
  invoice_id: web::Path<Uuid>,
  use_case: web::Data<Arc<GetInvoiceDetailsUseCase>>,
  http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
  let command = GetInvoiceDetailsCommand {
    actor: http_req.actor(),
    invoice_id: *invoice_id,
  };

  let response = use_case.execute(command).await?;
  Ok(HttpResponse::Ok().json(response))
}

/// POST /api/v1/invoices/{invoice_id}/issue
pub async fn issue_invoice_handler(
  invoice_id: web::Path<Uuid>,
  use_case: web::Data<Arc<IssueInvoiceUseCase>>,
  http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
  let command = IssueInvoiceCommand {
    actor: http_req.actor(),
    invoice_id: *invoice_id,
  };

  let response = use_case.execute(command).await?;
  Ok(HttpResponse::Ok().json(response))
}

/// POST /api/v1/invoices/{invoice_id}/mark-paid
pub async fn mark_invoice_paid_handler(
  invoice_id: web::Path<Uuid>,
  request: Option<web::Json<MarkInvoicePaidRequest>>,
  use_case: web::Data<Arc<MarkInvoicePaidUseCase>>,
  http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
  let payment_method = request
    .as_ref()
    .and_then(|r| r.payment_method.as_deref())
    .map(PaymentMethod::from_str)
    .transpose()
    .map_err(|e| ApiError::Validation(e.to_string()))?
    .unwrap_or(PaymentMethod::BankTransfer);

  let command = MarkInvoicePaidCommand {
    actor: http_req.actor(),
    invoice_id: *invoice_id,
    payment_method,
  };

  let response = use_case.execute(command).await?;
  Ok(HttpResponse::Ok().json(response))
}

/// POST /api/v1/invoices/{invoice_id}/cancel
pub async fn cancel_invoice_handler(
  invoice_id: web::Path<Uuid>,
  request: Option<web::Json<CancelInvoiceRequest>>,
  use_case: web::Data<Arc<CancelInvoiceUseCase>>,
  http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
  let command = CancelInvoiceCommand {
    actor: http_req.actor(),
    invoice_id: *invoice_id,
    reason: request.and_then(|r| r.reason.clone()),
  };

  let response = use_case.execute(command).await?;
  Ok(HttpResponse::Ok().json(response))
}

/// DELETE /api/v1/invoices/{invoice_id}
pub async fn delete_invoice_handler(
  invoice_id: web::Path<Uuid>,
  use_case: web::Data<Arc<DeleteInvoiceUseCase>>,
  http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
  let command = DeleteInvoiceCommand {
    actor: http_req.actor(),
    invoice_id: *invoice_id,
  };

  use_case.execute(command).await?;
  Ok(HttpResponse::NoContent().finish())
}
