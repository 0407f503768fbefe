use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Standard error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
  pub error: String,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub details: Option<String>,
}

// Auth

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
  #[validate(email(message = "Invalid email address"))]
  pub email: String,
  #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
  pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
  #[validate(email(message = "Invalid email address"))]
  pub email: String,
  #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
  pub password: String,
  #[validate(length(min = 1, message = "First name is required"))]
  pub first_name: String,
  #[validate(length(min = 1, message = "Last name is required"))]
  pub last_name: String,
  /// "admin", "trainer" or "customer"
  pub role: String,
  pub trainer_id: Option<Uuid>,
}

// Invoices

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreateInvoiceItemRequest {
  #[validate(length(min = 1, max = 500, message = "Description must be 1-500 characters"))]
  pub description: String,
  #[validate(range(min = 1, message = "Quantity must be positive"))]
  pub quantity: i32,
  pub unit_price: Decimal,
  pub tax_rate: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
  pub customer_id: Uuid,
  #[validate(length(max = 100, message = "Invoice number cannot exceed 100 characters"))]
  pub invoice_number: Option<String>,
  pub issue_date: NaiveDate,
  pub due_date: NaiveDate,
  #[validate(length(max = 5000, message = "Notes cannot exceed 5000 characters"))]
  pub notes: Option<String>,
  #[validate(length(min = 1, message = "At least one line item is required"), nested)]
  pub items: Vec<CreateInvoiceItemRequest>,
  #[serde(default)]
  pub issue: bool,
}

#[derive(Debug, Deserialize)]
pub struct ListInvoicesQuery {
  pub status: Option<String>,
  pub customer_id: Option<Uuid>,
  #[serde(default)]
  pub overdue_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct CancelInvoiceRequest {
  pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MarkInvoicePaidRequest {
  /// Defaults to bank transfer when omitted.
  pub payment_method: Option<String>,
}

// Payments

#[derive(Debug, Deserialize, Validate)]
pub struct RecordPaymentRequest {
  pub invoice_id: Uuid,
  pub amount: Decimal,
  /// "cash", "bank_transfer", "paypal", "stripe", "credit_card" or "other"
  pub payment_method: String,
  pub transaction_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListPaymentsQuery {
  pub invoice_id: Option<Uuid>,
  pub payment_method: Option<String>,
  pub status: Option<String>,
}

// PayPal

#[derive(Debug, Deserialize)]
pub struct CreatePayPalOrderRequest {
  pub invoice_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct CapturePayPalOrderRequest {
  pub order_id: String,
  pub invoice_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
  pub message: String,
}
