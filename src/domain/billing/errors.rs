use thiserror::Error;
use uuid::Uuid;

use super::value_objects::{InvoiceStatus, PaymentMethod, ValueObjectError};

#[derive(Debug, Error)]
pub enum BillingError {
  #[error("Validation error: {0}")]
  Validation(#[from] ValueObjectError),

  #[error("Invoice not found: {0}")]
  InvoiceNotFound(Uuid),

  #[error("Customer not found: {0}")]
  CustomerNotFound(Uuid),

  #[error("Payment not found: {0}")]
  PaymentNotFound(Uuid),

  #[error("Invoice has no line items")]
  NoItems,

  #[error("Operation not allowed in status {status}: {operation}")]
  InvalidState {
    status: InvoiceStatus,
    operation: String,
  },

  #[error("Invalid status transition from {from} to {to}")]
  InvalidTransition {
    from: InvoiceStatus,
    to: InvoiceStatus,
  },

  #[error("Invoice number '{0}' already exists")]
  InvoiceNumberConflict(String),

  #[error("Transaction '{transaction_id}' already recorded for {method}")]
  DuplicateTransaction {
    method: PaymentMethod,
    transaction_id: String,
  },

  #[error("Permission denied: {0}")]
  PermissionDenied(String),

  #[error("Payment gateway error: {0}")]
  Gateway(String),

  #[error("Payment failed: {0}")]
  PaymentFailed(String),

  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Internal error: {0}")]
  Internal(String),
}

impl BillingError {
  pub fn invalid_state(status: InvoiceStatus, operation: impl Into<String>) -> Self {
    BillingError::InvalidState {
      status,
      operation: operation.into(),
    }
  }
}
