use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::auth::{Actor, Role};
use crate::domain::billing::{
  BillingError, PaymentLedger, PaymentMethod, PaymentStatus,
};

#[derive(Debug)]
pub struct ListPaymentsCommand {
  pub actor: Actor,
  pub invoice_id: Option<Uuid>,
  pub payment_method: Option<PaymentMethod>,
  pub status: Option<PaymentStatus>,
}

#[derive(Debug, Serialize)]
pub struct PaymentListItem {
  pub payment_id: Uuid,
  pub invoice_id: Uuid,
  pub amount: Decimal,
  pub payment_method: PaymentMethod,
  pub transaction_id: Option<String>,
  pub status: PaymentStatus,
  pub payment_date: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ListPaymentsResponse {
  pub payments: Vec<PaymentListItem>,
}

pub struct ListPaymentsUseCase {
  ledger: Arc<dyn PaymentLedger>,
}

impl ListPaymentsUseCase {
  pub fn new(ledger: Arc<dyn PaymentLedger>) -> Self {
    Self { ledger }
  }

  pub async fn execute(
    &self,
    command: ListPaymentsCommand,
  ) -> Result<ListPaymentsResponse, BillingError> {
    // The ledger is staff-only; customers see payments through their
    // invoice details.
    if command.actor.role == Role::Customer {
      return Err(BillingError::PermissionDenied(
        "Staff role required".to_string(),
      ));
    }

    let mut payments = match command.invoice_id {
      Some(invoice_id) => self.ledger.find_by_invoice_id(invoice_id).await?,
      None => self.ledger.find_all().await?,
    };

    if let Some(method) = command.payment_method {
      payments.retain(|p| p.payment_method == method);
    }
    if let Some(status) = command.status {
      payments.retain(|p| p.status == status);
    }

    payments.sort_by(|a, b| b.payment_date.cmp(&a.payment_date));

    Ok(ListPaymentsResponse {
      payments: payments
        .into_iter()
        .map(|payment| PaymentListItem {
          payment_id: payment.id,
          invoice_id: payment.invoice_id,
          amount: payment.amount,
          payment_method: payment.payment_method,
          transaction_id: payment.transaction_id,
          status: payment.status,
          payment_date: payment.payment_date,
        })
        .collect(),
    })
  }
}
