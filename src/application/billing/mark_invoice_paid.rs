use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::auth::Actor;
use crate::domain::billing::{
  BillingError, BillingEvent, BillingService, EventPublisher, InvoiceStatus, PaymentMethod,
};

/// Settles the open balance with a single manual payment, keeping the
/// paid-status/ledger invariant intact.
#[derive(Debug)]
pub struct MarkInvoicePaidCommand {
  pub actor: Actor,
  pub invoice_id: Uuid,
  pub payment_method: PaymentMethod,
}

#[derive(Debug, Serialize)]
pub struct MarkInvoicePaidResponse {
  pub invoice_id: Uuid,
  pub invoice_status: InvoiceStatus,
  pub payment_id: Uuid,
  pub amount: Decimal,
}

pub struct MarkInvoicePaidUseCase {
  billing_service: Arc<BillingService>,
  event_publisher: Arc<dyn EventPublisher>,
}

impl MarkInvoicePaidUseCase {
  pub fn new(
    billing_service: Arc<BillingService>,
    event_publisher: Arc<dyn EventPublisher>,
  ) -> Self {
    Self {
      billing_service,
      event_publisher,
    }
  }

  pub async fn execute(
    &self,
    command: MarkInvoicePaidCommand,
  ) -> Result<MarkInvoicePaidResponse, BillingError> {
    let append = self
      .billing_service
      .mark_invoice_paid(command.actor, command.invoice_id, command.payment_method)
      .await?;

    if append.newly_settled {
      self
        .event_publisher
        .publish(BillingEvent::InvoicePaid {
          invoice_id: append.invoice.id,
        })
        .await;
    }

    Ok(MarkInvoicePaidResponse {
      invoice_id: append.invoice.id,
      invoice_status: append.invoice.status,
      payment_id: append.payment.id,
      amount: append.payment.amount,
    })
  }
}
