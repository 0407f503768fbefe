use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::auth::Actor;
use crate::domain::billing::{
  BillingError, BillingEvent, BillingService, EventPublisher, InvoiceStatus, PaymentMethod,
  PaymentStatus,
};

#[derive(Debug)]
pub struct RecordPaymentCommand {
  pub actor: Actor,
  pub invoice_id: Uuid,
  pub amount: Decimal,
  pub payment_method: PaymentMethod,
  pub transaction_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecordPaymentResponse {
  pub payment_id: Uuid,
  pub invoice_id: Uuid,
  pub amount: Decimal,
  pub payment_status: PaymentStatus,
  pub invoice_status: InvoiceStatus,
  pub total_paid: Decimal,
  pub remaining_balance: Decimal,
}

pub struct RecordPaymentUseCase {
  billing_service: Arc<BillingService>,
  event_publisher: Arc<dyn EventPublisher>,
}

impl RecordPaymentUseCase {
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
    command: RecordPaymentCommand,
  ) -> Result<RecordPaymentResponse, BillingError> {
    let append = self
      .billing_service
      .record_payment(
        command.actor,
        command.invoice_id,
        command.amount,
        command.payment_method,
        command.transaction_id,
      )
      .await?;

    self
      .event_publisher
      .publish(BillingEvent::PaymentReceived {
        invoice_id: append.invoice.id,
        payment_id: append.payment.id,
      })
      .await;

    if append.newly_settled {
      self
        .event_publisher
        .publish(BillingEvent::InvoicePaid {
          invoice_id: append.invoice.id,
        })
        .await;
    }

    Ok(RecordPaymentResponse {
      payment_id: append.payment.id,
      invoice_id: append.invoice.id,
      amount: append.payment.amount,
      payment_status: append.payment.status,
      invoice_status: append.invoice.status,
      remaining_balance: append.invoice.remaining_balance(append.total_paid),
      total_paid: append.total_paid,
    })
  }
}
