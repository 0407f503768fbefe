use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::auth::Actor;
use crate::domain::billing::{
  BillingError, BillingEvent, BillingService, EventPublisher, InvoiceStatus, PaymentStatus,
};

#[derive(Debug)]
pub struct CapturePayPalOrderCommand {
  pub actor: Actor,
  pub invoice_id: Uuid,
  pub order_id: String,
}

#[derive(Debug, Serialize)]
pub struct CapturePayPalOrderResponse {
  pub payment_id: Uuid,
  pub invoice_id: Uuid,
  pub amount: Decimal,
  pub transaction_id: Option<String>,
  pub payment_status: PaymentStatus,
  pub invoice_status: InvoiceStatus,
  pub remaining_balance: Decimal,
}

pub struct CapturePayPalOrderUseCase {
  billing_service: Arc<BillingService>,
  event_publisher: Arc<dyn EventPublisher>,
}

impl CapturePayPalOrderUseCase {
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
    command: CapturePayPalOrderCommand,
  ) -> Result<CapturePayPalOrderResponse, BillingError> {
    let append = self
      .billing_service
      .capture_gateway_order(command.actor, command.invoice_id, &command.order_id)
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

    Ok(CapturePayPalOrderResponse {
      payment_id: append.payment.id,
      invoice_id: append.invoice.id,
      amount: append.payment.amount,
      transaction_id: append.payment.transaction_id.clone(),
      payment_status: append.payment.status,
      invoice_status: append.invoice.status,
      remaining_balance: append.invoice.remaining_balance(append.total_paid),
    })
  }
}
