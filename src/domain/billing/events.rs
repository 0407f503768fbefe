use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Domain events emitted after a billing state change has been committed.
///
/// Publishing is decoupled from delivery: handlers reload whatever contact
/// data they need and enqueue mail jobs. A handler failure never rolls back
/// the state change that produced the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BillingEvent {
  InvoiceCreated { invoice_id: Uuid },
  InvoicePaid { invoice_id: Uuid },
  PaymentReceived { invoice_id: Uuid, payment_id: Uuid },
}

impl BillingEvent {
  pub fn invoice_id(&self) -> Uuid {
    match self {
      BillingEvent::InvoiceCreated { invoice_id }
      | BillingEvent::InvoicePaid { invoice_id }
      | BillingEvent::PaymentReceived { invoice_id, .. } => *invoice_id,
    }
  }
}

/// Hands an event to zero or more registered handlers, best-effort.
#[async_trait]
pub trait EventPublisher: Send + Sync {
  async fn publish(&self, event: BillingEvent);
}
