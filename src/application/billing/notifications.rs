use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use crate::domain::auth::UserRepository;
use crate::domain::billing::{
  BillingError, BillingEvent, CustomerRepository, EventPublisher, InvoiceRepository, MailJob,
  MailQueue, PaymentLedger,
};

/// One notification handler reacting to billing events.
#[async_trait]
pub trait BillingEventHandler: Send + Sync {
  async fn handle(&self, event: &BillingEvent) -> Result<(), BillingError>;
}

/// Fans events out to the registered handlers. Delivery is at-least-once and
/// best-effort: a handler error is logged with the originating entity id and
/// never propagated, because the state change behind the event is already
/// committed.
pub struct EventDispatcher {
  handlers: Vec<Arc<dyn BillingEventHandler>>,
}

impl EventDispatcher {
  pub fn new(handlers: Vec<Arc<dyn BillingEventHandler>>) -> Self {
    Self { handlers }
  }
}

#[async_trait]
impl EventPublisher for EventDispatcher {
  async fn publish(&self, event: BillingEvent) {
    for handler in &self.handlers {
      if let Err(e) = handler.handle(&event).await {
        tracing::error!(
          invoice_id = %event.invoice_id(),
          error = %e,
          "Notification handler failed"
        );
      }
    }
  }
}

/// Turns invoice events into customer emails via the mail queue. Reloads the
/// minimal contact data per event instead of carrying state in the event.
pub struct InvoiceMailHandler {
  invoice_repo: Arc<dyn InvoiceRepository>,
  customer_repo: Arc<dyn CustomerRepository>,
  user_repo: Arc<dyn UserRepository>,
  ledger: Arc<dyn PaymentLedger>,
  mail_queue: Arc<dyn MailQueue>,
}

impl InvoiceMailHandler {
  pub fn new(
    invoice_repo: Arc<dyn InvoiceRepository>,
    customer_repo: Arc<dyn CustomerRepository>,
    user_repo: Arc<dyn UserRepository>,
    ledger: Arc<dyn PaymentLedger>,
    mail_queue: Arc<dyn MailQueue>,
  ) -> Self {
    Self {
      invoice_repo,
      customer_repo,
      user_repo,
      ledger,
      mail_queue,
    }
  }

  async fn build_job(&self, event: &BillingEvent) -> Result<Option<MailJob>, BillingError> {
    let invoice_id = event.invoice_id();

    let invoice = self
      .invoice_repo
      .find_by_id(invoice_id)
      .await?
      .ok_or(BillingError::InvoiceNotFound(invoice_id))?;

    let customer = self
      .customer_repo
      .find_by_id(invoice.customer_id)
      .await?
      .ok_or(BillingError::CustomerNotFound(invoice.customer_id))?;

    let user = self
      .user_repo
      .find_by_id(customer.user_id)
      .await
      .map_err(|e| BillingError::Internal(format!("Failed to load user: {}", e)))?
      .ok_or_else(|| {
        BillingError::Internal(format!("Customer {} has no user account", customer.id))
      })?;

    let job = match event {
      BillingEvent::InvoiceCreated { .. } => {
        let total_paid = self.ledger.sum_completed(invoice.id).await?;
        MailJob {
          to: user.email,
          subject: format!("Rechnung {}", invoice.invoice_number),
          template: "invoice_created".to_string(),
          context: json!({
            "invoice_number": invoice.invoice_number.value(),
            "first_name": user.first_name,
            "total_amount": invoice.total_amount,
            "remaining_balance": invoice.remaining_balance(total_paid),
            "due_date": invoice.due_date,
          }),
        }
      }
      BillingEvent::InvoicePaid { .. } => MailJob {
        to: user.email,
        subject: format!("Zahlungsbestätigung: Rechnung {}", invoice.invoice_number),
        template: "invoice_paid".to_string(),
        context: json!({
          "invoice_number": invoice.invoice_number.value(),
          "first_name": user.first_name,
          "total_amount": invoice.total_amount,
          "paid_date": invoice.paid_date,
        }),
      },
      // Individual payment receipts are covered by the paid confirmation.
      BillingEvent::PaymentReceived { .. } => return Ok(None),
    };

    Ok(Some(job))
  }
}

#[async_trait]
impl BillingEventHandler for InvoiceMailHandler {
  async fn handle(&self, event: &BillingEvent) -> Result<(), BillingError> {
    if let Some(job) = self.build_job(event).await? {
      self.mail_queue.enqueue(job).await?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Mutex;
  use uuid::Uuid;

  struct FailingHandler;

  #[async_trait]
  impl BillingEventHandler for FailingHandler {
    async fn handle(&self, _event: &BillingEvent) -> Result<(), BillingError> {
      Err(BillingError::Internal("mail transport down".to_string()))
    }
  }

  struct CountingHandler {
    seen: Mutex<Vec<BillingEvent>>,
  }

  #[async_trait]
  impl BillingEventHandler for CountingHandler {
    async fn handle(&self, event: &BillingEvent) -> Result<(), BillingError> {
      self.seen.lock().unwrap().push(event.clone());
      Ok(())
    }
  }

  #[tokio::test]
  async fn test_handler_failure_is_swallowed() {
    let counting = Arc::new(CountingHandler {
      seen: Mutex::new(Vec::new()),
    });
    let dispatcher = EventDispatcher::new(vec![Arc::new(FailingHandler), counting.clone()]);

    // must not panic or propagate, and later handlers still run
    dispatcher
      .publish(BillingEvent::InvoiceCreated {
        invoice_id: Uuid::new_v4(),
      })
      .await;

    assert_eq!(counting.seen.lock().unwrap().len(), 1);
  }
}
