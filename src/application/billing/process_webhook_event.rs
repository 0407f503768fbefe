use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::billing::{BillingError, BillingEvent, BillingService, EventPublisher};

/// The slice of a PayPal webhook event body the processor needs. Callers
/// must run the raw request through the signature verifier first.
#[derive(Debug, Deserialize)]
pub struct WebhookEventBody {
  pub event_type: String,
  #[serde(default)]
  pub resource: Option<WebhookResource>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookResource {
  /// Capture id, which is the ledger's transaction id.
  pub id: Option<String>,
}

#[derive(Debug)]
pub struct ProcessWebhookEventCommand {
  pub body: WebhookEventBody,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
  Processed,
  Ignored,
}

pub struct ProcessWebhookEventUseCase {
  billing_service: Arc<BillingService>,
  event_publisher: Arc<dyn EventPublisher>,
}

impl ProcessWebhookEventUseCase {
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
    command: ProcessWebhookEventCommand,
  ) -> Result<WebhookOutcome, BillingError> {
    let event_type = command.body.event_type.as_str();
    let transaction_id = command.body.resource.and_then(|r| r.id);

    let Some(transaction_id) = transaction_id else {
      tracing::warn!(%event_type, "Webhook event without resource id, ignoring");
      return Ok(WebhookOutcome::Ignored);
    };

    match event_type {
      "PAYMENT.CAPTURE.COMPLETED" => {
        let result = self
          .billing_service
          .confirm_payment_by_transaction(&transaction_id)
          .await?;

        if let Some(append) = result {
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
        }
        Ok(WebhookOutcome::Processed)
      }
      "PAYMENT.CAPTURE.DENIED" | "PAYMENT.CAPTURE.DECLINED" => {
        self
          .billing_service
          .fail_payment_by_transaction(&transaction_id)
          .await?;
        Ok(WebhookOutcome::Processed)
      }
      "PAYMENT.CAPTURE.REFUNDED" => {
        self
          .billing_service
          .refund_payment_by_transaction(&transaction_id)
          .await?;
        Ok(WebhookOutcome::Processed)
      }
      other => {
        tracing::info!(event_type = %other, "Unhandled webhook event type");
        Ok(WebhookOutcome::Ignored)
      }
    }
  }
}
