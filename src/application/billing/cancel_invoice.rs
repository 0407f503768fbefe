use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::auth::Actor;
use crate::domain::billing::{BillingError, BillingService, InvoiceStatus};

#[derive(Debug)]
pub struct CancelInvoiceCommand {
  pub actor: Actor,
  pub invoice_id: Uuid,
  pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CancelInvoiceResponse {
  pub invoice_id: Uuid,
  pub status: InvoiceStatus,
}

pub struct CancelInvoiceUseCase {
  billing_service: Arc<BillingService>,
}

impl CancelInvoiceUseCase {
  pub fn new(billing_service: Arc<BillingService>) -> Self {
    Self { billing_service }
  }

  pub async fn execute(
    &self,
    command: CancelInvoiceCommand,
  ) -> Result<CancelInvoiceResponse, BillingError> {
    let invoice = self
      .billing_service
      .cancel_invoice(command.actor, command.invoice_id, command.reason)
      .await?;

    Ok(CancelInvoiceResponse {
      invoice_id: invoice.id,
      status: invoice.status,
    })
  }
}
