use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::auth::Actor;
use crate::domain::billing::{BillingError, BillingService, InvoiceStatus};

#[derive(Debug)]
pub struct IssueInvoiceCommand {
  pub actor: Actor,
  pub invoice_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct IssueInvoiceResponse {
  pub invoice_id: Uuid,
  pub invoice_number: String,
  pub status: InvoiceStatus,
}

pub struct IssueInvoiceUseCase {
  billing_service: Arc<BillingService>,
}

impl IssueInvoiceUseCase {
  pub fn new(billing_service: Arc<BillingService>) -> Self {
    Self { billing_service }
  }

  pub async fn execute(
    &self,
    command: IssueInvoiceCommand,
  ) -> Result<IssueInvoiceResponse, BillingError> {
    let invoice = self
      .billing_service
      .issue_invoice(command.actor, command.invoice_id)
      .await?;

    Ok(IssueInvoiceResponse {
      invoice_id: invoice.id,
      invoice_number: invoice.invoice_number.into_inner(),
      status: invoice.status,
    })
  }
}
