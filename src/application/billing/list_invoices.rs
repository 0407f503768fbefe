use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::auth::Actor;
use crate::domain::billing::{BillingError, BillingService, InvoiceListFilter, InvoiceStatus};

#[derive(Debug)]
pub struct ListInvoicesCommand {
  pub actor: Actor,
  pub status: Option<InvoiceStatus>,
  pub customer_id: Option<Uuid>,
  pub overdue_only: bool,
}

#[derive(Debug, Serialize)]
pub struct InvoiceListItem {
  pub invoice_id: Uuid,
  pub invoice_number: String,
  pub customer_id: Uuid,
  pub status: InvoiceStatus,
  pub issue_date: NaiveDate,
  pub due_date: NaiveDate,
  pub paid_date: Option<NaiveDate>,
  pub total_amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct ListInvoicesResponse {
  pub invoices: Vec<InvoiceListItem>,
}

pub struct ListInvoicesUseCase {
  billing_service: Arc<BillingService>,
}

impl ListInvoicesUseCase {
  pub fn new(billing_service: Arc<BillingService>) -> Self {
    Self { billing_service }
  }

  pub async fn execute(
    &self,
    command: ListInvoicesCommand,
  ) -> Result<ListInvoicesResponse, BillingError> {
    let filter = InvoiceListFilter {
      status: command.status,
      customer_id: command.customer_id,
      overdue_only: command.overdue_only,
    };

    let mut invoices = self
      .billing_service
      .list_invoices(command.actor, filter)
      .await?;

    invoices.sort_by(|a, b| b.issue_date.cmp(&a.issue_date));

    Ok(ListInvoicesResponse {
      invoices: invoices
        .into_iter()
        .map(|invoice| InvoiceListItem {
          invoice_id: invoice.id,
          invoice_number: invoice.invoice_number.into_inner(),
          customer_id: invoice.customer_id,
          status: invoice.status,
          issue_date: invoice.issue_date,
          due_date: invoice.due_date,
          paid_date: invoice.paid_date,
          total_amount: invoice.total_amount,
        })
        .collect(),
    })
  }
}
