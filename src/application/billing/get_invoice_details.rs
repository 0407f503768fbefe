use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::auth::Actor;
use crate::domain::billing::{
  BillingError, BillingService, InvoiceStatus, PaymentMethod, PaymentStatus,
};
use crate::domain::settings::SettingsService;

#[derive(Debug)]
pub struct GetInvoiceDetailsCommand {
  pub actor: Actor,
  pub invoice_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct InvoiceItemDto {
  pub description: String,
  pub quantity: i32,
  pub unit_price: Decimal,
  pub tax_rate: Decimal,
  pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct PaymentDto {
  pub payment_id: Uuid,
  pub amount: Decimal,
  pub payment_method: PaymentMethod,
  pub transaction_id: Option<String>,
  pub status: PaymentStatus,
  pub payment_date: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct TaxLineDto {
  pub rate: Decimal,
  pub base_amount: Decimal,
  pub tax_amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct GetInvoiceDetailsResponse {
  pub invoice_id: Uuid,
  pub invoice_number: String,
  pub customer_id: Uuid,
  pub status: InvoiceStatus,
  pub issue_date: NaiveDate,
  pub due_date: NaiveDate,
  pub paid_date: Option<NaiveDate>,
  pub notes: Option<String>,
  pub items: Vec<InvoiceItemDto>,
  pub payments: Vec<PaymentDto>,
  pub subtotal: Decimal,
  pub tax_lines: Vec<TaxLineDto>,
  pub total_amount: Decimal,
  pub total_paid: Decimal,
  pub remaining_balance: Decimal,
}

pub struct GetInvoiceDetailsUseCase {
  billing_service: Arc<BillingService>,
  settings_service: Arc<SettingsService>,
}

impl GetInvoiceDetailsUseCase {
  pub fn new(
    billing_service: Arc<BillingService>,
    settings_service: Arc<SettingsService>,
  ) -> Self {
    Self {
      billing_service,
      settings_service,
    }
  }

  pub async fn execute(
    &self,
    command: GetInvoiceDetailsCommand,
  ) -> Result<GetInvoiceDetailsResponse, BillingError> {
    let tax_ctx = self
      .settings_service
      .tax_context()
      .await
      .map_err(|e| BillingError::Internal(format!("Failed to load tax settings: {}", e)))?;

    let details = self
      .billing_service
      .get_invoice_details(command.actor, command.invoice_id, tax_ctx)
      .await?;

    Ok(GetInvoiceDetailsResponse {
      invoice_id: details.invoice.id,
      invoice_number: details.invoice.invoice_number.value().to_string(),
      customer_id: details.invoice.customer_id,
      status: details.invoice.status,
      issue_date: details.invoice.issue_date,
      due_date: details.invoice.due_date,
      paid_date: details.invoice.paid_date,
      notes: details.invoice.notes.clone(),
      items: details
        .items
        .into_iter()
        .map(|item| InvoiceItemDto {
          description: item.description.value().to_string(),
          quantity: item.quantity.value(),
          unit_price: item.unit_price.value(),
          tax_rate: item.tax_rate.value(),
          amount: item.amount,
        })
        .collect(),
      payments: details
        .payments
        .into_iter()
        .map(|payment| PaymentDto {
          payment_id: payment.id,
          amount: payment.amount,
          payment_method: payment.payment_method,
          transaction_id: payment.transaction_id,
          status: payment.status,
          payment_date: payment.payment_date,
        })
        .collect(),
      subtotal: details.totals.subtotal,
      tax_lines: details
        .totals
        .tax_lines
        .into_iter()
        .map(|line| TaxLineDto {
          rate: line.rate.value(),
          base_amount: line.base_amount,
          tax_amount: line.tax_amount,
        })
        .collect(),
      total_amount: details.invoice.total_amount,
      total_paid: details.total_paid,
      remaining_balance: details.remaining_balance,
    })
  }
}
