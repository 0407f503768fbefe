use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::auth::Actor;
use crate::domain::billing::{
  BillingError, BillingEvent, BillingService, EventPublisher, InvoiceData, InvoiceStatus,
  ItemDescription, Quantity, TaxRate, UnitPrice,
};
use crate::domain::settings::SettingsService;

/// Regular German VAT rate, applied when the caller does not specify one.
const DEFAULT_TAX_RATE: Decimal = dec!(19);

#[derive(Debug, Deserialize)]
pub struct CreateInvoiceItemDto {
  pub description: String,
  pub quantity: i32,
  pub unit_price: Decimal,
  pub tax_rate: Option<Decimal>,
}

#[derive(Debug)]
pub struct CreateInvoiceCommand {
  pub actor: Actor,
  pub customer_id: Uuid,
  pub invoice_number: Option<String>,
  pub issue_date: NaiveDate,
  pub due_date: NaiveDate,
  pub notes: Option<String>,
  pub items: Vec<CreateInvoiceItemDto>,
  /// Issue right away instead of leaving the invoice in draft.
  pub issue: bool,
}

#[derive(Debug, Serialize)]
pub struct CreateInvoiceResponse {
  pub invoice_id: Uuid,
  pub invoice_number: String,
  pub status: InvoiceStatus,
  pub total_amount: Decimal,
  pub created_at: DateTime<Utc>,
}

pub struct CreateInvoiceUseCase {
  billing_service: Arc<BillingService>,
  settings_service: Arc<SettingsService>,
  event_publisher: Arc<dyn EventPublisher>,
}

impl CreateInvoiceUseCase {
  pub fn new(
    billing_service: Arc<BillingService>,
    settings_service: Arc<SettingsService>,
    event_publisher: Arc<dyn EventPublisher>,
  ) -> Self {
    Self {
      billing_service,
      settings_service,
      event_publisher,
    }
  }

  pub async fn execute(
    &self,
    command: CreateInvoiceCommand,
  ) -> Result<CreateInvoiceResponse, BillingError> {
    let items: Vec<_> = command
      .items
      .into_iter()
      .map(|item| {
        let description = ItemDescription::new(item.description)?;
        let quantity = Quantity::new(item.quantity)?;
        let unit_price = UnitPrice::new(item.unit_price)?;
        let tax_rate = TaxRate::new(item.tax_rate.unwrap_or(DEFAULT_TAX_RATE))?;
        Ok((description, quantity, unit_price, tax_rate))
      })
      .collect::<Result<Vec<_>, BillingError>>()?;

    let tax_ctx = self
      .settings_service
      .tax_context()
      .await
      .map_err(|e| BillingError::Internal(format!("Failed to load tax settings: {}", e)))?;

    let invoice_data = InvoiceData {
      customer_id: command.customer_id,
      invoice_number: command.invoice_number,
      issue_date: command.issue_date,
      due_date: command.due_date,
      notes: command.notes,
      items,
    };

    let (invoice, _items) = self
      .billing_service
      .create_invoice(command.actor, invoice_data, tax_ctx)
      .await?;

    let invoice = if command.issue {
      self
        .billing_service
        .issue_invoice(command.actor, invoice.id)
        .await?
    } else {
      invoice
    };

    // State is committed; notification failures stay in the pipeline.
    self
      .event_publisher
      .publish(BillingEvent::InvoiceCreated {
        invoice_id: invoice.id,
      })
      .await;

    Ok(CreateInvoiceResponse {
      invoice_id: invoice.id,
      invoice_number: invoice.invoice_number.into_inner(),
      status: invoice.status,
      total_amount: invoice.total_amount,
      created_at: invoice.created_at,
    })
  }
}
