use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::auth::Actor;

use super::entities::{Invoice, InvoiceItem, Payment};
use super::errors::BillingError;
use super::ports::{
  CustomerRepository, InvoiceItemRepository, InvoiceRepository, LedgerAppend, PaymentGateway,
  PaymentLedger,
};
use super::tax::{self, InvoiceTotals, TaxContext};
use super::value_objects::{
  InvoiceNumber, InvoiceStatus, ItemDescription, PaymentMethod, PaymentStatus, Quantity, TaxRate,
  UnitPrice, ValueObjectError,
};

/// How often number generation retries after losing a uniqueness race.
const NUMBER_RETRY_ATTEMPTS: u32 = 3;

/// Invoice creation data
pub struct InvoiceData {
  pub customer_id: Uuid,
  /// Caller-supplied number, e.g. for imported invoices. Generated when
  /// absent.
  pub invoice_number: Option<String>,
  pub issue_date: NaiveDate,
  pub due_date: NaiveDate,
  pub notes: Option<String>,
  pub items: Vec<(ItemDescription, Quantity, UnitPrice, TaxRate)>,
}

/// Invoice with everything needed to render it
pub struct InvoiceDetails {
  pub invoice: Invoice,
  pub items: Vec<InvoiceItem>,
  pub payments: Vec<Payment>,
  pub totals: InvoiceTotals,
  pub total_paid: Decimal,
  pub remaining_balance: Decimal,
}

#[derive(Debug, Clone, Default)]
pub struct InvoiceListFilter {
  pub status: Option<InvoiceStatus>,
  pub customer_id: Option<Uuid>,
  pub overdue_only: bool,
}

pub struct BillingServiceDependencies {
  pub invoice_repo: Arc<dyn InvoiceRepository>,
  pub item_repo: Arc<dyn InvoiceItemRepository>,
  pub customer_repo: Arc<dyn CustomerRepository>,
  pub ledger: Arc<dyn PaymentLedger>,
  pub gateway: Arc<dyn PaymentGateway>,
}

/// Billing domain service: owns the invoice lifecycle, the payment ledger
/// projections and the gateway orchestration. All mutations go through the
/// aggregate's own methods so status invariants hold everywhere.
pub struct BillingService {
  invoice_repo: Arc<dyn InvoiceRepository>,
  item_repo: Arc<dyn InvoiceItemRepository>,
  customer_repo: Arc<dyn CustomerRepository>,
  ledger: Arc<dyn PaymentLedger>,
  gateway: Arc<dyn PaymentGateway>,
}

impl BillingService {
  pub fn new(deps: BillingServiceDependencies) -> Self {
    Self {
      invoice_repo: deps.invoice_repo,
      item_repo: deps.item_repo,
      customer_repo: deps.customer_repo,
      ledger: deps.ledger,
      gateway: deps.gateway,
    }
  }

  // Invoice lifecycle

  pub async fn create_invoice(
    &self,
    actor: Actor,
    mut data: InvoiceData,
    tax_ctx: TaxContext,
  ) -> Result<(Invoice, Vec<InvoiceItem>), BillingError> {
    require_staff(&actor)?;

    self
      .customer_repo
      .find_by_id(data.customer_id)
      .await?
      .ok_or(BillingError::CustomerNotFound(data.customer_id))?;

    if data.items.is_empty() {
      return Err(BillingError::NoItems);
    }
    if data.due_date < data.issue_date {
      return Err(BillingError::Validation(ValueObjectError::InvalidDateRange(
        "Due date cannot be before the issue date".to_string(),
      )));
    }

    if let Some(number) = data.invoice_number.take() {
      let invoice_number = InvoiceNumber::new(number)?;
      let (invoice, items) = build_invoice(&data, invoice_number, tax_ctx);
      return self.invoice_repo.create_with_items(invoice, items).await;
    }

    // Generated numbers can race between concurrent creations; the unique
    // index decides and we retry with a fresh sequence.
    let mut attempt = 0;
    loop {
      let invoice_number = self.next_invoice_number(data.issue_date).await?;
      let (invoice, items) = build_invoice(&data, invoice_number, tax_ctx);

      match self.invoice_repo.create_with_items(invoice, items).await {
        Err(BillingError::InvoiceNumberConflict(number)) => {
          attempt += 1;
          if attempt >= NUMBER_RETRY_ATTEMPTS {
            tracing::error!(%number, "Invoice number generation exhausted retries");
            return Err(BillingError::InvoiceNumberConflict(number));
          }
          tracing::warn!(%number, attempt, "Invoice number collision, regenerating");
        }
        other => return other,
      }
    }
  }

  /// Next number in the `R-{year}-{seq}` sequence for the issue year.
  async fn next_invoice_number(&self, issue_date: NaiveDate) -> Result<InvoiceNumber, BillingError> {
    let prefix = format!("R-{}-", issue_date.year());
    let last = self.invoice_repo.last_number_with_prefix(&prefix).await?;

    let next_seq = match last {
      Some(number) => number
        .strip_prefix(&prefix)
        .and_then(|seq| seq.parse::<u32>().ok())
        .map(|seq| seq + 1)
        .unwrap_or(1),
      None => 1,
    };

    Ok(InvoiceNumber::new(format!("{}{:04}", prefix, next_seq))?)
  }

  pub async fn issue_invoice(&self, actor: Actor, invoice_id: Uuid) -> Result<Invoice, BillingError> {
    require_staff(&actor)?;

    let mut invoice = self.get_invoice_entity(invoice_id).await?;
    let items = self.item_repo.find_by_invoice_id(invoice_id).await?;

    invoice.issue(items.len())?;
    self.invoice_repo.update(invoice).await
  }

  pub async fn cancel_invoice(
    &self,
    actor: Actor,
    invoice_id: Uuid,
    reason: Option<String>,
  ) -> Result<Invoice, BillingError> {
    require_admin(&actor)?;

    let mut invoice = self.get_invoice_entity(invoice_id).await?;
    invoice.cancel()?;

    if let Some(reason) = reason {
      invoice.notes = match invoice.notes.take() {
        Some(notes) => Some(format!("{}\nCancelled: {}", notes, reason)),
        None => Some(format!("Cancelled: {}", reason)),
      };
    }

    self.invoice_repo.update(invoice).await
  }

  /// Deletes a draft. Issued invoices are immutable history; drafts with
  /// completed payments cannot exist, but the ledger is checked anyway.
  pub async fn delete_invoice(&self, actor: Actor, invoice_id: Uuid) -> Result<(), BillingError> {
    require_admin(&actor)?;

    let invoice = self.get_invoice_entity(invoice_id).await?;
    if !invoice.is_deletable() {
      return Err(BillingError::invalid_state(invoice.status, "delete"));
    }

    let total_paid = self.ledger.sum_completed(invoice_id).await?;
    if total_paid > Decimal::ZERO {
      return Err(BillingError::invalid_state(invoice.status, "delete"));
    }

    self.invoice_repo.delete_with_items(invoice_id).await
  }

  // Payments

  /// Records a manual payment (cash, bank transfer) against an issued
  /// invoice.
  pub async fn record_payment(
    &self,
    actor: Actor,
    invoice_id: Uuid,
    amount: Decimal,
    method: PaymentMethod,
    transaction_id: Option<String>,
  ) -> Result<LedgerAppend, BillingError> {
    require_admin(&actor)?;

    let invoice = self.get_invoice_entity(invoice_id).await?;
    if !invoice.accepts_payments() {
      return Err(BillingError::invalid_state(invoice.status, "record payment"));
    }

    let payment = Payment::completed(invoice_id, amount, method, transaction_id)?;
    let append = self.ledger.append(payment, invoice).await?;

    tracing::info!(
      invoice_id = %invoice_id,
      payment_id = %append.payment.id,
      amount = %append.payment.amount,
      settled = append.newly_settled,
      "Payment recorded"
    );

    Ok(append)
  }

  /// Settles the remaining balance with one manual payment.
  pub async fn mark_invoice_paid(
    &self,
    actor: Actor,
    invoice_id: Uuid,
    method: PaymentMethod,
  ) -> Result<LedgerAppend, BillingError> {
    require_admin(&actor)?;

    let invoice = self.get_invoice_entity(invoice_id).await?;
    if invoice.status == InvoiceStatus::Paid {
      return Err(BillingError::invalid_state(invoice.status, "mark paid"));
    }
    if !invoice.accepts_payments() {
      return Err(BillingError::invalid_state(invoice.status, "mark paid"));
    }

    let total_paid = self.ledger.sum_completed(invoice_id).await?;
    let remaining = invoice.remaining_balance(total_paid);

    let payment = Payment::completed(invoice_id, remaining, method, None)?;
    self.ledger.append(payment, invoice).await
  }

  // Gateway orchestration

  /// Creates a gateway order over the remaining balance. No state changes:
  /// the ledger only moves on capture.
  pub async fn create_gateway_order(
    &self,
    actor: Actor,
    invoice_id: Uuid,
  ) -> Result<super::ports::GatewayOrder, BillingError> {
    let invoice = self.get_invoice_entity(invoice_id).await?;
    self.require_invoice_access(&actor, &invoice).await?;

    match invoice.status {
      InvoiceStatus::Paid => {
        return Err(BillingError::invalid_state(invoice.status, "create order"));
      }
      InvoiceStatus::Cancelled | InvoiceStatus::Draft => {
        return Err(BillingError::invalid_state(invoice.status, "create order"));
      }
      _ => {}
    }

    let total_paid = self.ledger.sum_completed(invoice_id).await?;
    let remaining = invoice.remaining_balance(total_paid);
    if remaining <= Decimal::ZERO {
      return Err(BillingError::invalid_state(invoice.status, "create order"));
    }

    let order = self
      .gateway
      .create_order(invoice.invoice_number.value(), remaining)
      .await?;

    tracing::info!(
      invoice_id = %invoice_id,
      order_id = %order.order_id,
      amount = %remaining,
      "Gateway order created"
    );

    Ok(order)
  }

  /// Captures a previously approved gateway order and credits the ledger.
  ///
  /// Capturing the same order twice cannot double-credit: the ledger's
  /// `(method, transaction_id)` uniqueness turns the second append into a
  /// duplicate, which is resolved to the already-recorded payment.
  pub async fn capture_gateway_order(
    &self,
    actor: Actor,
    invoice_id: Uuid,
    order_id: &str,
  ) -> Result<LedgerAppend, BillingError> {
    let invoice = self.get_invoice_entity(invoice_id).await?;
    self.require_invoice_access(&actor, &invoice).await?;

    let capture = self.gateway.capture_order(order_id).await?;

    if !capture.completed {
      // Preserve the audit trail before surfacing the failure.
      let failed = Payment::failed(
        invoice_id,
        capture.amount,
        PaymentMethod::PayPal,
        Some(capture.transaction_id.clone()),
      )?;
      if let Err(e) = self.ledger.append(failed, invoice).await {
        tracing::error!(
          invoice_id = %invoice_id,
          order_id = %order_id,
          error = %e,
          "Failed to record failed capture"
        );
      }
      tracing::warn!(
        invoice_id = %invoice_id,
        order_id = %order_id,
        transaction_id = %capture.transaction_id,
        status = %capture.status,
        "Gateway reported capture failure"
      );
      return Err(BillingError::PaymentFailed(capture.status));
    }

    let payment = Payment::completed(
      invoice_id,
      capture.amount,
      PaymentMethod::PayPal,
      Some(capture.transaction_id.clone()),
    )?;

    match self.ledger.append(payment, invoice).await {
      Ok(append) => {
        tracing::info!(
          invoice_id = %invoice_id,
          order_id = %order_id,
          transaction_id = %capture.transaction_id,
          amount = %capture.amount,
          settled = append.newly_settled,
          "Gateway payment captured"
        );
        Ok(append)
      }
      Err(BillingError::DuplicateTransaction { method, transaction_id }) => {
        // Already processed: a concurrent capture or a webhook got there
        // first. Resolve to the existing entry.
        let existing = self
          .ledger
          .find_by_transaction(method, &transaction_id)
          .await?
          .ok_or_else(|| {
            BillingError::Internal(format!(
              "Duplicate transaction {} has no ledger entry",
              transaction_id
            ))
          })?;

        let invoice = self.get_invoice_entity(invoice_id).await?;
        let total_paid = self.ledger.sum_completed(invoice_id).await?;

        tracing::info!(
          invoice_id = %invoice_id,
          transaction_id = %transaction_id,
          "Capture already processed, returning existing payment"
        );

        Ok(LedgerAppend {
          payment: existing,
          invoice,
          total_paid,
          newly_settled: false,
        })
      }
      Err(e) => Err(e),
    }
  }

  pub async fn gateway_order_status(
    &self,
    actor: Actor,
    invoice_id: Uuid,
    order_id: &str,
  ) -> Result<super::ports::GatewayOrder, BillingError> {
    let invoice = self.get_invoice_entity(invoice_id).await?;
    self.require_invoice_access(&actor, &invoice).await?;
    self.gateway.get_order(order_id).await
  }

  // Webhook-driven status updates. Callers must have verified the webhook
  // signature first.

  pub async fn confirm_payment_by_transaction(
    &self,
    transaction_id: &str,
  ) -> Result<Option<LedgerAppend>, BillingError> {
    let Some(mut payment) = self
      .ledger
      .find_by_transaction(PaymentMethod::PayPal, transaction_id)
      .await?
    else {
      tracing::info!(%transaction_id, "Webhook for unknown transaction, ignoring");
      return Ok(None);
    };

    if payment.status == PaymentStatus::Completed {
      return Ok(None);
    }

    payment.status = PaymentStatus::Completed;
    let payment = self.ledger.update_status(payment).await?;

    let mut invoice = self.get_invoice_entity(payment.invoice_id).await?;
    let total_paid = self.ledger.sum_completed(payment.invoice_id).await?;
    let newly_settled = invoice.apply_ledger_total(total_paid, Utc::now().date_naive())?;
    let invoice = self.invoice_repo.update(invoice).await?;

    tracing::info!(
      invoice_id = %invoice.id,
      %transaction_id,
      settled = newly_settled,
      "Payment confirmed via webhook"
    );

    Ok(Some(LedgerAppend {
      payment,
      invoice,
      total_paid,
      newly_settled,
    }))
  }

  pub async fn fail_payment_by_transaction(
    &self,
    transaction_id: &str,
  ) -> Result<(), BillingError> {
    let Some(mut payment) = self
      .ledger
      .find_by_transaction(PaymentMethod::PayPal, transaction_id)
      .await?
    else {
      tracing::info!(%transaction_id, "Webhook for unknown transaction, ignoring");
      return Ok(());
    };

    if payment.status == PaymentStatus::Failed {
      return Ok(());
    }

    payment.status = PaymentStatus::Failed;
    self.ledger.update_status(payment).await?;
    tracing::warn!(%transaction_id, "Payment marked as failed via webhook");
    Ok(())
  }

  /// A refund takes the funds back out: the payment stops counting toward
  /// the balance and a settled invoice reopens.
  pub async fn refund_payment_by_transaction(
    &self,
    transaction_id: &str,
  ) -> Result<(), BillingError> {
    let Some(mut payment) = self
      .ledger
      .find_by_transaction(PaymentMethod::PayPal, transaction_id)
      .await?
    else {
      tracing::info!(%transaction_id, "Webhook for unknown transaction, ignoring");
      return Ok(());
    };

    if payment.status == PaymentStatus::Refunded {
      return Ok(());
    }

    payment.status = PaymentStatus::Refunded;
    let payment = self.ledger.update_status(payment).await?;

    let mut invoice = self.get_invoice_entity(payment.invoice_id).await?;
    if invoice.status == InvoiceStatus::Paid {
      invoice.reopen();
      self.invoice_repo.update(invoice).await?;
    }

    tracing::info!(%transaction_id, "Payment refunded via webhook");
    Ok(())
  }

  // Queries

  pub async fn get_invoice_details(
    &self,
    actor: Actor,
    invoice_id: Uuid,
    tax_ctx: TaxContext,
  ) -> Result<InvoiceDetails, BillingError> {
    let invoice = self.get_invoice_entity(invoice_id).await?;
    self.require_invoice_access(&actor, &invoice).await?;

    let items = self.item_repo.find_by_invoice_id(invoice_id).await?;
    let payments = self.ledger.find_by_invoice_id(invoice_id).await?;
    let totals = tax::invoice_totals(&items, tax_ctx);
    let total_paid = self.ledger.sum_completed(invoice_id).await?;
    let remaining_balance = invoice.remaining_balance(total_paid);

    Ok(InvoiceDetails {
      invoice,
      items,
      payments,
      totals,
      total_paid,
      remaining_balance,
    })
  }

  pub async fn list_invoices(
    &self,
    actor: Actor,
    filter: InvoiceListFilter,
  ) -> Result<Vec<Invoice>, BillingError> {
    use crate::domain::auth::Role;

    let mut invoices = match actor.role {
      Role::Admin => match (filter.status, filter.customer_id) {
        (Some(status), _) => self.invoice_repo.find_by_status(status).await?,
        (None, Some(customer_id)) => self.invoice_repo.find_by_customer_id(customer_id).await?,
        (None, None) => self.invoice_repo.find_all().await?,
      },
      Role::Trainer => self.invoice_repo.find_by_trainer_id(actor.user_id).await?,
      Role::Customer => {
        let Some(customer) = self.customer_repo.find_by_user_id(actor.user_id).await? else {
          return Ok(Vec::new());
        };
        self.invoice_repo.find_by_customer_id(customer.id).await?
      }
    };

    if actor.role != crate::domain::auth::Role::Admin {
      if let Some(status) = filter.status {
        invoices.retain(|i| i.status == status);
      }
      if let Some(customer_id) = filter.customer_id {
        invoices.retain(|i| i.customer_id == customer_id);
      }
    }

    if filter.overdue_only {
      let today = Utc::now().date_naive();
      invoices.retain(|i| i.is_overdue(today));
    }

    Ok(invoices)
  }

  /// Scheduled sweep: flips open invoices past their due date to overdue.
  /// Idempotent; one invoice failing does not stop the rest.
  pub async fn mark_overdue_invoices(&self, as_of: NaiveDate) -> Result<Vec<Invoice>, BillingError> {
    let candidates = self.invoice_repo.find_due_for_overdue(as_of).await?;

    let mut updated = Vec::new();
    for mut invoice in candidates {
      match invoice.mark_overdue(as_of) {
        Ok(true) => match self.invoice_repo.update(invoice).await {
          Ok(invoice) => updated.push(invoice),
          Err(e) => {
            tracing::error!(error = %e, "Failed to persist overdue transition");
          }
        },
        Ok(false) => {}
        Err(e) => {
          tracing::error!(invoice_id = %invoice.id, error = %e, "Overdue transition rejected");
        }
      }
    }

    Ok(updated)
  }

  // Helpers

  async fn get_invoice_entity(&self, invoice_id: Uuid) -> Result<Invoice, BillingError> {
    self
      .invoice_repo
      .find_by_id(invoice_id)
      .await?
      .ok_or(BillingError::InvoiceNotFound(invoice_id))
  }

  /// Admins see everything, trainers their assigned customers' invoices,
  /// customers only their own.
  async fn require_invoice_access(
    &self,
    actor: &Actor,
    invoice: &Invoice,
  ) -> Result<(), BillingError> {
    use crate::domain::auth::Role;

    match actor.role {
      Role::Admin => Ok(()),
      Role::Trainer => {
        let customer = self
          .customer_repo
          .find_by_id(invoice.customer_id)
          .await?
          .ok_or(BillingError::CustomerNotFound(invoice.customer_id))?;
        if customer.is_assigned_to(actor.user_id) {
          Ok(())
        } else {
          Err(BillingError::PermissionDenied(
            "Invoice belongs to another trainer's customer".to_string(),
          ))
        }
      }
      Role::Customer => {
        let customer = self
          .customer_repo
          .find_by_id(invoice.customer_id)
          .await?
          .ok_or(BillingError::CustomerNotFound(invoice.customer_id))?;
        if customer.user_id == actor.user_id {
          Ok(())
        } else {
          Err(BillingError::PermissionDenied(
            "Invoice belongs to another customer".to_string(),
          ))
        }
      }
    }
  }
}

/// Builds the invoice and its items from validated creation data. The total
/// is fixed from the items under the given tax context; item amounts stay
/// net.
fn build_invoice(
  data: &InvoiceData,
  invoice_number: InvoiceNumber,
  tax_ctx: TaxContext,
) -> (Invoice, Vec<InvoiceItem>) {
  let mut items: Vec<InvoiceItem> = data
    .items
    .iter()
    .enumerate()
    .map(|(i, (description, quantity, unit_price, tax_rate))| {
      InvoiceItem::new(
        Uuid::nil(),
        description.clone(),
        *quantity,
        *unit_price,
        *tax_rate,
        (i + 1) as i32,
      )
    })
    .collect();

  let totals = tax::invoice_totals(&items, tax_ctx);

  let invoice = Invoice::new(
    data.customer_id,
    invoice_number,
    data.issue_date,
    data.due_date,
    totals.total,
    data.notes.clone(),
  );

  for item in &mut items {
    item.invoice_id = invoice.id;
  }

  (invoice, items)
}

fn require_staff(actor: &Actor) -> Result<(), BillingError> {
  if actor.is_staff() {
    Ok(())
  } else {
    Err(BillingError::PermissionDenied(
      "Staff role required".to_string(),
    ))
  }
}

fn require_admin(actor: &Actor) -> Result<(), BillingError> {
  if actor.is_admin() {
    Ok(())
  } else {
    Err(BillingError::PermissionDenied(
      "Admin role required".to_string(),
    ))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::auth::Role;
  use crate::domain::billing::entities::Customer;
  use crate::domain::billing::ports::{GatewayCapture, GatewayLink, GatewayOrder};
  use async_trait::async_trait;
  use rust_decimal_macros::dec;
  use std::collections::HashMap;
  use std::sync::Mutex;

  // In-memory fakes. The postgres implementations carry the same semantics,
  // including the (method, transaction_id) uniqueness.

  #[derive(Default)]
  struct InMemoryStore {
    invoices: Mutex<HashMap<Uuid, Invoice>>,
    items: Mutex<HashMap<Uuid, Vec<InvoiceItem>>>,
    payments: Mutex<Vec<Payment>>,
    customers: Mutex<HashMap<Uuid, Customer>>,
  }

  struct InMemoryInvoices(Arc<InMemoryStore>);
  struct InMemoryItems(Arc<InMemoryStore>);
  struct InMemoryCustomers(Arc<InMemoryStore>);
  struct InMemoryLedger(Arc<InMemoryStore>);

  #[async_trait]
  impl InvoiceRepository for InMemoryInvoices {
    async fn create_with_items(
      &self,
      invoice: Invoice,
      items: Vec<InvoiceItem>,
    ) -> Result<(Invoice, Vec<InvoiceItem>), BillingError> {
      let mut invoices = self.0.invoices.lock().unwrap();
      if invoices
        .values()
        .any(|i| i.invoice_number == invoice.invoice_number)
      {
        return Err(BillingError::InvoiceNumberConflict(
          invoice.invoice_number.value().to_string(),
        ));
      }
      invoices.insert(invoice.id, invoice.clone());
      self.0.items.lock().unwrap().insert(invoice.id, items.clone());
      Ok((invoice, items))
    }

    async fn update(&self, invoice: Invoice) -> Result<Invoice, BillingError> {
      self
        .0
        .invoices
        .lock()
        .unwrap()
        .insert(invoice.id, invoice.clone());
      Ok(invoice)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Invoice>, BillingError> {
      Ok(self.0.invoices.lock().unwrap().get(&id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Invoice>, BillingError> {
      Ok(self.0.invoices.lock().unwrap().values().cloned().collect())
    }

    async fn find_by_status(&self, status: InvoiceStatus) -> Result<Vec<Invoice>, BillingError> {
      Ok(
        self
          .0
          .invoices
          .lock()
          .unwrap()
          .values()
          .filter(|i| i.status == status)
          .cloned()
          .collect(),
      )
    }

    async fn find_by_customer_id(&self, customer_id: Uuid) -> Result<Vec<Invoice>, BillingError> {
      Ok(
        self
          .0
          .invoices
          .lock()
          .unwrap()
          .values()
          .filter(|i| i.customer_id == customer_id)
          .cloned()
          .collect(),
      )
    }

    async fn find_by_trainer_id(&self, trainer_id: Uuid) -> Result<Vec<Invoice>, BillingError> {
      let customers = self.0.customers.lock().unwrap();
      let customer_ids: Vec<Uuid> = customers
        .values()
        .filter(|c| c.trainer_id == Some(trainer_id))
        .map(|c| c.id)
        .collect();
      Ok(
        self
          .0
          .invoices
          .lock()
          .unwrap()
          .values()
          .filter(|i| customer_ids.contains(&i.customer_id))
          .cloned()
          .collect(),
      )
    }

    async fn find_due_for_overdue(&self, as_of: NaiveDate) -> Result<Vec<Invoice>, BillingError> {
      Ok(
        self
          .0
          .invoices
          .lock()
          .unwrap()
          .values()
          .filter(|i| i.status == InvoiceStatus::Open && i.due_date < as_of)
          .cloned()
          .collect(),
      )
    }

    async fn find_outstanding_due_before(
      &self,
      cutoff: NaiveDate,
    ) -> Result<Vec<Invoice>, BillingError> {
      Ok(
        self
          .0
          .invoices
          .lock()
          .unwrap()
          .values()
          .filter(|i| i.status.is_outstanding() && i.due_date < cutoff)
          .cloned()
          .collect(),
      )
    }

    async fn last_number_with_prefix(
      &self,
      prefix: &str,
    ) -> Result<Option<String>, BillingError> {
      Ok(
        self
          .0
          .invoices
          .lock()
          .unwrap()
          .values()
          .map(|i| i.invoice_number.value().to_string())
          .filter(|n| n.starts_with(prefix))
          .max(),
      )
    }

    async fn delete_with_items(&self, id: Uuid) -> Result<(), BillingError> {
      self.0.invoices.lock().unwrap().remove(&id);
      self.0.items.lock().unwrap().remove(&id);
      Ok(())
    }
  }

  #[async_trait]
  impl InvoiceItemRepository for InMemoryItems {
    async fn find_by_invoice_id(
      &self,
      invoice_id: Uuid,
    ) -> Result<Vec<InvoiceItem>, BillingError> {
      Ok(
        self
          .0
          .items
          .lock()
          .unwrap()
          .get(&invoice_id)
          .cloned()
          .unwrap_or_default(),
      )
    }
  }

  #[async_trait]
  impl CustomerRepository for InMemoryCustomers {
    async fn create(&self, customer: Customer) -> Result<Customer, BillingError> {
      self
        .0
        .customers
        .lock()
        .unwrap()
        .insert(customer.id, customer.clone());
      Ok(customer)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Customer>, BillingError> {
      Ok(self.0.customers.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<Customer>, BillingError> {
      Ok(
        self
          .0
          .customers
          .lock()
          .unwrap()
          .values()
          .find(|c| c.user_id == user_id)
          .cloned(),
      )
    }
  }

  #[async_trait]
  impl PaymentLedger for InMemoryLedger {
    async fn append(
      &self,
      payment: Payment,
      mut invoice: Invoice,
    ) -> Result<LedgerAppend, BillingError> {
      {
        let payments = self.0.payments.lock().unwrap();
        if let Some(transaction_id) = &payment.transaction_id {
          if payments.iter().any(|p| {
            p.payment_method == payment.payment_method
              && p.transaction_id.as_deref() == Some(transaction_id)
          }) {
            return Err(BillingError::DuplicateTransaction {
              method: payment.payment_method,
              transaction_id: transaction_id.clone(),
            });
          }
        }
      }
      self.0.payments.lock().unwrap().push(payment.clone());

      let total_paid = self.sum_completed(invoice.id).await?;
      let newly_settled = invoice.apply_ledger_total(total_paid, Utc::now().date_naive())?;
      self
        .0
        .invoices
        .lock()
        .unwrap()
        .insert(invoice.id, invoice.clone());

      Ok(LedgerAppend {
        payment,
        invoice,
        total_paid,
        newly_settled,
      })
    }

    async fn sum_completed(&self, invoice_id: Uuid) -> Result<Decimal, BillingError> {
      Ok(
        self
          .0
          .payments
          .lock()
          .unwrap()
          .iter()
          .filter(|p| p.invoice_id == invoice_id && p.is_completed())
          .map(|p| p.amount)
          .sum(),
      )
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>, BillingError> {
      Ok(
        self
          .0
          .payments
          .lock()
          .unwrap()
          .iter()
          .find(|p| p.id == id)
          .cloned(),
      )
    }

    async fn find_all(&self) -> Result<Vec<Payment>, BillingError> {
      Ok(self.0.payments.lock().unwrap().clone())
    }

    async fn find_by_invoice_id(&self, invoice_id: Uuid) -> Result<Vec<Payment>, BillingError> {
      Ok(
        self
          .0
          .payments
          .lock()
          .unwrap()
          .iter()
          .filter(|p| p.invoice_id == invoice_id)
          .cloned()
          .collect(),
      )
    }

    async fn find_by_transaction(
      &self,
      method: PaymentMethod,
      transaction_id: &str,
    ) -> Result<Option<Payment>, BillingError> {
      Ok(
        self
          .0
          .payments
          .lock()
          .unwrap()
          .iter()
          .find(|p| {
            p.payment_method == method && p.transaction_id.as_deref() == Some(transaction_id)
          })
          .cloned(),
      )
    }

    async fn update_status(&self, payment: Payment) -> Result<Payment, BillingError> {
      let mut payments = self.0.payments.lock().unwrap();
      let entry = payments
        .iter_mut()
        .find(|p| p.id == payment.id)
        .ok_or(BillingError::PaymentNotFound(payment.id))?;
      entry.status = payment.status;
      Ok(entry.clone())
    }
  }

  struct FakeGateway {
    captures: Mutex<HashMap<String, GatewayCapture>>,
  }

  impl FakeGateway {
    fn new() -> Self {
      Self {
        captures: Mutex::new(HashMap::new()),
      }
    }

    fn with_capture(self, order_id: &str, capture: GatewayCapture) -> Self {
      self
        .captures
        .lock()
        .unwrap()
        .insert(order_id.to_string(), capture);
      self
    }
  }

  #[async_trait]
  impl PaymentGateway for FakeGateway {
    async fn create_order(
      &self,
      invoice_number: &str,
      amount: Decimal,
    ) -> Result<GatewayOrder, BillingError> {
      Ok(GatewayOrder {
        order_id: format!("ORDER-{}-{}", invoice_number, amount),
        status: "CREATED".to_string(),
        links: vec![GatewayLink {
          href: "https://www.sandbox.paypal.com/checkoutnow?token=x".to_string(),
          rel: "approve".to_string(),
          method: Some("GET".to_string()),
        }],
      })
    }

    async fn capture_order(&self, order_id: &str) -> Result<GatewayCapture, BillingError> {
      self
        .captures
        .lock()
        .unwrap()
        .get(order_id)
        .cloned()
        .ok_or_else(|| BillingError::Gateway(format!("Unknown order {}", order_id)))
    }

    async fn get_order(&self, order_id: &str) -> Result<GatewayOrder, BillingError> {
      Ok(GatewayOrder {
        order_id: order_id.to_string(),
        status: "COMPLETED".to_string(),
        links: Vec::new(),
      })
    }
  }

  fn service_with_gateway(gateway: FakeGateway) -> (BillingService, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::default());
    let service = BillingService::new(BillingServiceDependencies {
      invoice_repo: Arc::new(InMemoryInvoices(store.clone())),
      item_repo: Arc::new(InMemoryItems(store.clone())),
      customer_repo: Arc::new(InMemoryCustomers(store.clone())),
      ledger: Arc::new(InMemoryLedger(store.clone())),
      gateway: Arc::new(gateway),
    });
    (service, store)
  }

  fn service() -> (BillingService, Arc<InMemoryStore>) {
    service_with_gateway(FakeGateway::new())
  }

  fn admin() -> Actor {
    Actor::new(Uuid::new_v4(), Role::Admin)
  }

  async fn seed_customer(store: &InMemoryStore) -> Customer {
    let customer = Customer::new(Uuid::new_v4(), None);
    store
      .customers
      .lock()
      .unwrap()
      .insert(customer.id, customer.clone());
    customer
  }

  fn training_invoice(customer_id: Uuid) -> InvoiceData {
    InvoiceData {
      customer_id,
      invoice_number: None,
      issue_date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
      due_date: NaiveDate::from_ymd_opt(2026, 2, 15).unwrap(),
      notes: None,
      items: vec![(
        ItemDescription::new("Einzeltraining".to_string()).unwrap(),
        Quantity::new(5).unwrap(),
        UnitPrice::new(dec!(50.00)).unwrap(),
        TaxRate::new(dec!(19)).unwrap(),
      )],
    }
  }

  #[tokio::test]
  async fn test_create_invoice_computes_total_with_tax() {
    let (service, store) = service();
    let customer = seed_customer(&store).await;

    let (invoice, items) = service
      .create_invoice(admin(), training_invoice(customer.id), TaxContext::default())
      .await
      .unwrap();

    assert_eq!(invoice.total_amount, dec!(297.50));
    assert_eq!(invoice.status, InvoiceStatus::Draft);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].amount, dec!(250.00));
    assert_eq!(invoice.invoice_number.value(), "R-2026-0001");
  }

  #[tokio::test]
  async fn test_create_invoice_small_business_skips_tax() {
    let (service, store) = service();
    let customer = seed_customer(&store).await;

    let (invoice, _) = service
      .create_invoice(
        admin(),
        training_invoice(customer.id),
        TaxContext::small_business(),
      )
      .await
      .unwrap();

    assert_eq!(invoice.total_amount, dec!(250.00));
  }

  #[tokio::test]
  async fn test_invoice_numbers_increment() {
    let (service, store) = service();
    let customer = seed_customer(&store).await;

    let (first, _) = service
      .create_invoice(admin(), training_invoice(customer.id), TaxContext::default())
      .await
      .unwrap();
    let (second, _) = service
      .create_invoice(admin(), training_invoice(customer.id), TaxContext::default())
      .await
      .unwrap();

    assert_eq!(first.invoice_number.value(), "R-2026-0001");
    assert_eq!(second.invoice_number.value(), "R-2026-0002");
  }

  #[tokio::test]
  async fn test_customer_cannot_create_invoice() {
    let (service, store) = service();
    let customer = seed_customer(&store).await;
    let actor = Actor::new(Uuid::new_v4(), Role::Customer);

    let result = service
      .create_invoice(actor, training_invoice(customer.id), TaxContext::default())
      .await;

    assert!(matches!(result, Err(BillingError::PermissionDenied(_))));
  }

  #[tokio::test]
  async fn test_record_payment_settles_invoice() {
    let (service, store) = service();
    let customer = seed_customer(&store).await;

    let (invoice, _) = service
      .create_invoice(admin(), training_invoice(customer.id), TaxContext::default())
      .await
      .unwrap();
    service.issue_invoice(admin(), invoice.id).await.unwrap();

    let append = service
      .record_payment(
        admin(),
        invoice.id,
        dec!(297.50),
        PaymentMethod::BankTransfer,
        None,
      )
      .await
      .unwrap();

    assert!(append.newly_settled);
    assert_eq!(append.invoice.status, InvoiceStatus::Paid);
    assert_eq!(append.invoice.remaining_balance(append.total_paid), dec!(0));
  }

  #[tokio::test]
  async fn test_partial_payment_keeps_invoice_open() {
    let (service, store) = service();
    let customer = seed_customer(&store).await;

    let (invoice, _) = service
      .create_invoice(admin(), training_invoice(customer.id), TaxContext::default())
      .await
      .unwrap();
    service.issue_invoice(admin(), invoice.id).await.unwrap();

    let append = service
      .record_payment(admin(), invoice.id, dec!(100.00), PaymentMethod::Cash, None)
      .await
      .unwrap();

    assert!(!append.newly_settled);
    assert_eq!(append.invoice.status, InvoiceStatus::Open);
    assert_eq!(
      append.invoice.remaining_balance(append.total_paid),
      dec!(197.50)
    );
  }

  #[tokio::test]
  async fn test_record_payment_rejected_on_draft() {
    let (service, store) = service();
    let customer = seed_customer(&store).await;

    let (invoice, _) = service
      .create_invoice(admin(), training_invoice(customer.id), TaxContext::default())
      .await
      .unwrap();

    let result = service
      .record_payment(admin(), invoice.id, dec!(10.00), PaymentMethod::Cash, None)
      .await;

    assert!(matches!(result, Err(BillingError::InvalidState { .. })));
  }

  #[tokio::test]
  async fn test_capture_is_idempotent() {
    let capture = GatewayCapture {
      transaction_id: "TXN-123".to_string(),
      amount: dec!(297.50),
      currency: "EUR".to_string(),
      status: "COMPLETED".to_string(),
      completed: true,
    };
    let (service, store) =
      service_with_gateway(FakeGateway::new().with_capture("ORDER-1", capture));
    let customer = seed_customer(&store).await;

    let (invoice, _) = service
      .create_invoice(admin(), training_invoice(customer.id), TaxContext::default())
      .await
      .unwrap();
    service.issue_invoice(admin(), invoice.id).await.unwrap();

    let first = service
      .capture_gateway_order(admin(), invoice.id, "ORDER-1")
      .await
      .unwrap();
    assert!(first.newly_settled);
    assert_eq!(first.invoice.status, InvoiceStatus::Paid);

    // Second capture resolves to the same payment, no double credit
    let second = service
      .capture_gateway_order(admin(), invoice.id, "ORDER-1")
      .await
      .unwrap();
    assert!(!second.newly_settled);
    assert_eq!(second.payment.id, first.payment.id);
    assert_eq!(second.total_paid, dec!(297.50));

    let completed: Vec<_> = store
      .payments
      .lock()
      .unwrap()
      .iter()
      .filter(|p| p.is_completed())
      .cloned()
      .collect();
    assert_eq!(completed.len(), 1);
  }

  #[tokio::test]
  async fn test_failed_capture_records_failed_payment() {
    let capture = GatewayCapture {
      transaction_id: "TXN-DECLINED".to_string(),
      amount: dec!(297.50),
      currency: "EUR".to_string(),
      status: "DECLINED".to_string(),
      completed: false,
    };
    let (service, store) =
      service_with_gateway(FakeGateway::new().with_capture("ORDER-1", capture));
    let customer = seed_customer(&store).await;

    let (invoice, _) = service
      .create_invoice(admin(), training_invoice(customer.id), TaxContext::default())
      .await
      .unwrap();
    service.issue_invoice(admin(), invoice.id).await.unwrap();

    let result = service
      .capture_gateway_order(admin(), invoice.id, "ORDER-1")
      .await;
    assert!(matches!(result, Err(BillingError::PaymentFailed(_))));

    let payments = store.payments.lock().unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].status, PaymentStatus::Failed);

    // invoice untouched
    let invoices = store.invoices.lock().unwrap();
    assert_eq!(invoices[&invoice.id].status, InvoiceStatus::Open);
  }

  #[tokio::test]
  async fn test_create_order_rejects_paid_invoice() {
    let (service, store) = service();
    let customer = seed_customer(&store).await;

    let (invoice, _) = service
      .create_invoice(admin(), training_invoice(customer.id), TaxContext::default())
      .await
      .unwrap();
    service.issue_invoice(admin(), invoice.id).await.unwrap();
    service
      .record_payment(admin(), invoice.id, dec!(297.50), PaymentMethod::Cash, None)
      .await
      .unwrap();

    let result = service.create_gateway_order(admin(), invoice.id).await;
    assert!(matches!(result, Err(BillingError::InvalidState { .. })));
  }

  #[tokio::test]
  async fn test_create_order_uses_remaining_balance() {
    let (service, store) = service();
    let customer = seed_customer(&store).await;

    let (invoice, _) = service
      .create_invoice(admin(), training_invoice(customer.id), TaxContext::default())
      .await
      .unwrap();
    service.issue_invoice(admin(), invoice.id).await.unwrap();
    service
      .record_payment(admin(), invoice.id, dec!(100.00), PaymentMethod::Cash, None)
      .await
      .unwrap();

    let order = service
      .create_gateway_order(admin(), invoice.id)
      .await
      .unwrap();
    // fake gateway embeds the requested amount into the order id
    assert!(order.order_id.ends_with("-197.50"));
  }

  #[tokio::test]
  async fn test_cancel_paid_invoice_rejected() {
    let (service, store) = service();
    let customer = seed_customer(&store).await;

    let (invoice, _) = service
      .create_invoice(admin(), training_invoice(customer.id), TaxContext::default())
      .await
      .unwrap();
    service.issue_invoice(admin(), invoice.id).await.unwrap();
    service
      .record_payment(admin(), invoice.id, dec!(297.50), PaymentMethod::Cash, None)
      .await
      .unwrap();

    let result = service.cancel_invoice(admin(), invoice.id, None).await;
    assert!(matches!(result, Err(BillingError::InvalidState { .. })));
  }

  #[tokio::test]
  async fn test_overdue_sweep_is_idempotent() {
    let (service, store) = service();
    let customer = seed_customer(&store).await;

    let (invoice, _) = service
      .create_invoice(admin(), training_invoice(customer.id), TaxContext::default())
      .await
      .unwrap();
    service.issue_invoice(admin(), invoice.id).await.unwrap();

    let as_of = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
    let updated = service.mark_overdue_invoices(as_of).await.unwrap();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].status, InvoiceStatus::Overdue);

    let again = service.mark_overdue_invoices(as_of).await.unwrap();
    assert!(again.is_empty());
  }

  #[tokio::test]
  async fn test_refund_reopens_paid_invoice() {
    let capture = GatewayCapture {
      transaction_id: "TXN-REFUND".to_string(),
      amount: dec!(297.50),
      currency: "EUR".to_string(),
      status: "COMPLETED".to_string(),
      completed: true,
    };
    let (service, store) =
      service_with_gateway(FakeGateway::new().with_capture("ORDER-1", capture));
    let customer = seed_customer(&store).await;

    let (invoice, _) = service
      .create_invoice(admin(), training_invoice(customer.id), TaxContext::default())
      .await
      .unwrap();
    service.issue_invoice(admin(), invoice.id).await.unwrap();
    service
      .capture_gateway_order(admin(), invoice.id, "ORDER-1")
      .await
      .unwrap();

    service
      .refund_payment_by_transaction("TXN-REFUND")
      .await
      .unwrap();

    let invoices = store.invoices.lock().unwrap();
    assert_eq!(invoices[&invoice.id].status, InvoiceStatus::Open);
    assert!(invoices[&invoice.id].paid_date.is_none());
  }

  #[tokio::test]
  async fn test_customer_sees_only_own_invoices() {
    let (service, store) = service();
    let customer = seed_customer(&store).await;
    let other = seed_customer(&store).await;

    for c in [&customer, &other] {
      service
        .create_invoice(admin(), training_invoice(c.id), TaxContext::default())
        .await
        .unwrap();
    }

    let actor = Actor::new(customer.user_id, Role::Customer);
    let invoices = service
      .list_invoices(actor, InvoiceListFilter::default())
      .await
      .unwrap();

    assert_eq!(invoices.len(), 1);
    assert_eq!(invoices[0].customer_id, customer.id);
  }

  #[tokio::test]
  async fn test_delete_only_drafts() {
    let (service, store) = service();
    let customer = seed_customer(&store).await;

    let (draft, _) = service
      .create_invoice(admin(), training_invoice(customer.id), TaxContext::default())
      .await
      .unwrap();
    service.delete_invoice(admin(), draft.id).await.unwrap();
    assert!(store.invoices.lock().unwrap().is_empty());

    let (issued, _) = service
      .create_invoice(admin(), training_invoice(customer.id), TaxContext::default())
      .await
      .unwrap();
    service.issue_invoice(admin(), issued.id).await.unwrap();
    let result = service.delete_invoice(admin(), issued.id).await;
    assert!(matches!(result, Err(BillingError::InvalidState { .. })));
  }
}
