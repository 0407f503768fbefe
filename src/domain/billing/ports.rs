use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entities::{Customer, Invoice, InvoiceItem, Payment};
use super::errors::BillingError;
use super::value_objects::{InvoiceStatus, PaymentMethod};

#[async_trait]
pub trait CustomerRepository: Send + Sync {
  async fn create(&self, customer: Customer) -> Result<Customer, BillingError>;
  async fn find_by_id(&self, id: Uuid) -> Result<Option<Customer>, BillingError>;
  async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<Customer>, BillingError>;
}

#[async_trait]
pub trait InvoiceRepository: Send + Sync {
  /// Inserts the invoice and its items in one transaction. A failure rolls
  /// everything back, leaving no orphaned items.
  async fn create_with_items(
    &self,
    invoice: Invoice,
    items: Vec<InvoiceItem>,
  ) -> Result<(Invoice, Vec<InvoiceItem>), BillingError>;

  async fn update(&self, invoice: Invoice) -> Result<Invoice, BillingError>;
  async fn find_by_id(&self, id: Uuid) -> Result<Option<Invoice>, BillingError>;
  async fn find_all(&self) -> Result<Vec<Invoice>, BillingError>;
  async fn find_by_status(&self, status: InvoiceStatus) -> Result<Vec<Invoice>, BillingError>;
  async fn find_by_customer_id(&self, customer_id: Uuid) -> Result<Vec<Invoice>, BillingError>;
  async fn find_by_trainer_id(&self, trainer_id: Uuid) -> Result<Vec<Invoice>, BillingError>;

  /// Open invoices whose due date has passed, for the overdue sweep.
  async fn find_due_for_overdue(&self, as_of: NaiveDate) -> Result<Vec<Invoice>, BillingError>;

  /// Outstanding invoices due before the cutoff, for payment reminders.
  /// Includes open and overdue, excludes paid and cancelled.
  async fn find_outstanding_due_before(
    &self,
    cutoff: NaiveDate,
  ) -> Result<Vec<Invoice>, BillingError>;

  /// Highest invoice number with the given prefix, used for sequence
  /// generation.
  async fn last_number_with_prefix(&self, prefix: &str) -> Result<Option<String>, BillingError>;

  /// Deletes a draft invoice together with its items.
  async fn delete_with_items(&self, id: Uuid) -> Result<(), BillingError>;
}

#[async_trait]
pub trait InvoiceItemRepository: Send + Sync {
  async fn find_by_invoice_id(&self, invoice_id: Uuid) -> Result<Vec<InvoiceItem>, BillingError>;
}

/// Result of atomically appending a ledger entry and re-deriving the invoice
/// status from the new completed-payment sum.
#[derive(Debug, Clone)]
pub struct LedgerAppend {
  pub payment: Payment,
  pub invoice: Invoice,
  pub total_paid: Decimal,
  pub newly_settled: bool,
}

/// Append-only record of funds applied to invoices. `total_paid` and
/// `remaining_balance` are projections over this ledger, never stored.
#[async_trait]
pub trait PaymentLedger: Send + Sync {
  /// Appends the payment and, in the same transaction, recomputes the
  /// completed sum and persists any resulting paid transition on the
  /// invoice. A `(payment_method, transaction_id)` uniqueness violation
  /// surfaces as `BillingError::DuplicateTransaction` without crediting
  /// anything.
  async fn append(&self, payment: Payment, invoice: Invoice) -> Result<LedgerAppend, BillingError>;

  async fn sum_completed(&self, invoice_id: Uuid) -> Result<Decimal, BillingError>;
  async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>, BillingError>;
  async fn find_all(&self) -> Result<Vec<Payment>, BillingError>;
  async fn find_by_invoice_id(&self, invoice_id: Uuid) -> Result<Vec<Payment>, BillingError>;
  async fn find_by_transaction(
    &self,
    method: PaymentMethod,
    transaction_id: &str,
  ) -> Result<Option<Payment>, BillingError>;

  /// Updates the status of an existing entry (webhook-driven completion,
  /// failure or refund). The amount and method never change.
  async fn update_status(&self, payment: Payment) -> Result<Payment, BillingError>;
}

/// External payment processor order, as returned by order creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayOrder {
  pub order_id: String,
  pub status: String,
  pub links: Vec<GatewayLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayLink {
  pub href: String,
  pub rel: String,
  pub method: Option<String>,
}

/// Outcome of capturing an order: the funds transfer as the gateway reports
/// it.
#[derive(Debug, Clone)]
pub struct GatewayCapture {
  pub transaction_id: String,
  pub amount: Decimal,
  pub currency: String,
  pub status: String,
  pub completed: bool,
}

/// Bridge to the external payment processor. Isolates all third-party
/// request/response shapes from the billing core; never mutates invoice
/// state itself.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
  async fn create_order(
    &self,
    invoice_number: &str,
    amount: Decimal,
  ) -> Result<GatewayOrder, BillingError>;

  async fn capture_order(&self, order_id: &str) -> Result<GatewayCapture, BillingError>;

  /// Read-only status passthrough for reconciliation.
  async fn get_order(&self, order_id: &str) -> Result<GatewayOrder, BillingError>;
}

/// A queued outbound email. Template rendering and transport belong to the
/// mail worker; the core's contract ends once the job is enqueued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailJob {
  pub to: String,
  pub subject: String,
  pub template: String,
  pub context: serde_json::Value,
}

#[async_trait]
pub trait MailQueue: Send + Sync {
  async fn enqueue(&self, job: MailJob) -> Result<(), BillingError>;
}
