use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::BillingError;
use super::tax::line_amount;
use super::value_objects::{
  InvoiceNumber, InvoiceStatus, ItemDescription, PaymentMethod, PaymentStatus, Quantity, TaxRate,
  UnitPrice,
};

/// Tolerance for treating a balance as settled. Gateways occasionally round
/// the captured amount by a cent.
pub const PAID_EPSILON: Decimal = dec!(0.01);

// Customer - billing contact, backed by a user account for login and email
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
  pub id: Uuid,
  pub user_id: Uuid,
  pub trainer_id: Option<Uuid>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Customer {
  pub fn new(user_id: Uuid, trainer_id: Option<Uuid>) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      user_id,
      trainer_id,
      created_at: now,
      updated_at: now,
    }
  }

  pub fn is_assigned_to(&self, trainer_id: Uuid) -> bool {
    self.trainer_id == Some(trainer_id)
  }
}

// Invoice - the billing aggregate root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
  pub id: Uuid,
  pub customer_id: Uuid,
  pub invoice_number: InvoiceNumber,
  pub status: InvoiceStatus,
  pub issue_date: NaiveDate,
  pub due_date: NaiveDate,
  pub paid_date: Option<NaiveDate>,
  /// Gross total, fixed from the line items at creation time.
  pub total_amount: Decimal,
  pub notes: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Invoice {
  pub fn new(
    customer_id: Uuid,
    invoice_number: InvoiceNumber,
    issue_date: NaiveDate,
    due_date: NaiveDate,
    total_amount: Decimal,
    notes: Option<String>,
  ) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      customer_id,
      invoice_number,
      status: InvoiceStatus::Draft,
      issue_date,
      due_date,
      paid_date: None,
      total_amount,
      notes,
      created_at: now,
      updated_at: now,
    }
  }

  pub fn change_status(&mut self, new_status: InvoiceStatus) -> Result<(), BillingError> {
    if !self.status.can_transition_to(new_status) {
      return Err(BillingError::InvalidTransition {
        from: self.status,
        to: new_status,
      });
    }
    self.status = new_status;
    self.updated_at = Utc::now();
    Ok(())
  }

  /// Issues the draft, freezing number and items.
  pub fn issue(&mut self, item_count: usize) -> Result<(), BillingError> {
    if self.status != InvoiceStatus::Draft {
      return Err(BillingError::invalid_state(self.status, "issue"));
    }
    if item_count == 0 {
      return Err(BillingError::NoItems);
    }
    self.change_status(InvoiceStatus::Open)
  }

  /// Remaining balance given the completed-payment sum from the ledger.
  /// Clamped at zero; overpayment by more than the epsilon is a ledger bug.
  pub fn remaining_balance(&self, total_paid: Decimal) -> Decimal {
    (self.total_amount - total_paid).max(Decimal::ZERO)
  }

  pub fn is_settled_by(&self, total_paid: Decimal) -> bool {
    self.total_amount - total_paid <= PAID_EPSILON
  }

  /// Re-derives the paid status from the ledger sum. Returns true when the
  /// invoice transitioned to Paid.
  pub fn apply_ledger_total(
    &mut self,
    total_paid: Decimal,
    as_of: NaiveDate,
  ) -> Result<bool, BillingError> {
    if self.status.is_outstanding() && self.is_settled_by(total_paid) {
      self.change_status(InvoiceStatus::Paid)?;
      self.paid_date = Some(as_of);
      return Ok(true);
    }
    Ok(false)
  }

  /// Reopens a paid invoice after a gateway refund.
  pub fn reopen(&mut self) {
    if self.status == InvoiceStatus::Paid {
      self.status = InvoiceStatus::Open;
      self.paid_date = None;
      self.updated_at = Utc::now();
    }
  }

  /// Scheduled sweep transition. Idempotent: already-overdue invoices are
  /// left alone.
  pub fn mark_overdue(&mut self, as_of: NaiveDate) -> Result<bool, BillingError> {
    if self.status == InvoiceStatus::Open && self.due_date < as_of {
      self.change_status(InvoiceStatus::Overdue)?;
      return Ok(true);
    }
    Ok(false)
  }

  pub fn cancel(&mut self) -> Result<(), BillingError> {
    match self.status {
      InvoiceStatus::Draft | InvoiceStatus::Open | InvoiceStatus::Overdue => {
        self.change_status(InvoiceStatus::Cancelled)
      }
      _ => Err(BillingError::invalid_state(self.status, "cancel")),
    }
  }

  pub fn is_overdue(&self, current_date: NaiveDate) -> bool {
    self.status.is_outstanding() && self.due_date < current_date
  }

  /// Payments may only be recorded against issued, non-cancelled invoices.
  pub fn accepts_payments(&self) -> bool {
    matches!(
      self.status,
      InvoiceStatus::Open | InvoiceStatus::Overdue | InvoiceStatus::Paid
    )
  }

  pub fn is_deletable(&self) -> bool {
    self.status == InvoiceStatus::Draft
  }
}

// Invoice Line Item - immutable once the invoice is issued
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItem {
  pub id: Uuid,
  pub invoice_id: Uuid,
  pub description: ItemDescription,
  pub quantity: Quantity,
  pub unit_price: UnitPrice,
  pub tax_rate: TaxRate,
  /// Net amount: quantity * unit price, rounded to cents.
  pub amount: Decimal,
  pub line_order: i32,
}

impl InvoiceItem {
  pub fn new(
    invoice_id: Uuid,
    description: ItemDescription,
    quantity: Quantity,
    unit_price: UnitPrice,
    tax_rate: TaxRate,
    line_order: i32,
  ) -> Self {
    let amount = line_amount(quantity.as_decimal(), unit_price.value());
    Self {
      id: Uuid::new_v4(),
      invoice_id,
      description,
      quantity,
      unit_price,
      tax_rate,
      amount,
      line_order,
    }
  }
}

// Payment - one append-only ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
  pub id: Uuid,
  pub invoice_id: Uuid,
  pub amount: Decimal,
  pub payment_method: PaymentMethod,
  pub transaction_id: Option<String>,
  pub status: PaymentStatus,
  pub payment_date: DateTime<Utc>,
  pub created_at: DateTime<Utc>,
}

impl Payment {
  pub fn new(
    invoice_id: Uuid,
    amount: Decimal,
    payment_method: PaymentMethod,
    transaction_id: Option<String>,
    status: PaymentStatus,
    payment_date: DateTime<Utc>,
  ) -> Result<Self, BillingError> {
    if amount <= Decimal::ZERO {
      return Err(BillingError::Validation(
        super::value_objects::ValueObjectError::InvalidAmount(
          "Payment amount must be positive".to_string(),
        ),
      ));
    }
    Ok(Self {
      id: Uuid::new_v4(),
      invoice_id,
      amount,
      payment_method,
      transaction_id,
      status,
      payment_date,
      created_at: Utc::now(),
    })
  }

  pub fn completed(
    invoice_id: Uuid,
    amount: Decimal,
    payment_method: PaymentMethod,
    transaction_id: Option<String>,
  ) -> Result<Self, BillingError> {
    Self::new(
      invoice_id,
      amount,
      payment_method,
      transaction_id,
      PaymentStatus::Completed,
      Utc::now(),
    )
  }

  pub fn failed(
    invoice_id: Uuid,
    amount: Decimal,
    payment_method: PaymentMethod,
    transaction_id: Option<String>,
  ) -> Result<Self, BillingError> {
    Self::new(
      invoice_id,
      amount,
      payment_method,
      transaction_id,
      PaymentStatus::Failed,
      Utc::now(),
    )
  }

  pub fn is_completed(&self) -> bool {
    self.status.is_completed()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rust_decimal_macros::dec;

  fn invoice(total: Decimal) -> Invoice {
    Invoice::new(
      Uuid::new_v4(),
      InvoiceNumber::new("R-2026-0001".to_string()).unwrap(),
      NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
      NaiveDate::from_ymd_opt(2026, 2, 15).unwrap(),
      total,
      None,
    )
  }

  #[test]
  fn test_issue_requires_draft_and_items() {
    let mut inv = invoice(dec!(297.50));
    assert!(matches!(inv.issue(0), Err(BillingError::NoItems)));

    inv.issue(1).unwrap();
    assert_eq!(inv.status, InvoiceStatus::Open);

    assert!(matches!(
      inv.issue(1),
      Err(BillingError::InvalidState { .. })
    ));
  }

  #[test]
  fn test_full_payment_settles() {
    let mut inv = invoice(dec!(297.50));
    inv.issue(1).unwrap();

    let as_of = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap();
    let settled = inv.apply_ledger_total(dec!(297.50), as_of).unwrap();

    assert!(settled);
    assert_eq!(inv.status, InvoiceStatus::Paid);
    assert_eq!(inv.paid_date, Some(as_of));
    assert_eq!(inv.remaining_balance(dec!(297.50)), dec!(0.00));
  }

  #[test]
  fn test_partial_payment_keeps_status() {
    let mut inv = invoice(dec!(297.50));
    inv.issue(1).unwrap();

    let as_of = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap();
    let settled = inv.apply_ledger_total(dec!(100.00), as_of).unwrap();

    assert!(!settled);
    assert_eq!(inv.status, InvoiceStatus::Open);
    assert_eq!(inv.remaining_balance(dec!(100.00)), dec!(197.50));
    assert!(inv.paid_date.is_none());
  }

  #[test]
  fn test_settle_within_epsilon() {
    let mut inv = invoice(dec!(100.00));
    inv.issue(1).unwrap();

    let as_of = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap();
    assert!(inv.apply_ledger_total(dec!(99.99), as_of).unwrap());
    assert_eq!(inv.status, InvoiceStatus::Paid);
  }

  #[test]
  fn test_late_payment_on_overdue_invoice() {
    let mut inv = invoice(dec!(100.00));
    inv.issue(1).unwrap();

    let yesterday = inv.due_date + chrono::Duration::days(1);
    assert!(inv.mark_overdue(yesterday).unwrap());
    assert_eq!(inv.status, InvoiceStatus::Overdue);

    assert!(inv.apply_ledger_total(dec!(100.00), yesterday).unwrap());
    assert_eq!(inv.status, InvoiceStatus::Paid);
  }

  #[test]
  fn test_mark_overdue_is_idempotent() {
    let mut inv = invoice(dec!(100.00));
    inv.issue(1).unwrap();

    let as_of = inv.due_date + chrono::Duration::days(1);
    assert!(inv.mark_overdue(as_of).unwrap());
    assert!(!inv.mark_overdue(as_of).unwrap());
    assert_eq!(inv.status, InvoiceStatus::Overdue);
  }

  #[test]
  fn test_mark_overdue_skips_future_due_date() {
    let mut inv = invoice(dec!(100.00));
    inv.issue(1).unwrap();

    assert!(!inv.mark_overdue(inv.due_date).unwrap());
    assert_eq!(inv.status, InvoiceStatus::Open);
  }

  #[test]
  fn test_cancel_paid_invoice_is_rejected() {
    let mut inv = invoice(dec!(100.00));
    inv.issue(1).unwrap();
    inv
      .apply_ledger_total(dec!(100.00), NaiveDate::from_ymd_opt(2026, 2, 5).unwrap())
      .unwrap();

    assert!(matches!(
      inv.cancel(),
      Err(BillingError::InvalidState { .. })
    ));
    assert_eq!(inv.status, InvoiceStatus::Paid);
  }

  #[test]
  fn test_cancel_from_draft_open_overdue() {
    let mut draft = invoice(dec!(10.00));
    draft.cancel().unwrap();
    assert_eq!(draft.status, InvoiceStatus::Cancelled);

    let mut open = invoice(dec!(10.00));
    open.issue(1).unwrap();
    open.cancel().unwrap();
    assert_eq!(open.status, InvoiceStatus::Cancelled);

    let mut overdue = invoice(dec!(10.00));
    overdue.issue(1).unwrap();
    overdue
      .mark_overdue(overdue.due_date + chrono::Duration::days(1))
      .unwrap();
    overdue.cancel().unwrap();
    assert_eq!(overdue.status, InvoiceStatus::Cancelled);
  }

  #[test]
  fn test_reopen_after_refund() {
    let mut inv = invoice(dec!(100.00));
    inv.issue(1).unwrap();
    inv
      .apply_ledger_total(dec!(100.00), NaiveDate::from_ymd_opt(2026, 2, 5).unwrap())
      .unwrap();

    inv.reopen();
    assert_eq!(inv.status, InvoiceStatus::Open);
    assert!(inv.paid_date.is_none());
  }

  #[test]
  fn test_item_amount_is_net() {
    let item = InvoiceItem::new(
      Uuid::new_v4(),
      ItemDescription::new("Puppy course".to_string()).unwrap(),
      Quantity::new(5).unwrap(),
      UnitPrice::new(dec!(50.00)).unwrap(),
      TaxRate::new(dec!(19)).unwrap(),
      1,
    );
    assert_eq!(item.amount, dec!(250.00));
  }

  #[test]
  fn test_payment_rejects_non_positive_amount() {
    assert!(Payment::completed(Uuid::new_v4(), dec!(0), PaymentMethod::Cash, None).is_err());
    assert!(Payment::completed(Uuid::new_v4(), dec!(-5), PaymentMethod::Cash, None).is_err());
    assert!(Payment::completed(Uuid::new_v4(), dec!(5), PaymentMethod::Cash, None).is_ok());
  }
}
