use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueObjectError {
  #[error("Invalid invoice number: {0}")]
  InvalidInvoiceNumber(String),
  #[error("Invalid amount: {0}")]
  InvalidAmount(String),
  #[error("Invalid line item description: {0}")]
  InvalidDescription(String),
  #[error("Invalid quantity: {0}")]
  InvalidQuantity(String),
  #[error("Invalid tax rate: {0}")]
  InvalidTaxRate(String),
  #[error("Invalid invoice status: {0}")]
  InvalidStatus(String),
  #[error("Invalid payment method: {0}")]
  InvalidPaymentMethod(String),
  #[error("Invalid payment status: {0}")]
  InvalidPaymentStatus(String),
  #[error("Invalid notes: {0}")]
  InvalidNotes(String),
  #[error("Invalid date range: {0}")]
  InvalidDateRange(String),
}

// Invoice Number - unique, immutable once the invoice is issued
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceNumber(String);

impl InvoiceNumber {
  pub fn new(value: String) -> Result<Self, ValueObjectError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
      return Err(ValueObjectError::InvalidInvoiceNumber(
        "Invoice number cannot be empty".to_string(),
      ));
    }
    if trimmed.len() > 100 {
      return Err(ValueObjectError::InvalidInvoiceNumber(
        "Invoice number cannot exceed 100 characters".to_string(),
      ));
    }
    Ok(Self(trimmed.to_string()))
  }

  pub fn value(&self) -> &str {
    &self.0
  }

  pub fn into_inner(self) -> String {
    self.0
  }
}

impl fmt::Display for InvoiceNumber {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

// Invoice Status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
  Draft,
  Open,
  Paid,
  Overdue,
  Cancelled,
}

impl InvoiceStatus {
  pub fn can_transition_to(&self, new_status: InvoiceStatus) -> bool {
    match (self, new_status) {
      // Draft is issued to Open, or discarded
      (InvoiceStatus::Draft, InvoiceStatus::Open) => true,
      (InvoiceStatus::Draft, InvoiceStatus::Cancelled) => true,
      // Open settles, ages into Overdue, or is cancelled
      (InvoiceStatus::Open, InvoiceStatus::Paid) => true,
      (InvoiceStatus::Open, InvoiceStatus::Overdue) => true,
      (InvoiceStatus::Open, InvoiceStatus::Cancelled) => true,
      // Late payment and late cancellation stay possible
      (InvoiceStatus::Overdue, InvoiceStatus::Paid) => true,
      (InvoiceStatus::Overdue, InvoiceStatus::Cancelled) => true,
      // Paid and Cancelled are terminal
      _ => false,
    }
  }

  pub fn is_editable(&self) -> bool {
    matches!(self, InvoiceStatus::Draft)
  }

  /// Statuses that still carry an open balance.
  pub fn is_outstanding(&self) -> bool {
    matches!(self, InvoiceStatus::Open | InvoiceStatus::Overdue)
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      InvoiceStatus::Draft => "draft",
      InvoiceStatus::Open => "open",
      InvoiceStatus::Paid => "paid",
      InvoiceStatus::Overdue => "overdue",
      InvoiceStatus::Cancelled => "cancelled",
    }
  }
}

impl FromStr for InvoiceStatus {
  type Err = ValueObjectError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "draft" => Ok(InvoiceStatus::Draft),
      "open" => Ok(InvoiceStatus::Open),
      "paid" => Ok(InvoiceStatus::Paid),
      "overdue" => Ok(InvoiceStatus::Overdue),
      "cancelled" => Ok(InvoiceStatus::Cancelled),
      _ => Err(ValueObjectError::InvalidStatus(format!(
        "Unknown status: {}",
        s
      ))),
    }
  }
}

impl fmt::Display for InvoiceStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

// Payment Method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
  Cash,
  BankTransfer,
  PayPal,
  Stripe,
  CreditCard,
  Other,
}

impl PaymentMethod {
  /// Gateway-sourced methods carry an external transaction id that must be
  /// unique per method.
  pub fn is_gateway(&self) -> bool {
    matches!(
      self,
      PaymentMethod::PayPal | PaymentMethod::Stripe | PaymentMethod::CreditCard
    )
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      PaymentMethod::Cash => "cash",
      PaymentMethod::BankTransfer => "bank_transfer",
      PaymentMethod::PayPal => "paypal",
      PaymentMethod::Stripe => "stripe",
      PaymentMethod::CreditCard => "credit_card",
      PaymentMethod::Other => "other",
    }
  }
}

impl FromStr for PaymentMethod {
  type Err = ValueObjectError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "cash" => Ok(PaymentMethod::Cash),
      "bank_transfer" => Ok(PaymentMethod::BankTransfer),
      "paypal" => Ok(PaymentMethod::PayPal),
      "stripe" => Ok(PaymentMethod::Stripe),
      "credit_card" => Ok(PaymentMethod::CreditCard),
      "other" => Ok(PaymentMethod::Other),
      _ => Err(ValueObjectError::InvalidPaymentMethod(format!(
        "Unknown payment method: {}",
        s
      ))),
    }
  }
}

impl fmt::Display for PaymentMethod {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

// Payment Status - only Completed payments count toward the balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
  Pending,
  Completed,
  Failed,
  Refunded,
}

impl PaymentStatus {
  pub fn is_completed(&self) -> bool {
    matches!(self, PaymentStatus::Completed)
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      PaymentStatus::Pending => "pending",
      PaymentStatus::Completed => "completed",
      PaymentStatus::Failed => "failed",
      PaymentStatus::Refunded => "refunded",
    }
  }
}

impl FromStr for PaymentStatus {
  type Err = ValueObjectError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "pending" => Ok(PaymentStatus::Pending),
      "completed" => Ok(PaymentStatus::Completed),
      "failed" => Ok(PaymentStatus::Failed),
      "refunded" => Ok(PaymentStatus::Refunded),
      _ => Err(ValueObjectError::InvalidPaymentStatus(format!(
        "Unknown payment status: {}",
        s
      ))),
    }
  }
}

impl fmt::Display for PaymentStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

// Line Item Description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDescription(String);

impl ItemDescription {
  pub fn new(value: String) -> Result<Self, ValueObjectError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
      return Err(ValueObjectError::InvalidDescription(
        "Description cannot be empty".to_string(),
      ));
    }
    if trimmed.len() > 500 {
      return Err(ValueObjectError::InvalidDescription(
        "Description cannot exceed 500 characters".to_string(),
      ));
    }
    Ok(Self(trimmed.to_string()))
  }

  pub fn value(&self) -> &str {
    &self.0
  }
}

// Quantity - positive whole units of a service or package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quantity(i32);

impl Quantity {
  pub fn new(value: i32) -> Result<Self, ValueObjectError> {
    if value <= 0 {
      return Err(ValueObjectError::InvalidQuantity(
        "Quantity must be positive".to_string(),
      ));
    }
    Ok(Self(value))
  }

  pub fn value(&self) -> i32 {
    self.0
  }

  pub fn as_decimal(&self) -> Decimal {
    Decimal::from(self.0)
  }
}

// Unit Price - non-negative, at most 2 decimal places
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPrice(Decimal);

impl UnitPrice {
  pub fn new(value: Decimal) -> Result<Self, ValueObjectError> {
    if value.is_sign_negative() {
      return Err(ValueObjectError::InvalidAmount(
        "Unit price cannot be negative".to_string(),
      ));
    }
    if value.scale() > 2 {
      return Err(ValueObjectError::InvalidAmount(
        "Unit price cannot have more than 2 decimal places".to_string(),
      ));
    }
    Ok(Self(value))
  }

  pub fn value(&self) -> Decimal {
    self.0
  }
}

// Tax Rate - percentage, e.g. 19.00 for the regular German VAT rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaxRate(Decimal);

impl TaxRate {
  pub fn new(value: Decimal) -> Result<Self, ValueObjectError> {
    if value < Decimal::ZERO || value > Decimal::from(100) {
      return Err(ValueObjectError::InvalidTaxRate(
        "Tax rate must be between 0 and 100".to_string(),
      ));
    }
    if value.scale() > 2 {
      return Err(ValueObjectError::InvalidTaxRate(
        "Tax rate cannot have more than 2 decimal places".to_string(),
      ));
    }
    Ok(Self(value))
  }

  pub fn zero() -> Self {
    Self(Decimal::ZERO)
  }

  pub fn value(&self) -> Decimal {
    self.0
  }

  pub fn is_zero(&self) -> bool {
    self.0.is_zero()
  }
}

impl fmt::Display for TaxRate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}%", self.0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rust_decimal_macros::dec;

  #[test]
  fn test_invoice_number() {
    assert!(InvoiceNumber::new("R-2026-0001".to_string()).is_ok());
    assert!(InvoiceNumber::new("".to_string()).is_err());
    assert!(InvoiceNumber::new("   ".to_string()).is_err());
    assert_eq!(
      InvoiceNumber::new(" R-2026-0001 ".to_string())
        .unwrap()
        .value(),
      "R-2026-0001"
    );
  }

  #[test]
  fn test_invoice_status_transitions() {
    assert!(InvoiceStatus::Draft.can_transition_to(InvoiceStatus::Open));
    assert!(InvoiceStatus::Draft.can_transition_to(InvoiceStatus::Cancelled));
    assert!(!InvoiceStatus::Draft.can_transition_to(InvoiceStatus::Paid));
    assert!(!InvoiceStatus::Draft.can_transition_to(InvoiceStatus::Overdue));

    assert!(InvoiceStatus::Open.can_transition_to(InvoiceStatus::Paid));
    assert!(InvoiceStatus::Open.can_transition_to(InvoiceStatus::Overdue));
    assert!(InvoiceStatus::Open.can_transition_to(InvoiceStatus::Cancelled));

    assert!(InvoiceStatus::Overdue.can_transition_to(InvoiceStatus::Paid));
    assert!(InvoiceStatus::Overdue.can_transition_to(InvoiceStatus::Cancelled));

    assert!(!InvoiceStatus::Paid.can_transition_to(InvoiceStatus::Open));
    assert!(!InvoiceStatus::Paid.can_transition_to(InvoiceStatus::Cancelled));
    assert!(!InvoiceStatus::Cancelled.can_transition_to(InvoiceStatus::Open));
  }

  #[test]
  fn test_status_round_trip() {
    for status in [
      InvoiceStatus::Draft,
      InvoiceStatus::Open,
      InvoiceStatus::Paid,
      InvoiceStatus::Overdue,
      InvoiceStatus::Cancelled,
    ] {
      assert_eq!(status.as_str().parse::<InvoiceStatus>().unwrap(), status);
    }
  }

  #[test]
  fn test_payment_method() {
    assert_eq!(
      "bank_transfer".parse::<PaymentMethod>().unwrap(),
      PaymentMethod::BankTransfer
    );
    assert!(PaymentMethod::PayPal.is_gateway());
    assert!(PaymentMethod::Stripe.is_gateway());
    assert!(!PaymentMethod::Cash.is_gateway());
    assert!("bitcoin".parse::<PaymentMethod>().is_err());
  }

  #[test]
  fn test_quantity() {
    assert!(Quantity::new(1).is_ok());
    assert!(Quantity::new(0).is_err());
    assert!(Quantity::new(-3).is_err());
    assert_eq!(Quantity::new(5).unwrap().as_decimal(), dec!(5));
  }

  #[test]
  fn test_unit_price() {
    assert!(UnitPrice::new(dec!(50.00)).is_ok());
    assert!(UnitPrice::new(dec!(0)).is_ok());
    assert!(UnitPrice::new(dec!(-1)).is_err());
    assert!(UnitPrice::new(dec!(9.999)).is_err());
  }

  #[test]
  fn test_tax_rate() {
    assert!(TaxRate::new(dec!(19)).is_ok());
    assert!(TaxRate::new(dec!(0)).is_ok());
    assert!(TaxRate::new(dec!(100)).is_ok());
    assert!(TaxRate::new(dec!(-1)).is_err());
    assert!(TaxRate::new(dec!(101)).is_err());
    assert!(TaxRate::zero().is_zero());
  }
}
