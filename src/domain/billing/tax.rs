use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::entities::InvoiceItem;
use super::value_objects::TaxRate;

/// Snapshot of the tax-relevant company settings, taken at the start of a
/// computation. The rules never read ambient configuration themselves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaxContext {
  /// German small-business exemption (§19 UStG): no VAT is charged or
  /// displayed, regardless of the rates stored on the items.
  pub small_business: bool,
}

impl TaxContext {
  pub fn small_business() -> Self {
    Self {
      small_business: true,
    }
  }
}

/// One tax subtotal per distinct rate, for display on the invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxLine {
  pub rate: TaxRate,
  pub base_amount: Decimal,
  pub tax_amount: Decimal,
}

/// Calculated invoice totals. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
  pub subtotal: Decimal,
  pub tax_lines: Vec<TaxLine>,
  pub total: Decimal,
}

/// Half-up rounding to cents.
pub fn round_cents(value: Decimal) -> Decimal {
  value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Net line amount: quantity times unit price, rounded to cents.
pub fn line_amount(quantity: Decimal, unit_price: Decimal) -> Decimal {
  round_cents(quantity * unit_price)
}

/// Tax portion for a net amount at the given percentage rate.
pub fn tax_for_rate(amount: Decimal, rate: Decimal) -> Decimal {
  round_cents(amount * rate / Decimal::from(100))
}

/// Aggregate totals over the invoice items under the given tax context.
///
/// In small-business mode the stored per-item rates are preserved for audit
/// but excluded from display and totalling: no tax lines are produced and the
/// total equals the net subtotal.
pub fn invoice_totals(items: &[InvoiceItem], ctx: TaxContext) -> InvoiceTotals {
  let subtotal = items
    .iter()
    .fold(Decimal::ZERO, |acc, item| acc + item.amount);

  if ctx.small_business {
    return InvoiceTotals {
      subtotal,
      tax_lines: Vec::new(),
      total: subtotal,
    };
  }

  let mut rates: Vec<TaxRate> = items
    .iter()
    .filter(|item| !item.tax_rate.is_zero())
    .map(|item| item.tax_rate)
    .collect();
  rates.sort();
  rates.dedup();

  let tax_lines: Vec<TaxLine> = rates
    .into_iter()
    .map(|rate| {
      let base_amount = items
        .iter()
        .filter(|item| item.tax_rate == rate)
        .fold(Decimal::ZERO, |acc, item| acc + item.amount);
      TaxLine {
        rate,
        base_amount,
        tax_amount: tax_for_rate(base_amount, rate.value()),
      }
    })
    .collect();

  let total = tax_lines
    .iter()
    .fold(subtotal, |acc, line| acc + line.tax_amount);

  InvoiceTotals {
    subtotal,
    tax_lines,
    total,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::billing::value_objects::{ItemDescription, Quantity, TaxRate, UnitPrice};
  use rust_decimal_macros::dec;
  use uuid::Uuid;

  fn item(qty: i32, unit_price: Decimal, tax_rate: Decimal) -> InvoiceItem {
    InvoiceItem::new(
      Uuid::new_v4(),
      ItemDescription::new("Group lesson".to_string()).unwrap(),
      Quantity::new(qty).unwrap(),
      UnitPrice::new(unit_price).unwrap(),
      TaxRate::new(tax_rate).unwrap(),
      1,
    )
  }

  #[test]
  fn test_line_amount_rounds_half_up() {
    assert_eq!(line_amount(dec!(5), dec!(50.00)), dec!(250.00));
    assert_eq!(line_amount(dec!(3), dec!(0.335)), dec!(1.01));
  }

  #[test]
  fn test_tax_for_rate() {
    assert_eq!(tax_for_rate(dec!(250.00), dec!(19)), dec!(47.50));
    assert_eq!(tax_for_rate(dec!(100.00), dec!(7)), dec!(7.00));
    assert_eq!(tax_for_rate(dec!(0.03), dec!(19)), dec!(0.01));
  }

  #[test]
  fn test_regular_invoice_totals() {
    // 5 x 50.00 at 19% -> net 250.00, tax 47.50, total 297.50
    let items = vec![item(5, dec!(50.00), dec!(19))];
    let totals = invoice_totals(&items, TaxContext::default());

    assert_eq!(totals.subtotal, dec!(250.00));
    assert_eq!(totals.tax_lines.len(), 1);
    assert_eq!(totals.tax_lines[0].tax_amount, dec!(47.50));
    assert_eq!(totals.total, dec!(297.50));
  }

  #[test]
  fn test_small_business_overrides_item_rates() {
    let items = vec![item(5, dec!(50.00), dec!(19))];
    let totals = invoice_totals(&items, TaxContext::small_business());

    assert_eq!(totals.subtotal, dec!(250.00));
    assert!(totals.tax_lines.is_empty());
    assert_eq!(totals.total, dec!(250.00));
    // the stored rate is untouched
    assert_eq!(items[0].tax_rate.value(), dec!(19));
  }

  #[test]
  fn test_breakdown_groups_by_rate() {
    let items = vec![
      item(1, dec!(100.00), dec!(19)),
      item(2, dec!(25.00), dec!(19)),
      item(1, dec!(40.00), dec!(7)),
      item(1, dec!(10.00), dec!(0)),
    ];
    let totals = invoice_totals(&items, TaxContext::default());

    assert_eq!(totals.subtotal, dec!(200.00));
    assert_eq!(totals.tax_lines.len(), 2);
    // ordered by rate
    assert_eq!(totals.tax_lines[0].rate.value(), dec!(7));
    assert_eq!(totals.tax_lines[0].base_amount, dec!(40.00));
    assert_eq!(totals.tax_lines[0].tax_amount, dec!(2.80));
    assert_eq!(totals.tax_lines[1].rate.value(), dec!(19));
    assert_eq!(totals.tax_lines[1].base_amount, dec!(150.00));
    assert_eq!(totals.tax_lines[1].tax_amount, dec!(28.50));
    assert_eq!(totals.total, dec!(231.30));
  }

  #[test]
  fn test_empty_invoice() {
    let totals = invoice_totals(&[], TaxContext::default());
    assert_eq!(totals.subtotal, Decimal::ZERO);
    assert!(totals.tax_lines.is_empty());
    assert_eq!(totals.total, Decimal::ZERO);
  }
}
