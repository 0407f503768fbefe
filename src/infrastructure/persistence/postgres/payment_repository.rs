use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::billing::{
  BillingError, Invoice, Payment, PaymentMethod, PaymentStatus,
  ports::{LedgerAppend, PaymentLedger},
};

#[derive(Debug, FromRow)]
struct PaymentRow {
  id: Uuid,
  invoice_id: Uuid,
  amount: Decimal,
  payment_method: String,
  transaction_id: Option<String>,
  status: String,
  payment_date: DateTime<Utc>,
  created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
  type Error = BillingError;

  fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
    Ok(Payment {
      id: row.id,
      invoice_id: row.invoice_id,
      amount: row.amount,
      payment_method: PaymentMethod::from_str(&row.payment_method)?,
      transaction_id: row.transaction_id,
      status: PaymentStatus::from_str(&row.status)?,
      payment_date: row.payment_date,
      created_at: row.created_at,
    })
  }
}

const PAYMENT_COLUMNS: &str =
  "id, invoice_id, amount, payment_method, transaction_id, status, payment_date, created_at";

/// Postgres payment ledger. The partial unique index on
/// `(payment_method, transaction_id)` is the serialization point that makes
/// concurrent captures of the same order safe.
pub struct PostgresPaymentRepository {
  pool: PgPool,
}

impl PostgresPaymentRepository {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  async fn sum_completed_tx(
    tx: &mut Transaction<'_, Postgres>,
    invoice_id: Uuid,
  ) -> Result<Decimal, BillingError> {
    let total = sqlx::query_scalar::<_, Decimal>(
      r#"
            SELECT COALESCE(SUM(amount), 0)
            FROM payments
            WHERE invoice_id = $1 AND status = 'completed'
            "#,
    )
    .bind(invoice_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(total)
  }
}

#[async_trait]
impl PaymentLedger for PostgresPaymentRepository {
  async fn append(
    &self,
    payment: Payment,
    mut invoice: Invoice,
  ) -> Result<LedgerAppend, BillingError> {
    // One transaction: insert the entry, recompute the completed sum and
    // persist the resulting status so a crash cannot leave the invoice out
    // of step with its ledger.
    let mut tx = self.pool.begin().await?;

    let inserted = sqlx::query_as::<_, PaymentRow>(
      r#"
            INSERT INTO payments (
                id, invoice_id, amount, payment_method, transaction_id, status,
                payment_date, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, invoice_id, amount, payment_method, transaction_id, status,
                      payment_date, created_at
            "#,
    )
    .bind(payment.id)
    .bind(payment.invoice_id)
    .bind(payment.amount)
    .bind(payment.payment_method.as_str())
    .bind(&payment.transaction_id)
    .bind(payment.status.as_str())
    .bind(payment.payment_date)
    .bind(payment.created_at)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
      if let sqlx::Error::Database(db_err) = &e {
        if db_err.code().as_deref() == Some("23505")
          && db_err.constraint() == Some("payments_method_transaction_unique")
        {
          return BillingError::DuplicateTransaction {
            method: payment.payment_method,
            transaction_id: payment.transaction_id.clone().unwrap_or_default(),
          };
        }
      }
      BillingError::Database(e)
    })?;

    let total_paid = Self::sum_completed_tx(&mut tx, payment.invoice_id).await?;
    let newly_settled = invoice.apply_ledger_total(total_paid, Utc::now().date_naive())?;

    if newly_settled {
      sqlx::query(
        r#"
            UPDATE invoices
            SET status = $2, paid_date = $3, updated_at = $4
            WHERE id = $1
            "#,
      )
      .bind(invoice.id)
      .bind(invoice.status.as_str())
      .bind(invoice.paid_date)
      .bind(invoice.updated_at)
      .execute(&mut *tx)
      .await?;
    }

    tx.commit().await?;

    Ok(LedgerAppend {
      payment: inserted.try_into()?,
      invoice,
      total_paid,
      newly_settled,
    })
  }

  async fn sum_completed(&self, invoice_id: Uuid) -> Result<Decimal, BillingError> {
    let total = sqlx::query_scalar::<_, Decimal>(
      r#"
            SELECT COALESCE(SUM(amount), 0)
            FROM payments
            WHERE invoice_id = $1 AND status = 'completed'
            "#,
    )
    .bind(invoice_id)
    .fetch_one(&self.pool)
    .await?;

    Ok(total)
  }

  async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>, BillingError> {
    let row = sqlx::query_as::<_, PaymentRow>(&format!(
      "SELECT {} FROM payments WHERE id = $1",
      PAYMENT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&self.pool)
    .await?;

    row.map(|r| r.try_into()).transpose()
  }

  async fn find_all(&self) -> Result<Vec<Payment>, BillingError> {
    let rows = sqlx::query_as::<_, PaymentRow>(&format!(
      "SELECT {} FROM payments ORDER BY payment_date DESC",
      PAYMENT_COLUMNS
    ))
    .fetch_all(&self.pool)
    .await?;

    rows.into_iter().map(|r| r.try_into()).collect()
  }

  async fn find_by_invoice_id(&self, invoice_id: Uuid) -> Result<Vec<Payment>, BillingError> {
    let rows = sqlx::query_as::<_, PaymentRow>(&format!(
      "SELECT {} FROM payments WHERE invoice_id = $1 ORDER BY payment_date ASC",
      PAYMENT_COLUMNS
    ))
    .bind(invoice_id)
    .fetch_all(&self.pool)
    .await?;

    rows.into_iter().map(|r| r.try_into()).collect()
  }

  async fn find_by_transaction(
    &self,
    method: PaymentMethod,
    transaction_id: &str,
  ) -> Result<Option<Payment>, BillingError> {
    let row = sqlx::query_as::<_, PaymentRow>(&format!(
      "SELECT {} FROM payments WHERE payment_method = $1 AND transaction_id = $2",
      PAYMENT_COLUMNS
    ))
    .bind(method.as_str())
    .bind(transaction_id)
    .fetch_optional(&self.pool)
    .await?;

    row.map(|r| r.try_into()).transpose()
  }

  async fn update_status(&self, payment: Payment) -> Result<Payment, BillingError> {
    let row = sqlx::query_as::<_, PaymentRow>(
      r#"
            UPDATE payments
            SET status = $2
            WHERE id = $1
            RETURNING id, invoice_id, amount, payment_method, transaction_id, status,
                      payment_date, created_at
            "#,
    )
    .bind(payment.id)
    .bind(payment.status.as_str())
    .fetch_optional(&self.pool)
    .await?
    .ok_or(BillingError::PaymentNotFound(payment.id))?;

    row.try_into()
  }
}
