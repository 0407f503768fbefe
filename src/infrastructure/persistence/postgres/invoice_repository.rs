use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::billing::{
  BillingError, Invoice, InvoiceItem, InvoiceNumber, InvoiceStatus, ItemDescription, Quantity,
  TaxRate, UnitPrice,
  ports::{InvoiceItemRepository, InvoiceRepository},
};

#[derive(Debug, FromRow)]
struct InvoiceRow {
  id: Uuid,
  customer_id: Uuid,
  invoice_number: String,
  status: String,
  issue_date: NaiveDate,
  due_date: NaiveDate,
  paid_date: Option<NaiveDate>,
  total_amount: Decimal,
  notes: Option<String>,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl TryFrom<InvoiceRow> for Invoice {
  type Error = BillingError;

  fn try_from(row: InvoiceRow) -> Result<Self, Self::Error> {
    let invoice_number = InvoiceNumber::new(row.invoice_number)?;
    let status = InvoiceStatus::from_str(&row.status)?;

    Ok(Invoice {
      id: row.id,
      customer_id: row.customer_id,
      invoice_number,
      status,
      issue_date: row.issue_date,
      due_date: row.due_date,
      paid_date: row.paid_date,
      total_amount: row.total_amount,
      notes: row.notes,
      created_at: row.created_at,
      updated_at: row.updated_at,
    })
  }
}

#[derive(Debug, FromRow)]
struct InvoiceItemRow {
  id: Uuid,
  invoice_id: Uuid,
  description: String,
  quantity: i32,
  unit_price: Decimal,
  tax_rate: Decimal,
  amount: Decimal,
  line_order: i32,
}

impl TryFrom<InvoiceItemRow> for InvoiceItem {
  type Error = BillingError;

  fn try_from(row: InvoiceItemRow) -> Result<Self, Self::Error> {
    Ok(InvoiceItem {
      id: row.id,
      invoice_id: row.invoice_id,
      description: ItemDescription::new(row.description)?,
      quantity: Quantity::new(row.quantity)?,
      unit_price: UnitPrice::new(row.unit_price)?,
      tax_rate: TaxRate::new(row.tax_rate)?,
      amount: row.amount,
      line_order: row.line_order,
    })
  }
}

const INVOICE_COLUMNS: &str = "id, customer_id, invoice_number, status, issue_date, due_date, \
                               paid_date, total_amount, notes, created_at, updated_at";

pub struct PostgresInvoiceRepository {
  pool: PgPool,
}

impl PostgresInvoiceRepository {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  async fn insert_invoice(
    tx: &mut Transaction<'_, Postgres>,
    invoice: &Invoice,
  ) -> Result<InvoiceRow, BillingError> {
    let invoice_number_value = invoice.invoice_number.value().to_string();

    sqlx::query_as::<_, InvoiceRow>(
      r#"
            INSERT INTO invoices (
                id, customer_id, invoice_number, status, issue_date, due_date,
                paid_date, total_amount, notes, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, customer_id, invoice_number, status, issue_date, due_date,
                      paid_date, total_amount, notes, created_at, updated_at
            "#,
    )
    .bind(invoice.id)
    .bind(invoice.customer_id)
    .bind(invoice.invoice_number.value())
    .bind(invoice.status.as_str())
    .bind(invoice.issue_date)
    .bind(invoice.due_date)
    .bind(invoice.paid_date)
    .bind(invoice.total_amount)
    .bind(&invoice.notes)
    .bind(invoice.created_at)
    .bind(invoice.updated_at)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| {
      if let sqlx::Error::Database(db_err) = &e {
        // PostgreSQL unique violation
        if db_err.code().as_deref() == Some("23505")
          && db_err.constraint() == Some("invoices_invoice_number_key")
        {
          return BillingError::InvoiceNumberConflict(invoice_number_value);
        }
      }
      BillingError::Database(e)
    })
  }

  async fn insert_item(
    tx: &mut Transaction<'_, Postgres>,
    item: &InvoiceItem,
  ) -> Result<InvoiceItemRow, BillingError> {
    Ok(
      sqlx::query_as::<_, InvoiceItemRow>(
        r#"
            INSERT INTO invoice_items (
                id, invoice_id, description, quantity, unit_price, tax_rate,
                amount, line_order
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, invoice_id, description, quantity, unit_price, tax_rate,
                      amount, line_order
            "#,
      )
      .bind(item.id)
      .bind(item.invoice_id)
      .bind(item.description.value())
      .bind(item.quantity.value())
      .bind(item.unit_price.value())
      .bind(item.tax_rate.value())
      .bind(item.amount)
      .bind(item.line_order)
      .fetch_one(&mut **tx)
      .await?,
    )
  }
}

#[async_trait]
impl InvoiceRepository for PostgresInvoiceRepository {
  async fn create_with_items(
    &self,
    invoice: Invoice,
    items: Vec<InvoiceItem>,
  ) -> Result<(Invoice, Vec<InvoiceItem>), BillingError> {
    // All or nothing: a failure inserting any item rolls the invoice back.
    let mut tx = self.pool.begin().await?;

    let invoice_row = Self::insert_invoice(&mut tx, &invoice).await?;

    let mut created_items = Vec::with_capacity(items.len());
    for item in &items {
      created_items.push(Self::insert_item(&mut tx, item).await?);
    }

    tx.commit().await?;

    let invoice = invoice_row.try_into()?;
    let items = created_items
      .into_iter()
      .map(|row| row.try_into())
      .collect::<Result<Vec<_>, _>>()?;

    Ok((invoice, items))
  }

  async fn update(&self, invoice: Invoice) -> Result<Invoice, BillingError> {
    let row = sqlx::query_as::<_, InvoiceRow>(
      r#"
            UPDATE invoices
            SET status = $2, paid_date = $3, notes = $4, updated_at = $5
            WHERE id = $1
            RETURNING id, customer_id, invoice_number, status, issue_date, due_date,
                      paid_date, total_amount, notes, created_at, updated_at
            "#,
    )
    .bind(invoice.id)
    .bind(invoice.status.as_str())
    .bind(invoice.paid_date)
    .bind(&invoice.notes)
    .bind(invoice.updated_at)
    .fetch_one(&self.pool)
    .await?;

    row.try_into()
  }

  async fn find_by_id(&self, id: Uuid) -> Result<Option<Invoice>, BillingError> {
    let row = sqlx::query_as::<_, InvoiceRow>(&format!(
      "SELECT {} FROM invoices WHERE id = $1",
      INVOICE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&self.pool)
    .await?;

    row.map(|r| r.try_into()).transpose()
  }

  async fn find_all(&self) -> Result<Vec<Invoice>, BillingError> {
    let rows = sqlx::query_as::<_, InvoiceRow>(&format!(
      "SELECT {} FROM invoices ORDER BY issue_date DESC, invoice_number DESC",
      INVOICE_COLUMNS
    ))
    .fetch_all(&self.pool)
    .await?;

    rows.into_iter().map(|r| r.try_into()).collect()
  }

  async fn find_by_status(&self, status: InvoiceStatus) -> Result<Vec<Invoice>, BillingError> {
    let rows = sqlx::query_as::<_, InvoiceRow>(&format!(
      "SELECT {} FROM invoices WHERE status = $1 ORDER BY issue_date DESC",
      INVOICE_COLUMNS
    ))
    .bind(status.as_str())
    .fetch_all(&self.pool)
    .await?;

    rows.into_iter().map(|r| r.try_into()).collect()
  }

  async fn find_by_customer_id(&self, customer_id: Uuid) -> Result<Vec<Invoice>, BillingError> {
    let rows = sqlx::query_as::<_, InvoiceRow>(&format!(
      "SELECT {} FROM invoices WHERE customer_id = $1 ORDER BY issue_date DESC",
      INVOICE_COLUMNS
    ))
    .bind(customer_id)
    .fetch_all(&self.pool)
    .await?;

    rows.into_iter().map(|r| r.try_into()).collect()
  }

  async fn find_by_trainer_id(&self, trainer_id: Uuid) -> Result<Vec<Invoice>, BillingError> {
    let rows = sqlx::query_as::<_, InvoiceRow>(&format!(
      r#"
            SELECT {}
            FROM invoices i
            WHERE i.customer_id IN (
                SELECT c.id FROM customers c WHERE c.trainer_id = $1
            )
            ORDER BY i.issue_date DESC
            "#,
      "i.id, i.customer_id, i.invoice_number, i.status, i.issue_date, i.due_date, \
       i.paid_date, i.total_amount, i.notes, i.created_at, i.updated_at"
    ))
    .bind(trainer_id)
    .fetch_all(&self.pool)
    .await?;

    rows.into_iter().map(|r| r.try_into()).collect()
  }

  async fn find_due_for_overdue(&self, as_of: NaiveDate) -> Result<Vec<Invoice>, BillingError> {
    let rows = sqlx::query_as::<_, InvoiceRow>(&format!(
      "SELECT {} FROM invoices WHERE status = 'open' AND due_date < $1 ORDER BY due_date ASC",
      INVOICE_COLUMNS
    ))
    .bind(as_of)
    .fetch_all(&self.pool)
    .await?;

    rows.into_iter().map(|r| r.try_into()).collect()
  }

  async fn find_outstanding_due_before(
    &self,
    cutoff: NaiveDate,
  ) -> Result<Vec<Invoice>, BillingError> {
    let rows = sqlx::query_as::<_, InvoiceRow>(&format!(
      r#"
            SELECT {}
            FROM invoices
            WHERE status NOT IN ('paid', 'cancelled', 'draft') AND due_date < $1
            ORDER BY due_date ASC
            "#,
      INVOICE_COLUMNS
    ))
    .bind(cutoff)
    .fetch_all(&self.pool)
    .await?;

    rows.into_iter().map(|r| r.try_into()).collect()
  }

  async fn last_number_with_prefix(&self, prefix: &str) -> Result<Option<String>, BillingError> {
    let pattern = format!("{}%", prefix);
    let number = sqlx::query_scalar::<_, String>(
      r#"
            SELECT invoice_number FROM invoices
            WHERE invoice_number LIKE $1
            ORDER BY invoice_number DESC
            LIMIT 1
            "#,
    )
    .bind(pattern)
    .fetch_optional(&self.pool)
    .await?;

    Ok(number)
  }

  async fn delete_with_items(&self, id: Uuid) -> Result<(), BillingError> {
    let mut tx = self.pool.begin().await?;

    sqlx::query("DELETE FROM invoice_items WHERE invoice_id = $1")
      .bind(id)
      .execute(&mut *tx)
      .await?;

    sqlx::query("DELETE FROM invoices WHERE id = $1")
      .bind(id)
      .execute(&mut *tx)
      .await?;

    tx.commit().await?;
    Ok(())
  }
}

pub struct PostgresInvoiceItemRepository {
  pool: PgPool,
}

impl PostgresInvoiceItemRepository {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl InvoiceItemRepository for PostgresInvoiceItemRepository {
  async fn find_by_invoice_id(&self, invoice_id: Uuid) -> Result<Vec<InvoiceItem>, BillingError> {
    let rows = sqlx::query_as::<_, InvoiceItemRow>(
      r#"
            SELECT id, invoice_id, description, quantity, unit_price, tax_rate,
                   amount, line_order
            FROM invoice_items
            WHERE invoice_id = $1
            ORDER BY line_order ASC
            "#,
    )
    .bind(invoice_id)
    .fetch_all(&self.pool)
    .await?;

    rows.into_iter().map(|r| r.try_into()).collect()
  }
}
