use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::domain::billing::{BillingError, Customer, ports::CustomerRepository};

#[derive(Debug, FromRow)]
struct CustomerRow {
  id: Uuid,
  user_id: Uuid,
  trainer_id: Option<Uuid>,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl From<CustomerRow> for Customer {
  fn from(row: CustomerRow) -> Self {
    Customer {
      id: row.id,
      user_id: row.user_id,
      trainer_id: row.trainer_id,
      created_at: row.created_at,
      updated_at: row.updated_at,
    }
  }
}

pub struct PostgresCustomerRepository {
  pool: PgPool,
}

impl PostgresCustomerRepository {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl CustomerRepository for PostgresCustomerRepository {
  async fn create(&self, customer: Customer) -> Result<Customer, BillingError> {
    let row = sqlx::query_as::<_, CustomerRow>(
      r#"
            INSERT INTO customers (id, user_id, trainer_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, trainer_id, created_at, updated_at
            "#,
    )
    .bind(customer.id)
    .bind(customer.user_id)
    .bind(customer.trainer_id)
    .bind(customer.created_at)
    .bind(customer.updated_at)
    .fetch_one(&self.pool)
    .await?;

    Ok(row.into())
  }

  async fn find_by_id(&self, id: Uuid) -> Result<Option<Customer>, BillingError> {
    let row = sqlx::query_as::<_, CustomerRow>(
      "SELECT id, user_id, trainer_id, created_at, updated_at FROM customers WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&self.pool)
    .await?;

    Ok(row.map(Into::into))
  }

  async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<Customer>, BillingError> {
    let row = sqlx::query_as::<_, CustomerRow>(
      "SELECT id, user_id, trainer_id, created_at, updated_at FROM customers WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(&self.pool)
    .await?;

    Ok(row.map(Into::into))
  }
}
