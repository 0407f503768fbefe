use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::net::IpAddr;
use uuid::Uuid;

use crate::domain::auth::entities::LoginAttempt;
use crate::domain::auth::errors::{AuthError, RepositoryError};
use crate::domain::auth::ports::LoginAttemptRepository;

#[derive(Debug, FromRow)]
struct LoginAttemptRow {
  id: Uuid,
  email: String,
  ip_address: String,
  success: bool,
  attempted_at: DateTime<Utc>,
}

pub struct PostgresLoginAttemptRepository {
  pool: PgPool,
}

impl PostgresLoginAttemptRepository {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl LoginAttemptRepository for PostgresLoginAttemptRepository {
  async fn create(&self, attempt: LoginAttempt) -> Result<LoginAttempt, AuthError> {
    let row = sqlx::query_as::<_, LoginAttemptRow>(
      r#"
            INSERT INTO login_attempts (id, email, ip_address, success, attempted_at)
            VALUES ($1, $2, CAST($3 AS INET), $4, $5)
            RETURNING id, email, HOST(ip_address) as ip_address, success, attempted_at
            "#,
    )
    .bind(attempt.id)
    .bind(&attempt.email)
    .bind(attempt.ip_address.to_string())
    .bind(attempt.success)
    .bind(attempt.attempted_at)
    .fetch_one(&self.pool)
    .await
    .map_err(RepositoryError::from)?;

    let ip_address = row
      .ip_address
      .parse::<IpAddr>()
      .map_err(|e| RepositoryError::QueryFailed(format!("Invalid IP in database: {}", e)))?;

    Ok(LoginAttempt {
      id: row.id,
      email: row.email,
      ip_address,
      success: row.success,
      attempted_at: row.attempted_at,
    })
  }

  async fn count_recent_failures(
    &self,
    email: &str,
    window_seconds: i64,
  ) -> Result<i64, AuthError> {
    let count = sqlx::query_scalar::<_, i64>(
      r#"
            SELECT COUNT(*)
            FROM login_attempts
            WHERE email = $1
              AND success = FALSE
              AND attempted_at > NOW() - ($2 || ' seconds')::INTERVAL
            "#,
    )
    .bind(email)
    .bind(window_seconds.to_string())
    .fetch_one(&self.pool)
    .await
    .map_err(RepositoryError::from)?;

    Ok(count)
  }
}
