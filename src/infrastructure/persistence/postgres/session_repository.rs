use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::net::IpAddr;
use uuid::Uuid;

use crate::domain::auth::entities::Session;
use crate::domain::auth::errors::{AuthError, RepositoryError};
use crate::domain::auth::ports::SessionRepository;

#[derive(Debug, FromRow)]
struct SessionRow {
  id: Uuid,
  user_id: Uuid,
  token_hash: String,
  ip_address: Option<String>,
  user_agent: Option<String>,
  expires_at: DateTime<Utc>,
  created_at: DateTime<Utc>,
}

impl From<SessionRow> for Session {
  fn from(row: SessionRow) -> Self {
    Session {
      id: row.id,
      user_id: row.user_id,
      token_hash: row.token_hash,
      ip_address: row.ip_address.and_then(|ip| ip.parse::<IpAddr>().ok()),
      user_agent: row.user_agent,
      expires_at: row.expires_at,
      created_at: row.created_at,
    }
  }
}

pub struct PostgresSessionRepository {
  pool: PgPool,
}

impl PostgresSessionRepository {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl SessionRepository for PostgresSessionRepository {
  async fn create(&self, session: Session) -> Result<Session, AuthError> {
    let ip_address = session.ip_address.map(|ip| ip.to_string());

    let row = sqlx::query_as::<_, SessionRow>(
      r#"
            INSERT INTO sessions (id, user_id, token_hash, ip_address, user_agent,
                                  expires_at, created_at)
            VALUES ($1, $2, $3, CAST($4 AS INET), $5, $6, $7)
            RETURNING id, user_id, token_hash, HOST(ip_address) as ip_address,
                      user_agent, expires_at, created_at
            "#,
    )
    .bind(session.id)
    .bind(session.user_id)
    .bind(&session.token_hash)
    .bind(ip_address.as_deref())
    .bind(session.user_agent.as_deref())
    .bind(session.expires_at)
    .bind(session.created_at)
    .fetch_one(&self.pool)
    .await
    .map_err(RepositoryError::from)?;

    Ok(row.into())
  }

  async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<Session>, AuthError> {
    let row = sqlx::query_as::<_, SessionRow>(
      r#"
            SELECT id, user_id, token_hash, HOST(ip_address) as ip_address,
                   user_agent, expires_at, created_at
            FROM sessions
            WHERE token_hash = $1
            "#,
    )
    .bind(token_hash)
    .fetch_optional(&self.pool)
    .await
    .map_err(RepositoryError::from)?;

    Ok(row.map(Into::into))
  }

  async fn delete(&self, session_id: Uuid) -> Result<(), AuthError> {
    sqlx::query("DELETE FROM sessions WHERE id = $1")
      .bind(session_id)
      .execute(&self.pool)
      .await
      .map_err(RepositoryError::from)?;

    Ok(())
  }

  async fn delete_all_for_user(&self, user_id: Uuid) -> Result<u64, AuthError> {
    let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
      .bind(user_id)
      .execute(&self.pool)
      .await
      .map_err(RepositoryError::from)?;

    Ok(result.rows_affected())
  }
}
