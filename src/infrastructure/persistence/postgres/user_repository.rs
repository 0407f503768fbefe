use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::auth::entities::User;
use crate::domain::auth::errors::{AuthError, RepositoryError};
use crate::domain::auth::ports::UserRepository;
use crate::domain::auth::value_objects::{Email, Role};

#[derive(Debug, FromRow)]
struct UserRow {
  id: Uuid,
  email: String,
  password_hash: String,
  first_name: String,
  last_name: String,
  role: String,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
  type Error = AuthError;

  fn try_from(row: UserRow) -> Result<Self, Self::Error> {
    Ok(User {
      id: row.id,
      email: row.email,
      password_hash: row.password_hash,
      first_name: row.first_name,
      last_name: row.last_name,
      role: Role::from_str(&row.role)?,
      created_at: row.created_at,
      updated_at: row.updated_at,
    })
  }
}

const USER_COLUMNS: &str =
  "id, email, password_hash, first_name, last_name, role, created_at, updated_at";

pub struct PostgresUserRepository {
  pool: PgPool,
}

impl PostgresUserRepository {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
  async fn create(&self, user: User) -> Result<User, AuthError> {
    let row = sqlx::query_as::<_, UserRow>(
      r#"
            INSERT INTO users (id, email, password_hash, first_name, last_name, role,
                               created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, email, password_hash, first_name, last_name, role,
                      created_at, updated_at
            "#,
    )
    .bind(user.id)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(user.role.as_str())
    .bind(user.created_at)
    .bind(user.updated_at)
    .fetch_one(&self.pool)
    .await
    .map_err(RepositoryError::from)?;

    row.try_into()
  }

  async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
      "SELECT {} FROM users WHERE id = $1",
      USER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&self.pool)
    .await
    .map_err(RepositoryError::from)?;

    row.map(|r| r.try_into()).transpose()
  }

  async fn find_by_email(&self, email: &Email) -> Result<Option<User>, AuthError> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
      "SELECT {} FROM users WHERE email = $1",
      USER_COLUMNS
    ))
    .bind(email.as_str())
    .fetch_optional(&self.pool)
    .await
    .map_err(RepositoryError::from)?;

    row.map(|r| r.try_into()).transpose()
  }

  async fn update(&self, user: User) -> Result<User, AuthError> {
    let row = sqlx::query_as::<_, UserRow>(
      r#"
            UPDATE users
            SET email = $2, password_hash = $3, first_name = $4, last_name = $5,
                role = $6, updated_at = $7
            WHERE id = $1
            RETURNING id, email, password_hash, first_name, last_name, role,
                      created_at, updated_at
            "#,
    )
    .bind(user.id)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(user.role.as_str())
    .bind(Utc::now())
    .fetch_one(&self.pool)
    .await
    .map_err(RepositoryError::from)?;

    row.try_into()
  }
}
