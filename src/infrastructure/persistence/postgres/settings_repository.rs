use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::settings::entities::{Setting, SettingType};
use crate::domain::settings::errors::SettingsError;
use crate::domain::settings::ports::SettingsRepository;

#[derive(Debug, FromRow)]
struct SettingRow {
  id: Uuid,
  key: String,
  value: Option<String>,
  setting_type: String,
  description: Option<String>,
  group_name: String,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl TryFrom<SettingRow> for Setting {
  type Error = SettingsError;

  fn try_from(row: SettingRow) -> Result<Self, Self::Error> {
    Ok(Setting {
      id: row.id,
      key: row.key,
      value: row.value,
      setting_type: SettingType::from_str(&row.setting_type)?,
      description: row.description,
      group: row.group_name,
      created_at: row.created_at,
      updated_at: row.updated_at,
    })
  }
}

const SETTING_COLUMNS: &str =
  "id, key, value, setting_type, description, group_name, created_at, updated_at";

pub struct PostgresSettingsRepository {
  pool: PgPool,
}

impl PostgresSettingsRepository {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl SettingsRepository for PostgresSettingsRepository {
  async fn find_by_key(&self, key: &str) -> Result<Option<Setting>, SettingsError> {
    let row = sqlx::query_as::<_, SettingRow>(&format!(
      "SELECT {} FROM settings WHERE key = $1",
      SETTING_COLUMNS
    ))
    .bind(key)
    .fetch_optional(&self.pool)
    .await?;

    row.map(|r| r.try_into()).transpose()
  }

  async fn find_all(&self) -> Result<Vec<Setting>, SettingsError> {
    let rows = sqlx::query_as::<_, SettingRow>(&format!(
      "SELECT {} FROM settings ORDER BY group_name, key",
      SETTING_COLUMNS
    ))
    .fetch_all(&self.pool)
    .await?;

    rows.into_iter().map(|r| r.try_into()).collect()
  }

  async fn find_by_group(&self, group: &str) -> Result<Vec<Setting>, SettingsError> {
    let rows = sqlx::query_as::<_, SettingRow>(&format!(
      "SELECT {} FROM settings WHERE group_name = $1 ORDER BY key",
      SETTING_COLUMNS
    ))
    .bind(group)
    .fetch_all(&self.pool)
    .await?;

    rows.into_iter().map(|r| r.try_into()).collect()
  }

  async fn upsert(&self, setting: Setting) -> Result<Setting, SettingsError> {
    let row = sqlx::query_as::<_, SettingRow>(
      r#"
            INSERT INTO settings (id, key, value, setting_type, description, group_name,
                                  created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (key) DO UPDATE
            SET value = EXCLUDED.value,
                setting_type = EXCLUDED.setting_type,
                group_name = EXCLUDED.group_name,
                updated_at = EXCLUDED.updated_at
            RETURNING id, key, value, setting_type, description, group_name,
                      created_at, updated_at
            "#,
    )
    .bind(setting.id)
    .bind(&setting.key)
    .bind(&setting.value)
    .bind(setting.setting_type.as_str())
    .bind(&setting.description)
    .bind(&setting.group)
    .bind(setting.created_at)
    .bind(setting.updated_at)
    .fetch_one(&self.pool)
    .await?;

    row.try_into()
  }
}
